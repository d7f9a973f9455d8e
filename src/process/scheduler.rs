/*
 * Copyright 2024 ferrite contributors
 *
 * This file is part of ferrite.
 *
 * ferrite is free software: you can redistribute it and/or modify it under the
 * terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or (at your option) any later
 * version.
 *
 * ferrite is distributed in the hope that it will be useful, but WITHOUT ANY
 * WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR
 * A PARTICULAR PURPOSE. See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * ferrite. If not, see <https://www.gnu.org/licenses/>.
 */

//! Round-robin scheduling over a ready set of pids.
//!
//! The ready list is a plain queue of pids rather than a circularly linked list of PCBs: pids are
//! stable and cheap to copy, so there is nothing to gain from threading pointers through the
//! process table itself, and a queue sidesteps the unlink-while-iterating hazard a linked ring has
//! on exit.

use crate::process::{self, tss, ProcState};
use crate::sync::IntMutex;
use alloc::collections::VecDeque;
use core::arch::asm;

static READY: IntMutex<VecDeque<process::pid::Pid>> = IntMutex::new(VecDeque::new());

/// Makes `pid` eligible to run.
pub fn enqueue(pid: process::pid::Pid) {
	READY.lock().push_back(pid);
}

extern "C" {
	/// Saves the callee-saved registers of the outgoing context onto its stack, stores the
	/// resulting stack pointer at `*out_esp`, loads `in_esp` as the stack pointer, and restores
	/// the incoming context's callee-saved registers before returning into it.
	///
	/// Defined in `arch/x86/asm/context_switch.s`.
	fn arch_context_switch(out_esp: *mut u32, in_esp: u32);
	/// Landing pad for a freshly built process stack; see `arch/x86/asm/context_switch.s`.
	fn new_context_trampoline();
}

/// Picks the next ready process and switches to it. Returns immediately if the caller is the
/// only runnable process.
///
/// Called directly by `yield`, by blocking waits between polls, and by the timer interrupt
/// handler.
pub fn schedule() {
	let current = process::current_pid();
	let next = {
		let mut ready = READY.lock();
		// Re-enqueue the current process if it is still runnable; this is what makes the queue
		// behave like a circular ready list rather than a one-shot run queue.
		if process::with_process(current, |p| matches!(p.state, ProcState::Ready)).unwrap_or(false)
		{
			ready.push_back(current);
		}
		loop {
			let candidate = ready.pop_front();
			match candidate {
				None => break None,
				Some(pid) if pid == current && ready.is_empty() => break Some(pid),
				Some(pid) => {
					let runnable =
						process::with_process(pid, |p| matches!(p.state, ProcState::Ready))
							.unwrap_or(false);
					if runnable {
						break Some(pid);
					}
					// Not runnable (blocked or reaped mid-queue): drop it from the queue.
				}
			}
		}
	};
	let Some(next) = next else {
		// Nothing runnable; halt until the next interrupt (likely the timer) re-evaluates.
		unsafe {
			asm!("sti", "hlt");
		}
		return;
	};
	if next == current {
		return;
	}
	switch_to(current, next);
}

fn switch_to(from: process::pid::Pid, to: process::pid::Pid) {
	let (to_cr3, to_kernel_stack_top) = process::with_process(to, |p| {
		(p.cr3, p.kernel_stack.as_ptr() as u32 + p.kernel_stack.len() as u32)
	})
	.expect("scheduled a pid with no control block");
	if crate::memory::vmm::current() != Some(to_cr3) {
		unsafe {
			crate::memory::vmm::switch(to_cr3);
		}
	}
	tss::TSS::set_kernel_stack(to_kernel_stack_top);
	process::set_current_pid(to);
	let out_esp: *mut u32 = process::with_process(from, |p| &mut p.saved_kernel_esp as *mut u32)
		.unwrap_or(core::ptr::null_mut());
	let in_esp = process::with_process(to, |p| p.saved_kernel_esp).unwrap();
	if out_esp.is_null() {
		// `from`'s control block is already gone (it just exited); nothing to save into.
		let mut discarded = 0u32;
		unsafe {
			arch_context_switch(&mut discarded as *mut u32, in_esp);
		}
	} else {
		unsafe {
			arch_context_switch(out_esp, in_esp);
		}
	}
}

/// Blocks the calling process on `reason` and switches away. Returns once another process wakes
/// it with a matching reason.
pub fn block(reason: u32) {
	let pid = process::current_pid();
	process::with_process(pid, |p| p.state = ProcState::Blocked(reason));
	schedule();
}

/// Wakes the first process blocked on `reason`, if any.
pub fn wake_one(reason: u32) {
	let mut ready = READY.lock();
	for pid in 0..process::pid::MAX_PID as process::pid::Pid {
		let woke = process::with_process(pid, |p| {
			if matches!(p.state, ProcState::Blocked(r) if r == reason) {
				p.state = ProcState::Ready;
				true
			} else {
				false
			}
		});
		if woke == Some(true) {
			ready.push_back(pid);
			return;
		}
	}
}

/// Builds the initial saved stack for a same-privilege kernel thread: just the three words an
/// `iret` without a privilege change pops, below the callee-saved registers the context-switch
/// restore path expects.
pub fn build_kernel_thread_stack(stack: &[u8], entry: u32) -> u32 {
	let cs = crate::gdt::make_segment_selector(crate::gdt::KERNEL_CS as u32, 0) as u32;
	build_initial_frame(stack, &[entry, cs, 0x200])
}

/// Builds the initial saved stack for a ring-3 process: the five-word `iret` frame a privilege
/// change pops, below the same callee-saved register block.
pub fn build_user_stack(stack: &[u8], entry: u32, user_stack_top: u32) -> u32 {
	let cs = crate::gdt::make_segment_selector(crate::gdt::USER_CS as u32, 3) as u32;
	let ds = crate::gdt::make_segment_selector(crate::gdt::USER_DS as u32, 3) as u32;
	build_initial_frame(stack, &[entry, cs, 0x200, user_stack_top, ds])
}

/// Lays `iret_words` at the top of `stack`, preceded by a zeroed callee-saved register block and
/// a return address into [`new_context_trampoline`] the `arch_context_switch` restore path pops
/// before returning.
///
/// Word count and order must match `arch/x86/asm/context_switch.s` exactly: 4 callee-saved
/// registers, then the trampoline return address, then the `iret` frame.
const SAVED_REGS_WORDS: usize = 4;

fn build_initial_frame(stack: &[u8], iret_words: &[u32]) -> u32 {
	let top = stack.as_ptr() as usize + stack.len();
	let frame_words = SAVED_REGS_WORDS + 1 + iret_words.len();
	let frame_base = top - frame_words * 4;
	unsafe {
		let ptr = frame_base as *mut u32;
		for i in 0..SAVED_REGS_WORDS {
			ptr.add(i).write(0);
		}
		ptr.add(SAVED_REGS_WORDS).write(new_context_trampoline as usize as u32);
		for (i, word) in iret_words.iter().enumerate() {
			ptr.add(SAVED_REGS_WORDS + 1 + i).write(*word);
		}
	}
	frame_base as u32
}
