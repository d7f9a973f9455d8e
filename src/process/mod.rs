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

//! Process control blocks and the process table.
//!
//! Processes are kept in a fixed-size arena indexed by pid rather than linked through pointers:
//! `exit`/`wait` only ever touch their own slot, so there is no pointer-cycle hazard during reaping.

pub mod pid;
pub mod scheduler;
pub mod tss;

use crate::errno::{kerr, KResult};
use crate::file::fd::FdTable;
use crate::file::{self, NodeId};
use crate::memory::{PhysAddr, VirtAddr};
use crate::sync::IntMutex;
use alloc::boxed::Box;
use alloc::vec::Vec;
use pid::{Pid, PidHandle, IDLE_PID, INIT_PID, MAX_PID};

/// Size, in bytes, of a kernel stack allocated for a process.
pub const KERNEL_STACK_SIZE: usize = 16 * 1024;

/// Top of the user stack region, common to every process (one page is mapped just below it).
pub const USER_STACK_TOP: usize = 0xC000_0000;

/// A process's run state.
///
/// `wait_reason` and `exit_code` fold into the variants that actually carry them rather than
/// living as separate always-present fields, since a `Ready` process has no reason to block and a
/// non-`Zombie` process has no exit code to report.
pub enum ProcState {
	Ready,
	Blocked(u32),
	Zombie(i32),
}

/// A process control block.
pub struct Process {
	pub pid: PidHandle,
	pub parent: Pid,
	pub state: ProcState,
	/// Stack pointer saved by the last context switch away from this process.
	pub saved_kernel_esp: u32,
	/// Physical address of this process's page directory.
	pub cr3: PhysAddr,
	/// Whether `cr3` is the shared kernel directory (kernel thread) rather than a private one.
	pub shares_kernel_directory: bool,
	pub kernel_stack: Box<[u8]>,
	pub program_break: VirtAddr,
	pub tracked_pages: Vec<VirtAddr>,
	pub cwd: NodeId,
	pub fd_table: FdTable,
}

struct Table {
	procs: Vec<Option<Process>>,
}

impl Table {
	const fn new() -> Self {
		Self {
			procs: Vec::new(),
		}
	}
}

static TABLE: IntMutex<Table> = IntMutex::new(Table::new());
static CURRENT: IntMutex<Pid> = IntMutex::new(IDLE_PID);

/// Runs `f` with exclusive access to process `pid`'s control block.
pub fn with_process<R>(pid: Pid, f: impl FnOnce(&mut Process) -> R) -> Option<R> {
	let mut table = TABLE.lock();
	table.procs.get_mut(pid as usize)?.as_mut().map(f)
}

/// Returns the pid of the process currently executing.
pub fn current_pid() -> Pid {
	*CURRENT.lock()
}

pub(crate) fn set_current_pid(pid: Pid) {
	*CURRENT.lock() = pid;
}

fn insert(proc: Process) -> Pid {
	let pid = proc.pid.get();
	let mut table = TABLE.lock();
	if table.procs.len() <= pid as usize {
		table.procs.resize_with(pid as usize + 1, || None);
	}
	table.procs[pid as usize] = Some(proc);
	pid
}

/// Removes and returns the control block for `pid`, if present.
fn take(pid: Pid) -> Option<Process> {
	TABLE.lock().procs.get_mut(pid as usize)?.take()
}

/// Creates a kernel thread that begins executing at `entry` in ring 0, sharing the kernel
/// directory (so `exit` must never free its address space).
pub fn spawn_kernel_thread(entry: extern "C" fn() -> !) -> KResult<Pid> {
	let pid_handle = PidHandle::alloc().ok_or(kerr!(OutOfMemory))?;
	let kernel_stack = alloc::vec![0u8; KERNEL_STACK_SIZE].into_boxed_slice();
	let esp = scheduler::build_kernel_thread_stack(&kernel_stack, entry as usize as u32);
	let proc = Process {
		pid: pid_handle,
		parent: INIT_PID,
		state: ProcState::Ready,
		saved_kernel_esp: esp,
		cr3: crate::memory::vmm::kernel_directory(),
		shares_kernel_directory: true,
		kernel_stack,
		program_break: VirtAddr(0),
		tracked_pages: Vec::new(),
		cwd: file::ROOT,
		fd_table: FdTable::new(),
	};
	let pid = insert(proc);
	scheduler::enqueue(pid);
	Ok(pid)
}

/// Creates a user process whose first instruction is `entry`, running in the private address
/// space `cr3` with a user stack already mapped at `USER_STACK_TOP - PAGE_SIZE`.
pub fn spawn_user(entry: VirtAddr, cr3: PhysAddr, program_break: VirtAddr) -> KResult<Pid> {
	let pid_handle = PidHandle::alloc().ok_or(kerr!(OutOfMemory))?;
	let kernel_stack = alloc::vec![0u8; KERNEL_STACK_SIZE].into_boxed_slice();
	let esp = scheduler::build_user_stack(&kernel_stack, entry.0 as u32, USER_STACK_TOP as u32);
	let proc = Process {
		pid: pid_handle,
		parent: current_pid(),
		state: ProcState::Ready,
		saved_kernel_esp: esp,
		cr3,
		shares_kernel_directory: false,
		kernel_stack,
		program_break,
		tracked_pages: Vec::new(),
		cwd: file::ROOT,
		fd_table: FdTable::new(),
	};
	let pid = insert(proc);
	scheduler::enqueue(pid);
	Ok(pid)
}

/// Terminates the calling process with `code`: frees its address space (unless it is shared),
/// marks it a zombie so `wait` can observe the exit code, wakes any waiter, and yields for good.
///
/// Per the design notes, the address space is freed here rather than deferred to the reaping
/// parent — a known divergence between "works in practice" and "provably correct", preserved
/// from the system this was adapted from.
pub fn exit(code: i32) -> ! {
	let pid = current_pid();
	with_process(pid, |p| {
		if !p.shares_kernel_directory {
			crate::memory::vmm::destroy_address_space(p.cr3);
		}
		p.state = ProcState::Zombie(code);
	});
	scheduler::wake_one(pid as u32);
	scheduler::schedule();
	unreachable!("exited process was rescheduled");
}

/// Reaps a child of the calling process.
///
/// `pid = -1` matches any child. Blocks until a matching child is a zombie, then frees its
/// control block and returns its pid and exit code.
pub fn wait(target: i32) -> KResult<(Pid, i32)> {
	let me = current_pid();
	loop {
		let mut live_child = None;
		let found = {
			let table = TABLE.lock();
			table.procs.iter().enumerate().find_map(|(pid, slot)| {
				let p = slot.as_ref()?;
				let matches = p.parent == me && (target < 0 || target as usize == pid);
				if !matches {
					return None;
				}
				match p.state {
					ProcState::Zombie(code) => Some((pid as Pid, code)),
					_ => {
						live_child.get_or_insert(pid as Pid);
						None
					}
				}
			})
		};
		if let Some((pid, code)) = found {
			take(pid);
			return Ok((pid, code));
		}
		// Block on the matched child's own pid, not the caller's: `exit` wakes by the exiting
		// process's pid, not its parent's.
		let Some(child_pid) = live_child else {
			return Err(kerr!(NoSuchChild));
		};
		scheduler::block(child_pid as u32);
	}
}

/// Checks `MAX_PID` is large enough to be indexed directly without a secondary hash lookup.
const _: () = assert!(MAX_PID <= u16::MAX as usize + 1);

#[cfg(test)]
mod test {
	use super::*;
	use crate::errno::KError;

	extern "C" fn dummy_entry() -> ! {
		loop {}
	}

	/// P8 / scenario: `wait` reaps an already-exited child without blocking, and reports
	/// `NoSuchChild` once the caller has no children left.
	#[test_case]
	fn wait_reaps_zombie_without_blocking() {
		crate::memory::test_init();
		let parent = current_pid();
		let child = spawn_kernel_thread(dummy_entry).unwrap();
		with_process(child, |p| {
			p.parent = parent;
			p.state = ProcState::Zombie(42);
		});

		let (reaped, code) = wait(-1).unwrap();
		assert_eq!(reaped, child);
		assert_eq!(code, 42);
		assert!(matches!(wait(-1), Err(KError::NoSuchChild)));
	}
}
