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

//! Kernel panic handling.
//!
//! A kernel panic occurs when an error is raised that the kernel cannot recover from. This is an
//! undesirable state which requires rebooting the host machine.

use crate::{
	arch::{cli, x86::IntFrame},
	logger::LOGGER,
	power, println, register_get,
};
use core::{
	fmt,
	panic::{Location, PanicInfo},
};

/// The list of interrupt error messages ordered by index of the corresponding interrupt vector.
static INT_REASONS: &[&str] = &[
	"Divide-by-zero Error",
	"Debug",
	"Non-maskable Interrupt",
	"Breakpoint",
	"Overflow",
	"Bound Range Exceeded",
	"Invalid Opcode",
	"Device Not Available",
	"Double Fault",
	"Coprocessor Segment Overrun",
	"Invalid TSS",
	"Segment Not Present",
	"Stack-Segment Fault",
	"General Protection Fault",
	"Page Fault",
	"Unknown",
	"x87 Floating-Point Exception",
	"Alignment Check",
	"Machine Check",
	"SIMD Floating-Point Exception",
	"Virtualization Exception",
	"Unknown",
	"Unknown",
	"Unknown",
	"Unknown",
	"Unknown",
	"Unknown",
	"Unknown",
	"Unknown",
	"Unknown",
	"Security Exception",
	"Unknown",
];

fn panic_impl(msg: impl fmt::Display, loc: Option<&Location>, frame: Option<&IntFrame>) -> ! {
	cli();
	LOGGER.lock().silent = false;
	println!("-- KERNEL PANIC! --");
	if let Some(loc) = loc {
		println!("Reason: {msg} Location: {loc}");
	} else {
		println!("Reason: {msg}");
	}
	if let Some(frame) = frame {
		println!("{frame}");
		let cr2 = register_get!("cr2");
		let cr3 = register_get!("cr3");
		println!("CR2: {cr2:#010x} CR3: {cr3:#010x}");
	}
	#[cfg(debug_assertions)]
	{
		use crate::debug;
		println!("Callstack:");
		let ebp = register_get!("ebp");
		const CALLSTACK_DEPTH: usize = 16;
		let mut callstack = [0usize; CALLSTACK_DEPTH];
		unsafe {
			debug::get_callstack(ebp as *mut usize, &mut callstack);
		}
		debug::print_callstack(&callstack);
	}
	println!("-- end trace --");
	power::halt();
}

/// Called on Rust panic.
#[panic_handler]
fn panic(panic_info: &PanicInfo) -> ! {
	panic_impl(panic_info.message(), panic_info.location(), None);
}

/// Panics with the information of an interrupt frame, for exceptions the handler treats as
/// terminal.
pub fn with_frame(frame: &IntFrame) -> ! {
	let error = INT_REASONS.get(frame.int as usize).unwrap_or(&"Unknown");
	panic_impl(error, None, Some(frame));
}

#[lang = "eh_personality"]
fn eh_personality() {}
