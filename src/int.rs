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

//! Interrupt dispatch: the single entry point every vector in `arch/x86/asm/interrupts.s` calls
//! into, routing each one to the handler that owns it.
//!
//! There is no general callback-registration facility here, unlike a kernel meant to host
//! arbitrary drivers: the small, fixed set of vectors this core cares about (exceptions, the timer
//! and keyboard IRQs, and `int 0x80`) are matched directly.

use crate::{
	arch::{end_of_interrupt, x86::IntFrame},
	device::keyboard,
	idt::SYSCALL_ENTRY,
	panic,
	process::scheduler,
	syscall,
};

/// First IRQ vector (the PIC is remapped so IRQ0 lands here, see `idt::init`).
const IRQ_BASE: u32 = 0x20;
/// Timer IRQ (IRQ0, the PIT).
const IRQ_TIMER: u32 = IRQ_BASE;
/// Keyboard IRQ (IRQ1).
const IRQ_KEYBOARD: u32 = IRQ_BASE + 1;
/// Last IRQ vector in use (IRQ0..IRQ15).
const IRQ_LAST: u32 = IRQ_BASE + 15;
/// `int 0x80`, as a `u32` for matching against `frame.int`.
const SYSCALL_VECTOR: u32 = SYSCALL_ENTRY as u32;

/// Called by the assembly stub on every interrupt, with general-purpose registers already saved
/// to `frame`.
#[unsafe(no_mangle)]
extern "C" fn interrupt_handler(frame: &mut IntFrame) {
	match frame.int {
		SYSCALL_VECTOR => syscall::dispatch(frame),
		IRQ_TIMER => {
			end_of_interrupt(0);
			scheduler::schedule();
		}
		IRQ_KEYBOARD => {
			keyboard::on_irq();
			end_of_interrupt(1);
		}
		irq @ IRQ_BASE..=IRQ_LAST => {
			end_of_interrupt((irq - IRQ_BASE) as u8);
		}
		_ => panic::with_frame(frame),
	}
}
