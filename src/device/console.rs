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

//! The kernel console: a VGA text-mode sink plus a mirrored serial log.
//!
//! Cursor/attribute handling is deliberately bare: this is the contract `print`/`clear_screen`
//! need, not a full terminal driver.

use crate::sync::IntMutex;

const VGA_WIDTH: usize = 80;
const VGA_HEIGHT: usize = 25;
const VGA_BUFFER: usize = 0xb8000;
const BLANK: u16 = (b' ' as u16) | (0x07 << 8);

struct Cursor {
	col: usize,
	row: usize,
}

static CURSOR: IntMutex<Cursor> = IntMutex::new(Cursor {
	col: 0,
	row: 0,
});

fn vga_buffer() -> &'static mut [u16; VGA_WIDTH * VGA_HEIGHT] {
	unsafe { &mut *(VGA_BUFFER as *mut [u16; VGA_WIDTH * VGA_HEIGHT]) }
}

fn scroll(buf: &mut [u16; VGA_WIDTH * VGA_HEIGHT]) {
	buf.copy_within(VGA_WIDTH.., 0);
	buf[VGA_WIDTH * (VGA_HEIGHT - 1)..].fill(BLANK);
}

fn putc(c: &mut Cursor, buf: &mut [u16; VGA_WIDTH * VGA_HEIGHT], byte: u8) {
	match byte {
		b'\n' => {
			c.col = 0;
			c.row += 1;
		}
		_ => {
			buf[c.row * VGA_WIDTH + c.col] = (byte as u16) | (0x07 << 8);
			c.col += 1;
			if c.col >= VGA_WIDTH {
				c.col = 0;
				c.row += 1;
			}
		}
	}
	if c.row >= VGA_HEIGHT {
		scroll(buf);
		c.row = VGA_HEIGHT - 1;
	}
}

/// Writes `s` to the VGA text buffer, scrolling when it reaches the bottom row.
pub fn term_print(s: &str) {
	let mut cursor = CURSOR.lock();
	let buf = vga_buffer();
	for byte in s.bytes() {
		putc(&mut cursor, buf, byte);
	}
}

/// Clears the VGA text buffer and homes the cursor.
pub fn term_clear() {
	let mut cursor = CURSOR.lock();
	vga_buffer().fill(BLANK);
	cursor.col = 0;
	cursor.row = 0;
}

/// Writes `s` to the COM1 serial port, for a log a host running under emulation can capture.
pub fn serial_log(s: &str) {
	crate::device::serial::PORTS[0].lock().write(s.as_bytes());
}
