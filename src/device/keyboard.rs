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

//! PS/2 keyboard: scancode decoding down to a single buffered character.
//!
//! Only the common-case Set 1 make codes for printable ASCII are decoded; extended codes, modifier
//! tracking (other than shift) and key-up handling beyond "drop it" are a fuller driver's job, not
//! this contract's.

use crate::io;
use crate::process::scheduler;
use crate::sync::IntMutex;

const DATA_PORT: u16 = 0x60;

/// Wait reason processes block on while waiting for a keystroke.
pub const WAIT_REASON: u32 = 1;

#[rustfmt::skip]
const SET1_LOWER: [u8; 0x3a] = [
	0, 0, b'1', b'2', b'3', b'4', b'5', b'6', b'7', b'8', b'9', b'0', b'-', b'=', 0x08, b'\t',
	b'q', b'w', b'e', b'r', b't', b'y', b'u', b'i', b'o', b'p', b'[', b']', b'\n', 0,
	b'a', b's', b'd', b'f', b'g', b'h', b'j', b'k', b'l', b';', b'\'', b'`', 0, b'\\',
	b'z', b'x', b'c', b'v', b'b', b'n', b'm', b',', b'.', b'/', 0, b'*', 0, b' ',
];

#[rustfmt::skip]
const SET1_UPPER: [u8; 0x3a] = [
	0, 0, b'!', b'@', b'#', b'$', b'%', b'^', b'&', b'*', b'(', b')', b'_', b'+', 0x08, b'\t',
	b'Q', b'W', b'E', b'R', b'T', b'Y', b'U', b'I', b'O', b'P', b'{', b'}', b'\n', 0,
	b'A', b'S', b'D', b'F', b'G', b'H', b'J', b'K', b'L', b':', b'"', b'~', 0, b'|',
	b'Z', b'X', b'C', b'V', b'B', b'N', b'M', b'<', b'>', b'?', 0, b'*', 0, b' ',
];

const LSHIFT_MAKE: u8 = 0x2a;
const RSHIFT_MAKE: u8 = 0x36;
const RELEASE_BIT: u8 = 0x80;

struct State {
	shift: bool,
	buffered: Option<char>,
}

static STATE: IntMutex<State> = IntMutex::new(State {
	shift: false,
	buffered: None,
});

/// Returns the oldest buffered keystroke, or `0` if none is pending.
///
/// Never blocks; the blocking behavior lives in the `read_char` syscall, which calls this in a
/// loop across scheduler blocks.
pub fn buffer_read() -> char {
	STATE.lock().buffered.take().unwrap_or('\0')
}

/// IRQ1 handler: reads one scancode from the controller, updates shift state or buffers a
/// decoded character, and wakes anyone blocked on [`WAIT_REASON`].
pub fn on_irq() {
	let code = unsafe { io::inb(DATA_PORT) };
	let released = code & RELEASE_BIT != 0;
	let code = code & !RELEASE_BIT;
	let mut state = STATE.lock();
	match code {
		LSHIFT_MAKE | RSHIFT_MAKE => {
			state.shift = !released;
			return;
		}
		_ if released => return,
		_ => {}
	}
	let table = if state.shift {
		&SET1_UPPER
	} else {
		&SET1_LOWER
	};
	let Some(&byte) = table.get(code as usize) else {
		return;
	};
	if byte == 0 {
		return;
	}
	state.buffered = Some(byte as char);
	drop(state);
	scheduler::wake_one(WAIT_REASON);
}

/// Buffers `c` directly, standing in for [`on_irq`] when nothing is wiggling real scancodes at
/// the controller.
#[cfg(test)]
pub(crate) fn inject(c: char) {
	STATE.lock().buffered = Some(c);
}

#[cfg(test)]
mod test {
	use super::*;

	#[test_case]
	fn buffered_char_read_once() {
		inject('x');
		assert_eq!(buffer_read(), 'x');
		assert_eq!(buffer_read(), '\0');
	}
}
