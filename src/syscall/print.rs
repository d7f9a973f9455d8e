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

//! `print(msg)`: writes a NUL-terminated user string to the kernel console.

use crate::device::console::term_print;
use crate::syscall::{user_c_str, MAX_PRINT_LEN};

pub fn call(msg: usize) -> isize {
	let Some(s) = (unsafe { user_c_str(msg, MAX_PRINT_LEN) }) else {
		return -1;
	};
	term_print(s);
	0
}

#[cfg(test)]
mod test {
	use super::*;

	/// Scenario 6: a process handing the kernel a pointer into its own supervisor-only low memory
	/// (here, 1 MiB in) is rejected outright rather than read.
	#[test_case]
	fn rejects_pointer_into_low_memory() {
		assert_eq!(call(0x0010_0000), -1);
	}
}
