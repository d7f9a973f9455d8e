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

//! `wait(pid, *status)`: reaps a child, blocking until one matching `pid` (or any, if `pid < 0`)
//! becomes a zombie.

use crate::process;
use crate::syscall::user_slice_mut;
use core::mem::size_of;

pub fn call(pid: i32, status: usize) -> isize {
	if status != 0 && unsafe { user_slice_mut(status, size_of::<i32>()) }.is_none() {
		return -1;
	}
	match process::wait(pid) {
		Ok((child_pid, code)) => {
			if status != 0 {
				let buf = unsafe { user_slice_mut(status, size_of::<i32>()) }.unwrap();
				buf.copy_from_slice(&code.to_ne_bytes());
			}
			child_pid as isize
		}
		Err(_) => -1,
	}
}
