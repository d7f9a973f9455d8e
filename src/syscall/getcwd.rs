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

//! `getcwd(buf, n)`: writes the full path of the calling process's CWD, NUL-terminated, into
//! `buf`.

use crate::file;
use crate::process;
use crate::syscall::user_slice_mut;

pub fn call(buf: usize, n: usize) -> isize {
	if n == 0 {
		return -1;
	}
	let Some(buf) = (unsafe { user_slice_mut(buf, n) }) else {
		return -1;
	};
	let pid = process::current_pid();
	let cwd = process::with_process(pid, |p| p.cwd).expect("current process has no control block");
	let path = file::path_of(cwd);
	let bytes = path.as_bytes();
	if bytes.len() + 1 > n {
		return -1;
	}
	buf[..bytes.len()].copy_from_slice(bytes);
	buf[bytes.len()] = 0;
	bytes.len() as isize
}
