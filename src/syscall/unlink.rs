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

//! `unlink(path)`: deletes the entry named `path` from the calling process's CWD. Non-empty
//! directories are rejected.

use crate::errno::to_syscall_ret;
use crate::syscall::{user_c_str, MAX_PATH};
use crate::{file, process};

pub fn call(path: usize) -> isize {
	let Some(path) = (unsafe { user_c_str(path, MAX_PATH) }) else {
		return -1;
	};
	let pid = process::current_pid();
	let res = process::with_process(pid, |p| file::delete(p.cwd, path))
		.expect("current process has no control block");
	to_syscall_ret(res.map(|_| 0isize))
}
