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

//! `open(path)`: resolves `path` against the calling process's CWD and allocates an FD slot for
//! it, offset 0.

use crate::errno::to_syscall_ret;
use crate::{file, process};
use crate::syscall::{user_c_str, MAX_PATH};

pub fn call(path: usize) -> isize {
	let Some(path) = (unsafe { user_c_str(path, MAX_PATH) }) else {
		return -1;
	};
	let pid = process::current_pid();
	let res = process::with_process(pid, |p| -> crate::errno::KResult<usize> {
		let node = file::resolve(p.cwd, path)?;
		p.fd_table.open(node)
	})
	.expect("current process has no control block");
	to_syscall_ret(res)
}
