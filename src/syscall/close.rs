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

//! `close(fd)`: releases the FD slot, making it available for reuse.

use crate::errno::to_syscall_ret;
use crate::process;

pub fn call(fd: usize) -> isize {
	let pid = process::current_pid();
	let res = process::with_process(pid, |p| p.fd_table.close(fd))
		.expect("current process has no control block");
	to_syscall_ret(res.map(|_| 0isize))
}
