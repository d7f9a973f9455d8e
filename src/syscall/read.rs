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

//! `read(fd, buf, n)`: copies up to `n` bytes from the node behind `fd` at its current offset,
//! advancing it, and returns the number of bytes copied (`0` at end-of-file).

use crate::errno::to_syscall_ret;
use crate::file;
use crate::process;
use crate::syscall::user_slice_mut;

pub fn call(fd: usize, buf: usize, n: usize) -> isize {
	let Some(buf) = (unsafe { user_slice_mut(buf, n) }) else {
		return -1;
	};
	let pid = process::current_pid();
	let res = process::with_process(pid, |p| -> crate::errno::KResult<usize> {
		let desc = p.fd_table.get_mut(fd)?;
		let read = file::read_at(desc.node, desc.offset, buf)?;
		desc.offset += read;
		Ok(read)
	})
	.expect("current process has no control block");
	to_syscall_ret(res)
}
