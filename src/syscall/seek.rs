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

//! `seek(fd, off, whence)`: repositions the FD's offset relative to `whence`, clamped to
//! `[0, size]`.

use crate::errno::to_syscall_ret;
use crate::file;
use crate::process;

const SEEK_SET: u32 = 0;
const SEEK_CUR: u32 = 1;
const SEEK_END: u32 = 2;

pub fn call(fd: usize, off: isize, whence: u32) -> isize {
	let pid = process::current_pid();
	let res = process::with_process(pid, |p| -> crate::errno::KResult<usize> {
		let desc = p.fd_table.get_mut(fd)?;
		let size = file::size_of(desc.node) as isize;
		let base = match whence {
			SEEK_SET => 0,
			SEEK_CUR => desc.offset as isize,
			SEEK_END => size,
			_ => return Err(crate::kerr!(InvalidArgument)),
		};
		let target = (base + off).clamp(0, size) as usize;
		desc.offset = target;
		Ok(target)
	})
	.expect("current process has no control block");
	to_syscall_ret(res)
}
