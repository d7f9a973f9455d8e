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

//! `readdir(index, buf)`: copies the name of the `index`-th child of the calling process's CWD
//! into `buf` as a NUL-terminated string. Returns `1` on hit, `0` once `index` runs past the last
//! child.

use crate::file::{self, MAX_NAME};
use crate::process;
use crate::syscall::user_slice_mut;

/// Room for [`MAX_NAME`] bytes plus a NUL terminator.
const BUF_LEN: usize = MAX_NAME + 1;

pub fn call(index: usize, buf: usize) -> isize {
	let Some(buf) = (unsafe { user_slice_mut(buf, BUF_LEN) }) else {
		return -1;
	};
	let pid = process::current_pid();
	let cwd = process::with_process(pid, |p| p.cwd).expect("current process has no control block");
	let Ok(children) = file::list(cwd) else {
		return -1;
	};
	let Some(&child) = children.get(index) else {
		return 0;
	};
	let name = file::name_of(child);
	let bytes = name.as_bytes();
	buf[..bytes.len()].copy_from_slice(bytes);
	buf[bytes.len()] = 0;
	1
}
