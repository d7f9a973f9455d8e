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

//! `get_time(*t)`: populates a [`time::RtcTime`] snapshot at the given user pointer.

use crate::syscall::user_slice_mut;
use crate::time::{self, RtcTime};
use core::mem::size_of;

pub fn call(t: usize) -> isize {
	let Some(buf) = (unsafe { user_slice_mut(t, size_of::<RtcTime>()) }) else {
		return -1;
	};
	let now = time::now();
	let bytes = [now.second, now.minute, now.hour, now.day, now.month, now.year];
	buf[..bytes.len()].copy_from_slice(&bytes);
	0
}
