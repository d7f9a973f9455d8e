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

//! PID allocation.
//!
//! Every process needs a unique PID, and the process arena in [`super`] is indexed by it
//! directly, so PIDs are drawn from a fixed range rather than an unbounded counter.

use crate::sync::IntMutex;

/// Type representing a process ID.
pub type Pid = u16;

/// The number of PID slots, and thus the size of the process arena.
pub const MAX_PID: usize = 256;
/// Special PID for the idle task, which never blocks and is always ready.
pub const IDLE_PID: Pid = 0;
/// PID of the first spawned process.
pub const INIT_PID: Pid = 1;

struct Bitmap([u8; MAX_PID / 8]);

impl Bitmap {
	fn get(&self, pid: usize) -> bool {
		self.0[pid / 8] & (1 << (pid % 8)) != 0
	}

	fn set(&mut self, pid: usize, used: bool) {
		let mask = 1 << (pid % 8);
		if used {
			self.0[pid / 8] |= mask;
		} else {
			self.0[pid / 8] &= !mask;
		}
	}
}

static PIDS: IntMutex<Bitmap> = IntMutex::new(Bitmap([0; MAX_PID / 8]));

/// A handle to an allocated PID, freeing it on drop.
#[derive(Debug)]
pub struct PidHandle(Pid);

impl PidHandle {
	/// Marks `pid` used and returns a handle owning it. Used for [`IDLE_PID`], which is reserved
	/// at boot rather than drawn from the pool.
	pub(super) fn mark_used(pid: Pid) -> Self {
		PIDS.lock().set(pid as usize, true);
		Self(pid)
	}

	/// Allocates and returns the lowest free PID.
	///
	/// Returns `None` if every slot in `0..MAX_PID` is taken.
	pub fn alloc() -> Option<Self> {
		let mut bm = PIDS.lock();
		for pid in 0..MAX_PID {
			if !bm.get(pid) {
				bm.set(pid, true);
				return Some(Self(pid as Pid));
			}
		}
		None
	}

	/// Returns the underlying PID.
	pub fn get(&self) -> Pid {
		self.0
	}
}

impl Drop for PidHandle {
	fn drop(&mut self) {
		PIDS.lock().set(self.0 as usize, false);
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test_case]
	fn alloc_free_does_not_collide() {
		let a = PidHandle::alloc().unwrap();
		let b = PidHandle::alloc().unwrap();
		assert_ne!(a.get(), b.get());
	}
}
