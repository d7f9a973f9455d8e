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

//! Spinlock implementation, used as the raw building block for [`super::intmutex::IntMutex`].
//!
//! On a single CPU, contention on this lock only ever comes from an interrupt handler observing
//! it held — which `IntMutex` prevents by disabling interrupts for the critical section. The spin
//! loop below exists for structural symmetry with a true SMP spinlock, not because contention is
//! expected.

use core::{
	hint,
	sync::{atomic, atomic::AtomicBool},
};

/// Locking primitive spinning until the resource can be acquired.
pub struct Spinlock(AtomicBool);

impl Spinlock {
	/// Creates a new, unlocked spinlock.
	#[allow(clippy::new_without_default)]
	pub const fn new() -> Self {
		Self(AtomicBool::new(false))
	}

	/// Locks the spinlock.
	#[inline(always)]
	pub fn lock(&self) {
		while self.0.swap(true, atomic::Ordering::Acquire) {
			hint::spin_loop();
		}
	}

	/// Unlocks the spinlock.
	#[inline(always)]
	pub fn unlock(&self) {
		self.0.store(false, atomic::Ordering::Release);
	}
}
