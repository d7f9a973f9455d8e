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

//! Interrupt-disabling mutual exclusion.
//!
//! Every piece of shared kernel state named in the concurrency model (PMM bitmap, heap free list,
//! ready queue, `current_directory`) is guarded by an [`IntMutex`]: acquiring it disables
//! maskable interrupts, so nothing can reenter the critical section on this single core; dropping
//! the guard restores interrupts to whatever state they were in before the lock was taken.

use crate::arch::{is_interrupt_enabled, x86};
use crate::sync::spinlock::Spinlock;
use core::{
	cell::UnsafeCell,
	fmt,
	ops::{Deref, DerefMut},
};

/// A mutex that disables interrupts for the duration of the critical section.
pub struct IntMutex<T: ?Sized> {
	spin: Spinlock,
	data: UnsafeCell<T>,
}

unsafe impl<T: ?Sized + Send> Sync for IntMutex<T> {}
unsafe impl<T: ?Sized + Send> Send for IntMutex<T> {}

impl<T> IntMutex<T> {
	/// Creates a new instance wrapping `data`.
	pub const fn new(data: T) -> Self {
		Self {
			spin: Spinlock::new(),
			data: UnsafeCell::new(data),
		}
	}
}

impl<T: ?Sized> IntMutex<T> {
	/// Acquires the lock, disabling interrupts for as long as the returned guard is alive.
	pub fn lock(&self) -> IntMutexGuard<'_, T> {
		let was_enabled = is_interrupt_enabled();
		x86::cli();
		self.spin.lock();
		IntMutexGuard {
			mutex: self,
			restore_interrupts: was_enabled,
		}
	}
}

/// RAII guard returned by [`IntMutex::lock`]. Restores the interrupt flag and releases the
/// spinlock on drop.
#[must_use]
pub struct IntMutexGuard<'m, T: ?Sized> {
	mutex: &'m IntMutex<T>,
	restore_interrupts: bool,
}

impl<T: ?Sized> Deref for IntMutexGuard<'_, T> {
	type Target = T;

	fn deref(&self) -> &Self::Target {
		unsafe { &*self.mutex.data.get() }
	}
}

impl<T: ?Sized> DerefMut for IntMutexGuard<'_, T> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		unsafe { &mut *self.mutex.data.get() }
	}
}

impl<T: ?Sized> Drop for IntMutexGuard<'_, T> {
	fn drop(&mut self) {
		self.mutex.spin.unlock();
		if self.restore_interrupts {
			x86::sti();
		}
	}
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for IntMutex<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(&*self.lock(), f)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test_case]
	fn int_mutex_basic() {
		let m = IntMutex::new(0usize);
		*m.lock() += 1;
		*m.lock() += 1;
		assert_eq!(*m.lock(), 2);
	}
}
