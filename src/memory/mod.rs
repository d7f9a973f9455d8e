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

//! Memory management: the physical frame allocator ([`pmm`]), the virtual memory manager
//! ([`vmm`]), and the kernel heap ([`heap`]).
//!
//! Addresses are represented with two distinct newtypes, [`PhysAddr`] and [`VirtAddr`], rather
//! than raw `usize`/pointers, so a page-table walk cannot accidentally treat one as the other.
//! Converting between them is only meaningful within the identity-mapped low 128 MiB the VMM sets
//! up at init (see [`vmm::KERNEL_SHARED_BYTES`]); every conversion asserts that invariant.

pub mod heap;
pub mod pmm;
pub mod vmm;

use core::{
	fmt,
	mem::size_of,
	ops::{Add, Deref, DerefMut, Sub},
};

/// The size of a single frame/page, in bytes.
pub const PAGE_SIZE: usize = 4096;

/// Number of bytes reserved (never handed out by the PMM) starting at physical address 0.
///
/// Protects the boot image, Multiboot modules, and the initial page tables constructed before the
/// PMM bitmap itself is live.
pub const KERNEL_RESERVED_BYTES: usize = 4 * 1024 * 1024;

/// Base of the kernel heap's virtual window.
pub const HEAP_BASE: VirtAddr = VirtAddr(0xD000_0000);

/// Size of the kernel heap's virtual window.
pub const HEAP_SIZE: usize = 16 * 1024 * 1024;

/// An address in physical memory.
#[repr(transparent)]
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct PhysAddr(pub usize);

/// An address in virtual memory.
#[repr(transparent)]
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct VirtAddr(pub usize);

impl PhysAddr {
	/// Converts a physical address within the identity-mapped low 128 MiB to the virtual address
	/// it is mapped at (the identity: virtual == physical there).
	///
	/// Returns `None` if `self` lies outside that window.
	pub fn to_identity_virt(self) -> Option<VirtAddr> {
		(self.0 < vmm::KERNEL_SHARED_BYTES).then_some(VirtAddr(self.0))
	}

	/// Returns a raw pointer to this physical address, asserting it lies in the identity-mapped
	/// region. Used only by code that has already established this frame is kernel-owned.
	pub fn as_mut_ptr<T>(self) -> *mut T {
		debug_assert!(self.0 < vmm::KERNEL_SHARED_BYTES, "address outside identity map");
		self.0 as *mut T
	}
}

impl VirtAddr {
	/// Converts a virtual address within the identity-mapped low 128 MiB to its physical address.
	///
	/// Returns `None` if `self` lies outside that window.
	pub fn to_identity_phys(self) -> Option<PhysAddr> {
		(self.0 < vmm::KERNEL_SHARED_BYTES).then_some(PhysAddr(self.0))
	}

	/// Returns a raw pointer at this virtual address.
	pub fn as_mut_ptr<T>(self) -> *mut T {
		self.0 as *mut T
	}

	/// Returns a raw const pointer at this virtual address.
	pub fn as_ptr<T>(self) -> *const T {
		self.0 as *const T
	}
}

macro_rules! addr_impl {
	($name:ident) => {
		impl $name {
			/// Tells whether the address is null.
			pub fn is_null(self) -> bool {
				self.0 == 0
			}

			/// Tells whether the address is aligned to `align`.
			pub fn is_aligned_to(self, align: usize) -> bool {
				self.0 % align == 0
			}

			/// Rounds up to the next multiple of `align`. A no-op if already aligned.
			pub fn align_to(self, align: usize) -> Self {
				Self(self.0.next_multiple_of(align))
			}

			/// Rounds down to the previous multiple of `align`. A no-op if already aligned.
			pub fn down_align_to(self, align: usize) -> Self {
				Self(self.0 & !(align - 1))
			}
		}

		impl Deref for $name {
			type Target = usize;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}

		impl DerefMut for $name {
			fn deref_mut(&mut self) -> &mut Self::Target {
				&mut self.0
			}
		}

		impl Add<usize> for $name {
			type Output = Self;

			fn add(self, off: usize) -> Self::Output {
				Self(self.0.wrapping_add(off))
			}
		}

		impl Sub<usize> for $name {
			type Output = Self;

			fn sub(self, off: usize) -> Self::Output {
				Self(self.0.wrapping_sub(off))
			}
		}

		impl fmt::Debug for $name {
			fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
				const LEN: usize = size_of::<usize>() * 2;
				write!(fmt, "{:0LEN$x}", self.0)
			}
		}
	};
}

addr_impl!(PhysAddr);
addr_impl!(VirtAddr);

/// Brings up the PMM, VMM, and heap with a fixed amount of simulated RAM, exactly once per test
/// run, so every module's `#[test_case]`s share one consistent boot state regardless of run
/// order.
#[cfg(test)]
pub(crate) fn test_init() {
	use crate::sync::IntMutex;
	static DONE: IntMutex<bool> = IntMutex::new(false);
	let mut done = DONE.lock();
	if !*done {
		pmm::init(64 * 1024 * 1024);
		vmm::init().unwrap();
		heap::init().unwrap();
		*done = true;
	}
}
