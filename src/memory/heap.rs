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

//! The kernel heap: a first-fit, singly-linked free-list allocator over the fixed virtual window
//! `[HEAP_BASE, HEAP_BASE + HEAP_SIZE)`, backing [`alloc`](mod@alloc) so the rest of the kernel
//! can use `Vec`, `String`, `Box`, and `BTreeMap` directly instead of hand-rolled intrusive
//! structures.
//!
//! `kmalloc`/`kfree` are the primitive operations the rest of the kernel is grounded on; the
//! [`KernelAllocator`] at the bottom is the thinnest possible adapter onto [`GlobalAlloc`], so the
//! first-fit/split/coalesce semantics are exercised identically whether called directly or
//! through `alloc`.

use crate::errno::{KError, KResult};
use crate::kerr;
use crate::memory::{vmm, HEAP_BASE, HEAP_SIZE, PAGE_SIZE};
use crate::sync::IntMutex;
use core::{
	alloc::{GlobalAlloc, Layout},
	mem::size_of,
	ptr,
};

/// Minimum payload size of a block, so a free split is never left too small to ever hold
/// anything: a split is only performed when the remainder can fit a header plus this much.
const MIN_PAYLOAD: usize = 4;

/// Header prepended to every block, free or allocated. Always 4-byte aligned since [`HEAP_BASE`]
/// is page-aligned and every size recorded here is rounded up to a multiple of 4.
#[repr(C)]
struct BlockHeader {
	/// Size of the payload following this header, in bytes. Does not include the header itself.
	size: usize,
	/// Next block in address order, or null for the last block in the window.
	next: *mut BlockHeader,
	is_free: bool,
}

const HEADER_SIZE: usize = size_of::<BlockHeader>();

struct Heap {
	head: *mut BlockHeader,
}

unsafe impl Send for Heap {}

impl Heap {
	const fn uninit() -> Self {
		Self {
			head: ptr::null_mut(),
		}
	}

	unsafe fn block_mut<'a>(ptr: *mut BlockHeader) -> &'a mut BlockHeader {
		unsafe { &mut *ptr }
	}

	fn find_free(&self, size: usize) -> Option<*mut BlockHeader> {
		let mut cur = self.head;
		while !cur.is_null() {
			let block = unsafe { Self::block_mut(cur) };
			if block.is_free && block.size >= size {
				return Some(cur);
			}
			cur = block.next;
		}
		None
	}

	/// Splits `block` so its payload becomes exactly `size` bytes, if the remainder can hold
	/// another header plus [`MIN_PAYLOAD`] bytes.
	fn split(&mut self, block_ptr: *mut BlockHeader, size: usize) {
		let block = unsafe { Self::block_mut(block_ptr) };
		let remaining = block.size - size;
		if remaining < HEADER_SIZE + MIN_PAYLOAD {
			return;
		}
		let new_block_ptr = unsafe {
			(block_ptr as *mut u8).add(HEADER_SIZE + size) as *mut BlockHeader
		};
		unsafe {
			new_block_ptr.write(BlockHeader {
				size: remaining - HEADER_SIZE,
				next: block.next,
				is_free: true,
			});
		}
		block.size = size;
		block.next = new_block_ptr;
	}

	/// Merges every run of adjacent free blocks into one, in a single pass over the list.
	fn coalesce(&mut self) {
		let mut cur = self.head;
		while !cur.is_null() {
			let block = unsafe { Self::block_mut(cur) };
			if !block.is_free {
				cur = block.next;
				continue;
			}
			loop {
				let next = block.next;
				if next.is_null() {
					break;
				}
				let next_block = unsafe { Self::block_mut(next) };
				let adjacent = unsafe { (cur as *mut u8).add(HEADER_SIZE + block.size) } == next as *mut u8;
				if adjacent && next_block.is_free {
					block.size += HEADER_SIZE + next_block.size;
					block.next = next_block.next;
				} else {
					break;
				}
			}
			cur = block.next;
		}
	}
}

static HEAP: IntMutex<Heap> = IntMutex::new(Heap::uninit());

/// Maps the entire heap window into the kernel directory and initializes it as one giant free
/// block.
///
/// Must be called once, after [`vmm::init`].
pub fn init() -> KResult<()> {
	let dir = vmm::kernel_directory();
	let pages = HEAP_SIZE / PAGE_SIZE;
	for i in 0..pages {
		let frame = crate::memory::pmm::alloc_frame()?;
		let virt = HEAP_BASE + i * PAGE_SIZE;
		vmm::map(dir, frame, virt, vmm::WRITABLE)?;
	}
	let mut heap = HEAP.lock();
	let head = HEAP_BASE.as_mut_ptr::<BlockHeader>();
	unsafe {
		head.write(BlockHeader {
			size: HEAP_SIZE - HEADER_SIZE,
			next: ptr::null_mut(),
			is_free: true,
		});
	}
	heap.head = head;
	Ok(())
}

/// Allocates at least `size` bytes, 4-byte aligned, returning a pointer to the payload.
///
/// Fails with [`KError::OutOfMemory`] when no free block is large enough.
pub fn kmalloc(size: usize) -> KResult<*mut u8> {
	let size = size.next_multiple_of(4).max(MIN_PAYLOAD);
	let mut heap = HEAP.lock();
	let block_ptr = heap.find_free(size).ok_or(kerr!(OutOfMemory))?;
	heap.split(block_ptr, size);
	let block = unsafe { Heap::block_mut(block_ptr) };
	block.is_free = false;
	let payload = unsafe { (block_ptr as *mut u8).add(HEADER_SIZE) };
	Ok(payload)
}

/// Frees a pointer previously returned by [`kmalloc`], coalescing with adjacent free blocks.
///
/// # Safety
///
/// `ptr` must have been returned by a still-live call to [`kmalloc`] and not freed already.
pub unsafe fn kfree(ptr: *mut u8) {
	let block_ptr = unsafe { ptr.sub(HEADER_SIZE) as *mut BlockHeader };
	let mut heap = HEAP.lock();
	unsafe { Heap::block_mut(block_ptr) }.is_free = true;
	heap.coalesce();
}

/// Adapts [`kmalloc`]/[`kfree`] onto [`GlobalAlloc`] so the rest of the kernel can use `alloc`'s
/// collections.
///
/// Requests for an alignment greater than 4 are satisfied best-effort only: the underlying
/// allocator is purely size-driven, matching the 4-byte-alignment invariant the heap itself
/// guarantees. No type the kernel stores in a heap collection currently needs more than that.
pub struct KernelAllocator;

unsafe impl GlobalAlloc for KernelAllocator {
	unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
		kmalloc(layout.size()).unwrap_or(ptr::null_mut())
	}

	unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
		unsafe {
			kfree(ptr);
		}
	}
}

#[global_allocator]
static ALLOCATOR: KernelAllocator = KernelAllocator;

#[cfg(test)]
mod test {
	use super::*;

	/// P2 / scenario 2: first-fit reuse after a free yields the same address.
	#[test_case]
	fn first_fit_reuse() {
		crate::memory::test_init();
		let a = kmalloc(100).unwrap();
		let b = kmalloc(200).unwrap();
		unsafe {
			kfree(a);
		}
		let c = kmalloc(80).unwrap();
		assert_eq!(a, c);
		assert_ne!(b, c);
	}

	#[test_case]
	fn alloc_never_aliases() {
		crate::memory::test_init();
		let a = kmalloc(16).unwrap();
		let b = kmalloc(16).unwrap();
		assert_ne!(a, b);
		unsafe {
			kfree(a);
			kfree(b);
		}
	}
}
