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

//! The virtual memory manager: page directories/tables and address-space lifecycle.
//!
//! Every address space shares the same first [`KERNEL_SHARED_PDES`] page-directory entries
//! (physical pointer, not a copy) by value-copying the PDE words themselves at creation time, so
//! a PDE write into the kernel directory after boot would not propagate — the kernel directory's
//! low mappings are therefore fixed at init and never remapped (see the concurrency notes).

use crate::arch::x86;
use crate::errno::{KError, KResult};
use crate::kerr;
use crate::memory::{pmm, PhysAddr, VirtAddr, PAGE_SIZE};
use crate::sync::{once::OnceInit, IntMutex};
use core::ptr;

/// Bytes of address space shared verbatim across every address space (128 MiB).
pub const KERNEL_SHARED_BYTES: usize = 128 * 1024 * 1024;

const ENTRIES_PER_TABLE: usize = 1024;
const BYTES_PER_PDE: usize = ENTRIES_PER_TABLE * PAGE_SIZE;

/// Number of leading page-directory entries that are kernel-shared.
pub const KERNEL_SHARED_PDES: usize = KERNEL_SHARED_BYTES / BYTES_PER_PDE;

/// PDE/PTE present bit.
pub const PRESENT: u32 = 1 << 0;
/// PDE/PTE read-write bit. Clear means read-only.
pub const WRITABLE: u32 = 1 << 1;
/// PDE/PTE user-accessible bit. Clear restricts the entry to ring 0.
pub const USER: u32 = 1 << 2;

const FLAGS_MASK: u32 = PAGE_SIZE as u32 - 1;

/// A page directory or page table: 1024 raw 32-bit entries, 4096-byte aligned so its own address
/// is always frame-aligned.
#[repr(C, align(4096))]
struct Table([u32; ENTRIES_PER_TABLE]);

impl Table {
	/// Returns a mutable reference to the table stored at the identity-mapped physical address
	/// `phys`.
	///
	/// # Safety
	///
	/// `phys` must point to a frame that actually holds a page directory or page table, and no
	/// other live reference to it may exist.
	unsafe fn at(phys: PhysAddr) -> &'static mut Table {
		unsafe { &mut *phys.as_mut_ptr() }
	}
}

fn pde_index(virt: VirtAddr) -> usize {
	(virt.0 >> 22) & 0x3ff
}

fn pte_index(virt: VirtAddr) -> usize {
	(virt.0 >> 12) & 0x3ff
}

/// Physical address of the directory shared as the kernel's view of memory; copied into every
/// fresh address space's first [`KERNEL_SHARED_PDES`] entries.
static KERNEL_DIRECTORY: OnceInit<PhysAddr> = unsafe { OnceInit::new() };

/// Physical address of the directory currently loaded into `cr3`, or `None` before the first
/// [`switch`].
static CURRENT_DIRECTORY: IntMutex<Option<PhysAddr>> = IntMutex::new(None);

fn alloc_zeroed_table() -> KResult<PhysAddr> {
	let phys = pmm::alloc_frame()?;
	let table = unsafe { Table::at(phys) };
	table.0.fill(0);
	Ok(phys)
}

/// Builds the kernel directory and identity-maps the low [`KERNEL_SHARED_BYTES`] as
/// supervisor-only, read-write.
///
/// Must be called once, after [`pmm::init`] and before any process address space is created.
pub fn init() -> KResult<()> {
	let dir_phys = alloc_zeroed_table()?;
	let dir = unsafe { Table::at(dir_phys) };
	for pde in 0..KERNEL_SHARED_PDES {
		let table_phys = alloc_zeroed_table()?;
		let table = unsafe { Table::at(table_phys) };
		for pte in 0..ENTRIES_PER_TABLE {
			let frame = pde * ENTRIES_PER_TABLE + pte;
			table.0[pte] = (frame * PAGE_SIZE) as u32 | PRESENT | WRITABLE;
		}
		dir.0[pde] = table_phys.0 as u32 | PRESENT | WRITABLE;
	}
	unsafe {
		OnceInit::init(&KERNEL_DIRECTORY, dir_phys);
	}
	Ok(())
}

/// Ensures a page table exists for the PDE covering `virt` in `dir`, allocating and installing
/// one if necessary, then returns its physical address.
fn ensure_table(dir_phys: PhysAddr, virt: VirtAddr) -> KResult<PhysAddr> {
	let dir = unsafe { Table::at(dir_phys) };
	let pde = &mut dir.0[pde_index(virt)];
	if *pde & PRESENT != 0 {
		return Ok(PhysAddr((*pde & !FLAGS_MASK) as usize));
	}
	let table_phys = alloc_zeroed_table()?;
	*pde = table_phys.0 as u32 | PRESENT | WRITABLE | USER;
	Ok(table_phys)
}

/// Maps `virt` to `phys` in the address space `dir`, with the given PTE flags.
///
/// If `dir` is the currently loaded directory, the corresponding TLB entry is invalidated.
pub fn map(dir: PhysAddr, phys: PhysAddr, virt: VirtAddr, flags: u32) -> KResult<()> {
	debug_assert!(virt.is_aligned_to(PAGE_SIZE), "unaligned virtual address");
	debug_assert!(phys.0 % PAGE_SIZE == 0, "unaligned physical address");
	let table_phys = ensure_table(dir, virt)?;
	let table = unsafe { Table::at(table_phys) };
	table.0[pte_index(virt)] = phys.0 as u32 | flags | PRESENT;
	if CURRENT_DIRECTORY.lock().as_ref() == Some(&dir) {
		x86::invlpg(virt.0);
	}
	Ok(())
}

/// Unmaps `virt` in `dir`, returning the physical frame it was backed by, if any.
pub fn unmap(dir: PhysAddr, virt: VirtAddr) -> Option<PhysAddr> {
	let table_phys = {
		let d = unsafe { Table::at(dir) };
		let pde = d.0[pde_index(virt)];
		(pde & PRESENT != 0).then(|| PhysAddr((pde & !FLAGS_MASK) as usize))?
	};
	let table = unsafe { Table::at(table_phys) };
	let pte = &mut table.0[pte_index(virt)];
	if *pte & PRESENT == 0 {
		return None;
	}
	let phys = PhysAddr((*pte & !FLAGS_MASK) as usize);
	*pte = 0;
	if CURRENT_DIRECTORY.lock().as_ref() == Some(&dir) {
		x86::invlpg(virt.0);
	}
	Some(phys)
}

/// Allocates a fresh address space whose first [`KERNEL_SHARED_PDES`] entries are copied
/// verbatim from the kernel directory and whose remaining entries are empty.
pub fn create_address_space() -> KResult<PhysAddr> {
	let dir_phys = alloc_zeroed_table()?;
	let kernel_dir = unsafe { Table::at(*KERNEL_DIRECTORY) };
	let dir = unsafe { Table::at(dir_phys) };
	dir.0[..KERNEL_SHARED_PDES].copy_from_slice(&kernel_dir.0[..KERNEL_SHARED_PDES]);
	Ok(dir_phys)
}

/// Tears down a user address space: frees every present, user-accessible frame reachable from
/// entries `KERNEL_SHARED_PDES..1024`, then the page tables themselves, then the directory.
///
/// Entries below [`KERNEL_SHARED_PDES`] are never touched; they point at kernel-shared page
/// tables that outlive any single address space.
pub fn destroy_address_space(dir_phys: PhysAddr) {
	let dir = unsafe { Table::at(dir_phys) };
	for pde in &dir.0[KERNEL_SHARED_PDES..] {
		if *pde & PRESENT == 0 {
			continue;
		}
		let table_phys = PhysAddr((*pde & !FLAGS_MASK) as usize);
		let table = unsafe { Table::at(table_phys) };
		for pte in &table.0 {
			if *pte & PRESENT != 0 && *pte & USER != 0 {
				pmm::free_frame(PhysAddr((*pte & !FLAGS_MASK) as usize));
			}
		}
		pmm::free_frame(table_phys);
	}
	pmm::free_frame(dir_phys);
}

/// Loads `dir` into `cr3`, enabling paging on the very first call.
///
/// # Safety
///
/// `dir` must be a well-formed page directory whose kernel-shared entries cover the code
/// currently executing, including this function and its caller.
pub unsafe fn switch(dir: PhysAddr) {
	let first_switch = CURRENT_DIRECTORY.lock().is_none();
	unsafe {
		x86::set_cr3(dir.0 as u32);
		if first_switch {
			x86::enable_paging();
		}
	}
	*CURRENT_DIRECTORY.lock() = Some(dir);
}

/// Returns the physical address of the directory currently loaded into `cr3`.
pub fn current() -> Option<PhysAddr> {
	*CURRENT_DIRECTORY.lock()
}

/// Returns the physical address of the kernel's shared directory, for use as the address space
/// of kernel-only threads.
pub fn kernel_directory() -> PhysAddr {
	*KERNEL_DIRECTORY
}

/// Translates a virtual address to its backing physical address in `dir`, if mapped.
pub fn translate(dir: PhysAddr, virt: VirtAddr) -> Option<PhysAddr> {
	let d = unsafe { Table::at(dir) };
	let pde = d.0[pde_index(virt)];
	if pde & PRESENT == 0 {
		return None;
	}
	let table = unsafe { Table::at(PhysAddr((pde & !FLAGS_MASK) as usize)) };
	let pte = table.0[pte_index(virt)];
	(pte & PRESENT != 0).then(|| PhysAddr((pte & !FLAGS_MASK) as usize | (virt.0 & FLAGS_MASK as usize)))
}

/// Zeroes `len` bytes of physical memory starting at `phys`, via the identity map.
///
/// # Safety
///
/// `phys..phys+len` must lie within the identity-mapped low [`KERNEL_SHARED_BYTES`] and must not
/// alias a live Rust reference.
pub unsafe fn zero_frame(phys: PhysAddr) {
	unsafe {
		ptr::write_bytes(phys.as_mut_ptr::<u8>(), 0, PAGE_SIZE);
	}
}

#[cfg(test)]
mod test {
	use super::*;

	/// P9: a fresh address space carries the same low-memory mappings as the kernel directory and
	/// nothing else.
	#[test_case]
	fn fresh_address_space_matches_kernel() {
		crate::memory::test_init();
		let dir = create_address_space().unwrap();
		let kd = unsafe { Table::at(kernel_directory()) };
		let d = unsafe { Table::at(dir) };
		assert_eq!(&d.0[..KERNEL_SHARED_PDES], &kd.0[..KERNEL_SHARED_PDES]);
		assert!(d.0[KERNEL_SHARED_PDES..].iter().all(|pde| *pde & PRESENT == 0));
		destroy_address_space(dir);
	}

	#[test_case]
	fn map_then_translate() {
		crate::memory::test_init();
		let dir = create_address_space().unwrap();
		let frame = pmm::alloc_frame().unwrap();
		let virt = VirtAddr(KERNEL_SHARED_BYTES);
		map(dir, frame, virt, WRITABLE | USER).unwrap();
		assert_eq!(translate(dir, virt), Some(frame));
		destroy_address_space(dir);
	}
}
