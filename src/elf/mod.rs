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

//! ELF32 executable loading.
//!
//! [`load`] validates the header, builds a fresh address space, maps and populates each `LOAD`
//! segment, then hands the result to [`process::spawn_user`] as a ring-3 process. Mapping and
//! copying happen through the new directory itself rather than a bounce buffer: `cr3` is switched
//! to it for the duration, with interrupts disabled so nothing else observes the half-built
//! address space.

use crate::arch::x86;
use crate::errno::{KError, KResult};
use crate::file::{self, NodeId};
use crate::kerr;
use crate::memory::vmm::{self, USER, WRITABLE};
use crate::memory::{pmm, PhysAddr, VirtAddr, PAGE_SIZE};
use crate::process::{self, pid::Pid, USER_STACK_TOP};
use core::ptr;

/// Identification bytes offset: file class (32-bit vs. 64-bit).
const EI_CLASS: usize = 4;
/// The four magic bytes every ELF file starts with.
const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];
/// Expects 32-bit objects ([`crate::elf`] never loads 64-bit binaries).
const ELFCLASS32: u8 = 1;
/// Program header type: a loadable segment.
const PT_LOAD: u32 = 1;
/// Minimum size of a well-formed ELF32 header.
const EHDR_SIZE: usize = 52;
/// Size of an ELF32 program header entry.
const PHDR_SIZE: usize = 32;

struct Header {
	e_entry: u32,
	e_phoff: u32,
	e_phnum: u16,
}

struct ProgramHeader {
	p_type: u32,
	p_offset: u32,
	p_vaddr: u32,
	p_filesz: u32,
	p_memsz: u32,
}

fn u16_at(data: &[u8], off: usize) -> KResult<u16> {
	data.get(off..off + 2).map(|b| u16::from_le_bytes([b[0], b[1]])).ok_or(kerr!(BadFormat))
}

fn u32_at(data: &[u8], off: usize) -> KResult<u32> {
	data.get(off..off + 4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]])).ok_or(kerr!(BadFormat))
}

fn parse_header(data: &[u8]) -> KResult<Header> {
	if data.len() < EHDR_SIZE || data[0..4] != ELF_MAGIC || data[EI_CLASS] != ELFCLASS32 {
		return Err(kerr!(BadFormat));
	}
	Ok(Header {
		e_entry: u32_at(data, 24)?,
		e_phoff: u32_at(data, 28)?,
		e_phnum: u16_at(data, 44)?,
	})
}

fn parse_program_header(data: &[u8], off: usize) -> KResult<ProgramHeader> {
	Ok(ProgramHeader {
		p_type: u32_at(data, off)?,
		p_offset: u32_at(data, off + 4)?,
		p_vaddr: u32_at(data, off + 8)?,
		p_filesz: u32_at(data, off + 16)?,
		p_memsz: u32_at(data, off + 20)?,
	})
}

/// Maps and zeroes every page in `[start, end)` (already page-aligned), all user+writable.
fn map_range(dir: PhysAddr, start: VirtAddr, end: VirtAddr) -> KResult<()> {
	let mut page = start;
	while page.0 < end.0 {
		let frame = pmm::alloc_frame()?;
		unsafe {
			vmm::zero_frame(frame);
		}
		if let Err(e) = vmm::map(dir, frame, page, WRITABLE | USER) {
			pmm::free_frame(frame);
			return Err(e);
		}
		page = page + PAGE_SIZE;
	}
	Ok(())
}

/// Loads the segment described by `ph` from `data` into the address space currently loaded into
/// `cr3` (the caller is expected to have already switched to it), returning the page-aligned end
/// of the mapped range.
fn load_segment(dir: PhysAddr, data: &[u8], ph: &ProgramHeader) -> KResult<VirtAddr> {
	let vaddr = VirtAddr(ph.p_vaddr as usize);
	let page_start = vaddr.down_align_to(PAGE_SIZE);
	let page_end = (vaddr + ph.p_memsz as usize).align_to(PAGE_SIZE);
	map_range(dir, page_start, page_end)?;
	let src = data
		.get(ph.p_offset as usize..ph.p_offset as usize + ph.p_filesz as usize)
		.ok_or(kerr!(BadFormat))?;
	// The tail between `p_filesz` and `p_memsz` (bss) stays zeroed courtesy of `vmm::zero_frame`
	// above; only the file-backed prefix needs an explicit copy.
	unsafe {
		ptr::copy_nonoverlapping(src.as_ptr(), vaddr.as_mut_ptr::<u8>(), src.len());
	}
	Ok(page_end)
}

/// Builds every `LOAD` segment plus the user stack into a fresh address space, temporarily
/// switching `cr3` to do so, and returns the directory along with the initial program break.
fn populate_address_space(header: &Header, data: &[u8]) -> KResult<(PhysAddr, VirtAddr)> {
	let dir = vmm::create_address_space()?;
	let prev = vmm::current();
	x86::cli();
	let result = (|| -> KResult<VirtAddr> {
		unsafe {
			vmm::switch(dir);
		}
		let mut highest = VirtAddr(0);
		for i in 0..header.e_phnum as usize {
			let off = header.e_phoff as usize + i * PHDR_SIZE;
			let ph = parse_program_header(data, off)?;
			if ph.p_type != PT_LOAD {
				continue;
			}
			let end = load_segment(dir, data, &ph)?;
			if end.0 > highest.0 {
				highest = end;
			}
		}
		let stack_page = VirtAddr(USER_STACK_TOP) - PAGE_SIZE;
		map_range(dir, stack_page, VirtAddr(USER_STACK_TOP))?;
		Ok(highest)
	})();
	unsafe {
		if let Some(p) = prev {
			vmm::switch(p);
		}
	}
	x86::sti();
	match result {
		Ok(program_break) => Ok((dir, program_break)),
		Err(e) => {
			vmm::destroy_address_space(dir);
			Err(e)
		}
	}
}

/// Loads the ELF32 executable at `node` and spawns it as a ring-3 process.
///
/// `args` is accepted per the calling convention but not yet wired to any in-process argv: there
/// is no `exec`-style syscall in this ABI, only kernel-initiated loading at boot.
pub fn load(node: NodeId, _args: &str) -> KResult<Pid> {
	let data = file::contents(node)?;
	let header = parse_header(&data)?;
	let (dir, program_break) = populate_address_space(&header, &data)?;
	process::spawn_user(VirtAddr(header.e_entry as usize), dir, program_break)
}

#[cfg(test)]
mod test {
	use super::*;

	#[test_case]
	fn rejects_short_buffer() {
		assert!(matches!(parse_header(&[0u8; 4]), Err(KError::BadFormat)));
	}

	#[test_case]
	fn rejects_bad_magic() {
		let mut data = [0u8; EHDR_SIZE];
		data[0..4].copy_from_slice(b"\x7fBAD");
		assert!(matches!(parse_header(&data), Err(KError::BadFormat)));
	}

	#[test_case]
	fn parses_well_formed_header() {
		let mut data = [0u8; EHDR_SIZE];
		data[0..4].copy_from_slice(&ELF_MAGIC);
		data[EI_CLASS] = ELFCLASS32;
		data[24..28].copy_from_slice(&0x0804_8000u32.to_le_bytes());
		data[28..32].copy_from_slice(&52u32.to_le_bytes());
		data[44..46].copy_from_slice(&1u16.to_le_bytes());
		let header = parse_header(&data).unwrap();
		assert_eq!(header.e_entry, 0x0804_8000);
		assert_eq!(header.e_phoff, 52);
		assert_eq!(header.e_phnum, 1);
	}

	/// Scenario: loading a minimal one-segment ELF32 spawns a ring-3 process with the segment's
	/// entry point and a fresh address space; reaping it afterwards behaves like any other child.
	#[test_case]
	fn load_spawns_process_then_reaped_by_wait() {
		crate::memory::test_init();
		file::test_init();
		const ENTRY: u32 = 0x0804_8000;
		let mut data = alloc::vec![0u8; EHDR_SIZE + PHDR_SIZE + 4];
		data[0..4].copy_from_slice(&ELF_MAGIC);
		data[EI_CLASS] = ELFCLASS32;
		data[24..28].copy_from_slice(&ENTRY.to_le_bytes());
		data[28..32].copy_from_slice(&(EHDR_SIZE as u32).to_le_bytes());
		data[44..46].copy_from_slice(&1u16.to_le_bytes());
		let ph = EHDR_SIZE;
		data[ph..ph + 4].copy_from_slice(&PT_LOAD.to_le_bytes());
		data[ph + 4..ph + 8].copy_from_slice(&((EHDR_SIZE + PHDR_SIZE) as u32).to_le_bytes());
		data[ph + 8..ph + 12].copy_from_slice(&ENTRY.to_le_bytes());
		data[ph + 16..ph + 20].copy_from_slice(&4u32.to_le_bytes());
		data[ph + 20..ph + 24].copy_from_slice(&4u32.to_le_bytes());

		let node = file::create_root_file("init_test", data);
		let pid = load(node, "").unwrap();
		let cr3 = process::with_process(pid, |p| p.cr3).unwrap();

		assert!(vmm::translate(cr3, VirtAddr(ENTRY as usize)).is_some());

		// The calling test thread is still the child's parent (its pid never changed), so it can
		// reap it directly once marked a zombie.
		process::with_process(pid, |p| p.state = process::ProcState::Zombie(7));
		let (reaped, code) = process::wait(pid as i32).unwrap();
		assert_eq!(reaped, pid);
		assert_eq!(code, 7);
		vmm::destroy_address_space(cr3);
	}
}
