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

//! `sbrk(increment)`: grows the calling process's user heap by `increment` bytes.
//!
//! Allocation is eager: every newly covered page is allocated, zeroed, and mapped before this
//! returns, rather than left for a page fault to fill in later (there is no demand paging here).

use crate::memory::pmm;
use crate::memory::vmm::{self, USER, WRITABLE};
use crate::memory::{VirtAddr, PAGE_SIZE};
use crate::process;

#[cfg(test)]
use crate::process::ProcState;

pub fn call(increment: isize) -> isize {
	if increment <= 0 {
		return process::with_process(process::current_pid(), |p| p.program_break.0 as isize)
			.expect("current process has no control block");
	}
	let pid = process::current_pid();
	let (old_break, cr3) = process::with_process(pid, |p| (p.program_break, p.cr3))
		.expect("current process has no control block");
	let new_break = VirtAddr(old_break.0 + increment as usize);
	let old_top = old_break.align_to(PAGE_SIZE);
	let new_top = new_break.align_to(PAGE_SIZE);
	let mut page = old_top;
	while page.0 < new_top.0 {
		let Ok(frame) = pmm::alloc_frame() else {
			return -1;
		};
		unsafe {
			vmm::zero_frame(frame);
		}
		if vmm::map(cr3, frame, page, WRITABLE | USER).is_err() {
			pmm::free_frame(frame);
			return -1;
		}
		process::with_process(pid, |p| p.tracked_pages.push(page));
		page = page + PAGE_SIZE;
	}
	process::with_process(pid, |p| p.program_break = new_break);
	old_break.0 as isize
}

#[cfg(test)]
mod test {
	use super::*;

	/// P7: `sbrk` leaves every newly covered page readable and zeroed, and returns the break
	/// address from before the call rather than the new one.
	#[test_case]
	fn sbrk_zeroes_new_pages() {
		crate::memory::test_init();
		let cr3 = vmm::create_address_space().unwrap();
		let prev = process::current_pid();
		let entry = VirtAddr(vmm::KERNEL_SHARED_BYTES);
		let pid = process::spawn_user(entry, cr3, VirtAddr(0x2000_0000)).unwrap();
		process::set_current_pid(pid);

		let old_break = call(PAGE_SIZE as isize);
		assert_eq!(old_break, 0x2000_0000);

		let phys = vmm::translate(cr3, VirtAddr(old_break as usize)).unwrap();
		let bytes = unsafe { core::slice::from_raw_parts(phys.as_mut_ptr::<u8>(), PAGE_SIZE) };
		assert!(bytes.iter().all(|&b| b == 0));

		process::set_current_pid(prev);
		process::with_process(pid, |p| p.state = ProcState::Zombie(0));
		process::wait(pid as i32).unwrap();
		vmm::destroy_address_space(cr3);
	}
}
