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

//! A small preemptive, 32-bit protected-mode teaching kernel core: physical and virtual memory
//! management, a kernel heap, a round-robin process scheduler, a syscall dispatcher, an ELF32
//! loader and an in-memory filesystem with on-disk persistence.

#![no_std]
#![no_main]
#![feature(allow_internal_unstable)]
#![feature(custom_test_frameworks)]
#![feature(lang_items)]
#![deny(missing_docs)]
#![allow(clippy::tabs_in_doc_comments)]
#![allow(dead_code)]
#![allow(unsafe_op_in_unsafe_fn)]
#![test_runner(crate::selftest::runner)]
#![reexport_test_harness_main = "kernel_selftest"]

extern crate alloc;

pub mod arch;
mod boot;
#[macro_use]
pub mod config;
pub mod debug;
pub mod device;
pub mod elf;
pub mod errno;
pub mod file;
pub mod gdt;
pub mod idt;
pub mod int;
pub mod io;
pub mod logger;
pub mod memory;
pub mod multiboot;
#[macro_use]
pub mod panic;
pub mod power;
#[macro_use]
pub mod print;
pub mod process;
pub mod selftest;
pub mod sync;
pub mod syscall;
pub mod time;

use crate::logger::LOGGER;
use crate::memory::{heap, pmm, vmm};
use crate::process::tss::TSS;
use core::ffi::c_void;

/// The kernel's name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
/// Current kernel version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Loads every Multiboot module into a root-level file of the same name, so a command line or a
/// later syscall can find it by path.
fn load_modules(boot_info: &multiboot::BootInfo) {
	for module in &boot_info.modules[..boot_info.mods_count] {
		let name = module.name();
		if name.is_empty() {
			continue;
		}
		println!("Load module {name}");
		file::create_root_file(name, module.data().to_vec());
	}
}

/// Resolves the init program to run at boot: the first plain file at the root, by convention
/// (whatever the bootloader or the on-disk filesystem supplied first).
///
/// Returns `None` if nothing is runnable, in which case the kernel just sits idle.
fn init_node() -> Option<file::NodeId> {
	let candidates = file::list(file::ROOT).ok()?;
	candidates.into_iter().find(|&id| file::kind_of(id) == file::FileKind::File)
}

/// An inner function is required to ensure everything allocated during setup (boot info
/// borrows, local buffers) is dropped before the kernel falls into its idle loop.
fn kernel_main_inner(magic: u32, multiboot_ptr: *const c_void) {
	gdt::init();
	idt::init();
	TSS::init();

	let boot_info = unsafe { multiboot::read(magic, multiboot_ptr) };
	let cmdline = config::CmdLine::parse(boot_info.cmdline);
	LOGGER.lock().silent = cmdline.is_silent();

	println!("Boot {NAME} version {VERSION}");

	println!("Setup memory management");
	let mem_bytes = (boot_info.mem_upper_kb as usize + 1024) * 1024;
	pmm::init(mem_bytes);
	vmm::init().expect("virtual memory initialization failed");
	heap::init().expect("kernel heap initialization failed");

	println!("Setup files management");
	file::init();
	load_modules(&boot_info);
	if !cmdline.skip_disk() {
		match file::disk::load() {
			Ok(()) => println!("Loaded on-disk filesystem"),
			Err(e) => println!("No on-disk filesystem found ({e:?}), starting empty"),
		}
	}

	#[cfg(test)]
	kernel_selftest();

	arch::sti();

	match init_node() {
		Some(node) => match elf::load(node, "") {
			Ok(pid) => println!("Started init process (pid {pid})"),
			Err(e) => println!("Failed to start init process: {e:?}"),
		},
		None => println!("No init module supplied, idling"),
	}
}

/// This is the main function of the Rust source code, responsible for the
/// initialization of the kernel.
///
/// When calling this function, the CPU must be in Protected Mode with the GDT loaded with space
/// for the Task State Segment.
///
/// Arguments:
/// - `magic` is the magic number passed by Multiboot.
/// - `multiboot_ptr` is the pointer to the Multiboot booting information structure.
#[unsafe(no_mangle)]
pub extern "C" fn kernel_main(magic: u32, multiboot_ptr: *const c_void) -> ! {
	kernel_main_inner(magic, multiboot_ptr);
	loop {
		process::scheduler::schedule();
	}
}
