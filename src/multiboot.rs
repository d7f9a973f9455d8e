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

//! The Multiboot2 standard specifies an interface to load and boot the kernel image. It provides
//! essential information such as the memory mapping and the loaded modules.
//!
//! Only the tags this core actually consumes are decoded: command line, basic memory info,
//! modules, and the framebuffer. Everything else (ELF sections, ACPI, EFI, network, SMBIOS...) is
//! out of scope and skipped.

use core::{ffi::c_void, slice, str};

/// The magic number passed in `eax` by a Multiboot2-compliant bootloader.
pub const BOOTLOADER_MAGIC: u32 = 0x36d76289;

const TAG_TYPE_END: u32 = 0;
const TAG_TYPE_CMDLINE: u32 = 1;
const TAG_TYPE_MODULE: u32 = 3;
const TAG_TYPE_BASIC_MEMINFO: u32 = 4;
const TAG_TYPE_FRAMEBUFFER: u32 = 8;

/// Maximum number of boot modules tracked. The bootloader may offer more; extras are ignored.
pub const MAX_MODULES: usize = 8;

#[repr(C)]
struct Tag {
	type_: u32,
	size: u32,
}

#[repr(C)]
struct TagString {
	type_: u32,
	size: u32,
	string: [u8; 0],
}

#[repr(C)]
struct TagModule {
	type_: u32,
	size: u32,
	mod_start: u32,
	mod_end: u32,
	cmdline: [u8; 0],
}

#[repr(C)]
struct TagBasicMeminfo {
	type_: u32,
	size: u32,
	mem_lower: u32,
	mem_upper: u32,
}

#[repr(C)]
struct TagFramebuffer {
	type_: u32,
	size: u32,
	addr: u64,
	pitch: u32,
	width: u32,
	height: u32,
	bpp: u8,
	fb_type: u8,
	reserved: u16,
}

impl Tag {
	fn next(&self) -> *const Self {
		((self as *const _ as usize) + (((self.size + 7) & !7) as usize)) as *const _
	}
}

/// A loaded boot module: a named byte range handed to the kernel by the bootloader, destined to
/// become a root-level file.
#[derive(Clone, Copy)]
pub struct Module {
	pub name: [u8; 32],
	pub name_len: usize,
	pub start: *const u8,
	pub end: *const u8,
}

impl Module {
	const EMPTY: Self = Self {
		name: [0; 32],
		name_len: 0,
		start: core::ptr::null(),
		end: core::ptr::null(),
	};

	/// Returns the module's name as a string, empty if it wasn't valid UTF-8.
	pub fn name(&self) -> &str {
		str::from_utf8(&self.name[..self.name_len]).unwrap_or("")
	}

	/// Returns the module's content as a byte slice.
	pub fn data(&self) -> &'static [u8] {
		unsafe { slice::from_raw_parts(self.start, self.end as usize - self.start as usize) }
	}
}

/// Framebuffer information reported by the bootloader, if any.
#[derive(Clone, Copy, Default)]
pub struct Framebuffer {
	pub addr: u64,
	pub pitch: u32,
	pub width: u32,
	pub height: u32,
	pub bpp: u8,
}

/// Kernel boot information provided by Multiboot, structured and filtered down to what the core
/// consumes.
pub struct BootInfo {
	/// The raw command line string, used by [`crate::config::CmdLine`].
	pub cmdline: &'static str,
	/// Upper memory size in KiB, as reported by the BIOS (memory above 1 MiB).
	pub mem_upper_kb: u32,
	/// The boot modules, in the order reported by the bootloader.
	pub modules: [Module; MAX_MODULES],
	/// Number of valid entries in `modules`.
	pub mods_count: usize,
	/// Framebuffer info, if the bootloader set one up.
	pub framebuffer: Option<Framebuffer>,
}

impl Default for BootInfo {
	fn default() -> Self {
		Self {
			cmdline: "",
			mem_upper_kb: 0,
			modules: [Module::EMPTY; MAX_MODULES],
			mods_count: 0,
			framebuffer: None,
		}
	}
}

unsafe fn reinterpret_tag<T>(tag: &Tag) -> &'static T {
	unsafe { &*(tag as *const _ as *const T) }
}

unsafe fn str_from_ptr(ptr: *const u8) -> &'static str {
	let mut len = 0;
	unsafe {
		while *ptr.add(len) != 0 {
			len += 1;
		}
		str::from_utf8(slice::from_raw_parts(ptr, len)).unwrap_or("")
	}
}

fn handle_tag(boot_info: &mut BootInfo, tag: &Tag) {
	match tag.type_ {
		TAG_TYPE_CMDLINE => unsafe {
			let t: &TagString = reinterpret_tag(tag);
			boot_info.cmdline = str_from_ptr(t.string.as_ptr());
		},

		TAG_TYPE_MODULE => {
			if boot_info.mods_count >= MAX_MODULES {
				return;
			}
			let t: &TagModule = unsafe { reinterpret_tag(tag) };
			let cmdline = unsafe { str_from_ptr(t.cmdline.as_ptr()) };
			let mut module = Module::EMPTY;
			let len = cmdline.len().min(module.name.len());
			module.name[..len].copy_from_slice(&cmdline.as_bytes()[..len]);
			module.name_len = len;
			module.start = t.mod_start as *const u8;
			module.end = t.mod_end as *const u8;
			boot_info.modules[boot_info.mods_count] = module;
			boot_info.mods_count += 1;
		}

		TAG_TYPE_BASIC_MEMINFO => {
			let t: &TagBasicMeminfo = unsafe { reinterpret_tag(tag) };
			boot_info.mem_upper_kb = t.mem_upper;
		}

		TAG_TYPE_FRAMEBUFFER => {
			let t: &TagFramebuffer = unsafe { reinterpret_tag(tag) };
			boot_info.framebuffer = Some(Framebuffer {
				addr: t.addr,
				pitch: t.pitch,
				width: t.width,
				height: t.height,
				bpp: t.bpp,
			});
		}

		_ => {}
	}
}

/// Reads the Multiboot2 tags at `ptr` (the pointer the bootloader left in `ebx`) into a
/// [`BootInfo`].
///
/// # Safety
///
/// `ptr` must be the untouched pointer handed to `kernel_main` by the bootloader.
pub unsafe fn read(magic: u32, ptr: *const c_void) -> BootInfo {
	let mut boot_info = BootInfo::default();
	if magic != BOOTLOADER_MAGIC {
		return boot_info;
	}
	let mut tag = unsafe { ptr.add(8) } as *const Tag;
	while unsafe { (*tag).type_ } != TAG_TYPE_END {
		handle_tag(&mut boot_info, unsafe { &*tag });
		tag = unsafe { (*tag).next() };
	}
	boot_info
}
