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

//! The build script compiles the assembly stubs the kernel links against (interrupt entry points,
//! context switch trampoline, GDT/IDT load helpers) and wires up the linker script.
//!
//! There is no build-time TOML configuration file and no multi-architecture target selection
//! here: the kernel targets exactly one platform (32-bit x86, protected mode), so the triplet and
//! linker script are fixed rather than read from a target JSON file at build time.

pub mod compile;
pub mod util;

use std::{env, path::PathBuf, process::exit};

/// The environment passed to the build script.
pub struct Env {
	/// The path to the root of the workspace.
	pub manifest_dir: PathBuf,
	/// The name of the profile used to compile the crate.
	pub profile: String,
	/// The optimization level, between `0` and `3` included.
	pub opt_level: u32,
}

impl Env {
	/// Reads the current environment.
	pub fn get() -> Self {
		Self {
			manifest_dir: PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap()),
			profile: env::var("PROFILE").unwrap(),
			opt_level: env::var("OPT_LEVEL").unwrap().parse().unwrap(),
		}
	}

	/// Tells whether compiling in debug mode.
	pub fn is_debug(&self) -> bool {
		self.profile == "debug"
	}
}

/// The LLVM target triplet for the kernel. Fixed: this kernel is x86 32-bit only.
const TRIPLET: &str = "i686-unknown-none";
/// Path to the linker script, relative to the crate root.
const LINKER_SCRIPT: &str = "arch/x86/linker.ld";

fn main() {
	let env = Env::get();
	compile::compile_asm(&env, TRIPLET).unwrap_or_else(|e| {
		eprintln!("Compilation failed: {e}");
		exit(1);
	});
	println!("cargo:rerun-if-changed={LINKER_SCRIPT}");
	println!("cargo:rustc-link-arg=-T{LINKER_SCRIPT}");
	// Prevent the linker from using very large alignments
	println!("cargo:rustc-link-arg=-zmax-page-size=0x1000");
}
