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

//! Assembles the interrupt stub / context switch assembly that is part of the kernel's codebase.

use crate::{Env, util::list_asm_files};
use std::{io, path::Path};

/// Assembles the assembly sources under `src/arch/x86/asm`.
pub fn compile_asm(env: &Env, triplet: &str) -> io::Result<()> {
	let files = list_asm_files(Path::new("src/arch/x86/asm"))?;
	for f in &files {
		println!("cargo:rerun-if-changed={}", f.display());
	}
	cc::Build::new()
		.flag("-nostdlib")
		.flag("-ffreestanding")
		.flag("-fno-stack-protector")
		.flag("-Wall")
		.flag("-Wextra")
		.flag("-Wno-unused-command-line-argument")
		.pic(false)
		.target(triplet)
		.debug(env.is_debug())
		.opt_level(env.opt_level)
		.files(files)
		.compile("kasm");
	println!("cargo:rustc-link-arg=-lkasm");
	Ok(())
}
