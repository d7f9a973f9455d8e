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

//! Build script utilities.

use std::{
	ffi::OsStr,
	fs, io,
	path::{Path, PathBuf},
};

/// Lists paths to assembly (`.s`) files under `dir`, non-recursively reporting nothing if `dir`
/// does not exist yet (it is created lazily alongside the assembly stubs it holds).
pub fn list_asm_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
	let dir = match fs::read_dir(dir) {
		Ok(dir) => dir,
		Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
		Err(e) => return Err(e),
	};
	let mut paths = vec![];
	for e in dir {
		let e = e?;
		if e.file_type()?.is_file() && e.path().extension().and_then(OsStr::to_str) == Some("s") {
			paths.push(e.path());
		}
	}
	Ok(paths)
}
