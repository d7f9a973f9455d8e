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

//! On-disk persistence for the file tree: a flat table of entries backed by the primary ATA
//! drive, written and read in one shot rather than incrementally.
//!
//! Layout, in 512-byte sectors:
//!
//! ```text
//! sector 0       header (magic, entry count)
//! sectors 1..8   entry table (8 sectors * 512 bytes / 72 bytes per entry = 56 entries)
//! sector 9       unused
//! sector 10..    file data, back to back in entry order
//! ```
//!
//! Entry count is capped at [`MAX_ENTRIES`] by the table's fixed 8-sector size, not by the 64
//! the format was originally sized for; 64 72-byte entries do not fit 8 512-byte sectors, so the
//! sector count is taken as authoritative and the entry cap is derived from it.
//!
//! Saving walks the whole tree and flattens it: only files (not directories) are written, each
//! keyed by its full slash-joined path. Loading, however, recreates every entry as a direct
//! child of the root, discarding the path's directory components — a save/load round trip does
//! not reproduce the original tree shape. This asymmetry is preserved rather than fixed.

use crate::device::storage::{self, SECTOR_SIZE};
use crate::errno::{kerr, KResult};
use crate::file::{self, NodeId, ROOT};
use alloc::string::String;
use alloc::vec::Vec;

const MAGIC: u32 = 0xDEADC0DE;
const HEADER_SECTOR: u32 = 0;
const TABLE_START_SECTOR: u32 = 1;
const TABLE_SECTORS: u32 = 8;
const DATA_START_SECTOR: u32 = 10;

const ENTRY_NAME_LEN: usize = 64;
const ENTRY_SIZE: usize = ENTRY_NAME_LEN + 4 + 4;

/// Maximum number of file entries the on-disk table can hold, derived from its fixed 8-sector
/// size rather than the format's originally intended 64.
pub const MAX_ENTRIES: usize = (TABLE_SECTORS as usize * SECTOR_SIZE) / ENTRY_SIZE;

#[derive(Clone)]
struct Entry {
	name: String,
	size: u32,
	start_sector: u32,
}

fn encode_entry(e: &Entry, out: &mut [u8]) {
	debug_assert_eq!(out.len(), ENTRY_SIZE);
	out.fill(0);
	let name_bytes = e.name.as_bytes();
	let n = name_bytes.len().min(ENTRY_NAME_LEN - 1);
	out[..n].copy_from_slice(&name_bytes[..n]);
	out[ENTRY_NAME_LEN..ENTRY_NAME_LEN + 4].copy_from_slice(&e.size.to_le_bytes());
	out[ENTRY_NAME_LEN + 4..ENTRY_NAME_LEN + 8].copy_from_slice(&e.start_sector.to_le_bytes());
}

fn decode_entry(raw: &[u8]) -> Option<Entry> {
	debug_assert_eq!(raw.len(), ENTRY_SIZE);
	let nul = raw[..ENTRY_NAME_LEN].iter().position(|&b| b == 0).unwrap_or(0);
	if nul == 0 {
		return None;
	}
	let name = core::str::from_utf8(&raw[..nul]).ok()?.into();
	let size = u32::from_le_bytes(raw[ENTRY_NAME_LEN..ENTRY_NAME_LEN + 4].try_into().unwrap());
	let start_sector =
		u32::from_le_bytes(raw[ENTRY_NAME_LEN + 4..ENTRY_NAME_LEN + 8].try_into().unwrap());
	Some(Entry {
		name,
		size,
		start_sector,
	})
}

fn sectors_for(bytes: usize) -> u32 {
	((bytes + SECTOR_SIZE - 1) / SECTOR_SIZE) as u32
}

/// Recursively collects every file (not directory) under `dir`, keyed by its full path from
/// root, in depth-first order.
fn collect_files(dir: NodeId, prefix: &str, out: &mut Vec<(String, NodeId)>) -> KResult<()> {
	for child in file::list(dir)? {
		let name = file::name_of(child);
		let mut path = String::new();
		path.push_str(prefix);
		path.push('/');
		path.push_str(&name);
		let node = file::resolve(ROOT, &path)?;
		if file::list(node).is_ok() {
			collect_files(node, &path, out)?;
		} else {
			out.push((path, node));
		}
	}
	Ok(())
}

/// Serializes the whole file tree to the primary disk, overwriting whatever was there.
pub fn save() -> KResult<()> {
	let mut files = Vec::new();
	collect_files(ROOT, "", &mut files)?;
	if files.len() > MAX_ENTRIES {
		return Err(kerr!(InvalidArgument));
	}

	let mut table = alloc::vec![0u8; TABLE_SECTORS as usize * SECTOR_SIZE];
	let mut next_sector = DATA_START_SECTOR;
	let mut data = Vec::new();
	for (i, (path, node)) in files.iter().enumerate() {
		let size = file::size_of(*node);
		let mut buf = alloc::vec![0u8; size];
		file::read_at(*node, 0, &mut buf)?;
		let entry = Entry {
			name: path.clone(),
			size: size as u32,
			start_sector: next_sector,
		};
		encode_entry(&entry, &mut table[i * ENTRY_SIZE..(i + 1) * ENTRY_SIZE]);
		next_sector += sectors_for(size).max(1);
		data.push(buf);
	}

	let mut header = alloc::vec![0u8; SECTOR_SIZE];
	header[0..4].copy_from_slice(&MAGIC.to_le_bytes());
	header[4..8].copy_from_slice(&(files.len() as u32).to_le_bytes());
	storage::ata_write_sectors(HEADER_SECTOR, 1, &header);
	storage::ata_write_sectors(TABLE_START_SECTOR, TABLE_SECTORS as u8, &table);

	let mut sector = DATA_START_SECTOR;
	for buf in &data {
		let count = sectors_for(buf.len()).max(1);
		let mut padded = alloc::vec![0u8; count as usize * SECTOR_SIZE];
		padded[..buf.len()].copy_from_slice(buf);
		storage::ata_write_sectors(sector, count as u8, &padded);
		sector += count;
	}
	Ok(())
}

/// Loads the on-disk table, recreating every stored file as a direct child of the root.
///
/// Entries whose saved name contained `/` lose their directory components: `"a/b/c.txt"` becomes
/// a root-level file named `"c.txt"`. This mirrors [`save`]'s asymmetry rather than correcting
/// it.
pub fn load() -> KResult<()> {
	let mut header = [0u8; SECTOR_SIZE];
	storage::ata_read_sectors(HEADER_SECTOR, 1, &mut header);
	let magic = u32::from_le_bytes(header[0..4].try_into().unwrap());
	if magic != MAGIC {
		return Err(kerr!(BadFormat));
	}
	let count = u32::from_le_bytes(header[4..8].try_into().unwrap()) as usize;
	if count > MAX_ENTRIES {
		return Err(kerr!(BadFormat));
	}

	let mut table = alloc::vec![0u8; TABLE_SECTORS as usize * SECTOR_SIZE];
	storage::ata_read_sectors(TABLE_START_SECTOR, TABLE_SECTORS as u8, &mut table);

	for i in 0..count {
		let Some(entry) = decode_entry(&table[i * ENTRY_SIZE..(i + 1) * ENTRY_SIZE]) else {
			continue;
		};
		let count_sectors = sectors_for(entry.size as usize).max(1);
		let mut padded = alloc::vec![0u8; count_sectors as usize * SECTOR_SIZE];
		storage::ata_read_sectors(entry.start_sector, count_sectors as u8, &mut padded);
		let data = padded[..entry.size as usize].to_vec();
		let flat_name = entry.name.rsplit('/').next().unwrap_or(&entry.name);
		file::create_root_file(flat_name, data);
	}
	Ok(())
}

#[cfg(test)]
mod test {
	use super::*;

	#[test_case]
	fn entry_round_trips_through_encoding() {
		let e = Entry {
			name: "hello.txt".into(),
			size: 42,
			start_sector: 10,
		};
		let mut buf = [0u8; ENTRY_SIZE];
		encode_entry(&e, &mut buf);
		let decoded = decode_entry(&buf).unwrap();
		assert_eq!(decoded.name, "hello.txt");
		assert_eq!(decoded.size, 42);
		assert_eq!(decoded.start_sector, 10);
	}

	#[test_case]
	fn max_entries_fits_table_sectors() {
		assert!(MAX_ENTRIES * ENTRY_SIZE <= TABLE_SECTORS as usize * SECTOR_SIZE);
		assert_eq!(MAX_ENTRIES, 56);
	}

	/// Scenario: a file saved to disk and removed from the in-memory tree comes back on `load`,
	/// recreated directly under the root per the documented flattening.
	#[test_case]
	fn save_then_load_round_trip_flattens_to_root() {
		file::test_init();
		let node = file::touch(ROOT, "/roundtrip_test.txt").unwrap();
		file::write(node, b"hello from disk").unwrap();
		save().unwrap();
		file::delete(ROOT, "/roundtrip_test.txt").unwrap();

		load().unwrap();

		let reloaded = file::resolve(ROOT, "/roundtrip_test.txt").unwrap();
		assert_eq!(file::contents(reloaded).unwrap(), b"hello from disk");
	}
}
