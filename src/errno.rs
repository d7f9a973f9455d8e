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

//! Internal error taxonomy.
//!
//! Every fallible operation inside the kernel returns a [`KResult`]. The numeric sentinels the
//! ABI actually exposes (`-1` from a syscall, `null` from an allocator, `-1` from the loader) are
//! produced only at those three edges; nothing upstream of them matches on a raw integer.

use core::fmt;

/// The kernel's internal error kind.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum KError {
	/// A physical frame, heap block, or virtual mapping could not be obtained.
	OutOfMemory,
	/// A user-provided pointer failed [`crate::syscall::is_valid_user_ptr`]'s checks.
	InvalidPointer,
	/// A path, FD, or pid did not resolve to anything.
	NotFound,
	/// An on-disk or executable header did not match what was expected (bad magic).
	BadFormat,
	/// An argument was structurally invalid (bad flag combination, zero-length name, ...).
	InvalidArgument,
	/// An operation that requires a directory was given a file, or vice versa.
	NotADirectory,
	/// A directory with children was passed to an operation that requires it to be empty.
	NotEmpty,
	/// `wait` found no child matching the requested pid.
	NoSuchChild,
	/// A file descriptor index was out of range or unallocated.
	BadFd,
	/// A name already exists among the siblings of a directory.
	AlreadyExists,
}

impl fmt::Display for KError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let msg = match self {
			Self::OutOfMemory => "out of memory",
			Self::InvalidPointer => "invalid user pointer",
			Self::NotFound => "not found",
			Self::BadFormat => "bad format",
			Self::InvalidArgument => "invalid argument",
			Self::NotADirectory => "not a directory",
			Self::NotEmpty => "directory not empty",
			Self::NoSuchChild => "no such child",
			Self::BadFd => "bad file descriptor",
			Self::AlreadyExists => "already exists",
		};
		write!(f, "{msg}")
	}
}

/// Result alias used throughout the kernel's internal APIs.
pub type KResult<T> = Result<T, KError>;

/// Constructs a [`KError`] value, so call sites read as a single token (`kerr!(NotFound)`)
/// instead of a path.
#[macro_export]
macro_rules! kerr {
	($variant:ident) => {
		$crate::errno::KError::$variant
	};
}

/// Flattens a [`KResult<T>`] to the syscall ABI's `isize` return convention: `Ok(v)` becomes `v`
/// cast to `isize`, any `Err` becomes `-1`.
pub fn to_syscall_ret<T: TryInto<isize>>(res: KResult<T>) -> isize {
	match res {
		Ok(v) => v.try_into().unwrap_or(-1),
		Err(_) => -1,
	}
}
