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

//! Synchronization primitives.
//!
//! This kernel is single-CPU and non-preemptible while running kernel-mode code (see the
//! concurrency model in the top-level design notes): the only hazard shared mutable kernel state
//! faces is a hardware interrupt firing mid-update. [`mutex::IntMutex`] is therefore the one
//! primitive the rest of the kernel needs; [`spinlock::Spinlock`] is its raw building block and
//! [`once::OnceInit`] covers state that is set up once at boot and read-only after.

pub mod mutex;
pub mod once;
pub mod spinlock;

pub use mutex::IntMutex;
