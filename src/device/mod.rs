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

//! Device contracts consumed by the core.
//!
//! Scancode tables, VGA cursor handling, framebuffer plotting and PATA timing tuning are driver
//! concerns and not reimplemented in depth here; what lives in this module is the minimal
//! surface the rest of the kernel actually calls: console output, a buffered keyboard character,
//! and synchronous sector I/O.

pub mod console;
pub mod keyboard;
pub mod serial;
pub mod storage;
