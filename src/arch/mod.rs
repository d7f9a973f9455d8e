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

//! Architecture-specific primitives. This kernel supports exactly one architecture (x86, 32-bit
//! protected mode); this module exists so the rest of the kernel names things as "the
//! architecture layer" rather than hard-coding `x86` everywhere, in case a second backend is ever
//! added.

pub mod x86;

pub use x86::{cli, end_of_interrupt, is_interrupt_enabled, sti};
