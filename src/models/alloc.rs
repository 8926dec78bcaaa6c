// Copyright 2026 The symflow authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

//! Synthetic address allocation.
//!
//! Procedure models need addresses so that the rest of the platform can
//! treat them like ordinary code: breakpoints, hooks, and jump-table patches
//! are all keyed by address. [`allocate`] derives such an address from a
//! `(library, symbol)` pair by content hash, which makes it
//!
//! - **deterministic**: the same pair yields the same address within a
//!   session and across repeated runs with the same architecture, so
//!   breakpoints set by address stay stable, and
//! - **collision-resistant in practice**: distinct pairs land on distinct
//!   addresses for any realistic symbol population given the hash width.
//!
//! No uniqueness is enforced here; the registry detects the rare collision
//! at bind time and keeps the first binding (see
//! [`ModelRegistry::bind`](crate::models::ModelRegistry::bind)).

use md5::{Digest, Md5};

use crate::arch::{ArchInfo, Endian};
use crate::Result;

/// Separator between library and symbol in the hash input.
const SEPARATOR: &str = "_";

/// Derives the synthetic address for `(library, symbol)` under `arch`.
///
/// Algorithm: MD5 of `"{library}_{symbol}"`, truncated to the architecture's
/// address byte width, interpreted in the architecture's byte order, and
/// rounded down to the nearest multiple of the instruction alignment unit so
/// the result can never look like a misaligned branch target.
///
/// # Errors
///
/// Returns [`Error::Config`](crate::Error::Config) if the architecture's
/// address byte width cannot index the digest. `ArchInfo::new` already rules
/// this out; the check here keeps the function total over hand-built
/// descriptors.
///
/// # Examples
///
/// ```rust
/// use symflow::{arch::ArchInfo, models::alloc::allocate};
///
/// let arch = ArchInfo::amd64();
/// let a = allocate("libc.so.6", "strlen", &arch).unwrap();
/// let b = allocate("libc.so.6", "strlen", &arch).unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a % arch.instruction_alignment(), 0);
/// ```
pub fn allocate(library: &str, symbol: &str, arch: &ArchInfo) -> Result<u64> {
    let width = arch.byte_width();
    if width == 0 || width > 8 {
        return Err(config_error!(
            "cannot derive a synthetic address with byte width {} on architecture {}",
            width,
            arch.name()
        ));
    }

    let mut hasher = Md5::new();
    hasher.update(library.as_bytes());
    hasher.update(SEPARATOR.as_bytes());
    hasher.update(symbol.as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 8];
    let value = match arch.endian() {
        Endian::Little => {
            bytes[..width].copy_from_slice(&digest[..width]);
            u64::from_le_bytes(bytes)
        }
        Endian::Big => {
            bytes[8 - width..].copy_from_slice(&digest[..width]);
            u64::from_be_bytes(bytes)
        }
    };

    let alignment = arch.instruction_alignment();
    Ok(value - value % alignment)
}
