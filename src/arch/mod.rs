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

//! Architecture descriptors.
//!
//! An [`ArchInfo`] captures the fixed facts about a target machine that the
//! dispatch core needs: address width, byte order, instruction alignment, and
//! the optional narrower encoding mode some architectures support (e.g. Thumb
//! on ARM). Descriptors are immutable and shared by reference (`Arc`) across
//! all components for the lifetime of a session.
//!
//! A missing or inconsistent descriptor is a fatal configuration error:
//! without a valid address byte width no synthetic address can be allocated,
//! so [`ArchInfo::new`] validates eagerly, before any stepping occurs.

use crate::Result;

/// Byte order of the target machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endian {
    /// Least significant byte first.
    Little,
    /// Most significant byte first.
    Big,
}

/// Fixed facts about a target machine.
///
/// Shared read-only by the allocator (address width, byte order, alignment),
/// the dispatcher (alignment and narrow-mode checks), and the built-in
/// procedure models (return-value and link register names).
///
/// # Examples
///
/// ```rust
/// use symflow::arch::{ArchInfo, Endian};
///
/// let arch = ArchInfo::amd64();
/// assert_eq!(arch.bits(), 64);
/// assert_eq!(arch.byte_width(), 8);
/// assert_eq!(arch.instruction_alignment(), 1);
///
/// let arm = ArchInfo::armel();
/// assert_eq!(arm.instruction_alignment(), 4);
/// assert_eq!(arm.narrow_alignment(), Some(2));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchInfo {
    name: &'static str,
    bits: u32,
    endian: Endian,
    instruction_alignment: u64,
    narrow_alignment: Option<u64>,
    return_reg: &'static str,
    link_reg: Option<&'static str>,
}

impl ArchInfo {
    /// Creates a new architecture descriptor.
    ///
    /// # Arguments
    ///
    /// * `name` - Architecture name, used in diagnostics
    /// * `bits` - Address width in bits; must be a non-zero multiple of 8, at most 64
    /// * `endian` - Byte order
    /// * `instruction_alignment` - Alignment unit of standard-mode instructions, in bytes
    /// * `narrow_alignment` - Alignment unit of the narrow encoding mode, or `None`
    ///   if the architecture has no such mode
    /// * `return_reg` - Name of the return-value register
    /// * `link_reg` - Name of the link (return-address) register, if any
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the address width or
    /// an alignment unit is invalid. This is fatal: no synthetic address can be
    /// derived from a descriptor without a usable byte width.
    pub fn new(
        name: &'static str,
        bits: u32,
        endian: Endian,
        instruction_alignment: u64,
        narrow_alignment: Option<u64>,
        return_reg: &'static str,
        link_reg: Option<&'static str>,
    ) -> Result<Self> {
        if bits == 0 || bits % 8 != 0 || bits > 64 {
            return Err(config_error!(
                "invalid address width {} for architecture {}; must be a non-zero multiple of 8 up to 64",
                bits,
                name
            ));
        }
        if instruction_alignment == 0 {
            return Err(config_error!(
                "instruction alignment must be non-zero for architecture {}",
                name
            ));
        }
        if let Some(narrow) = narrow_alignment {
            if narrow == 0 || narrow >= instruction_alignment {
                return Err(config_error!(
                    "narrow-mode alignment {} must be non-zero and smaller than {} for architecture {}",
                    narrow,
                    instruction_alignment,
                    name
                ));
            }
        }

        Ok(ArchInfo {
            name,
            bits,
            endian,
            instruction_alignment,
            narrow_alignment,
            return_reg,
            link_reg,
        })
    }

    /// 64-bit x86, byte-granular instructions.
    #[must_use]
    pub fn amd64() -> Self {
        ArchInfo {
            name: "AMD64",
            bits: 64,
            endian: Endian::Little,
            instruction_alignment: 1,
            narrow_alignment: None,
            return_reg: "rax",
            link_reg: None,
        }
    }

    /// 32-bit x86, byte-granular instructions.
    #[must_use]
    pub fn x86() -> Self {
        ArchInfo {
            name: "X86",
            bits: 32,
            endian: Endian::Little,
            instruction_alignment: 1,
            narrow_alignment: None,
            return_reg: "eax",
            link_reg: None,
        }
    }

    /// Little-endian 32-bit ARM with 4-byte instructions and a 2-byte narrow
    /// (Thumb) encoding mode.
    #[must_use]
    pub fn armel() -> Self {
        ArchInfo {
            name: "ARMEL",
            bits: 32,
            endian: Endian::Little,
            instruction_alignment: 4,
            narrow_alignment: Some(2),
            return_reg: "r0",
            link_reg: Some("lr"),
        }
    }

    /// Big-endian 32-bit MIPS with 4-byte instructions.
    #[must_use]
    pub fn mips32() -> Self {
        ArchInfo {
            name: "MIPS32",
            bits: 32,
            endian: Endian::Big,
            instruction_alignment: 4,
            narrow_alignment: None,
            return_reg: "v0",
            link_reg: Some("ra"),
        }
    }

    /// Architecture name, used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Address width in bits.
    #[must_use]
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Address width in bytes.
    #[must_use]
    pub fn byte_width(&self) -> usize {
        (self.bits / 8) as usize
    }

    /// Byte order.
    #[must_use]
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Alignment unit of standard-mode instructions, in bytes.
    #[must_use]
    pub fn instruction_alignment(&self) -> u64 {
        self.instruction_alignment
    }

    /// Alignment unit of the narrow encoding mode, if the architecture has one.
    #[must_use]
    pub fn narrow_alignment(&self) -> Option<u64> {
        self.narrow_alignment
    }

    /// Name of the return-value register.
    #[must_use]
    pub fn return_reg(&self) -> &'static str {
        self.return_reg
    }

    /// Name of the link (return-address) register, if the architecture has one.
    #[must_use]
    pub fn link_reg(&self) -> Option<&'static str> {
        self.link_reg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        for arch in [
            ArchInfo::amd64(),
            ArchInfo::x86(),
            ArchInfo::armel(),
            ArchInfo::mips32(),
        ] {
            assert!(arch.bits() % 8 == 0 && arch.bits() <= 64);
            assert!(arch.instruction_alignment() >= 1);
        }
    }

    #[test]
    fn test_invalid_bits_rejected() {
        let result = ArchInfo::new("BAD", 12, Endian::Little, 1, None, "r0", None);
        assert!(matches!(result, Err(crate::Error::Config { .. })));

        let result = ArchInfo::new("BAD", 0, Endian::Little, 1, None, "r0", None);
        assert!(result.is_err());

        let result = ArchInfo::new("BAD", 128, Endian::Little, 1, None, "r0", None);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_alignment_rejected() {
        let result = ArchInfo::new("BAD", 32, Endian::Little, 0, None, "r0", None);
        assert!(result.is_err());

        // Narrow mode must actually be narrower.
        let result = ArchInfo::new("BAD", 32, Endian::Little, 4, Some(4), "r0", None);
        assert!(result.is_err());
    }

    #[test]
    fn test_custom_arch() {
        let arch = ArchInfo::new("RV32", 32, Endian::Little, 4, Some(2), "a0", Some("ra"))
            .expect("valid descriptor");
        assert_eq!(arch.byte_width(), 4);
        assert_eq!(arch.narrow_alignment(), Some(2));
        assert_eq!(arch.link_reg(), Some("ra"));
    }
}
