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

//! Loader contract.
//!
//! The binary/object loader - import and export resolution, relocations,
//! memory layout - is an external collaborator of the dispatch core. This
//! module defines the slice of it the core consumes: identity and address
//! range of each loaded image, its import table, its dependency names, and a
//! way to patch a call-resolution entry to branch to a synthetic address.
//!
//! [`MemoryImage`] is a self-contained in-memory implementation of the
//! contract. It backs the test suite and any embedder whose images are
//! produced by other means; a real loader implements [`LoadedImage`] on its
//! own image type.
//!
//! From the core's perspective images are read-only except for the
//! jump-table patches the import binder explicitly requests.

use std::collections::BTreeMap;
use std::ops::Range;

use crate::Result;

/// One entry of an image's import table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportEntry {
    /// The external symbol name.
    pub symbol: String,
    /// The address the loader already resolved this import to, if any.
    pub resolved: Option<u64>,
}

impl ImportEntry {
    /// An import the loader left unresolved.
    #[must_use]
    pub fn unresolved(symbol: &str) -> Self {
        ImportEntry {
            symbol: symbol.to_string(),
            resolved: None,
        }
    }

    /// An import the loader resolved to `target`.
    #[must_use]
    pub fn resolved(symbol: &str, target: u64) -> Self {
        ImportEntry {
            symbol: symbol.to_string(),
            resolved: Some(target),
        }
    }
}

/// The loader-owned view of one loaded executable or library image.
pub trait LoadedImage {
    /// Identity of the image (path or name).
    fn identity(&self) -> &str;

    /// The address range this image occupies.
    fn address_range(&self) -> Range<u64>;

    /// Library names the image declares as dependencies.
    fn dependencies(&self) -> Vec<String>;

    /// Additional dependency names inferred statically, for binaries the
    /// loader could not fully resolve.
    fn static_dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// The image's import table.
    fn imports(&self) -> Vec<ImportEntry>;

    /// Patches the call-resolution entry for `symbol` to branch to `target`.
    ///
    /// This is the only mutation the dispatch core ever requests of an
    /// image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Patch`](crate::Error::Patch) if the image has no
    /// such entry or the entry cannot be rewritten.
    fn patch_import(&mut self, symbol: &str, target: u64) -> Result<()>;
}

/// An in-memory [`LoadedImage`].
///
/// # Examples
///
/// ```rust
/// use symflow::loader::{ImportEntry, LoadedImage, MemoryImage};
///
/// let mut image = MemoryImage::new("/bin/true", 0x40_0000..0x41_0000)
///     .with_dependency("libc.so.6")
///     .with_import(ImportEntry::unresolved("strlen"));
///
/// image.patch_import("strlen", 0xdead_0000).unwrap();
/// assert_eq!(image.patches().get("strlen"), Some(&0xdead_0000));
/// ```
#[derive(Debug, Clone)]
pub struct MemoryImage {
    identity: String,
    range: Range<u64>,
    dependencies: Vec<String>,
    static_dependencies: Vec<String>,
    imports: Vec<ImportEntry>,
    patches: BTreeMap<String, u64>,
}

impl MemoryImage {
    /// Creates an image with the given identity and address range.
    #[must_use]
    pub fn new(identity: &str, range: Range<u64>) -> Self {
        MemoryImage {
            identity: identity.to_string(),
            range,
            dependencies: Vec::new(),
            static_dependencies: Vec::new(),
            imports: Vec::new(),
            patches: BTreeMap::new(),
        }
    }

    /// Adds a declared dependency name.
    #[must_use]
    pub fn with_dependency(mut self, name: &str) -> Self {
        self.dependencies.push(name.to_string());
        self
    }

    /// Adds a statically inferred dependency name.
    #[must_use]
    pub fn with_static_dependency(mut self, name: &str) -> Self {
        self.static_dependencies.push(name.to_string());
        self
    }

    /// Adds an import table entry.
    #[must_use]
    pub fn with_import(mut self, entry: ImportEntry) -> Self {
        self.imports.push(entry);
        self
    }

    /// The patches applied so far (symbol → target address).
    #[must_use]
    pub fn patches(&self) -> &BTreeMap<String, u64> {
        &self.patches
    }
}

impl LoadedImage for MemoryImage {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn address_range(&self) -> Range<u64> {
        self.range.clone()
    }

    fn dependencies(&self) -> Vec<String> {
        self.dependencies.clone()
    }

    fn static_dependencies(&self) -> Vec<String> {
        self.static_dependencies.clone()
    }

    fn imports(&self) -> Vec<ImportEntry> {
        self.imports.clone()
    }

    fn patch_import(&mut self, symbol: &str, target: u64) -> Result<()> {
        if !self.imports.iter().any(|i| i.symbol == symbol) {
            return Err(crate::Error::Patch {
                symbol: symbol.to_string(),
                message: format!("no import table entry in {}", self.identity),
            });
        }
        self.patches.insert(symbol.to_string(), target);
        Ok(())
    }
}
