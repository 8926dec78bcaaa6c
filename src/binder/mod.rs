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

//! Import binding.
//!
//! The [`ImportBinder`] walks a loaded image's import table once and decides,
//! per symbol, between three outcomes:
//!
//! 1. **bound to a model** - a known model library provides a model under
//!    that exact symbol name; a synthetic address is allocated, the model is
//!    bound in the registry, and the image's call-resolution entry is patched
//!    to branch there;
//! 2. **left native** - the symbol is excluded from modeling, or the loader
//!    already resolved it to real code inside a loaded address range; native
//!    lifting will execute it;
//! 3. **fallback** - everything else is bound to the generic
//!    unconstrained-result stub so execution can proceed past the unknown
//!    routine.
//!
//! The pass is reproducible: candidate libraries are iterated in stable
//! sorted order, first match wins, and the allocator is pure, so running the
//! binder twice over the same image produces identical registry bindings and
//! identical patches.
//!
//! Jump-table patches are the binder's only externally observable mutation.
//! A failing exclusion predicate aborts the pass for the image; bindings made
//! before the failure stay valid (a partially patched image is surfaced to
//! the caller as a hard failure rather than recovered from).

use std::collections::BTreeSet;
use std::ops::Range;
use std::sync::Arc;

use crate::{
    arch::ArchInfo,
    loader::{ImportEntry, LoadedImage},
    models::{
        alloc, stubs::ReturnUnconstrained, stubs::STUB_LIBRARY, ModelCatalog, ModelConfig,
        ModelLibrary, ModelRegistry, ProcedureModel,
    },
    Error, Result,
};

/// Fixed aliasing of legacy library filenames onto their canonical
/// model-library names.
const LIBRARY_ALIASES: &[(&str, &str)] = &[
    ("libc.so.0", "libc.so.6"),
    ("ld-uClibc.so.0", "ld-uClibc.so.6"),
];

/// Which symbols to leave out of modeling.
///
/// A symbol is excluded when it appears in the name set or when the
/// predicate accepts it. The predicate is fallible; a predicate error
/// propagates out of the binder pass.
#[derive(Default)]
pub struct Exclusions {
    names: BTreeSet<String>,
    predicate: Option<Box<dyn Fn(&str) -> Result<bool> + Send + Sync>>,
}

impl Exclusions {
    /// No exclusions.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Excludes `symbol` by name.
    #[must_use]
    pub fn with_name(mut self, symbol: &str) -> Self {
        self.names.insert(symbol.to_string());
        self
    }

    /// Excludes every symbol the predicate accepts.
    #[must_use]
    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str) -> Result<bool> + Send + Sync + 'static,
    {
        self.predicate = Some(Box::new(predicate));
        self
    }

    /// Tests whether `symbol` is excluded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Exclusion`] if the predicate fails.
    pub fn is_excluded(&self, symbol: &str) -> Result<bool> {
        if self.names.contains(symbol) {
            return Ok(true);
        }
        match &self.predicate {
            Some(predicate) => predicate(symbol).map_err(|e| Error::Exclusion {
                symbol: symbol.to_string(),
                source: Box::new(e),
            }),
            None => Ok(false),
        }
    }
}

impl std::fmt::Debug for Exclusions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exclusions")
            .field("names", &self.names)
            .field("has_predicate", &self.predicate.is_some())
            .finish()
    }
}

/// What one binder pass did, per import symbol.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BindReport {
    /// Imports bound to a library model, with their synthetic addresses.
    pub modeled: Vec<(String, u64)>,
    /// Imports bound to the unconstrained-result fallback, with their
    /// synthetic addresses.
    pub fallback: Vec<(String, u64)>,
    /// Imports left to native execution (excluded or resolved in-range).
    pub native: Vec<String>,
}

impl BindReport {
    /// Total number of imports that received a binding.
    #[must_use]
    pub fn bound_count(&self) -> usize {
        self.modeled.len() + self.fallback.len()
    }
}

/// Binds a loaded image's imports to procedure models.
///
/// Created through [`Session::binder`](crate::session::Session::binder);
/// borrows the session's architecture, registry, and catalog for the
/// duration of the pass.
pub struct ImportBinder<'a> {
    arch: &'a ArchInfo,
    registry: &'a ModelRegistry,
    catalog: &'a ModelCatalog,
    exclusions: Exclusions,
    ignored: BTreeSet<String>,
    fallback: Arc<ReturnUnconstrained>,
}

impl<'a> ImportBinder<'a> {
    /// Creates a binder over the given session components.
    #[must_use]
    pub fn new(
        arch: &'a ArchInfo,
        registry: &'a ModelRegistry,
        catalog: &'a ModelCatalog,
        exclusions: Exclusions,
    ) -> Self {
        ImportBinder {
            arch,
            registry,
            catalog,
            exclusions,
            ignored: BTreeSet::new(),
            fallback: Arc::new(ReturnUnconstrained),
        }
    }

    /// Marks a routine as never stepped into natively: even when the loader
    /// resolved it to real code, it receives the unconstrained fallback.
    #[must_use]
    pub fn ignore_function(mut self, symbol: &str) -> Self {
        self.ignored.insert(symbol.to_string());
        self
    }

    /// Runs one binding pass over `image`.
    ///
    /// `loaded_ranges` are the address ranges of all loaded objects in the
    /// session, used to decide whether a resolved import actually points at
    /// reachable native code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Exclusion`] if the exclusion predicate fails,
    /// [`Error::Config`](crate::Error::Config) for an unusable architecture
    /// descriptor, and [`Error::Patch`](crate::Error::Patch) if the image
    /// refuses a jump-table patch. Registry bindings installed before the
    /// failure remain valid.
    pub fn bind_imports(
        &self,
        image: &mut dyn LoadedImage,
        loaded_ranges: &[Range<u64>],
    ) -> Result<BindReport> {
        let libraries = self.candidate_libraries(image);
        tracing::debug!(
            image = image.identity(),
            libraries = ?libraries.iter().map(|l| l.name()).collect::<Vec<_>>(),
            "binding imports"
        );

        let mut report = BindReport::default();

        // Partition the import set up front instead of removing entries
        // while iterating it.
        let mut matched: Vec<(ImportEntry, &ModelLibrary, Arc<dyn ProcedureModel>)> = Vec::new();
        let mut remaining: Vec<ImportEntry> = Vec::new();
        for entry in image.imports() {
            if self.exclusions.is_excluded(&entry.symbol)? {
                tracing::debug!(symbol = %entry.symbol, "import excluded from modeling");
                report.native.push(entry.symbol);
                continue;
            }
            match libraries
                .iter()
                .find_map(|lib| lib.get(&entry.symbol).map(|model| (*lib, model)))
            {
                Some((library, model)) => matched.push((entry, library, model)),
                None => remaining.push(entry),
            }
        }

        for (entry, library, model) in matched {
            let address =
                self.install(image, library.name(), &entry.symbol, model, ModelConfig::new())?;
            report.modeled.push((entry.symbol, address));
        }

        for entry in remaining {
            if let Some(target) = entry.resolved {
                let reachable = loaded_ranges.iter().any(|range| range.contains(&target));
                if reachable && !self.ignored.contains(&entry.symbol) {
                    tracing::debug!(
                        symbol = %entry.symbol,
                        target = format_args!("{target:#x}"),
                        "import resolves to native code; leaving unmodeled"
                    );
                    report.native.push(entry.symbol);
                    continue;
                }
            }

            tracing::debug!(symbol = %entry.symbol, "no model found; using unconstrained fallback");
            let config = ModelConfig::new().with_text("resolves", &entry.symbol);
            let address = self.install(
                image,
                STUB_LIBRARY,
                &entry.symbol,
                self.fallback.clone(),
                config,
            )?;
            report.fallback.push((entry.symbol, address));
        }

        Ok(report)
    }

    /// Allocates, binds, and patches one import.
    ///
    /// A model dependency is allocated and bound first so its address exists
    /// before the dependent configuration is frozen.
    fn install(
        &self,
        image: &mut dyn LoadedImage,
        library: &str,
        symbol: &str,
        model: Arc<dyn ProcedureModel>,
        mut config: ModelConfig,
    ) -> Result<u64> {
        if let Some(dependency) = model.dependency() {
            if config.address(dependency.config_key).is_none() {
                let dep_model = self
                    .catalog
                    .get(library)
                    .and_then(|lib| lib.get(dependency.symbol))
                    .ok_or_else(|| Error::Model {
                        model: model.name().to_string(),
                        message: format!(
                            "dependency '{}' has no model in library '{library}'",
                            dependency.symbol
                        ),
                    })?;
                let dep_address = alloc::allocate(library, dependency.symbol, self.arch)?;
                self.registry.bind(dep_address, dep_model, ModelConfig::new());
                config = config.with_address(dependency.config_key, dep_address);
            }
        }

        let address = alloc::allocate(library, symbol, self.arch)?;
        // On a collision the registry keeps the first binding and warns; the
        // patch still targets the shared address, where the surviving model
        // lives.
        let _ = self.registry.bind(address, model, config);
        image.patch_import(symbol, address)?;
        Ok(address)
    }

    /// Normalizes the image's dependency names and keeps those the catalog
    /// has models for, in stable sorted order.
    fn candidate_libraries(&self, image: &dyn LoadedImage) -> Vec<&ModelLibrary> {
        let mut names = BTreeSet::new();
        for name in image
            .dependencies()
            .into_iter()
            .chain(image.static_dependencies())
        {
            names.insert(normalize_library_name(&name));
        }

        let mut libraries = Vec::new();
        for name in names {
            match self.catalog.get(&name) {
                Some(library) => libraries.push(library),
                None => {
                    tracing::debug!(library = %name, "no procedure models for library");
                }
            }
        }
        libraries
    }
}

/// Reduces a dependency name to its basename and applies the fixed alias
/// table.
fn normalize_library_name(name: &str) -> String {
    let base = name.rsplit('/').next().unwrap_or(name);
    for (alias, canonical) in LIBRARY_ALIASES {
        if base == *alias {
            return (*canonical).to_string();
        }
    }
    base.to_string()
}
