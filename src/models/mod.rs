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

//! Procedure models and the machinery that makes them addressable.
//!
//! A [`ProcedureModel`] is a hand-written behavioral summary of a routine: it
//! reads and writes the abstract machine state directly instead of being
//! derived from the routine's instructions. Models are installed at
//! *synthetic addresses* - integers derived deterministically from a
//! `(library, symbol)` pair by [`alloc::allocate`] that do not correspond to
//! any loaded code byte - and looked up on every dispatch step through the
//! [`ModelRegistry`].
//!
//! # Components
//!
//! - [`ProcedureModel`] - the behavioral-summary trait
//! - [`ModelConfig`] - per-binding configuration parameters
//! - [`ModelLibrary`] / [`ModelCatalog`] - named collections of models,
//!   searched by the import binder
//! - [`ModelRegistry`] - address → model bindings with non-overwrite
//!   semantics and a reverse index
//! - [`alloc`] - the synthetic address allocator
//! - [`libc`] / [`stubs`] - built-in model families
//!
//! # Binding Lifecycle
//!
//! Bindings are created during binder setup (or by explicit hook
//! installation), live for the whole session, and are never mutated in
//! place. Rebinding an address to a *different* model type is refused with
//! a warning; the first binding wins.

pub mod alloc;
pub mod libc;
mod registry;
pub mod stubs;

pub use registry::{BindOutcome, ModelBinding, ModelRegistry};

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{
    state::ExecutionState,
    value::AbstractValue,
    Result,
};

/// A routine dependency a procedure model needs resolved before its binding
/// is frozen.
///
/// Some modeled routines must be able to branch to *another* modeled routine
/// when they complete; the classic case is a C runtime startup routine that
/// must transfer to the process-exit routine once the user program returns.
/// The dependency's synthetic address has to exist before the dependent
/// model's configuration is installed, so the binder allocates and binds the
/// dependency first and threads its address through the named config key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelDependency {
    /// Symbol of the routine this model branches to, looked up in the same
    /// model library as the dependent model.
    pub symbol: &'static str,
    /// Config key under which the allocated address is threaded into the
    /// dependent model's configuration.
    pub config_key: &'static str,
}

/// A behavioral summary of a routine, executed instead of its instructions.
///
/// Implementations must be stateless: all mutable state lives in the
/// [`ExecutionState`] passed to [`execute`](ProcedureModel::execute), and the
/// same model instance may be invoked concurrently from independently
/// advancing states.
///
/// # Errors
///
/// An error raised inside a model is never swallowed by the dispatcher; it
/// propagates to the caller of `step`, because a failing modeled routine
/// indicates either a semantic gap in the model or a genuine defect in the
/// program under analysis.
pub trait ProcedureModel: Send + Sync {
    /// Stable name of the model type. Used for registry identity (two
    /// bindings are "the same model" exactly when their names match) and for
    /// the reverse address lookup.
    fn name(&self) -> &'static str;

    /// Runs the summary against `state` with the binding's configuration.
    ///
    /// Returns the routine's result value, if it produces one.
    fn execute(
        &self,
        state: &mut ExecutionState,
        config: &ModelConfig,
    ) -> Result<Option<AbstractValue>>;

    /// The dependency that must be allocated and bound before this model's
    /// configuration is frozen, if any.
    fn dependency(&self) -> Option<ModelDependency> {
        None
    }
}

/// A configuration parameter value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigValue {
    /// An address in the machine's address space.
    Address(u64),
    /// A plain integer.
    Integer(u64),
    /// A text parameter.
    Text(String),
}

/// Configuration parameters of a procedure model binding.
///
/// Built once, bound with the model, and never mutated afterwards.
///
/// # Examples
///
/// ```rust
/// use symflow::models::ModelConfig;
///
/// let config = ModelConfig::new()
///     .with_address("exit_addr", 0xdead_0000)
///     .with_text("resolves", "strlen");
///
/// assert_eq!(config.address("exit_addr"), Some(0xdead_0000));
/// assert_eq!(config.text("resolves"), Some("strlen"));
/// assert_eq!(config.address("missing"), None);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModelConfig {
    entries: BTreeMap<String, ConfigValue>,
}

impl ModelConfig {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an address parameter.
    #[must_use]
    pub fn with_address(mut self, key: &str, address: u64) -> Self {
        self.entries
            .insert(key.to_string(), ConfigValue::Address(address));
        self
    }

    /// Adds an integer parameter.
    #[must_use]
    pub fn with_integer(mut self, key: &str, value: u64) -> Self {
        self.entries
            .insert(key.to_string(), ConfigValue::Integer(value));
        self
    }

    /// Adds a text parameter.
    #[must_use]
    pub fn with_text(mut self, key: &str, value: &str) -> Self {
        self.entries
            .insert(key.to_string(), ConfigValue::Text(value.to_string()));
        self
    }

    /// Reads an address parameter.
    #[must_use]
    pub fn address(&self, key: &str) -> Option<u64> {
        match self.entries.get(key) {
            Some(ConfigValue::Address(a)) => Some(*a),
            _ => None,
        }
    }

    /// Reads an integer parameter.
    #[must_use]
    pub fn integer(&self, key: &str) -> Option<u64> {
        match self.entries.get(key) {
            Some(ConfigValue::Integer(v)) => Some(*v),
            _ => None,
        }
    }

    /// Reads a text parameter.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.entries.get(key) {
            Some(ConfigValue::Text(t)) => Some(t),
            _ => None,
        }
    }

    /// Returns `true` if no parameters are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A named collection of procedure models for one library.
///
/// The name is the canonical library filename the import binder matches
/// dependency names against (e.g. `libc.so.6`).
pub struct ModelLibrary {
    name: String,
    models: BTreeMap<&'static str, Arc<dyn ProcedureModel>>,
}

impl ModelLibrary {
    /// Creates an empty library named `name`.
    #[must_use]
    pub fn new(name: &str) -> Self {
        ModelLibrary {
            name: name.to_string(),
            models: BTreeMap::new(),
        }
    }

    /// Adds a model under the exact symbol name imports resolve against.
    #[must_use]
    pub fn with_model(mut self, symbol: &'static str, model: Arc<dyn ProcedureModel>) -> Self {
        self.models.insert(symbol, model);
        self
    }

    /// The canonical library name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up the model registered under `symbol`.
    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<Arc<dyn ProcedureModel>> {
        self.models.get(symbol).cloned()
    }

    /// Returns `true` if a model is registered under `symbol`.
    #[must_use]
    pub fn contains(&self, symbol: &str) -> bool {
        self.models.contains_key(symbol)
    }

    /// The symbols this library provides models for.
    pub fn symbols(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.models.keys().copied()
    }
}

impl std::fmt::Debug for ModelLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelLibrary")
            .field("name", &self.name)
            .field("model_count", &self.models.len())
            .finish()
    }
}

/// The set of known model libraries, searched by the import binder.
///
/// Libraries are kept in a sorted map so binder iteration over candidates is
/// stable across runs; together with the allocator's determinism this makes
/// the whole binding pass reproducible.
#[derive(Debug, Default)]
pub struct ModelCatalog {
    libraries: BTreeMap<String, ModelLibrary>,
}

impl ModelCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a library, replacing any previous library of the same name.
    pub fn insert(&mut self, library: ModelLibrary) {
        self.libraries.insert(library.name().to_string(), library);
    }

    /// Looks up a library by canonical name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ModelLibrary> {
        self.libraries.get(name)
    }

    /// Returns `true` if a library of that name is known.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.libraries.contains_key(name)
    }

    /// The known library names, in stable sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.libraries.keys().map(String::as_str)
    }
}
