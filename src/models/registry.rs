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

//! Address → procedure model registry.

use std::sync::{Arc, Mutex};

use dashmap::DashMap;

use crate::models::{ModelConfig, ProcedureModel};

/// An installed procedure model plus its configuration.
///
/// Bindings are immutable once installed; the registry hands out clones
/// (cheap, the model is an `Arc`).
#[derive(Clone)]
pub struct ModelBinding {
    /// The installed model.
    pub model: Arc<dyn ProcedureModel>,
    /// The configuration frozen at bind time.
    pub config: ModelConfig,
}

impl std::fmt::Debug for ModelBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBinding")
            .field("model", &self.model.name())
            .field("config", &self.config)
            .finish()
    }
}

/// Result of a [`ModelRegistry::bind`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindOutcome {
    /// The binding was installed.
    Installed,
    /// The address already held a binding of the same model type; the
    /// original binding (and its configuration) stays in place.
    AlreadyBound,
    /// The address already held a *different* model type. The new binding
    /// was refused and a warning emitted; the first binding wins.
    Rejected,
}

/// Maps addresses (real or synthetic) to installed procedure models.
///
/// Queried on every dispatch step, so reads go through lock-free `DashMap`
/// shards: after binder setup the registry is effectively immutable and any
/// number of independently advancing execution states may consult it
/// concurrently. Writes are serialized by a single gate because the
/// "never silently overwrite a different model" invariant requires an atomic
/// check-then-insert.
///
/// A reverse index (model name → first bound address) is maintained
/// alongside the forward map so [`find_address_of`](Self::find_address_of)
/// is a lookup, not a scan over all bindings.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use symflow::models::{BindOutcome, ModelConfig, ModelRegistry};
/// use symflow::models::stubs::ReturnUnconstrained;
///
/// let registry = ModelRegistry::new();
/// let outcome = registry.bind(0x4000, Arc::new(ReturnUnconstrained), ModelConfig::new());
/// assert_eq!(outcome, BindOutcome::Installed);
/// assert!(registry.is_bound(0x4000));
/// assert_eq!(registry.find_address_of("ReturnUnconstrained"), Some(0x4000));
/// ```
#[derive(Default)]
pub struct ModelRegistry {
    bindings: DashMap<u64, ModelBinding>,
    by_model: DashMap<&'static str, u64>,
    bind_gate: Mutex<()>,
}

impl ModelRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `model` at `address` with `config`.
    ///
    /// Idempotent for the same model type: rebinding an address to the model
    /// type it already holds is a no-op returning
    /// [`BindOutcome::AlreadyBound`]. Rebinding to a different model type is
    /// refused with a warning ([`BindOutcome::Rejected`]); this is how hash
    /// collisions between distinct `(library, symbol)` pairs surface, and
    /// the previously registered model wins.
    pub fn bind(
        &self,
        address: u64,
        model: Arc<dyn ProcedureModel>,
        config: ModelConfig,
    ) -> BindOutcome {
        let _gate = lock!(self.bind_gate);

        if let Some(existing) = self.bindings.get(&address) {
            if existing.model.name() == model.name() {
                return BindOutcome::AlreadyBound;
            }
            tracing::warn!(
                address = format_args!("{address:#x}"),
                existing = existing.model.name(),
                rejected = model.name(),
                "address already bound to a different model; keeping the first binding"
            );
            return BindOutcome::Rejected;
        }

        self.by_model.entry(model.name()).or_insert(address);
        tracing::debug!(
            address = format_args!("{address:#x}"),
            model = model.name(),
            "installing procedure model"
        );
        self.bindings.insert(address, ModelBinding { model, config });
        BindOutcome::Installed
    }

    /// Looks up the binding at `address`.
    #[must_use]
    pub fn lookup(&self, address: u64) -> Option<ModelBinding> {
        self.bindings.get(&address).map(|b| b.clone())
    }

    /// Returns `true` if a model is installed at `address`.
    #[must_use]
    pub fn is_bound(&self, address: u64) -> bool {
        self.bindings.contains_key(&address)
    }

    /// Reverse lookup: the address at which a model type was first bound.
    ///
    /// Used for introspection and debugging (e.g. setting a breakpoint on a
    /// model by name).
    #[must_use]
    pub fn find_address_of(&self, model_name: &str) -> Option<u64> {
        self.by_model.get(model_name).map(|a| *a)
    }

    /// Number of installed bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns `true` if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// The currently bound addresses, in no particular order.
    #[must_use]
    pub fn addresses(&self) -> Vec<u64> {
        self.bindings.iter().map(|e| *e.key()).collect()
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("binding_count", &self.bindings.len())
            .finish()
    }
}
