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

//! Session handle.
//!
//! A [`Session`] owns the components that outlive any single step: the
//! architecture descriptor, the procedure registry, and the model catalog.
//! It is an explicit handle passed by the caller - there is no process-wide
//! session table, and reconstructing a session after deserialization means
//! rebuilding it from its configuration plus whatever handle the caller
//! kept, never consulting implicit global state.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use symflow::arch::ArchInfo;
//! use symflow::models::libc::libc_models;
//! use symflow::session::Session;
//!
//! let session = Session::builder()
//!     .arch(ArchInfo::amd64())
//!     .library(libc_models())
//!     .build()?;
//!
//! let state = session.new_state(0x40_0000);
//! assert_eq!(state.ip.eval().unwrap(), 0x40_0000);
//! # Ok::<(), symflow::Error>(())
//! ```

use std::sync::Arc;

use crate::{
    arch::ArchInfo,
    binder::{Exclusions, ImportBinder},
    dispatch::{Dispatcher, Lifter, SystemHandler},
    models::{alloc, BindOutcome, ModelCatalog, ModelConfig, ModelLibrary, ModelRegistry,
        ProcedureModel},
    state::ExecutionState,
    Result,
};

/// Where a user-supplied model should be installed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HookTarget {
    /// At an explicit address (real or synthetic).
    Address(u64),
    /// At the synthetic address derived for a `(library, symbol)` pair.
    Symbol {
        /// Library name fed to the allocator.
        library: String,
        /// Symbol name fed to the allocator.
        symbol: String,
    },
}

/// Builder for [`Session`].
#[derive(Default)]
pub struct SessionBuilder {
    arch: Option<ArchInfo>,
    libraries: Vec<ModelLibrary>,
}

impl SessionBuilder {
    /// Sets the architecture descriptor. Required.
    #[must_use]
    pub fn arch(mut self, arch: ArchInfo) -> Self {
        self.arch = Some(arch);
        self
    }

    /// Adds a model library to the catalog.
    #[must_use]
    pub fn library(mut self, library: ModelLibrary) -> Self {
        self.libraries.push(library);
        self
    }

    /// Builds the session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if no architecture
    /// descriptor was provided. Configuration errors are fatal and occur
    /// before any stepping.
    pub fn build(self) -> Result<Session> {
        let arch = self
            .arch
            .ok_or_else(|| config_error!("session requires an architecture descriptor"))?;

        let mut catalog = ModelCatalog::new();
        for library in self.libraries {
            catalog.insert(library);
        }

        Ok(Session {
            arch: Arc::new(arch),
            registry: Arc::new(ModelRegistry::new()),
            catalog,
        })
    }
}

/// An analysis session: architecture, procedure registry, model catalog.
///
/// The registry and allocator are populated during binder setup and are
/// read-only afterwards, so any number of exploration workers may share one
/// session and step independent states concurrently.
pub struct Session {
    arch: Arc<ArchInfo>,
    registry: Arc<ModelRegistry>,
    catalog: ModelCatalog,
}

impl Session {
    /// Starts building a session.
    #[must_use]
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    /// The architecture descriptor.
    #[must_use]
    pub fn arch(&self) -> &Arc<ArchInfo> {
        &self.arch
    }

    /// The procedure registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// The model catalog.
    #[must_use]
    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    /// Creates an import binder over this session's components.
    #[must_use]
    pub fn binder(&self, exclusions: Exclusions) -> ImportBinder<'_> {
        ImportBinder::new(&self.arch, &self.registry, &self.catalog, exclusions)
    }

    /// Creates a dispatcher over this session's components and the given
    /// external collaborators.
    #[must_use]
    pub fn dispatcher(
        &self,
        lifter: Arc<dyn Lifter>,
        system: Arc<dyn SystemHandler>,
    ) -> Dispatcher {
        Dispatcher::new(
            Arc::clone(&self.arch),
            Arc::clone(&self.registry),
            lifter,
            system,
        )
    }

    /// Creates a fresh execution state positioned at `entry`.
    #[must_use]
    pub fn new_state(&self, entry: u64) -> ExecutionState {
        ExecutionState::new(Arc::clone(&self.arch), entry)
    }

    /// Installs a user-supplied model at the given target.
    ///
    /// Uses the registry's non-overwrite semantics: installing at an address
    /// that already holds a different model type is refused with a warning
    /// and [`BindOutcome::Rejected`]; the first binding wins.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if a synthetic
    /// address cannot be derived for a symbol target.
    pub fn install_model(
        &self,
        target: HookTarget,
        model: Arc<dyn ProcedureModel>,
        config: ModelConfig,
    ) -> Result<(u64, BindOutcome)> {
        let address = match target {
            HookTarget::Address(address) => address,
            HookTarget::Symbol { library, symbol } => {
                alloc::allocate(&library, &symbol, &self.arch)?
            }
        };
        let outcome = self.registry.bind(address, model, config);
        Ok((address, outcome))
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("arch", &self.arch.name())
            .field("bindings", &self.registry.len())
            .finish()
    }
}
