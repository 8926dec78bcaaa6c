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

//! C runtime procedure models.
//!
//! A small family of behavioral summaries for the libc routines the dispatch
//! core needs end-to-end: process startup, process exit, and the dependency
//! threading between them. [`libc_models`] packages them as the
//! `libc.so.6` model library for the import binder.

use std::sync::Arc;

use crate::{
    models::{ModelConfig, ModelDependency, ModelLibrary, ProcedureModel},
    state::{ExecutionState, StateFlags, TransferKind},
    value::{AbstractValue, BitVec},
    Error, Result,
};

/// Config key through which [`LibcStartMain`] receives the address of the
/// process-exit model.
pub const EXIT_ADDR_KEY: &str = "exit_addr";

/// Terminates the current path.
///
/// Sets [`StateFlags::TERMINATED`]; the exploration driver decides what a
/// terminated path means (usually: stop stepping it).
pub struct Exit;

impl ProcedureModel for Exit {
    fn name(&self) -> &'static str {
        "Exit"
    }

    fn execute(
        &self,
        state: &mut ExecutionState,
        _config: &ModelConfig,
    ) -> Result<Option<AbstractValue>> {
        state.flags |= StateFlags::TERMINATED;
        Ok(None)
    }
}

/// Models `__libc_start_main`: transfers control to the user program's main
/// routine, arranging for the process-exit routine to run when it returns.
///
/// The exit routine is itself a procedure model, so its synthetic address
/// must exist *before* this model's configuration is frozen - declared via
/// [`ProcedureModel::dependency`] and resolved by the import binder, which
/// allocates and binds the `exit` model first and threads its address in
/// under [`EXIT_ADDR_KEY`].
///
/// The main routine's address is taken from call-argument slot 0 and must be
/// concrete.
pub struct LibcStartMain;

impl ProcedureModel for LibcStartMain {
    fn name(&self) -> &'static str {
        "LibcStartMain"
    }

    fn execute(
        &self,
        state: &mut ExecutionState,
        config: &ModelConfig,
    ) -> Result<Option<AbstractValue>> {
        let exit_addr = config.address(EXIT_ADDR_KEY).ok_or_else(|| Error::Model {
            model: self.name().to_string(),
            message: format!("missing '{EXIT_ADDR_KEY}' configuration"),
        })?;

        let main_addr = state
            .arg(0, self.name())?
            .as_bits()?
            .eval_as("main routine address")?;

        let bits = state.arch().bits();
        // Architectures without a link register get the return target in a
        // pseudo-register the exploration driver's call setup consumes.
        let link_reg = state.arch().link_reg().unwrap_or("ret_addr");
        state.reg_write(link_reg, AbstractValue::Bits(BitVec::concrete(exit_addr, bits)));

        state.set_ip(main_addr);
        state.transfer_kind = TransferKind::Call;
        Ok(None)
    }

    fn dependency(&self) -> Option<ModelDependency> {
        Some(ModelDependency {
            symbol: "exit",
            config_key: EXIT_ADDR_KEY,
        })
    }
}

/// The built-in `libc.so.6` model library.
#[must_use]
pub fn libc_models() -> ModelLibrary {
    ModelLibrary::new("libc.so.6")
        .with_model("exit", Arc::new(Exit))
        .with_model("__libc_start_main", Arc::new(LibcStartMain))
}
