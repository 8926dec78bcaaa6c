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

//! Generic fallback models.

use crate::{
    models::{ModelConfig, ProcedureModel},
    state::{ExecutionState, TransferKind},
    value::{AbstractValue, BitVec},
    Result,
};

/// Library name fallback stubs are allocated under.
///
/// Part of the allocator input, so it determines the synthetic addresses of
/// all fallback bindings.
pub const STUB_LIBRARY: &str = "stubs";

/// Returns an unconstrained result and returns to the caller.
///
/// This is the designed degraded behavior for an import with no matching
/// model and no reachable native code: rather than fabricating code paths,
/// the call produces a fresh symbolic value in the return-value register so
/// exploration can continue past the unknown routine. Not an error; logged
/// at debug level only.
///
/// The `resolves` config entry records which import the stub stands in for;
/// it names the symbolic value, keeping results from different unmatched
/// imports distinguishable.
pub struct ReturnUnconstrained;

impl ProcedureModel for ReturnUnconstrained {
    fn name(&self) -> &'static str {
        "ReturnUnconstrained"
    }

    fn execute(
        &self,
        state: &mut ExecutionState,
        config: &ModelConfig,
    ) -> Result<Option<AbstractValue>> {
        let resolves = config.text("resolves").unwrap_or("unknown").to_string();
        tracing::debug!(resolves = %resolves, "returning unconstrained result for unmodeled call");

        let name = state.fresh_symbol(&format!("unconstrained_{resolves}"));
        let value = BitVec::symbolic(name, state.arch().bits());
        let return_reg = state.arch().return_reg();
        state.reg_write(return_reg, AbstractValue::Bits(value.clone()));
        state.transfer_kind = TransferKind::Return;
        Ok(Some(AbstractValue::Bits(value)))
    }
}
