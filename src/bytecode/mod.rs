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

//! Secondary front-end adapter for an object-bytecode instruction set.
//!
//! A structurally different front-end - an interpreter over managed-object
//! bytecode rather than native machine code - reuses the procedure-model and
//! dispatch pattern of the rest of the crate. Two pieces live here:
//!
//! - [`constants`]: the constant-materialization stage that turns literal
//!   operands (integers, wide integers, strings, class references, null)
//!   into abstract-state values;
//! - [`collection`]: procedure models implementing the indexable-collection
//!   and iterator protocol over managed heap objects.
//!
//! Both operate on the same [`ExecutionState`](crate::state::ExecutionState)
//! as the native path; the managed heap provides the object model.

pub mod collection;
pub mod constants;

pub use constants::{materialize, Literal};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{arch::ArchInfo, state::ExecutionState, value::AbstractValue};
    use std::sync::Arc;

    #[test]
    fn test_front_end_shares_state_representation() {
        // A literal materialized by the bytecode front-end is an ordinary
        // abstract value, visible to models on the native path.
        let mut state = ExecutionState::new(Arc::new(ArchInfo::amd64()), 0);
        let value = materialize(&mut state, &Literal::Int(42)).unwrap();
        state.reg_write("rax", value);
        assert!(matches!(
            state.reg_read("rax"),
            Some(AbstractValue::Bits(_))
        ));
    }
}
