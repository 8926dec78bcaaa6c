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

//! Collection and iterator procedure models.
//!
//! The indexable-collection abstraction is a managed heap object with three
//! fields: [`SIZE_FIELD`] (element count), [`ELEMS_FIELD`] (reference to the
//! element array), and [`INDEX_FIELD`] (cursor position). The two iterator
//! models take the collection reference from call-argument slot 0:
//!
//! - [`IteratorHasNext`] compares cursor against size and returns a
//!   concrete-or-symbolic boolean;
//! - [`IteratorNext`] loads the element at the cursor, advances the cursor
//!   by one, and returns the element. Out-of-range reads fail closed with
//!   [`Error::IndexOutOfBounds`](crate::Error::IndexOutOfBounds).

use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    models::{ModelConfig, ModelLibrary, ProcedureModel},
    state::{ExecutionState, HeapValue, TransferKind},
    value::{AbstractValue, BitVec, BoolValue, HeapRef},
    Error, Result,
};

/// Field holding the collection's element count.
pub const SIZE_FIELD: &str = "size";
/// Field holding the reference to the element array.
pub const ELEMS_FIELD: &str = "elems";
/// Field holding the iterator cursor.
pub const INDEX_FIELD: &str = "index";

/// Allocates a collection object holding `elements`, with the cursor at 0.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use symflow::arch::ArchInfo;
/// use symflow::bytecode::collection::new_collection;
/// use symflow::state::ExecutionState;
/// use symflow::value::AbstractValue;
///
/// let mut state = ExecutionState::new(Arc::new(ArchInfo::amd64()), 0);
/// let collection = new_collection(&mut state, vec![AbstractValue::Null]);
/// assert!(state.heap().load_field(collection, "size").is_ok());
/// ```
pub fn new_collection(state: &mut ExecutionState, elements: Vec<AbstractValue>) -> HeapRef {
    let size = elements.len() as u64;
    let elems_ref = state.heap_mut().alloc(HeapValue::Array(elements));

    let mut fields = HashMap::new();
    fields.insert(
        SIZE_FIELD.to_string(),
        AbstractValue::Bits(BitVec::concrete(size, 32)),
    );
    fields.insert(ELEMS_FIELD.to_string(), AbstractValue::Ref(elems_ref));
    fields.insert(
        INDEX_FIELD.to_string(),
        AbstractValue::Bits(BitVec::concrete(0, 32)),
    );
    state.heap_mut().alloc(HeapValue::Object(fields))
}

/// Reads the collection reference from call-argument slot 0.
fn this_ref(state: &ExecutionState, model: &str) -> Result<HeapRef> {
    state.arg(0, model)?.as_ref_value()
}

/// `hasNext`: returns whether the cursor is before the end.
///
/// When both the cursor and the size are concrete the result is a concrete
/// boolean; otherwise a fresh symbolic boolean is returned and the
/// constraint layer decides.
pub struct IteratorHasNext;

impl ProcedureModel for IteratorHasNext {
    fn name(&self) -> &'static str {
        "IteratorHasNext"
    }

    fn execute(
        &self,
        state: &mut ExecutionState,
        _config: &ModelConfig,
    ) -> Result<Option<AbstractValue>> {
        let this = this_ref(state, self.name())?;
        let size = state.heap().load_field(this, SIZE_FIELD)?;
        let index = state.heap().load_field(this, INDEX_FIELD)?;

        let result = match (
            index.as_bits()?.as_concrete(),
            size.as_bits()?.as_concrete(),
        ) {
            (Some(index), Some(size)) => BoolValue::Concrete(index < size),
            _ => BoolValue::Symbolic(state.fresh_symbol("has_next")),
        };

        state.transfer_kind = TransferKind::Return;
        Ok(Some(AbstractValue::Bool(result)))
    }
}

/// `next`: loads the element at the cursor and advances the cursor.
///
/// The read fails closed: a cursor at or past the size field raises
/// [`Error::IndexOutOfBounds`](crate::Error::IndexOutOfBounds) instead of
/// reading past the end of the element array.
pub struct IteratorNext;

impl ProcedureModel for IteratorNext {
    fn name(&self) -> &'static str {
        "IteratorNext"
    }

    fn execute(
        &self,
        state: &mut ExecutionState,
        _config: &ModelConfig,
    ) -> Result<Option<AbstractValue>> {
        let this = this_ref(state, self.name())?;
        let elems = state
            .heap()
            .load_field(this, ELEMS_FIELD)?
            .as_ref_value()?;
        let index = state
            .heap()
            .load_field(this, INDEX_FIELD)?
            .as_bits()?
            .eval_as("iterator index")?;
        let size = state
            .heap()
            .load_field(this, SIZE_FIELD)?
            .as_bits()?
            .eval_as("collection size")?;

        if index >= size {
            return Err(Error::IndexOutOfBounds { index, size });
        }

        let element = state.heap().load_element(elems, index)?;
        state.heap_mut().store_field(
            this,
            INDEX_FIELD,
            AbstractValue::Bits(BitVec::concrete(index + 1, 32)),
        )?;

        state.transfer_kind = TransferKind::Return;
        Ok(Some(element))
    }
}

/// The built-in collection model library.
#[must_use]
pub fn collection_models() -> ModelLibrary {
    ModelLibrary::new("collections")
        .with_model("hasNext", Arc::new(IteratorHasNext))
        .with_model("next", Arc::new(IteratorNext))
}
