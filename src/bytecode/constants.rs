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

//! Constant materialization.
//!
//! Literal operands arrive from the bytecode front-end in textual or numeric
//! source form and must become abstract-state values before the interpreter
//! can use them:
//!
//! - integers and wide integers become concrete 32/64-bit bitvectors;
//! - string literals are unescaped (surrounding quotes stripped) and stored
//!   *behind a fresh heap reference*, never inlined, so later aliasing and
//!   identity comparisons behave like boxed strings - two materializations
//!   of the identical literal text yield distinct references;
//! - class references are parsed from their internal-name form
//!   (`class "L<path>;"`, `/`-separated) into a canonical dotted name;
//! - null becomes the canonical null reference.

use crate::{
    state::{ExecutionState, HeapValue},
    value::{AbstractValue, BitVec},
    Error, Result,
};

/// Prefix marker of the internal class-reference encoding.
const CLASS_PREFIX: &str = "class \"L";
/// Suffix marker of the internal class-reference encoding.
const CLASS_SUFFIX: &str = ";\"";
/// Path separator of the internal class-reference encoding.
const PATH_SEPARATOR: char = '/';

/// A literal operand as it appears in source bytecode.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    /// A 32-bit integer constant.
    Int(i32),
    /// A 64-bit (wide) integer constant.
    Long(i64),
    /// A string constant, still carrying its surrounding quotes.
    Str(String),
    /// A class-reference constant in internal-name form.
    Class(String),
    /// The null constant.
    Null,
}

/// Converts a literal operand into an abstract-state value.
///
/// # Errors
///
/// Returns [`Error::MalformedConstant`] if a class-reference constant does
/// not follow the `class "L<path>;"` encoding.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use symflow::arch::ArchInfo;
/// use symflow::bytecode::{materialize, Literal};
/// use symflow::state::{ExecutionState, HeapValue};
/// use symflow::value::AbstractValue;
///
/// let mut state = ExecutionState::new(Arc::new(ArchInfo::amd64()), 0);
///
/// let value = materialize(&mut state, &Literal::Str("\"hello\"".into())).unwrap();
/// let reference = value.as_ref_value().unwrap();
/// assert_eq!(
///     state.heap().get(reference).unwrap(),
///     &HeapValue::Str("hello".into())
/// );
///
/// let class = materialize(&mut state, &Literal::Class("class \"Ljava/lang/String;\"".into()));
/// assert_eq!(class.unwrap(), AbstractValue::Class("java.lang.String".into()));
/// ```
pub fn materialize(state: &mut ExecutionState, literal: &Literal) -> Result<AbstractValue> {
    match literal {
        Literal::Int(value) => Ok(AbstractValue::Bits(BitVec::concrete(
            u64::from(*value as u32),
            32,
        ))),
        Literal::Long(value) => Ok(AbstractValue::Bits(BitVec::concrete(*value as u64, 64))),
        Literal::Str(raw) => {
            // Strip the quotes the front-end wraps around string constants,
            // then box the value behind a fresh reference.
            let text = raw.trim_matches('"').to_string();
            let reference = state.heap_mut().alloc(HeapValue::Str(text));
            Ok(AbstractValue::Ref(reference))
        }
        Literal::Class(raw) => parse_class_constant(raw).map(AbstractValue::Class),
        Literal::Null => Ok(AbstractValue::Null),
    }
}

/// Parses the internal-name form of a class constant into a dotted name.
fn parse_class_constant(raw: &str) -> Result<String> {
    let inner = raw
        .strip_prefix(CLASS_PREFIX)
        .and_then(|rest| rest.strip_suffix(CLASS_SUFFIX))
        .ok_or_else(|| {
            Error::MalformedConstant(format!(
                "class constant '{raw}' does not match {CLASS_PREFIX}...{CLASS_SUFFIX}"
            ))
        })?;
    if inner.is_empty() {
        return Err(Error::MalformedConstant(format!(
            "class constant '{raw}' has an empty name"
        )));
    }
    Ok(inner.replace(PATH_SEPARATOR, "."))
}
