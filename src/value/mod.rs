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

//! Abstract runtime values.
//!
//! This module is the dispatch core's view of the constraint/value layer: it
//! provides construction of concrete and symbolic integers, booleans, and
//! strings of specified bit widths, and evaluation of a value to a concrete
//! integer where a control decision requires one (alignment checks, iterator
//! bounds comparisons).
//!
//! The representations here are deliberately minimal. A full solver backend
//! would replace [`BitVec`] and [`BoolValue`] with expression trees; the
//! dispatch core only relies on the surface exposed here.

use std::fmt;

use crate::{Error, Result};

/// A fixed-width integer value, either concrete or symbolic.
///
/// Symbolic values carry only the name of the variable they stand for; the
/// constraint layer owns whatever structure hangs off that name.
///
/// # Examples
///
/// ```rust
/// use symflow::value::BitVec;
///
/// let c = BitVec::concrete(0x41, 32);
/// assert_eq!(c.eval().unwrap(), 0x41);
///
/// let s = BitVec::symbolic("argc", 32);
/// assert!(s.is_symbolic());
/// assert!(s.eval().is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitVec {
    bits: u32,
    kind: BitVecKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum BitVecKind {
    Concrete(u64),
    Symbolic(String),
}

impl BitVec {
    /// Creates a concrete value, masked to `bits`.
    #[must_use]
    pub fn concrete(value: u64, bits: u32) -> Self {
        let masked = if bits >= 64 {
            value
        } else {
            value & ((1u64 << bits) - 1)
        };
        BitVec {
            bits,
            kind: BitVecKind::Concrete(masked),
        }
    }

    /// Creates a symbolic value named `name`.
    #[must_use]
    pub fn symbolic(name: impl Into<String>, bits: u32) -> Self {
        BitVec {
            bits,
            kind: BitVecKind::Symbolic(name.into()),
        }
    }

    /// Width of the value in bits.
    #[must_use]
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Returns `true` if the value is symbolic.
    #[must_use]
    pub fn is_symbolic(&self) -> bool {
        matches!(self.kind, BitVecKind::Symbolic(_))
    }

    /// The concrete value, if there is one.
    #[must_use]
    pub fn as_concrete(&self) -> Option<u64> {
        match self.kind {
            BitVecKind::Concrete(v) => Some(v),
            BitVecKind::Symbolic(_) => None,
        }
    }

    /// The symbolic variable name, if the value is symbolic.
    #[must_use]
    pub fn symbol(&self) -> Option<&str> {
        match &self.kind {
            BitVecKind::Symbolic(name) => Some(name),
            BitVecKind::Concrete(_) => None,
        }
    }

    /// Evaluates to a concrete integer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SymbolicValue`] if the value is symbolic.
    pub fn eval(&self) -> Result<u64> {
        self.eval_as("integer")
    }

    /// Evaluates to a concrete integer, naming `context` in the error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SymbolicValue`] if the value is symbolic.
    pub fn eval_as(&self, context: &str) -> Result<u64> {
        match &self.kind {
            BitVecKind::Concrete(v) => Ok(*v),
            BitVecKind::Symbolic(_) => Err(Error::SymbolicValue {
                context: context.to_string(),
            }),
        }
    }
}

impl fmt::Display for BitVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            BitVecKind::Concrete(v) => write!(f, "{:#x}[{}]", v, self.bits),
            BitVecKind::Symbolic(name) => write!(f, "<{}>[{}]", name, self.bits),
        }
    }
}

/// A boolean value, either concrete or symbolic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BoolValue {
    /// A known truth value.
    Concrete(bool),
    /// An unknown truth value, named for the constraint layer.
    Symbolic(String),
}

impl BoolValue {
    /// Returns `true` if the value is symbolic.
    #[must_use]
    pub fn is_symbolic(&self) -> bool {
        matches!(self, BoolValue::Symbolic(_))
    }

    /// The concrete truth value, if there is one.
    #[must_use]
    pub fn as_concrete(&self) -> Option<bool> {
        match self {
            BoolValue::Concrete(b) => Some(*b),
            BoolValue::Symbolic(_) => None,
        }
    }
}

/// Reference to an object on the managed heap.
///
/// References are plain identifiers; the heap that issued them resolves them.
/// Two references are aliases exactly when their identifiers are equal, which
/// is what makes the boxed-string semantics of constant materialization
/// observable (distinct materializations yield distinct identifiers).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HeapRef(u64);

impl HeapRef {
    /// Creates a reference with the given identifier.
    #[must_use]
    pub fn new(id: u64) -> Self {
        HeapRef(id)
    }

    /// The reference identifier.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for HeapRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ref#{}", self.0)
    }
}

/// Any value the abstract machine can hold.
///
/// This covers machine registers and memory (bitvectors), path predicates
/// (booleans), and the managed-heap value kinds the secondary front-end
/// needs: strings, class references, heap references, and the canonical
/// null reference.
#[derive(Clone, Debug, PartialEq)]
pub enum AbstractValue {
    /// A fixed-width integer, concrete or symbolic.
    Bits(BitVec),
    /// A boolean, concrete or symbolic.
    Bool(BoolValue),
    /// An unboxed string value. Constant materialization never produces this
    /// directly; string literals go through a [`HeapRef`] indirection.
    Str(String),
    /// A class reference by canonical dotted name.
    Class(String),
    /// A reference into the managed heap.
    Ref(HeapRef),
    /// The canonical null reference.
    Null,
}

impl AbstractValue {
    /// Short name of the variant, used in type-mismatch diagnostics.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            AbstractValue::Bits(_) => "bits",
            AbstractValue::Bool(_) => "bool",
            AbstractValue::Str(_) => "string",
            AbstractValue::Class(_) => "class",
            AbstractValue::Ref(_) => "reference",
            AbstractValue::Null => "null",
        }
    }

    /// Borrows the bitvector payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] for any other variant.
    pub fn as_bits(&self) -> Result<&BitVec> {
        match self {
            AbstractValue::Bits(bv) => Ok(bv),
            other => Err(Error::TypeMismatch {
                expected: "bits",
                found: other.kind_name(),
            }),
        }
    }

    /// Borrows the heap reference payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] for any other variant.
    pub fn as_ref_value(&self) -> Result<HeapRef> {
        match self {
            AbstractValue::Ref(r) => Ok(*r),
            other => Err(Error::TypeMismatch {
                expected: "reference",
                found: other.kind_name(),
            }),
        }
    }
}

impl From<BitVec> for AbstractValue {
    fn from(bv: BitVec) -> Self {
        AbstractValue::Bits(bv)
    }
}

impl From<BoolValue> for AbstractValue {
    fn from(b: BoolValue) -> Self {
        AbstractValue::Bool(b)
    }
}

impl From<HeapRef> for AbstractValue {
    fn from(r: HeapRef) -> Self {
        AbstractValue::Ref(r)
    }
}
