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

//! Mutable abstract machine state.
//!
//! An [`ExecutionState`] holds everything that varies along one exploration
//! path: the instruction pointer, the pending transfer-of-control kind,
//! registers, abstract memory, the managed heap, call arguments, and path
//! constraints. The exploration driver owns the state's lifecycle (creation,
//! forking, disposal); the dispatcher and procedure models only read and
//! write through it, which keeps every dispatch step stateless and
//! replayable.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use bitflags::bitflags;
use strum::Display;

use crate::{
    arch::ArchInfo,
    value::{AbstractValue, BitVec, BoolValue, HeapRef},
    Error, Result,
};

/// Kind of the pending transfer of control at the current step.
///
/// Mirrors the jump kinds reported by the lifter. The dispatcher routes the
/// faulting kinds (everything [`needs_system_handler`](TransferKind::needs_system_handler)
/// accepts) to the system handler before consulting the procedure registry.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum TransferKind {
    /// Ordinary fall-through or unconditional branch.
    Fallthrough,
    /// A call into a routine.
    Call,
    /// A return from a routine.
    Return,
    /// A system call is pending.
    Syscall,
    /// The emulation layer could not continue (e.g. unsupported instruction).
    EmulationFault,
    /// The bytes at the instruction pointer did not decode.
    NoDecode,
    /// A memory translation failure.
    MapFault,
    /// A signal is being delivered.
    Signal(u8),
}

impl TransferKind {
    /// Returns `true` if this kind must be routed to the system handler
    /// instead of the procedure registry or the lifter.
    #[must_use]
    pub fn needs_system_handler(&self) -> bool {
        matches!(
            self,
            TransferKind::Syscall
                | TransferKind::EmulationFault
                | TransferKind::NoDecode
                | TransferKind::MapFault
                | TransferKind::Signal(_)
        )
    }
}

bitflags! {
    /// Mode flags of an execution state.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct StateFlags: u32 {
        /// The narrow (compressed) instruction-encoding mode is active.
        /// Permits lifting at addresses aligned only to the architecture's
        /// narrow alignment unit.
        const NARROW_MODE = 1 << 0;
        /// The path has terminated (e.g. the process-exit model ran).
        const TERMINATED = 1 << 1;
    }
}

/// A value stored on the managed heap.
#[derive(Clone, Debug, PartialEq)]
pub enum HeapValue {
    /// A boxed string.
    Str(String),
    /// An indexable element array.
    Array(Vec<AbstractValue>),
    /// An object with named fields.
    Object(HashMap<String, AbstractValue>),
}

/// The managed heap of one execution state.
///
/// Reference identifiers are fresh and monotonically increasing, so two
/// allocations never alias even when their contents are equal.
#[derive(Clone, Debug, Default)]
pub struct ManagedHeap {
    objects: HashMap<u64, HeapValue>,
    next_ref: u64,
}

impl ManagedHeap {
    /// Allocates `value` and returns a fresh reference to it.
    pub fn alloc(&mut self, value: HeapValue) -> HeapRef {
        let id = self.next_ref;
        self.next_ref += 1;
        self.objects.insert(id, value);
        HeapRef::new(id)
    }

    /// Resolves a reference.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DanglingRef`] if the reference was never allocated.
    pub fn get(&self, r: HeapRef) -> Result<&HeapValue> {
        self.objects.get(&r.id()).ok_or(Error::DanglingRef(r.id()))
    }

    /// Resolves a reference mutably.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DanglingRef`] if the reference was never allocated.
    pub fn get_mut(&mut self, r: HeapRef) -> Result<&mut HeapValue> {
        self.objects
            .get_mut(&r.id())
            .ok_or(Error::DanglingRef(r.id()))
    }

    /// Loads a named field from the object behind `r`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DanglingRef`] for a dead reference,
    /// [`Error::TypeMismatch`] if the target is not an object, and
    /// [`Error::MissingField`] if the field is absent.
    pub fn load_field(&self, r: HeapRef, field: &str) -> Result<AbstractValue> {
        match self.get(r)? {
            HeapValue::Object(fields) => fields.get(field).cloned().ok_or(Error::MissingField {
                field: field.to_string(),
            }),
            other => Err(Error::TypeMismatch {
                expected: "object",
                found: heap_kind_name(other),
            }),
        }
    }

    /// Stores a named field on the object behind `r`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DanglingRef`] for a dead reference and
    /// [`Error::TypeMismatch`] if the target is not an object.
    pub fn store_field(&mut self, r: HeapRef, field: &str, value: AbstractValue) -> Result<()> {
        match self.get_mut(r)? {
            HeapValue::Object(fields) => {
                fields.insert(field.to_string(), value);
                Ok(())
            }
            other => Err(Error::TypeMismatch {
                expected: "object",
                found: heap_kind_name(other),
            }),
        }
    }

    /// Loads the element at `index` from the array behind `r`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DanglingRef`] for a dead reference,
    /// [`Error::TypeMismatch`] if the target is not an array, and
    /// [`Error::IndexOutOfBounds`] if `index` is past the end.
    pub fn load_element(&self, r: HeapRef, index: u64) -> Result<AbstractValue> {
        match self.get(r)? {
            HeapValue::Array(elements) => {
                elements
                    .get(index as usize)
                    .cloned()
                    .ok_or(Error::IndexOutOfBounds {
                        index,
                        size: elements.len() as u64,
                    })
            }
            other => Err(Error::TypeMismatch {
                expected: "array",
                found: heap_kind_name(other),
            }),
        }
    }

    /// Number of live objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns `true` if nothing has been allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

fn heap_kind_name(value: &HeapValue) -> &'static str {
    match value {
        HeapValue::Str(_) => "string",
        HeapValue::Array(_) => "array",
        HeapValue::Object(_) => "object",
    }
}

/// The mutable abstract machine state advanced by each dispatch step.
///
/// # Ownership
///
/// States are created by the exploration driver ([`Session::new_state`]
/// being the usual entry point) and passed `&mut` into
/// [`Dispatcher::step`]. The dispatch core never retains a state.
///
/// [`Session::new_state`]: crate::session::Session::new_state
/// [`Dispatcher::step`]: crate::dispatch::Dispatcher::step
#[derive(Clone, Debug)]
pub struct ExecutionState {
    arch: Arc<ArchInfo>,
    /// Instruction pointer. Symbolic pointers are legal to hold but must
    /// evaluate to a concrete address before a step can dispatch.
    pub ip: BitVec,
    /// Transfer-of-control kind pending at this step.
    pub transfer_kind: TransferKind,
    /// Mode flags.
    pub flags: StateFlags,
    regs: HashMap<String, AbstractValue>,
    mem: BTreeMap<u64, AbstractValue>,
    heap: ManagedHeap,
    call_args: Vec<AbstractValue>,
    constraints: Vec<BoolValue>,
    next_symbol: u64,
}

impl ExecutionState {
    /// Creates a state positioned at `entry` with an empty machine context.
    #[must_use]
    pub fn new(arch: Arc<ArchInfo>, entry: u64) -> Self {
        let bits = arch.bits();
        ExecutionState {
            arch,
            ip: BitVec::concrete(entry, bits),
            transfer_kind: TransferKind::Fallthrough,
            flags: StateFlags::empty(),
            regs: HashMap::new(),
            mem: BTreeMap::new(),
            heap: ManagedHeap::default(),
            call_args: Vec::new(),
            constraints: Vec::new(),
            next_symbol: 0,
        }
    }

    /// The architecture this state executes under.
    #[must_use]
    pub fn arch(&self) -> &ArchInfo {
        &self.arch
    }

    /// Repositions the instruction pointer at a concrete address.
    pub fn set_ip(&mut self, address: u64) {
        self.ip = BitVec::concrete(address, self.arch.bits());
    }

    /// Reads a register. Unwritten registers read as `None`.
    #[must_use]
    pub fn reg_read(&self, name: &str) -> Option<&AbstractValue> {
        self.regs.get(name)
    }

    /// Writes a register.
    pub fn reg_write(&mut self, name: &str, value: AbstractValue) {
        self.regs.insert(name.to_string(), value);
    }

    /// Reads abstract memory at `address`. Unwritten cells read as `None`.
    #[must_use]
    pub fn mem_read(&self, address: u64) -> Option<&AbstractValue> {
        self.mem.get(&address)
    }

    /// Writes abstract memory at `address`.
    pub fn mem_write(&mut self, address: u64, value: AbstractValue) {
        self.mem.insert(address, value);
    }

    /// The managed heap.
    #[must_use]
    pub fn heap(&self) -> &ManagedHeap {
        &self.heap
    }

    /// The managed heap, mutably.
    pub fn heap_mut(&mut self) -> &mut ManagedHeap {
        &mut self.heap
    }

    /// Replaces the call-argument slots consumed by procedure models.
    pub fn set_call_args(&mut self, args: Vec<AbstractValue>) {
        self.call_args = args;
    }

    /// Reads call-argument slot `index`, naming `model` in the error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArgument`] if the slot was never set.
    pub fn arg(&self, index: usize, model: &str) -> Result<&AbstractValue> {
        self.call_args.get(index).ok_or(Error::MissingArgument {
            index,
            model: model.to_string(),
        })
    }

    /// Records a path constraint.
    pub fn add_constraint(&mut self, constraint: BoolValue) {
        self.constraints.push(constraint);
    }

    /// The path constraints recorded so far.
    #[must_use]
    pub fn constraints(&self) -> &[BoolValue] {
        &self.constraints
    }

    /// Returns a fresh symbolic variable name with the given prefix.
    ///
    /// Names are unique within the state, which keeps unconstrained results
    /// from distinct call sites distinguishable to the constraint layer.
    pub fn fresh_symbol(&mut self, prefix: &str) -> String {
        let n = self.next_symbol;
        self.next_symbol += 1;
        format!("{prefix}_{n}")
    }
}
