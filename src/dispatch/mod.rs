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

//! Execution dispatch.
//!
//! [`Dispatcher::step`] is the per-step hot path of the platform: given a
//! state positioned at its instruction pointer, it decides - first match
//! wins - among
//!
//! 1. **system handling**: the pending transfer kind indicates a system call
//!    or a fault (emulation failure, undecodable instruction, signal
//!    delivery); the registered [`SystemHandler`] runs;
//! 2. **model invocation**: the current address has a procedure registry
//!    binding; the model executes against the state, bracketed by
//!    [`CallObserver`] notifications so tracing and breakpoints observe
//!    model calls symmetrically with native stepping;
//! 3. **native lifting**: a bounded block of real instructions is lifted at
//!    the address and interpreted.
//!
//! The dispatcher itself holds no session-spanning mutable state - just
//! shared read-only handles to the registry and architecture - so steps are
//! composable and replayable given identical inputs, and one dispatcher can
//! serve any number of independently advancing states.

use std::sync::Arc;

use crate::{
    arch::ArchInfo,
    models::ModelRegistry,
    state::{ExecutionState, StateFlags, TransferKind},
    value::AbstractValue,
    Error, Result,
};

/// Instruction-decoding mode for a lift request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeMode {
    /// The architecture's standard encoding.
    Standard,
    /// The narrower compressed encoding (e.g. Thumb).
    Narrow,
}

/// A block of lifted instructions, identified by its start address.
///
/// The intermediate representation itself lives behind the [`Lifter`]; the
/// dispatch core only needs the block's extent and mode to hand it back for
/// interpretation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LiftedBlock {
    /// Address the block starts at.
    pub address: u64,
    /// Size of the lifted bytes.
    pub size: usize,
    /// Number of instructions in the block.
    pub instruction_count: usize,
    /// Decoding mode the block was lifted in.
    pub mode: DecodeMode,
}

/// One observable machine effect of interpreting a block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// A register was read.
    RegisterRead(String),
    /// A register was written.
    RegisterWrite(String),
    /// Memory was read at an address.
    MemoryRead(u64),
    /// Memory was written at an address.
    MemoryWrite(u64),
}

/// Result of interpreting a lifted block: the possible successors and the
/// machine effects, for consumption by exploration and analysis layers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockSummary {
    /// Possible `(address, transfer kind)` successor pairs.
    pub successors: Vec<(u64, TransferKind)>,
    /// Register and memory effects, in program order.
    pub effects: Vec<Effect>,
}

/// The instruction-lifting engine, an external collaborator.
///
/// Implementations turn raw bytes into an intermediate representation
/// ([`lift`](Lifter::lift)) and evaluate that representation against an
/// execution state ([`interpret`](Lifter::interpret)).
pub trait Lifter: Send + Sync {
    /// Lifts a block starting at `address`, bounded by `max_bytes` and
    /// `max_instructions`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Lift`] if no block can be produced at the address.
    fn lift(
        &self,
        address: u64,
        max_bytes: usize,
        max_instructions: usize,
        mode: DecodeMode,
    ) -> Result<LiftedBlock>;

    /// Interprets a previously lifted block against `state`.
    ///
    /// # Errors
    ///
    /// Interpretation failures propagate to the caller of `step`.
    fn interpret(&self, state: &mut ExecutionState, block: &LiftedBlock) -> Result<BlockSummary>;
}

/// Handler for system calls and fault-like transfer kinds.
pub trait SystemHandler: Send + Sync {
    /// Handles the pending system call or fault.
    ///
    /// `address` is where the transfer originated, passed for diagnostics.
    ///
    /// # Errors
    ///
    /// Handler failures propagate to the caller of `step`.
    fn handle(
        &self,
        state: &mut ExecutionState,
        kind: TransferKind,
        address: u64,
    ) -> Result<()>;
}

/// Phase of a procedure model invocation, as seen by a [`CallObserver`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallPhase {
    /// The model is about to execute.
    Before,
    /// The model finished executing.
    After,
}

/// External introspection into model invocations.
///
/// Observers are notified immediately before and immediately after a model
/// executes, mirroring how a breakpoint would observe entry and exit of the
/// real routine.
pub trait CallObserver: Send + Sync {
    /// Called for each phase of each model invocation.
    fn on_call(&self, phase: CallPhase, model: &str, address: u64);
}

/// Caller-overridable bounds of one lift request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepOptions {
    /// Maximum block size in bytes.
    pub max_bytes: usize,
    /// Maximum number of instructions in the block.
    pub max_instructions: usize,
}

impl Default for StepOptions {
    fn default() -> Self {
        StepOptions {
            max_bytes: 400,
            max_instructions: usize::MAX,
        }
    }
}

/// What one dispatch step did.
#[derive(Clone, Debug)]
pub enum StepResult {
    /// The system handler ran.
    System {
        /// Address the transfer originated at.
        address: u64,
        /// The transfer kind that was handled.
        kind: TransferKind,
    },
    /// A procedure model ran.
    Model {
        /// The bound (usually synthetic) address.
        address: u64,
        /// Name of the model that ran.
        model: &'static str,
        /// The model's result value, if it produced one.
        value: Option<AbstractValue>,
    },
    /// A native block was lifted and interpreted.
    Block {
        /// Address the block started at.
        address: u64,
        /// Successors and effects of the block.
        summary: BlockSummary,
    },
}

impl StepResult {
    /// The block successors, if this step interpreted a block.
    #[must_use]
    pub fn successors(&self) -> &[(u64, TransferKind)] {
        match self {
            StepResult::Block { summary, .. } => &summary.successors,
            _ => &[],
        }
    }
}

/// Per-step decision component of the platform.
///
/// Built through [`Session::dispatcher`](crate::session::Session::dispatcher).
/// Cheap to clone conceptually but usually shared; all handles are `Arc`.
pub struct Dispatcher {
    arch: Arc<ArchInfo>,
    registry: Arc<ModelRegistry>,
    lifter: Arc<dyn Lifter>,
    system: Arc<dyn SystemHandler>,
    observers: Vec<Arc<dyn CallObserver>>,
    options: StepOptions,
}

impl Dispatcher {
    /// Creates a dispatcher over the given collaborators.
    #[must_use]
    pub fn new(
        arch: Arc<ArchInfo>,
        registry: Arc<ModelRegistry>,
        lifter: Arc<dyn Lifter>,
        system: Arc<dyn SystemHandler>,
    ) -> Self {
        Dispatcher {
            arch,
            registry,
            lifter,
            system,
            observers: Vec::new(),
            options: StepOptions::default(),
        }
    }

    /// Registers a call observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn CallObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Replaces the default step options.
    #[must_use]
    pub fn with_options(mut self, options: StepOptions) -> Self {
        self.options = options;
        self
    }

    /// Advances `state` by one dispatch step with the default options.
    ///
    /// # Errors
    ///
    /// See [`step_with`](Self::step_with).
    pub fn step(&self, state: &mut ExecutionState) -> Result<StepResult> {
        self.step_with(state, self.options)
    }

    /// Advances `state` by one dispatch step.
    ///
    /// # Errors
    ///
    /// - [`Error::SymbolicValue`] if the instruction pointer cannot be
    ///   evaluated to a concrete address;
    /// - [`Error::UnalignedAddress`] if the address violates the instruction
    ///   alignment and no narrow encoding mode is active;
    /// - any error raised by the system handler, a procedure model, or the
    ///   lifter - model errors are deliberately not swallowed.
    pub fn step_with(
        &self,
        state: &mut ExecutionState,
        options: StepOptions,
    ) -> Result<StepResult> {
        let address = state.ip.eval_as("instruction pointer")?;
        let kind = state.transfer_kind;

        if kind.needs_system_handler() {
            tracing::debug!(
                address = format_args!("{address:#x}"),
                %kind,
                "invoking system handler"
            );
            self.system.handle(state, kind, address)?;
            return Ok(StepResult::System { address, kind });
        }

        if let Some(binding) = self.registry.lookup(address) {
            let model = binding.model.name();
            tracing::debug!(
                address = format_args!("{address:#x}"),
                model,
                "invoking procedure model"
            );
            for observer in &self.observers {
                observer.on_call(CallPhase::Before, model, address);
            }
            let value = binding.model.execute(state, &binding.config)?;
            for observer in &self.observers {
                observer.on_call(CallPhase::After, model, address);
            }
            return Ok(StepResult::Model {
                address,
                model,
                value,
            });
        }

        let mode = self.decode_mode(address, state)?;
        tracing::debug!(
            address = format_args!("{address:#x}"),
            ?mode,
            "lifting native block"
        );
        let block = self
            .lifter
            .lift(address, options.max_bytes, options.max_instructions, mode)?;
        let summary = self.lifter.interpret(state, &block)?;
        Ok(StepResult::Block { address, summary })
    }

    /// Alignment check: an unaligned address is only legal when the state
    /// has the narrow encoding mode active on an architecture that has one,
    /// and the address satisfies the narrow alignment.
    fn decode_mode(&self, address: u64, state: &ExecutionState) -> Result<DecodeMode> {
        let alignment = self.arch.instruction_alignment();
        if address % alignment == 0 {
            return Ok(DecodeMode::Standard);
        }

        if state.flags.contains(StateFlags::NARROW_MODE) {
            if let Some(narrow) = self.arch.narrow_alignment() {
                if address % narrow == 0 {
                    return Ok(DecodeMode::Narrow);
                }
            }
        }

        Err(Error::UnalignedAddress {
            address,
            alignment,
            arch: self.arch.name().to_string(),
        })
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("arch", &self.arch.name())
            .field("bindings", &self.registry.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{stubs::ReturnUnconstrained, ModelConfig, ModelRegistry},
        test::{RecordingObserver, RecordingSystemHandler, ScriptedLifter},
        value::BitVec,
    };

    fn dispatcher_for(
        arch: ArchInfo,
        registry: Arc<ModelRegistry>,
        lifter: ScriptedLifter,
        system: Arc<RecordingSystemHandler>,
    ) -> Dispatcher {
        Dispatcher::new(Arc::new(arch), registry, Arc::new(lifter), system)
    }

    #[test]
    fn test_step_lifts_native_block() {
        let system = Arc::new(RecordingSystemHandler::default());
        let lifter = ScriptedLifter::new().with_fallthrough(0x1000, 0x1004);
        let dispatcher = dispatcher_for(
            ArchInfo::amd64(),
            Arc::new(ModelRegistry::new()),
            lifter,
            system,
        );

        let mut state = ExecutionState::new(Arc::new(ArchInfo::amd64()), 0x1000);
        let result = dispatcher.step(&mut state).unwrap();
        assert!(matches!(result, StepResult::Block { address: 0x1000, .. }));
        assert_eq!(result.successors(), &[(0x1004, TransferKind::Fallthrough)]);
        assert_eq!(state.ip.eval().unwrap(), 0x1004);
    }

    #[test]
    fn test_step_invokes_bound_model() {
        let registry = Arc::new(ModelRegistry::new());
        registry.bind(0x1000, Arc::new(ReturnUnconstrained), ModelConfig::new());
        let system = Arc::new(RecordingSystemHandler::default());
        let dispatcher = dispatcher_for(
            ArchInfo::amd64(),
            Arc::clone(&registry),
            ScriptedLifter::new(),
            system,
        );

        let mut state = ExecutionState::new(Arc::new(ArchInfo::amd64()), 0x1000);
        let result = dispatcher.step(&mut state).unwrap();
        match result {
            StepResult::Model { address, model, value } => {
                assert_eq!(address, 0x1000);
                assert_eq!(model, "ReturnUnconstrained");
                assert!(value.is_some());
            }
            other => panic!("expected model step, got {other:?}"),
        }
        assert_eq!(state.transfer_kind, TransferKind::Return);
    }

    #[test]
    fn test_system_transfer_takes_precedence_over_binding() {
        // A syscall-like transfer at a bound address must reach the system
        // handler, not the model.
        let registry = Arc::new(ModelRegistry::new());
        registry.bind(0x1000, Arc::new(ReturnUnconstrained), ModelConfig::new());
        let system = Arc::new(RecordingSystemHandler::default());
        let dispatcher = dispatcher_for(
            ArchInfo::amd64(),
            Arc::clone(&registry),
            ScriptedLifter::new(),
            Arc::clone(&system),
        );

        let mut state = ExecutionState::new(Arc::new(ArchInfo::amd64()), 0x1000);
        state.transfer_kind = TransferKind::Syscall;
        let result = dispatcher.step(&mut state).unwrap();
        assert!(matches!(
            result,
            StepResult::System { address: 0x1000, kind: TransferKind::Syscall }
        ));
        assert_eq!(
            lock!(system.handled).as_slice(),
            &[(0x1000, TransferKind::Syscall)]
        );
    }

    #[test]
    fn test_fault_kinds_reach_system_handler() {
        let system = Arc::new(RecordingSystemHandler::default());
        let dispatcher = dispatcher_for(
            ArchInfo::amd64(),
            Arc::new(ModelRegistry::new()),
            ScriptedLifter::new(),
            Arc::clone(&system),
        );

        for kind in [
            TransferKind::EmulationFault,
            TransferKind::NoDecode,
            TransferKind::MapFault,
            TransferKind::Signal(11),
        ] {
            let mut state = ExecutionState::new(Arc::new(ArchInfo::amd64()), 0x2000);
            state.transfer_kind = kind;
            let result = dispatcher.step(&mut state).unwrap();
            assert!(matches!(result, StepResult::System { .. }));
        }
        assert_eq!(lock!(system.handled).len(), 4);
    }

    #[test]
    fn test_symbolic_ip_is_an_error() {
        let dispatcher = dispatcher_for(
            ArchInfo::amd64(),
            Arc::new(ModelRegistry::new()),
            ScriptedLifter::new(),
            Arc::new(RecordingSystemHandler::default()),
        );

        let mut state = ExecutionState::new(Arc::new(ArchInfo::amd64()), 0x1000);
        state.ip = BitVec::symbolic("target", 64);
        let result = dispatcher.step(&mut state);
        assert!(matches!(result, Err(Error::SymbolicValue { .. })));
    }

    #[test]
    fn test_unaligned_address_is_fatal_without_narrow_mode() {
        let dispatcher = dispatcher_for(
            ArchInfo::armel(),
            Arc::new(ModelRegistry::new()),
            ScriptedLifter::new(),
            Arc::new(RecordingSystemHandler::default()),
        );

        let mut state = ExecutionState::new(Arc::new(ArchInfo::armel()), 0x1002);
        let result = dispatcher.step(&mut state);
        assert!(matches!(
            result,
            Err(Error::UnalignedAddress { address: 0x1002, alignment: 4, .. })
        ));
    }

    #[test]
    fn test_narrow_mode_permits_narrow_aligned_address() {
        let system = Arc::new(RecordingSystemHandler::default());
        let lifter = ScriptedLifter::new().with_fallthrough(0x1002, 0x1004);
        let dispatcher = dispatcher_for(
            ArchInfo::armel(),
            Arc::new(ModelRegistry::new()),
            lifter,
            system,
        );

        let mut state = ExecutionState::new(Arc::new(ArchInfo::armel()), 0x1002);
        state.flags.insert(StateFlags::NARROW_MODE);
        let result = dispatcher.step(&mut state).unwrap();
        assert!(matches!(result, StepResult::Block { .. }));
    }

    #[test]
    fn test_narrow_mode_still_rejects_odd_address() {
        let dispatcher = dispatcher_for(
            ArchInfo::armel(),
            Arc::new(ModelRegistry::new()),
            ScriptedLifter::new(),
            Arc::new(RecordingSystemHandler::default()),
        );

        let mut state = ExecutionState::new(Arc::new(ArchInfo::armel()), 0x1001);
        state.flags.insert(StateFlags::NARROW_MODE);
        let result = dispatcher.step(&mut state);
        assert!(matches!(result, Err(Error::UnalignedAddress { .. })));
    }

    #[test]
    fn test_lift_request_carries_decode_mode() {
        let system = Arc::new(RecordingSystemHandler::default());
        let lifter = Arc::new(ScriptedLifter::new().with_fallthrough(0x1002, 0x1004));
        let dispatcher = Dispatcher::new(
            Arc::new(ArchInfo::armel()),
            Arc::new(ModelRegistry::new()),
            Arc::clone(&lifter) as Arc<dyn Lifter>,
            system,
        );

        let mut state = ExecutionState::new(Arc::new(ArchInfo::armel()), 0x1002);
        state.flags.insert(StateFlags::NARROW_MODE);
        dispatcher.step(&mut state).unwrap();
        assert_eq!(lock!(lifter.lifts).as_slice(), &[(0x1002, 400, DecodeMode::Narrow)]);
    }

    #[test]
    fn test_observers_bracket_model_execution() {
        let registry = Arc::new(ModelRegistry::new());
        registry.bind(0x1000, Arc::new(ReturnUnconstrained), ModelConfig::new());
        let observer = RecordingObserver::arc();
        let dispatcher = dispatcher_for(
            ArchInfo::amd64(),
            registry,
            ScriptedLifter::new(),
            Arc::new(RecordingSystemHandler::default()),
        )
        .with_observer(Arc::clone(&observer) as Arc<dyn CallObserver>);

        let mut state = ExecutionState::new(Arc::new(ArchInfo::amd64()), 0x1000);
        dispatcher.step(&mut state).unwrap();

        let calls = lock!(observer.calls);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], (CallPhase::Before, "ReturnUnconstrained".to_string(), 0x1000));
        assert_eq!(calls[1], (CallPhase::After, "ReturnUnconstrained".to_string(), 0x1000));
    }

    #[test]
    fn test_model_error_propagates_and_skips_after_phase() {
        struct Failing;
        impl crate::models::ProcedureModel for Failing {
            fn name(&self) -> &'static str {
                "Failing"
            }
            fn execute(
                &self,
                _state: &mut ExecutionState,
                _config: &ModelConfig,
            ) -> Result<Option<AbstractValue>> {
                Err(Error::Model {
                    model: "Failing".to_string(),
                    message: "missing argument".to_string(),
                })
            }
        }

        let registry = Arc::new(ModelRegistry::new());
        registry.bind(0x1000, Arc::new(Failing), ModelConfig::new());
        let observer = RecordingObserver::arc();
        let dispatcher = dispatcher_for(
            ArchInfo::amd64(),
            registry,
            ScriptedLifter::new(),
            Arc::new(RecordingSystemHandler::default()),
        )
        .with_observer(Arc::clone(&observer) as Arc<dyn CallObserver>);

        let mut state = ExecutionState::new(Arc::new(ArchInfo::amd64()), 0x1000);
        let result = dispatcher.step(&mut state);
        assert!(matches!(result, Err(Error::Model { .. })));

        let calls = lock!(observer.calls);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, CallPhase::Before);
    }

    #[test]
    fn test_step_with_overrides_lift_bounds() {
        let system = Arc::new(RecordingSystemHandler::default());
        let lifter = Arc::new(ScriptedLifter::new().with_fallthrough(0x1000, 0x1004));
        let dispatcher = Dispatcher::new(
            Arc::new(ArchInfo::amd64()),
            Arc::new(ModelRegistry::new()),
            Arc::clone(&lifter) as Arc<dyn Lifter>,
            system,
        );

        let mut state = ExecutionState::new(Arc::new(ArchInfo::amd64()), 0x1000);
        let options = StepOptions {
            max_bytes: 16,
            max_instructions: 1,
        };
        dispatcher.step_with(&mut state, options).unwrap();
        assert_eq!(lock!(lifter.lifts).as_slice(), &[(0x1000, 16, DecodeMode::Standard)]);
    }

    #[test]
    fn test_unscripted_address_reports_lift_error() {
        let dispatcher = dispatcher_for(
            ArchInfo::amd64(),
            Arc::new(ModelRegistry::new()),
            ScriptedLifter::new(),
            Arc::new(RecordingSystemHandler::default()),
        );

        let mut state = ExecutionState::new(Arc::new(ArchInfo::amd64()), 0x1000);
        let result = dispatcher.step(&mut state);
        assert!(matches!(result, Err(Error::Lift { address: 0x1000, .. })));
    }
}
