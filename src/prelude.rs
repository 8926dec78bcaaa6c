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

//! # symflow Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the symflow library. Import this module to get quick access to the essential
//! types for building and stepping an analysis.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all symflow operations
pub use crate::Error;

/// The result type used throughout symflow
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// The analysis session and its builder
pub use crate::session::{HookTarget, Session, SessionBuilder};

// ================================================================================================
// Architecture and Values
// ================================================================================================

/// Architecture descriptors
pub use crate::arch::{ArchInfo, Endian};

/// Concrete and symbolic values
pub use crate::value::{AbstractValue, BitVec, BoolValue, HeapRef};

// ================================================================================================
// Execution State
// ================================================================================================

/// Execution state and its components
pub use crate::state::{ExecutionState, StateFlags, TransferKind};

// ================================================================================================
// Procedure Models
// ================================================================================================

/// The model trait and its configuration
pub use crate::models::{
    BindOutcome, ModelCatalog, ModelConfig, ModelLibrary, ModelRegistry, ProcedureModel,
};

/// The libc model library
pub use crate::models::libc::libc_models;

/// The unconstrained-return fallback
pub use crate::models::stubs::ReturnUnconstrained;

// ================================================================================================
// Binding and Dispatch
// ================================================================================================

/// Import binding
pub use crate::binder::{BindReport, Exclusions, ImportBinder};

/// Loaded images
pub use crate::loader::{ImportEntry, LoadedImage, MemoryImage};

/// Per-step dispatch
pub use crate::dispatch::{
    BlockSummary, CallObserver, CallPhase, DecodeMode, Dispatcher, LiftedBlock, Lifter,
    StepOptions, StepResult, SystemHandler,
};
