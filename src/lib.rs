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

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # symflow
//!
//! [![Crates.io](https://img.shields.io/crates/v/symflow.svg)](https://crates.io/crates/symflow)
//! [![Documentation](https://docs.rs/symflow/badge.svg)](https://docs.rs/symflow)
//! [![License](https://img.shields.io/badge/license-Apache--2.0-blue.svg)](https://github.com/symflow/symflow/blob/main/LICENSE-APACHE)
//!
//! The execution-dispatch core of a symbolic binary analysis platform. Built in pure Rust,
//! `symflow` provides the machinery that decides, at every step of an analysis, whether to
//! execute native code or substitute a summarized model of a library routine - and the
//! plumbing that makes such substitution possible across architectures and binary formats.
//!
//! ## Features
//!
//! - **🔗 Import binding** - Replace dynamic library imports with procedure models at load time
//! - **🎯 Deterministic synthetic addresses** - Hash-derived, alignment-respecting addresses for modeled routines
//! - **⚙️ Per-step dispatch** - System handler, procedure model, or native lift, decided per step
//! - **🧩 Extensible models** - Procedure models are plain trait objects with frozen per-site configuration
//! - **🛡️ Memory safe** - No unsafe code, comprehensive error handling
//! - **🔀 Concurrent exploration** - One session serves any number of worker threads
//!
//! ## Quick Start
//!
//! Add `symflow` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! symflow = "0.1"
//! ```
//!
//! ### Using the Prelude
//!
//! For convenient access to the most commonly used types, import the prelude:
//!
//! ```rust
//! use symflow::prelude::*;
//!
//! let session = Session::builder()
//!     .arch(ArchInfo::amd64())
//!     .library(libc_models())
//!     .build()?;
//! let state = session.new_state(0x40_0000);
//! # Ok::<(), symflow::Error>(())
//! ```
//!
//! ## Architecture
//!
//! `symflow` is organized into several key modules:
//!
//! - [`prelude`] - Convenient re-exports of commonly used types and traits
//! - [`session`] - The explicit [`Session`](session::Session) handle tying the components together
//! - [`arch`] - Architecture descriptors (word width, byte order, alignments)
//! - [`value`] - Concrete and symbolic values ([`value::BitVec`], [`value::AbstractValue`])
//! - [`state`] - Execution state: registers, memory, managed heap, constraints
//! - [`models`] - Procedure models, the synthetic address allocator, and the registry
//! - [`loader`] - Loaded-image abstraction and import tables
//! - [`binder`] - The import binder that wires models into a loaded image
//! - [`dispatch`] - The per-step execution dispatcher
//! - [`bytecode`] - Front-end adapter for managed bytecode (constants, collections)
//! - [`Error`] and [`Result`] - Comprehensive error handling
//!
//! ### Binding and Dispatch
//!
//! The lifecycle of a modeled routine:
//!
//! 1. The [`binder::ImportBinder`] walks a loaded image's import table, matches symbols
//!    against the session's model catalog, and allocates a synthetic address for each match.
//! 2. Each import slot is patched to its synthetic address, so native call instructions
//!    reach the model without rewriting any code.
//! 3. On each step, the [`dispatch::Dispatcher`] checks the transfer kind (system calls and
//!    faults go to the [`dispatch::SystemHandler`]), then the registry (bound addresses run
//!    their model), and only then lifts and interprets a native block.
//!
//! Unmatched imports fall back to a stub model that returns a fresh symbolic value, so
//! analysis proceeds past any routine nobody has modeled yet.
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`](Result) with comprehensive error information:
//!
//! ```rust
//! use symflow::{value::BitVec, Error};
//!
//! let symbolic = BitVec::symbolic("input", 64);
//! match symbolic.eval() {
//!     Ok(value) => println!("concrete: {value:#x}"),
//!     Err(Error::SymbolicValue { context }) => println!("symbolic in {context}"),
//!     Err(e) => println!("other error: {e}"),
//! }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test
//! cargo bench  # dispatch hot-path benchmarks
//! ```

#[macro_use]
pub(crate) mod macros;

#[macro_use]
mod error;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// This module provides a curated selection of the most frequently used types
/// from across the symflow library, allowing for convenient glob imports.
///
/// # Example
///
/// ```rust
/// use symflow::prelude::*;
///
/// let session = Session::builder().arch(ArchInfo::amd64()).build()?;
/// # Ok::<(), symflow::Error>(())
/// ```
pub mod prelude;

/// Architecture descriptors.
///
/// An [`arch::ArchInfo`] captures the properties of a target architecture that the
/// dispatch core depends on: word width in bits, byte order, instruction alignment
/// (with an optional narrower compressed-encoding alignment), and the calling-convention
/// registers used by procedure models.
///
/// Presets are provided for the common targets ([`arch::ArchInfo::amd64`],
/// [`arch::ArchInfo::x86`], [`arch::ArchInfo::armel`], [`arch::ArchInfo::mips32`]);
/// custom descriptors go through the validating [`arch::ArchInfo::new`].
pub mod arch;

/// Import binding.
///
/// The [`binder::ImportBinder`] walks a loaded image's import table and decides, per
/// symbol, whether to install a catalog model, defer to native code, or install the
/// unconstrained-return fallback. Library names are normalized through a basename and
/// alias step so that e.g. `libc.so.0` finds models registered under `libc.so.6`.
///
/// Binding is idempotent: re-running the binder over the same image produces the same
/// synthetic addresses and the same patches.
pub mod binder;

/// Front-end adapter for managed bytecode.
///
/// Managed-language front ends produce constants and use runtime collections that have
/// no direct machine representation. This module materializes bytecode literals into
/// abstract values ([`bytecode::materialize`]) and models the collection iterator
/// protocol as procedure models ([`bytecode::collection`]).
pub mod bytecode;

/// The per-step execution dispatcher.
///
/// The [`dispatch::Dispatcher`] advances an execution state by one step: system calls
/// and faults go to the [`dispatch::SystemHandler`], bound addresses run their procedure
/// model (bracketed by [`dispatch::CallObserver`] notifications), and everything else is
/// lifted and interpreted through the [`dispatch::Lifter`].
pub mod dispatch;

/// Loaded-image abstraction.
///
/// The [`loader::LoadedImage`] trait is the binder's view of a mapped binary: identity,
/// occupied address range, declared dependencies, and a patchable import table.
/// [`loader::MemoryImage`] is a self-contained implementation used for images
/// constructed in memory and throughout the test suite.
pub mod loader;

/// Procedure models and their infrastructure.
///
/// A [`models::ProcedureModel`] is a summarized stand-in for a library routine. This
/// module also provides the synthetic address allocator ([`models::alloc`]), the
/// concurrent address-to-model registry ([`models::ModelRegistry`]), the model catalog
/// grouping models by library, the libc models ([`models::libc`]), and the
/// unconstrained-return fallback stub ([`models::stubs`]).
pub mod models;

/// The analysis session.
///
/// A [`session::Session`] is the explicit handle that owns the long-lived components -
/// architecture, registry, catalog - and hands out binders, dispatchers, and fresh
/// execution states. There is no global session table.
pub mod session;

/// Execution state.
///
/// An [`state::ExecutionState`] carries everything that evolves during one path of
/// exploration: instruction pointer, pending transfer kind, registers, memory, the
/// managed heap, call arguments, and the accumulated path constraints.
pub mod state;

/// Concrete and symbolic values.
///
/// [`value::BitVec`] is a fixed-width bit-vector that is either concrete or symbolic;
/// [`value::AbstractValue`] is the tagged union flowing through registers, memory, and
/// the managed heap.
pub mod value;

/// `symflow` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always
/// [`Error`]. This is used consistently throughout the crate for all fallible
/// operations.
pub type Result<T> = std::result::Result<T, Error>;

pub use error::Error;
