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

use thiserror::Error;

macro_rules! config_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Config {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Config {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// The taxonomy follows the failure classes of the dispatch core:
///
/// # Error Categories
///
/// ## Configuration Errors
/// - [`Error::Config`] - Missing or invalid architecture descriptor or session
///   configuration. Always fatal and always raised before any stepping occurs.
///
/// ## Binder Errors
/// - [`Error::Exclusion`] - A caller-supplied exclusion predicate failed; aborts
///   the binder pass for that binary. Bindings made up to that point stay valid.
///
/// Synthetic-address collisions are *not* errors: the first binding wins and the
/// rejection is reported as a `tracing` warning only.
///
/// ## Dispatch Errors
/// - [`Error::UnalignedAddress`] - Instruction pointer violates the architecture's
///   alignment without a narrow encoding mode being active.
/// - [`Error::SymbolicValue`] - A concrete integer was required (instruction
///   pointer, iterator index) but the value is symbolic.
/// - [`Error::Lift`] - The lifter could not produce a block at an address.
///
/// ## Model Invocation Errors
/// - [`Error::Model`] - A procedure model failed. Never swallowed; a failing
///   modeled routine indicates a semantic gap that must stay visible.
/// - [`Error::DanglingRef`], [`Error::MissingField`], [`Error::IndexOutOfBounds`] -
///   Managed-heap access failures raised by collection and iterator models.
///
/// ## Front-End Errors
/// - [`Error::MalformedConstant`] - A bytecode literal operand does not follow its
///   fixed textual encoding.
#[derive(Error, Debug)]
pub enum Error {
    /// The session or architecture configuration is invalid.
    ///
    /// Raised during construction, before any stepping. The source location of
    /// the failed validation is captured for debugging.
    #[error("Configuration - {file}:{line}: {message}")]
    Config {
        /// Description of the invalid configuration
        message: String,
        /// The source file in which this error occurred
        file: &'static str,
        /// The source line in which this error occurred
        line: u32,
    },

    /// An address does not satisfy the architecture's instruction alignment.
    ///
    /// Lifting at an unaligned address is only legal when the execution state
    /// has the narrow encoding mode active on an architecture that supports
    /// one; otherwise the step aborts with this error.
    #[error("Address {address:#x} does not align to alignment {alignment} for architecture {arch}")]
    UnalignedAddress {
        /// The offending address
        address: u64,
        /// The required alignment unit in bytes
        alignment: u64,
        /// The architecture name, for diagnostics
        arch: String,
    },

    /// A concrete integer was required but the value is symbolic.
    #[error("Symbolic value where a concrete {context} is required")]
    SymbolicValue {
        /// What the concrete value was needed for
        context: String,
    },

    /// An import exclusion predicate failed.
    ///
    /// The failure propagates and aborts the binder pass for the current
    /// binary; registry writes made before the failure remain valid. The
    /// predicate's own error is preserved as the source.
    #[error("Exclusion predicate failed for import '{symbol}'")]
    Exclusion {
        /// The import symbol being tested
        symbol: String,
        /// The predicate's underlying failure
        #[source]
        source: Box<Error>,
    },

    /// A procedure model raised an error during invocation.
    #[error("Procedure model '{model}' failed: {message}")]
    Model {
        /// Name of the failing model
        model: String,
        /// Description of the failure
        message: String,
    },

    /// The lifter could not produce a block at the given address.
    #[error("Lifting failed at {address:#x}: {message}")]
    Lift {
        /// Address at which lifting was attempted
        address: u64,
        /// Description of the failure
        message: String,
    },

    /// A loader patch request could not be applied.
    #[error("Could not patch import '{symbol}': {message}")]
    Patch {
        /// The import symbol whose call-resolution entry was being patched
        symbol: String,
        /// Description of the failure
        message: String,
    },

    /// A bytecode literal operand does not follow its fixed textual encoding.
    #[error("Malformed constant operand: {0}")]
    MalformedConstant(String),

    /// An iterator read past the end of its collection.
    #[error("Iterator index {index} out of bounds for collection of size {size}")]
    IndexOutOfBounds {
        /// The index that was about to be read
        index: u64,
        /// The collection's size field
        size: u64,
    },

    /// A heap reference does not resolve to a live object.
    #[error("No heap object for reference {0:#x}")]
    DanglingRef(u64),

    /// A heap object is missing an expected named field.
    #[error("Missing field '{field}' on heap object")]
    MissingField {
        /// The field name that was requested
        field: String,
    },

    /// A procedure model was invoked with fewer arguments than it requires.
    #[error("Missing argument {index} for procedure model '{model}'")]
    MissingArgument {
        /// The argument slot that was requested
        index: usize,
        /// Name of the model that requested it
        model: String,
    },

    /// A value had an unexpected variant for the requested operation.
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// The expected value shape
        expected: &'static str,
        /// The actual value shape
        found: &'static str,
    },
}
