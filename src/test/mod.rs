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

//! Shared fixtures for unit tests.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::{
    dispatch::{
        BlockSummary, CallObserver, CallPhase, DecodeMode, LiftedBlock, Lifter, SystemHandler,
    },
    state::{ExecutionState, TransferKind},
    Error, Result,
};

/// A lifter scripted with fixed blocks per address.
///
/// Records every lift request so tests can assert on requested modes and
/// bounds. Addresses with no script entry fail with [`Error::Lift`].
pub(crate) struct ScriptedLifter {
    blocks: HashMap<u64, BlockSummary>,
    pub(crate) lifts: Mutex<Vec<(u64, usize, DecodeMode)>>,
}

impl ScriptedLifter {
    pub(crate) fn new() -> Self {
        ScriptedLifter {
            blocks: HashMap::new(),
            lifts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_block(mut self, address: u64, summary: BlockSummary) -> Self {
        self.blocks.insert(address, summary);
        self
    }

    /// Scripts a trivial fall-through block to `next`.
    pub(crate) fn with_fallthrough(self, address: u64, next: u64) -> Self {
        self.with_block(
            address,
            BlockSummary {
                successors: vec![(next, TransferKind::Fallthrough)],
                effects: Vec::new(),
            },
        )
    }
}

impl Lifter for ScriptedLifter {
    fn lift(
        &self,
        address: u64,
        max_bytes: usize,
        _max_instructions: usize,
        mode: DecodeMode,
    ) -> Result<LiftedBlock> {
        lock!(self.lifts).push((address, max_bytes, mode));
        if self.blocks.contains_key(&address) {
            Ok(LiftedBlock {
                address,
                size: 4,
                instruction_count: 1,
                mode,
            })
        } else {
            Err(Error::Lift {
                address,
                message: "no scripted block".to_string(),
            })
        }
    }

    fn interpret(&self, state: &mut ExecutionState, block: &LiftedBlock) -> Result<BlockSummary> {
        let summary = self.blocks.get(&block.address).ok_or_else(|| Error::Lift {
            address: block.address,
            message: "no scripted block".to_string(),
        })?;
        if let Some(&(next, kind)) = summary.successors.first() {
            state.set_ip(next);
            state.transfer_kind = kind;
        }
        Ok(summary.clone())
    }
}

/// A system handler that records what it was asked to handle.
#[derive(Default)]
pub(crate) struct RecordingSystemHandler {
    pub(crate) handled: Mutex<Vec<(u64, TransferKind)>>,
}

impl SystemHandler for RecordingSystemHandler {
    fn handle(
        &self,
        _state: &mut ExecutionState,
        kind: TransferKind,
        address: u64,
    ) -> Result<()> {
        lock!(self.handled).push((address, kind));
        Ok(())
    }
}

/// An observer that records each phase notification in order.
#[derive(Default)]
pub(crate) struct RecordingObserver {
    pub(crate) calls: Mutex<Vec<(CallPhase, String, u64)>>,
}

impl RecordingObserver {
    pub(crate) fn arc() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl CallObserver for RecordingObserver {
    fn on_call(&self, phase: CallPhase, model: &str, address: u64) {
        lock!(self.calls).push((phase, model.to_string(), address));
    }
}
