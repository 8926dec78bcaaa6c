//! Benchmarks for the dispatch hot path.
//!
//! Measures the per-step decision cost in its three shapes:
//! - registry hit (modeled call)
//! - registry miss (native lift)
//! - synthetic address allocation

extern crate symflow;

use criterion::{criterion_group, criterion_main, Criterion};
use std::{hint::black_box, sync::Arc};
use symflow::{
    models::alloc,
    prelude::*,
    Result,
};

/// A lifter that reports a single fall-through block at any address.
struct FallthroughLifter;

impl Lifter for FallthroughLifter {
    fn lift(
        &self,
        address: u64,
        _max_bytes: usize,
        _max_instructions: usize,
        mode: DecodeMode,
    ) -> Result<LiftedBlock> {
        Ok(LiftedBlock {
            address,
            size: 4,
            instruction_count: 1,
            mode,
        })
    }

    fn interpret(&self, state: &mut ExecutionState, block: &LiftedBlock) -> Result<BlockSummary> {
        let next = block.address + 4;
        state.set_ip(next);
        state.transfer_kind = TransferKind::Fallthrough;
        Ok(BlockSummary {
            successors: vec![(next, TransferKind::Fallthrough)],
            effects: Vec::new(),
        })
    }
}

/// Handler that never runs in these benchmarks.
struct NoopHandler;

impl SystemHandler for NoopHandler {
    fn handle(&self, _state: &mut ExecutionState, _kind: TransferKind, _address: u64) -> Result<()> {
        Ok(())
    }
}

fn session_with_stub() -> (Session, u64) {
    let session = Session::builder()
        .arch(ArchInfo::amd64())
        .library(libc_models())
        .build()
        .unwrap();
    let (address, _) = session
        .install_model(
            HookTarget::Address(0x5000),
            Arc::new(ReturnUnconstrained),
            ModelConfig::new(),
        )
        .unwrap();
    (session, address)
}

/// Benchmark a step that hits a bound procedure model.
fn bench_step_model(c: &mut Criterion) {
    let (session, address) = session_with_stub();
    let dispatcher = session.dispatcher(Arc::new(FallthroughLifter), Arc::new(NoopHandler));

    c.bench_function("step_model", |b| {
        b.iter(|| {
            let mut state = session.new_state(black_box(address));
            let result = dispatcher.step(&mut state).unwrap();
            black_box(result)
        });
    });
}

/// Benchmark a step that misses the registry and lifts a native block.
fn bench_step_native(c: &mut Criterion) {
    let (session, _) = session_with_stub();
    let dispatcher = session.dispatcher(Arc::new(FallthroughLifter), Arc::new(NoopHandler));

    c.bench_function("step_native", |b| {
        b.iter(|| {
            let mut state = session.new_state(black_box(0x40_0000));
            let result = dispatcher.step(&mut state).unwrap();
            black_box(result)
        });
    });
}

/// Benchmark a native run of consecutive blocks through one state.
fn bench_step_native_run(c: &mut Criterion) {
    let (session, _) = session_with_stub();
    let dispatcher = session.dispatcher(Arc::new(FallthroughLifter), Arc::new(NoopHandler));

    c.bench_function("step_native_run_64", |b| {
        b.iter(|| {
            let mut state = session.new_state(black_box(0x40_0000));
            for _ in 0..64 {
                dispatcher.step(&mut state).unwrap();
            }
            black_box(state)
        });
    });
}

/// Benchmark synthetic address allocation.
fn bench_allocate(c: &mut Criterion) {
    let arch = ArchInfo::amd64();

    c.bench_function("allocate_synthetic", |b| {
        b.iter(|| {
            let address =
                alloc::allocate(black_box("libc.so.6"), black_box("memcpy"), &arch).unwrap();
            black_box(address)
        });
    });
}

criterion_group!(
    benches,
    bench_step_model,
    bench_step_native,
    bench_step_native_run,
    bench_allocate
);
criterion_main!(benches);
