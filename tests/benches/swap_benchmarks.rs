//! # HTLC Swap Benchmarks
//!
//! | Area | Operation | Target |
//! |------|-----------|--------|
//! | Commitment | generate secret, hashlock, condition | < 50µs |
//! | Commitment | verify fulfillment against condition | < 10µs |
//! | Timelocks | pack / unpack / re-base | < 1µs |
//! | Coordinator | initiate (both legs, simulated chains) | < 5ms |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use htlc_core::algorithms::{encode_fulfillment, verify_condition, SecretCommitment, Timelocks};
use htlc_core::domain::TimelockStage;
use htlc_core::SwapApi;
use htlc_tests::fixtures::{swap_request, Harness, T0};
use std::time::Duration;

// ============================================================================
// Commitment
// ============================================================================

fn bench_commitment(c: &mut Criterion) {
    let mut group = c.benchmark_group("commitment");

    group.bench_function("generate", |b| b.iter(|| black_box(SecretCommitment::generate())));

    let commitment = SecretCommitment::generate();
    group.bench_function("verify_condition", |b| {
        b.iter(|| black_box(verify_condition(commitment.secret(), commitment.condition())))
    });
    group.bench_function("encode_fulfillment", |b| {
        b.iter(|| black_box(encode_fulfillment(commitment.secret())))
    });

    group.finish();
}

// ============================================================================
// Timelocks
// ============================================================================

fn bench_timelocks(c: &mut Criterion) {
    let mut group = c.benchmark_group("timelocks");

    let schedule = Timelocks::from_timestamps(
        T0,
        &[
            (TimelockStage::DstWithdrawal, T0 + 30),
            (TimelockStage::DstPublicWithdrawal, T0 + 300),
            (TimelockStage::DstCancellation, T0 + 600),
        ],
    )
    .unwrap();
    let packed = schedule.pack();

    group.bench_function("pack", |b| b.iter(|| black_box(schedule.pack())));
    group.bench_function("unpack", |b| b.iter(|| black_box(Timelocks::unpack(packed))));
    group.bench_function("with_deployed_at", |b| {
        b.iter(|| black_box(schedule.with_deployed_at(T0 + 12).unwrap()))
    });

    group.finish();
}

// ============================================================================
// Coordinator
// ============================================================================

fn bench_initiate(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("coordinator");
    group.measurement_time(Duration::from_secs(10));

    for batch in [1usize, 10, 50] {
        group.throughput(Throughput::Elements(batch as u64));
        group.bench_with_input(BenchmarkId::new("initiate", batch), &batch, |b, &batch| {
            b.iter(|| {
                runtime.block_on(async {
                    let h = Harness::new();
                    for _ in 0..batch {
                        black_box(h.coordinator.initiate(swap_request()).await.unwrap());
                    }
                })
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_commitment, bench_timelocks, bench_initiate);
criterion_main!(benches);
