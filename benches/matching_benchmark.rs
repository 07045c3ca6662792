// ============================================================================
// Matching Engine Benchmarks
// ============================================================================
//
// Benchmark Categories:
// 1. Submission - Order entry throughput into a resting book
// 2. Sweep - Full matching pass over a crossed book
// 3. Book Operations - Snapshot and depth queries
// ============================================================================

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use matching_core::prelude::*;
use rust_decimal::Decimal;
use std::hint::black_box;
use std::sync::Arc;

fn new_engine() -> Arc<MatchingEngine> {
    Arc::new(
        MatchingEngine::new(
            EngineConfig::default(),
            Arc::new(NoOpPublisher),
            Arc::new(NoOpTradeLog),
        )
        .expect("default config is valid"),
    )
}

fn limit_order(side: Side, price: i64, quantity: i64) -> Arc<Order> {
    Arc::new(Order::limit(
        "bench_user",
        "BENCH",
        side,
        Decimal::from(price),
        Decimal::from(quantity),
    ))
}

// ============================================================================
// Submission Benchmarks
// ============================================================================

fn benchmark_submission(c: &mut Criterion) {
    let mut group = c.benchmark_group("submission");

    for num_orders in [100, 1_000].iter() {
        group.bench_with_input(
            BenchmarkId::new("non_crossing", num_orders),
            num_orders,
            |b, &num_orders| {
                b.iter_batched(
                    new_engine,
                    |engine| {
                        // Bids strictly below asks, so nothing ever crosses
                        for i in 0..num_orders {
                            let bid = limit_order(Side::Buy, 100 - (i % 50), 1);
                            let ask = limit_order(Side::Sell, 200 + (i % 50), 1);
                            engine.submit_order(bid).unwrap();
                            engine.submit_order(ask).unwrap();
                        }
                        black_box(engine.get_stats())
                    },
                    BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

// ============================================================================
// Sweep Benchmarks
// ============================================================================

fn benchmark_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("sweep");

    for num_pairs in [100, 1_000].iter() {
        group.bench_with_input(
            BenchmarkId::new("crossed_book", num_pairs),
            num_pairs,
            |b, &num_pairs| {
                b.iter_batched(
                    || {
                        let engine = new_engine();
                        for _ in 0..num_pairs {
                            engine.submit_order(limit_order(Side::Buy, 100, 1)).unwrap();
                            engine.submit_order(limit_order(Side::Sell, 100, 1)).unwrap();
                        }
                        engine
                    },
                    |engine| black_box(engine.run_matching_sweep()),
                    BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

// ============================================================================
// Book Operation Benchmarks
// ============================================================================

fn benchmark_snapshot(c: &mut Criterion) {
    let engine = new_engine();
    for i in 0..1_000 {
        engine
            .submit_order(limit_order(Side::Buy, 100 - (i % 100), 1))
            .unwrap();
        engine
            .submit_order(limit_order(Side::Sell, 200 + (i % 100), 1))
            .unwrap();
    }

    c.bench_function("snapshot_depth_10", |b| {
        b.iter(|| black_box(engine.get_order_book("BENCH", 10)))
    });
}

criterion_group!(
    benches,
    benchmark_submission,
    benchmark_sweep,
    benchmark_snapshot
);
criterion_main!(benches);
