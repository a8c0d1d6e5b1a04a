//! Benchmarks for the streaming window aggregate operator.
//!
//! Run with: `cargo bench -p cascadb-query`

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use cascadb_core::{DataType, Value};
use cascadb_query::exec::operators::{ValuesOp, WindowAggregateOp};
use cascadb_query::exec::{ExecutionConfig, ExecutionContext, Operator, Schema};
use cascadb_query::plan::{AggregateKind, ExprArena, SortKey, WindowAggregate, WindowPlan};
use criterion::{
    black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ROWS: usize = 100_000;

/// Generate `ROWS` rows of (partition, order key, measure) sorted by the
/// first two columns. `peer_width` bounds how many rows share an order key.
fn sorted_rows(partitions: i64, peer_width: i64) -> Vec<Vec<Value>> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut rows: Vec<(i64, i64, i64)> = (0..ROWS)
        .map(|_| {
            let p = rng.gen_range(0..partitions);
            let o = rng.gen_range(0..(ROWS as i64 / peer_width).max(1));
            (p, o, rng.gen_range(-1000..1000))
        })
        .collect();
    rows.sort_unstable();
    rows.into_iter().map(|(p, o, m)| vec![Value::Int(p), Value::Int(o), Value::Int(m)]).collect()
}

fn schema() -> Arc<Schema> {
    Arc::new(Schema::from(vec![
        ("p", DataType::Integer),
        ("o", DataType::Integer),
        ("m", DataType::Integer),
    ]))
}

fn plan(kinds: &[AggregateKind]) -> (WindowPlan, Arc<ExprArena>) {
    let mut exprs = ExprArena::new();
    let p = exprs.column(0);
    let o = exprs.column(1);
    let m = exprs.column(2);

    let mut plan = WindowPlan::new(vec![p], vec![SortKey::asc(o)]);
    for kind in kinds {
        let aggregate = if kind.takes_measure() {
            WindowAggregate::with_measure(kind.clone(), m, kind.sql_name())
        } else {
            WindowAggregate::new(kind.clone(), kind.sql_name())
        };
        plan = plan.with_aggregate(aggregate);
    }
    (plan, Arc::new(exprs))
}

fn run(mut op: WindowAggregateOp, ctx: &ExecutionContext) -> usize {
    op.open(ctx).unwrap();
    let mut count = 0;
    while let Some(row) = op.next().unwrap() {
        black_box(row);
        count += 1;
    }
    op.close().unwrap();
    count
}

/// Benchmark RANK alone against partition counts.
fn bench_rank_partitions(c: &mut Criterion) {
    let mut group = c.benchmark_group("window_rank_partitions");
    group.throughput(Throughput::Elements(ROWS as u64));
    let ctx = ExecutionContext::with_config(ExecutionConfig::new().without_stats());

    for partitions in [1, 100, 10_000] {
        let rows = sorted_rows(partitions, 4);
        let (plan, exprs) = plan(&[AggregateKind::Rank]);

        group.bench_with_input(BenchmarkId::from_parameter(partitions), &partitions, |b, _| {
            b.iter_batched(
                || {
                    let input = Box::new(ValuesOp::new(schema(), rows.clone()));
                    WindowAggregateOp::new(&plan, exprs.clone(), input).unwrap()
                },
                |op| run(op, &ctx),
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

/// Benchmark every supported aggregate computed by one node.
fn bench_all_aggregates(c: &mut Criterion) {
    let mut group = c.benchmark_group("window_all_aggregates");
    group.throughput(Throughput::Elements(ROWS as u64));
    let ctx = ExecutionContext::with_config(ExecutionConfig::new().without_stats());

    // Wide peer groups stress buffering, narrow ones stress boundary checks.
    for peer_width in [1, 16, 256] {
        let rows = sorted_rows(10, peer_width);
        let (plan, exprs) = plan(&[
            AggregateKind::Rank,
            AggregateKind::DenseRank,
            AggregateKind::RowNumber,
            AggregateKind::CountStar,
            AggregateKind::Sum,
            AggregateKind::Min,
            AggregateKind::Max,
            AggregateKind::Avg,
        ]);

        group.bench_with_input(BenchmarkId::from_parameter(peer_width), &peer_width, |b, _| {
            b.iter_batched(
                || {
                    let input = Box::new(ValuesOp::new(schema(), rows.clone()));
                    WindowAggregateOp::new(&plan, exprs.clone(), input).unwrap()
                },
                |op| run(op, &ctx),
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

/// Benchmark the cost of checking input order.
fn bench_sort_verification(c: &mut Criterion) {
    let mut group = c.benchmark_group("window_sort_verification");
    group.throughput(Throughput::Elements(ROWS as u64));
    let rows = sorted_rows(100, 4);
    let (plan, exprs) = plan(&[AggregateKind::Rank]);

    for verify in [false, true] {
        let config = ExecutionConfig::new().without_stats().with_sort_verification(verify);
        let ctx = ExecutionContext::with_config(config);

        group.bench_with_input(BenchmarkId::from_parameter(verify), &verify, |b, _| {
            b.iter_batched(
                || {
                    let input = Box::new(ValuesOp::new(schema(), rows.clone()));
                    WindowAggregateOp::new(&plan, exprs.clone(), input).unwrap()
                },
                |op| run(op, &ctx),
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_rank_partitions, bench_all_aggregates, bench_sort_verification);
criterion_main!(benches);
