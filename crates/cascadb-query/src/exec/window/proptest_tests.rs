//! Property-based tests for the window aggregate operator.
//!
//! Each property runs the streaming operator over random sorted input and
//! checks it against a brute-force evaluation of the same window.

use std::cmp::Ordering;
use std::sync::Arc;

use cascadb_core::{DataType, Value};
use proptest::prelude::*;

use crate::exec::operators::{ValuesOp, WindowAggregateOp};
use crate::exec::{ExecutionContext, Operator, Row, Schema};
use crate::plan::{AggregateKind, ExprArena, SortKey, WindowAggregate, WindowPlan};

/// Input rows of (partition, order key, measure), sorted by partition then
/// order key with NULL lowest.
fn arb_sorted_rows() -> impl Strategy<Value = Vec<[Value; 3]>> {
    let key = prop_oneof![1 => Just(Value::Null), 6 => (0i64..5).prop_map(Value::Int)];
    let measure = prop_oneof![1 => Just(Value::Null), 4 => (-100i64..100).prop_map(Value::Int)];
    prop::collection::vec(((0i64..4).prop_map(Value::Int), key, measure), 0..60).prop_map(
        |rows| {
            let mut rows: Vec<[Value; 3]> = rows.into_iter().map(|(p, o, m)| [p, o, m]).collect();
            rows.sort_by(|a, b| a[0].sql_cmp(&b[0]).then_with(|| a[1].sql_cmp(&b[1])));
            rows
        },
    )
}

const KINDS: [AggregateKind; 6] = [
    AggregateKind::Rank,
    AggregateKind::DenseRank,
    AggregateKind::RowNumber,
    AggregateKind::CountStar,
    AggregateKind::Sum,
    AggregateKind::Max,
];

fn run_window(rows: &[[Value; 3]]) -> Vec<Row> {
    let schema = Arc::new(Schema::from(vec![
        ("p", DataType::Integer),
        ("o", DataType::Integer),
        ("m", DataType::Integer),
    ]));
    let mut exprs = ExprArena::new();
    let p = exprs.column(0);
    let o = exprs.column(1);
    let m = exprs.column(2);

    let plan = KINDS.iter().fold(WindowPlan::new(vec![p], vec![SortKey::asc(o)]), |plan, kind| {
        let aggregate = if kind.takes_measure() {
            WindowAggregate::with_measure(kind.clone(), m, kind.sql_name())
        } else {
            WindowAggregate::new(kind.clone(), kind.sql_name())
        };
        plan.with_aggregate(aggregate)
    });

    let input = Box::new(ValuesOp::new(schema, rows.iter().map(|r| r.to_vec()).collect()));
    let mut op = WindowAggregateOp::new(&plan, Arc::new(exprs), input).unwrap();
    let ctx = ExecutionContext::new();
    op.open(&ctx).unwrap();
    let mut out = Vec::new();
    while let Some(row) = op.next().unwrap() {
        out.push(row);
    }
    op.close().unwrap();
    out
}

/// Window values computed directly from the definitions.
fn reference(rows: &[[Value; 3]], i: usize) -> [Value; 6] {
    let [p, o, _] = &rows[i];
    let partition: Vec<&[Value; 3]> = rows.iter().filter(|r| r[0].not_distinct(p)).collect();
    let position = rows[..i].iter().filter(|r| r[0].not_distinct(p)).count();

    let before = partition.iter().filter(|r| r[1].sql_cmp(o) == Ordering::Less).count();
    let mut distinct_before: Vec<&Value> = partition
        .iter()
        .map(|r| &r[1])
        .filter(|v| v.sql_cmp(o) == Ordering::Less)
        .collect();
    distinct_before.dedup_by(|a, b| a.not_distinct(b));

    let prefix: Vec<&&[Value; 3]> =
        partition.iter().filter(|r| r[1].sql_cmp(o) != Ordering::Greater).collect();
    let measures: Vec<i64> = prefix.iter().filter_map(|r| r[2].as_int()).collect();
    let sum = if measures.is_empty() { Value::Null } else { Value::Int(measures.iter().sum()) };
    let max = measures.iter().max().map_or(Value::Null, |m| Value::Int(*m));

    [
        Value::Int(before as i64 + 1),
        Value::Int(distinct_before.len() as i64 + 1),
        Value::Int(position as i64 + 1),
        Value::Int(prefix.len() as i64),
        sum,
        max,
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn one_output_row_per_input_row_in_order(rows in arb_sorted_rows()) {
        let out = run_window(&rows);
        prop_assert_eq!(out.len(), rows.len());
        for (input, output) in rows.iter().zip(&out) {
            prop_assert_eq!(&output.values()[..3], &input[..]);
        }
    }

    #[test]
    fn matches_brute_force(rows in arb_sorted_rows()) {
        let out = run_window(&rows);
        for (i, row) in out.iter().enumerate() {
            let expected = reference(&rows, i);
            prop_assert_eq!(&row.values()[3..], &expected[..], "row {}", i);
        }
    }

    #[test]
    fn rank_properties(rows in arb_sorted_rows()) {
        let out = run_window(&rows);
        for i in 0..out.len() {
            let rank = out[i].values()[3].as_int().unwrap();
            let dense = out[i].values()[4].as_int().unwrap();
            let starts_partition = i == 0 || !rows[i][0].not_distinct(&rows[i - 1][0]);
            if starts_partition {
                prop_assert_eq!(rank, 1);
                prop_assert_eq!(dense, 1);
                continue;
            }

            let prev_rank = out[i - 1].values()[3].as_int().unwrap();
            let prev_dense = out[i - 1].values()[4].as_int().unwrap();
            if rows[i][1].not_distinct(&rows[i - 1][1]) {
                prop_assert_eq!(rank, prev_rank);
                prop_assert_eq!(dense, prev_dense);
            } else {
                let row_number = out[i].values()[5].as_int().unwrap();
                prop_assert_eq!(rank, row_number);
                prop_assert_eq!(dense, prev_dense + 1);
            }
        }
    }

    #[test]
    fn rerun_is_identical(rows in arb_sorted_rows()) {
        prop_assert_eq!(run_window(&rows), run_window(&rows));
    }
}
