//! Window aggregate state machines.
//!
//! Every window aggregate sees the same four calls from the executor:
//! `reset_partition` when a partition starts, `reset_peer_group` when a new
//! peer group starts within it, `update` once per input row, and `read`
//! once a peer group is complete. Cumulative aggregates treat
//! `reset_peer_group` as a commit point and leave their accumulator alone,
//! which is what makes ties see the same value.

use std::cmp::Ordering;

use cascadb_core::{DataType, Value};

use crate::error::{ExecError, ExecResult};
use crate::plan::AggregateKind;

/// Running SUM state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SumAccumulator {
    /// No non-NULL measure seen yet.
    Empty,
    /// Exact integer sum.
    Int(i64),
    /// Floating point sum.
    Float(f64),
}

impl SumAccumulator {
    fn add(self, value: &Value) -> ExecResult<Self> {
        let next = match (self, value) {
            (Self::Empty, Value::Int(i)) => Self::Int(*i),
            (Self::Empty, Value::Float(f)) => Self::Float(*f),
            (Self::Int(sum), Value::Int(i)) => match sum.checked_add(*i) {
                Some(total) => Self::Int(total),
                None => {
                    return Err(ExecError::NumericOverflow(format!(
                        "SUM exceeded BIGINT range adding {i} to {sum}"
                    )));
                }
            },
            (Self::Int(sum), Value::Float(f)) => Self::Float(sum as f64 + f),
            (Self::Float(sum), Value::Int(i)) => Self::Float(sum + *i as f64),
            (Self::Float(sum), Value::Float(f)) => Self::Float(sum + f),
            (_, other) => {
                return Err(ExecError::type_mismatch("SUM", "numeric", other.data_type()));
            }
        };
        Ok(next)
    }

    fn value(self) -> Value {
        match self {
            Self::Empty => Value::Null,
            Self::Int(i) => Value::Int(i),
            Self::Float(f) => Value::Float(f),
        }
    }
}

/// One window aggregate's state.
///
/// The set of aggregates is closed; [`WindowFunctor::for_kind`] maps a plan
/// identifier to its state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowFunctor {
    /// RANK(): 1 + rows before the current peer group.
    Rank {
        /// Rows in completed peer groups of this partition.
        rows_before_peer_group: i64,
        /// Rows in the current peer group.
        peer_group_rows: i64,
    },
    /// DENSE_RANK(): 1 + peer groups before the current one.
    DenseRank {
        /// Completed peer groups in this partition.
        groups_before: i64,
    },
    /// ROW_NUMBER(): numbered at emission time.
    RowNumber {
        /// Rows numbered so far in this partition.
        emitted: i64,
    },
    /// COUNT(*) or COUNT(expr).
    Count {
        /// Whether NULL measures are counted (COUNT(*)).
        star: bool,
        /// Running count.
        count: i64,
    },
    /// SUM(expr).
    Sum {
        /// Declared measure type.
        measure_type: DataType,
        /// Running sum.
        acc: SumAccumulator,
    },
    /// MIN(expr).
    Min {
        /// Declared measure type.
        measure_type: DataType,
        /// Smallest non-NULL measure so far.
        current: Option<Value>,
    },
    /// MAX(expr).
    Max {
        /// Declared measure type.
        measure_type: DataType,
        /// Largest non-NULL measure so far.
        current: Option<Value>,
    },
    /// AVG(expr).
    Avg {
        /// Sum of non-NULL measures.
        sum: f64,
        /// Number of non-NULL measures.
        count: i64,
    },
}

impl WindowFunctor {
    /// Builds the state machine for `kind`.
    ///
    /// `measure_type` is the declared type of the measure expression, or
    /// `None` when the aggregate has no measure.
    ///
    /// # Errors
    ///
    /// - [`ExecError::UnsupportedAggregateKind`] for kinds with no window form
    /// - [`ExecError::InvalidPlan`] for a missing or superfluous measure
    /// - [`ExecError::TypeMismatch`] when SUM or AVG get a non-numeric measure
    pub fn for_kind(kind: &AggregateKind, measure_type: Option<DataType>) -> ExecResult<Self> {
        if matches!(kind, AggregateKind::ApproxCountDistinct | AggregateKind::UserDefined(_)) {
            return Err(ExecError::UnsupportedAggregateKind(kind.to_string()));
        }

        let measure_type = match (kind.takes_measure(), measure_type) {
            (true, Some(ty)) => ty,
            (false, None) => DataType::Any,
            (true, None) => {
                return Err(ExecError::InvalidPlan(format!("{kind} requires a measure expression")));
            }
            (false, Some(_)) => {
                return Err(ExecError::InvalidPlan(format!("{kind} takes no measure expression")));
            }
        };

        let functor = match kind {
            AggregateKind::Rank => Self::Rank { rows_before_peer_group: 0, peer_group_rows: 0 },
            AggregateKind::DenseRank => Self::DenseRank { groups_before: 0 },
            AggregateKind::RowNumber => Self::RowNumber { emitted: 0 },
            AggregateKind::CountStar => Self::Count { star: true, count: 0 },
            AggregateKind::Count => Self::Count { star: false, count: 0 },
            AggregateKind::Sum => {
                require_numeric(kind, measure_type)?;
                Self::Sum { measure_type, acc: SumAccumulator::Empty }
            }
            AggregateKind::Avg => {
                require_numeric(kind, measure_type)?;
                Self::Avg { sum: 0.0, count: 0 }
            }
            AggregateKind::Min => Self::Min { measure_type, current: None },
            AggregateKind::Max => Self::Max { measure_type, current: None },
            AggregateKind::ApproxCountDistinct | AggregateKind::UserDefined(_) => {
                return Err(ExecError::UnsupportedAggregateKind(kind.to_string()));
            }
        };
        Ok(functor)
    }

    /// Returns the SQL name of this aggregate.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Rank { .. } => "RANK",
            Self::DenseRank { .. } => "DENSE_RANK",
            Self::RowNumber { .. } => "ROW_NUMBER",
            Self::Count { star: true, .. } => "COUNT(*)",
            Self::Count { star: false, .. } => "COUNT",
            Self::Sum { .. } => "SUM",
            Self::Min { .. } => "MIN",
            Self::Max { .. } => "MAX",
            Self::Avg { .. } => "AVG",
        }
    }

    /// Returns the type of the values this aggregate produces.
    #[must_use]
    pub const fn result_type(&self) -> DataType {
        match self {
            Self::Rank { .. }
            | Self::DenseRank { .. }
            | Self::RowNumber { .. }
            | Self::Count { .. } => DataType::Integer,
            Self::Sum { measure_type, .. }
            | Self::Min { measure_type, .. }
            | Self::Max { measure_type, .. } => *measure_type,
            Self::Avg { .. } => DataType::Float,
        }
    }

    /// Returns true if rows of one peer group get different values, so the
    /// value must be taken per row with [`read_row`](Self::read_row).
    #[must_use]
    pub const fn varies_within_peer_group(&self) -> bool {
        matches!(self, Self::RowNumber { .. })
    }

    /// Clears all state at the start of a partition.
    pub fn reset_partition(&mut self) {
        match self {
            Self::Rank { rows_before_peer_group, peer_group_rows } => {
                *rows_before_peer_group = 0;
                *peer_group_rows = 0;
            }
            Self::DenseRank { groups_before } => *groups_before = 0,
            Self::RowNumber { emitted } => *emitted = 0,
            Self::Count { count, .. } => *count = 0,
            Self::Sum { acc, .. } => *acc = SumAccumulator::Empty,
            Self::Min { current, .. } | Self::Max { current, .. } => *current = None,
            Self::Avg { sum, count } => {
                *sum = 0.0;
                *count = 0;
            }
        }
    }

    /// Marks the start of a new peer group within the current partition.
    pub fn reset_peer_group(&mut self) {
        match self {
            Self::Rank { rows_before_peer_group, peer_group_rows } => {
                *rows_before_peer_group += *peer_group_rows;
                *peer_group_rows = 0;
            }
            Self::DenseRank { groups_before } => *groups_before += 1,
            Self::RowNumber { .. }
            | Self::Count { .. }
            | Self::Sum { .. }
            | Self::Min { .. }
            | Self::Max { .. }
            | Self::Avg { .. } => {}
        }
    }

    /// Feeds one row's measure. `None` means the aggregate has no measure.
    ///
    /// NULL measures are skipped by every aggregate except COUNT(*).
    ///
    /// # Errors
    ///
    /// - [`ExecError::NumericOverflow`] when an integer SUM overflows
    /// - [`ExecError::TypeMismatch`] when a value does not fit the measure type
    pub fn update(&mut self, measure: Option<&Value>) -> ExecResult<()> {
        match self {
            Self::Rank { peer_group_rows, .. } => *peer_group_rows += 1,
            Self::DenseRank { .. } | Self::RowNumber { .. } => {}
            Self::Count { star, count } => {
                if *star || measure.is_some_and(|v| !v.is_null()) {
                    *count += 1;
                }
            }
            Self::Sum { measure_type, acc } => {
                if let Some(value) = non_null(measure) {
                    check_admits("SUM", *measure_type, value)?;
                    *acc = acc.add(value)?;
                }
            }
            Self::Min { measure_type, current } => {
                if let Some(value) = non_null(measure) {
                    check_admits("MIN", *measure_type, value)?;
                    keep_extreme(current, value, Ordering::Less);
                }
            }
            Self::Max { measure_type, current } => {
                if let Some(value) = non_null(measure) {
                    check_admits("MAX", *measure_type, value)?;
                    keep_extreme(current, value, Ordering::Greater);
                }
            }
            Self::Avg { sum, count } => {
                if let Some(value) = non_null(measure) {
                    let x = value.to_f64().ok_or_else(|| {
                        ExecError::type_mismatch("AVG", "numeric", value.data_type())
                    })?;
                    *sum += x;
                    *count += 1;
                }
            }
        }
        Ok(())
    }

    /// Returns the aggregate's value for the current peer group.
    ///
    /// For ROW_NUMBER this is the number the next row would get.
    #[must_use]
    pub fn read(&self) -> Value {
        match self {
            Self::Rank { rows_before_peer_group, .. } => Value::Int(rows_before_peer_group + 1),
            Self::DenseRank { groups_before } => Value::Int(groups_before + 1),
            Self::RowNumber { emitted } => Value::Int(emitted + 1),
            Self::Count { count, .. } => Value::Int(*count),
            Self::Sum { acc, .. } => acc.value(),
            Self::Min { current, .. } | Self::Max { current, .. } => {
                current.clone().unwrap_or(Value::Null)
            }
            Self::Avg { sum, count } => {
                if *count == 0 {
                    Value::Null
                } else {
                    Value::Float(*sum / *count as f64)
                }
            }
        }
    }

    /// Returns the value for the next emitted row.
    ///
    /// Equal to [`read`](Self::read) except for ROW_NUMBER, which advances.
    pub fn read_row(&mut self) -> Value {
        match self {
            Self::RowNumber { emitted } => {
                *emitted += 1;
                Value::Int(*emitted)
            }
            other => other.read(),
        }
    }
}

fn require_numeric(kind: &AggregateKind, measure_type: DataType) -> ExecResult<()> {
    if measure_type.is_numeric() || measure_type == DataType::Any {
        Ok(())
    } else {
        Err(ExecError::type_mismatch(kind.sql_name(), "numeric", measure_type))
    }
}

fn check_admits(function: &str, measure_type: DataType, value: &Value) -> ExecResult<()> {
    if measure_type.admits(value) {
        Ok(())
    } else {
        Err(ExecError::type_mismatch(function, measure_type.to_string(), value.data_type()))
    }
}

fn non_null(measure: Option<&Value>) -> Option<&Value> {
    measure.filter(|v| !v.is_null())
}

/// Replaces `current` with `value` when `value` compares as `wanted` to it.
fn keep_extreme(current: &mut Option<Value>, value: &Value, wanted: Ordering) {
    match current {
        Some(existing) if value.sql_cmp(existing) != wanted => {}
        _ => *current = Some(value.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drives a functor through `groups` (peer groups of measures) within one
    /// partition, returning the value read at the end of each group.
    fn run(functor: &mut WindowFunctor, groups: &[&[Value]]) -> Vec<Value> {
        let mut out = Vec::new();
        for (i, group) in groups.iter().enumerate() {
            if i == 0 {
                functor.reset_partition();
            } else {
                functor.reset_peer_group();
            }
            for value in *group {
                functor.update(Some(value)).unwrap();
            }
            out.push(functor.read());
        }
        out
    }

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().copied().map(Value::Int).collect()
    }

    #[test]
    fn rank_skips_after_ties() {
        let mut f = WindowFunctor::for_kind(&AggregateKind::Rank, None).unwrap();
        let mut out = Vec::new();
        f.reset_partition();
        for group_size in [2, 2, 1] {
            if !out.is_empty() {
                f.reset_peer_group();
            }
            for _ in 0..group_size {
                f.update(None).unwrap();
            }
            out.push(f.read());
        }
        assert_eq!(out, ints(&[1, 3, 5]));
    }

    #[test]
    fn dense_rank_has_no_gaps() {
        let mut f = WindowFunctor::for_kind(&AggregateKind::DenseRank, None).unwrap();
        f.reset_partition();
        f.update(None).unwrap();
        f.update(None).unwrap();
        assert_eq!(f.read(), Value::Int(1));
        f.reset_peer_group();
        f.update(None).unwrap();
        assert_eq!(f.read(), Value::Int(2));
    }

    #[test]
    fn rank_restarts_per_partition() {
        let mut f = WindowFunctor::for_kind(&AggregateKind::Rank, None).unwrap();
        f.reset_partition();
        f.update(None).unwrap();
        f.reset_peer_group();
        f.update(None).unwrap();
        assert_eq!(f.read(), Value::Int(2));
        f.reset_partition();
        f.update(None).unwrap();
        assert_eq!(f.read(), Value::Int(1));
    }

    #[test]
    fn row_number_advances_per_row() {
        let mut f = WindowFunctor::for_kind(&AggregateKind::RowNumber, None).unwrap();
        f.reset_partition();
        assert!(f.varies_within_peer_group());
        assert_eq!(f.read_row(), Value::Int(1));
        assert_eq!(f.read_row(), Value::Int(2));
        f.reset_peer_group();
        assert_eq!(f.read_row(), Value::Int(3));
        f.reset_partition();
        assert_eq!(f.read_row(), Value::Int(1));
    }

    #[test]
    fn count_star_counts_nulls() {
        let mut f = WindowFunctor::for_kind(&AggregateKind::CountStar, None).unwrap();
        f.reset_partition();
        f.update(None).unwrap();
        f.update(None).unwrap();
        assert_eq!(f.read(), Value::Int(2));
    }

    #[test]
    fn count_expr_skips_nulls() {
        let mut f = WindowFunctor::for_kind(&AggregateKind::Count, Some(DataType::Any)).unwrap();
        let out = run(&mut f, &[&[Value::Int(1), Value::Null], &[Value::Null]]);
        assert_eq!(out, ints(&[1, 1]));
    }

    #[test]
    fn cumulative_sum() {
        let mut f = WindowFunctor::for_kind(&AggregateKind::Sum, Some(DataType::Integer)).unwrap();
        let out = run(&mut f, &[&ints(&[1, 2]), &ints(&[3]), &[Value::Null]]);
        assert_eq!(out, ints(&[3, 6, 6]));
        assert_eq!(f.result_type(), DataType::Integer);
    }

    #[test]
    fn sum_is_null_until_first_value() {
        let mut f = WindowFunctor::for_kind(&AggregateKind::Sum, Some(DataType::Integer)).unwrap();
        let out = run(&mut f, &[&[Value::Null], &ints(&[4])]);
        assert_eq!(out, vec![Value::Null, Value::Int(4)]);
    }

    #[test]
    fn sum_switches_to_float_on_untyped_column() {
        let mut f = WindowFunctor::for_kind(&AggregateKind::Sum, Some(DataType::Any)).unwrap();
        let out = run(&mut f, &[&ints(&[1]), &[Value::Float(0.5)]]);
        assert_eq!(out, vec![Value::Int(1), Value::Float(1.5)]);
    }

    #[test]
    fn sum_overflow() {
        let mut f = WindowFunctor::for_kind(&AggregateKind::Sum, Some(DataType::Integer)).unwrap();
        f.reset_partition();
        f.update(Some(&Value::Int(i64::MAX))).unwrap();
        let err = f.update(Some(&Value::Int(1))).unwrap_err();
        assert!(matches!(err, ExecError::NumericOverflow(_)));
    }

    #[test]
    fn sum_rejects_text_at_runtime() {
        let mut f = WindowFunctor::for_kind(&AggregateKind::Sum, Some(DataType::Any)).unwrap();
        f.reset_partition();
        let err = f.update(Some(&Value::from("x"))).unwrap_err();
        assert!(matches!(err, ExecError::TypeMismatch { found: DataType::Text, .. }));
    }

    #[test]
    fn min_and_max() {
        let measure = Some(DataType::Integer);
        let mut min = WindowFunctor::for_kind(&AggregateKind::Min, measure).unwrap();
        let mut max = WindowFunctor::for_kind(&AggregateKind::Max, measure).unwrap();
        let groups: &[&[Value]] = &[&[Value::Null], &ints(&[5, 3]), &ints(&[7])];
        assert_eq!(run(&mut min, groups), vec![Value::Null, Value::Int(3), Value::Int(3)]);
        assert_eq!(run(&mut max, groups), vec![Value::Null, Value::Int(5), Value::Int(7)]);
    }

    #[test]
    fn min_over_text() {
        let mut f = WindowFunctor::for_kind(&AggregateKind::Min, Some(DataType::Text)).unwrap();
        let out = run(&mut f, &[&[Value::from("pear"), Value::from("apple")]]);
        assert_eq!(out, vec![Value::from("apple")]);
        assert_eq!(f.result_type(), DataType::Text);
    }

    #[test]
    fn avg() {
        let mut f = WindowFunctor::for_kind(&AggregateKind::Avg, Some(DataType::Integer)).unwrap();
        let out = run(&mut f, &[&[Value::Null], &ints(&[1, 2]), &[Value::Float(6.0)]]);
        assert_eq!(out, vec![Value::Null, Value::Float(1.5), Value::Float(3.0)]);
        assert_eq!(f.result_type(), DataType::Float);
    }

    #[test]
    fn registry_rejects_unsupported_kinds() {
        let err = WindowFunctor::for_kind(&AggregateKind::ApproxCountDistinct, Some(DataType::Any))
            .unwrap_err();
        assert!(matches!(err, ExecError::UnsupportedAggregateKind(_)));

        let err = WindowFunctor::for_kind(&AggregateKind::UserDefined("median".into()), None)
            .unwrap_err();
        assert_eq!(err, ExecError::UnsupportedAggregateKind("median".into()));
    }

    #[test]
    fn registry_checks_measures() {
        let err = WindowFunctor::for_kind(&AggregateKind::Sum, None).unwrap_err();
        assert!(matches!(err, ExecError::InvalidPlan(_)));

        let err =
            WindowFunctor::for_kind(&AggregateKind::Rank, Some(DataType::Integer)).unwrap_err();
        assert!(matches!(err, ExecError::InvalidPlan(_)));

        let err = WindowFunctor::for_kind(&AggregateKind::Sum, Some(DataType::Text)).unwrap_err();
        assert_eq!(err, ExecError::type_mismatch("SUM", "numeric", DataType::Text));

        let err =
            WindowFunctor::for_kind(&AggregateKind::Avg, Some(DataType::Boolean)).unwrap_err();
        assert!(matches!(err, ExecError::TypeMismatch { .. }));

        assert!(WindowFunctor::for_kind(&AggregateKind::Count, Some(DataType::Text)).is_ok());
        assert!(WindowFunctor::for_kind(&AggregateKind::Max, Some(DataType::Boolean)).is_ok());
    }

    #[test]
    fn reset_peer_group_keeps_cumulative_state() {
        let mut f = WindowFunctor::for_kind(&AggregateKind::Max, Some(DataType::Integer)).unwrap();
        f.reset_partition();
        f.update(Some(&Value::Int(9))).unwrap();
        let before = f.clone();
        f.reset_peer_group();
        assert_eq!(f, before);
    }
}
