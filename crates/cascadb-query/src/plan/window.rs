//! Window node plan description.
//!
//! A [`WindowPlan`] is what the planner hands the executor: which expressions
//! form the partition and order keys, which aggregates to compute, and where
//! the results land in the output row.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ExprId;
use crate::error::ExecError;

/// An ORDER BY key of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    /// The expression to sort by.
    pub expr: ExprId,
    /// Whether to sort ascending (true) or descending (false).
    pub ascending: bool,
    /// Whether nulls come first. `None` uses the engine default: NULL sorts
    /// lowest, so first when ascending and last when descending.
    pub nulls_first: Option<bool>,
}

impl SortKey {
    /// Creates an ascending sort key.
    #[must_use]
    pub const fn asc(expr: ExprId) -> Self {
        Self { expr, ascending: true, nulls_first: None }
    }

    /// Creates a descending sort key.
    #[must_use]
    pub const fn desc(expr: ExprId) -> Self {
        Self { expr, ascending: false, nulls_first: None }
    }

    /// Sets nulls first ordering.
    #[must_use]
    pub const fn nulls_first(mut self) -> Self {
        self.nulls_first = Some(true);
        self
    }

    /// Sets nulls last ordering.
    #[must_use]
    pub const fn nulls_last(mut self) -> Self {
        self.nulls_first = Some(false);
        self
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        if self.ascending {
            write!(f, " ASC")?;
        } else {
            write!(f, " DESC")?;
        }
        match self.nulls_first {
            Some(true) => write!(f, " NULLS FIRST")?,
            Some(false) => write!(f, " NULLS LAST")?,
            None => {}
        }
        Ok(())
    }
}

/// The aggregate kinds a planner can attach to a window node.
///
/// Not every kind has a window implementation; the executor rejects the
/// others with [`ExecError::UnsupportedAggregateKind`] when it is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateKind {
    /// RANK() - rank with gaps after ties.
    Rank,
    /// DENSE_RANK() - rank without gaps.
    DenseRank,
    /// ROW_NUMBER() - position within the partition.
    RowNumber,
    /// COUNT(*) - counts every row.
    CountStar,
    /// COUNT(expr) - counts non-NULL measures.
    Count,
    /// SUM(expr).
    Sum,
    /// MIN(expr).
    Min,
    /// MAX(expr).
    Max,
    /// AVG(expr).
    Avg,
    /// APPROX_COUNT_DISTINCT(expr).
    ApproxCountDistinct,
    /// A user-defined aggregate, by name.
    UserDefined(String),
}

impl AggregateKind {
    /// Returns the SQL name of this aggregate.
    #[must_use]
    pub fn sql_name(&self) -> &str {
        match self {
            Self::Rank => "RANK",
            Self::DenseRank => "DENSE_RANK",
            Self::RowNumber => "ROW_NUMBER",
            Self::CountStar | Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Avg => "AVG",
            Self::ApproxCountDistinct => "APPROX_COUNT_DISTINCT",
            Self::UserDefined(name) => name,
        }
    }

    /// Returns `true` if this aggregate reads a measure expression.
    #[must_use]
    pub const fn takes_measure(&self) -> bool {
        !matches!(self, Self::Rank | Self::DenseRank | Self::RowNumber | Self::CountStar)
    }
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CountStar => f.write_str("COUNT(*)"),
            other => f.write_str(other.sql_name()),
        }
    }
}

impl FromStr for AggregateKind {
    type Err = ExecError;

    /// Parses a plan identifier such as `"RANK"`, `"dense_rank"`,
    /// `"AGGREGATE_WINDOWED_RANK"` or `"AGGREGATE_COUNT_STAR"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let name = upper
            .strip_prefix("AGGREGATE_WINDOWED_")
            .or_else(|| upper.strip_prefix("AGGREGATE_"))
            .unwrap_or(&upper);
        let kind = match name {
            "RANK" => Self::Rank,
            "DENSE_RANK" => Self::DenseRank,
            "ROW_NUMBER" => Self::RowNumber,
            "COUNT_STAR" | "COUNT(*)" => Self::CountStar,
            "COUNT" => Self::Count,
            "SUM" => Self::Sum,
            "MIN" => Self::Min,
            "MAX" => Self::Max,
            "AVG" => Self::Avg,
            "APPROX_COUNT_DISTINCT" => Self::ApproxCountDistinct,
            _ => return Err(ExecError::UnsupportedAggregateKind(s.to_string())),
        };
        Ok(kind)
    }
}

/// One window aggregate computed by a window node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowAggregate {
    /// Which aggregate to compute.
    pub kind: AggregateKind,
    /// The measure expression, for aggregates that take one.
    pub measure: Option<ExprId>,
    /// Output column name.
    pub name: String,
}

impl WindowAggregate {
    /// Creates an aggregate without a measure (RANK, DENSE_RANK, ROW_NUMBER, COUNT(*)).
    #[must_use]
    pub fn new(kind: AggregateKind, name: impl Into<String>) -> Self {
        Self { kind, measure: None, name: name.into() }
    }

    /// Creates an aggregate over a measure expression.
    #[must_use]
    pub fn with_measure(kind: AggregateKind, measure: ExprId, name: impl Into<String>) -> Self {
        Self { kind, measure: Some(measure), name: name.into() }
    }
}

/// Where an output column's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnSource {
    /// The input column at this position.
    Input(usize),
    /// The window aggregate at this position in [`WindowPlan::aggregates`].
    Window(usize),
}

/// One column of the window node's output schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputColumn {
    /// Column name. When `None` the input column or aggregate name is used.
    pub name: Option<String>,
    /// Value source.
    pub source: ColumnSource,
}

impl OutputColumn {
    /// An input column passed through under its own name.
    #[must_use]
    pub const fn input(index: usize) -> Self {
        Self { name: None, source: ColumnSource::Input(index) }
    }

    /// A window aggregate result under the aggregate's name.
    #[must_use]
    pub const fn window(index: usize) -> Self {
        Self { name: None, source: ColumnSource::Window(index) }
    }

    /// Renames the column.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A complete window node description.
///
/// The input must arrive sorted by `partition_by` (ascending) and then by
/// `order_by` in the declared directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowPlan {
    /// PARTITION BY expressions.
    pub partition_by: Vec<ExprId>,
    /// ORDER BY keys.
    pub order_by: Vec<SortKey>,
    /// Aggregates computed over the same window.
    pub aggregates: Vec<WindowAggregate>,
    /// Explicit output layout. `None` means every input column followed by
    /// every aggregate.
    pub output: Option<Vec<OutputColumn>>,
}

impl WindowPlan {
    /// Creates a plan with no aggregates.
    #[must_use]
    pub fn new(partition_by: Vec<ExprId>, order_by: Vec<SortKey>) -> Self {
        Self { partition_by, order_by, aggregates: Vec::new(), output: None }
    }

    /// Adds an aggregate.
    #[must_use]
    pub fn with_aggregate(mut self, aggregate: WindowAggregate) -> Self {
        self.aggregates.push(aggregate);
        self
    }

    /// Sets the output layout.
    #[must_use]
    pub fn with_output(mut self, output: Vec<OutputColumn>) -> Self {
        self.output = Some(output);
        self
    }
}

impl fmt::Display for WindowPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Window: ")?;
        for (i, agg) in self.aggregates.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match agg.measure {
                Some(m) => write!(f, "{}({m})", agg.kind.sql_name())?,
                None if agg.kind == AggregateKind::CountStar => write!(f, "COUNT(*)")?,
                None => write!(f, "{}()", agg.kind.sql_name())?,
            }
        }
        write!(f, " OVER (")?;
        if !self.partition_by.is_empty() {
            write!(f, "PARTITION BY ")?;
            for (i, expr) in self.partition_by.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{expr}")?;
            }
            if !self.order_by.is_empty() {
                write!(f, " ")?;
            }
        }
        if !self.order_by.is_empty() {
            write!(f, "ORDER BY ")?;
            for (i, key) in self.order_by.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}")?;
            }
        }
        write!(f, ")")
    }
}
