//! Error types for plan binding and execution.

use cascadb_core::{CoreError, DataType};
use thiserror::Error;

/// Errors that can occur while building or running an operator.
///
/// Variants fall into two groups. Construction-time errors
/// ([`UnsupportedAggregateKind`](Self::UnsupportedAggregateKind),
/// [`TypeMismatch`](Self::TypeMismatch), [`InvalidPlan`](Self::InvalidPlan))
/// are reported before any row is pulled. Runtime errors abort the stream at
/// the row that caused them; no rows are skipped or retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecError {
    /// Input rows are not sorted by partition keys then order keys.
    #[error("input is not sorted as required (partition {partition}): {message}")]
    PreconditionViolation {
        /// Zero-based index of the partition where the violation was seen.
        partition: u64,
        /// What was out of order.
        message: String,
    },

    /// The plan names an aggregate kind with no window implementation.
    #[error("unsupported window aggregate: {0}")]
    UnsupportedAggregateKind(String),

    /// A measure type is incompatible with the requested aggregate.
    #[error("type mismatch in {function}: expected {expected}, found {found}")]
    TypeMismatch {
        /// The aggregate being computed.
        function: String,
        /// What the aggregate accepts.
        expected: String,
        /// What the measure produced.
        found: DataType,
    },

    /// The plan references columns, expressions or outputs that do not exist.
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    /// Expression evaluation failed.
    #[error("expression error: {0}")]
    Expression(String),

    /// An accumulator overflowed its result type.
    #[error("numeric overflow: {0}")]
    NumericOverflow(String),

    /// A single peer group exceeded the configured buffer limit.
    #[error("peer group too large: {actual} rows exceeds limit of {limit}")]
    PeerGroupTooLarge {
        /// Rows buffered when the limit was hit.
        actual: usize,
        /// The configured limit.
        limit: usize,
    },

    /// The query was cancelled.
    #[error("query cancelled")]
    Cancelled,

    /// An operator was driven out of its lifecycle order.
    #[error("invalid operator state: {0}")]
    InvalidState(String),
}

impl ExecError {
    /// Creates a type mismatch error.
    #[must_use]
    pub fn type_mismatch(
        function: impl Into<String>,
        expected: impl Into<String>,
        found: DataType,
    ) -> Self {
        Self::TypeMismatch { function: function.into(), expected: expected.into(), found }
    }

    /// Returns `true` if this error is raised before execution starts.
    #[must_use]
    pub const fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedAggregateKind(_) | Self::TypeMismatch { .. } | Self::InvalidPlan(_)
        )
    }
}

impl From<CoreError> for ExecError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Overflow(msg) => Self::NumericOverflow(msg),
            other => Self::Expression(other.to_string()),
        }
    }
}

/// Result type for execution operations.
pub type ExecResult<T> = Result<T, ExecError>;
