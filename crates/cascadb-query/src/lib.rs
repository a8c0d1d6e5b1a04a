//! `CascaDB` Query
//!
//! This crate provides the streaming window-function executor for `CascaDB`.
//!
//! # Overview
//!
//! A window node consumes rows already sorted by its PARTITION BY keys and
//! then its ORDER BY keys, and appends one value per window aggregate to
//! every row:
//!
//! - **RANK** / **DENSE_RANK** / **ROW_NUMBER**
//! - cumulative **COUNT**, **SUM**, **MIN**, **MAX** and **AVG** over the
//!   partition up to and including the current peer group
//!
//! Execution is single pass and pull based. Only the current peer group is
//! held in memory.
//!
//! # Modules
//!
//! - [`plan`] - Window plan description and the expression evaluator seam
//! - [`exec`] - Operators, execution context and the window building blocks
//! - [`error`] - Error types for plan binding and execution
//!
//! # Quick Start
//!
//! Describe a window and parse aggregate identifiers:
//!
//! ```
//! use cascadb_query::plan::{AggregateKind, ExprId, SortKey, WindowAggregate, WindowPlan};
//!
//! let kind: AggregateKind = "AGGREGATE_WINDOWED_RANK".parse().unwrap();
//! let plan = WindowPlan::new(vec![ExprId(0)], vec![SortKey::asc(ExprId(1))])
//!     .with_aggregate(WindowAggregate::new(kind, "r"));
//!
//! assert_eq!(plan.to_string(), "Window: RANK() OVER (PARTITION BY $0 ORDER BY $1 ASC)");
//! ```
//!
//! See [`exec`] for running a plan.

// Deny unwrap in library code to ensure proper error handling
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod exec;
pub mod plan;

// Re-export commonly used items at the crate root
pub use error::{ExecError, ExecResult};
pub use exec::operators::WindowAggregateOp;
pub use exec::{ExecutionConfig, ExecutionContext, Operator, Row, Schema};
pub use plan::{AggregateKind, ExprArena, ExprId, SortKey, WindowAggregate, WindowPlan};
