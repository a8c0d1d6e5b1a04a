//! Query execution engine.
//!
//! # Architecture
//!
//! The execution engine uses a **pull-based iterator model** where each
//! operator implements the [`Operator`] trait with `open()`, `next()`,
//! and `close()` methods. Data flows from bottom to top of the operator tree.
//!
//! # Modules
//!
//! - [`operators`] - Concrete operator implementations
//! - [`window`] - Key comparison, boundary detection and aggregate state
//!   used by the window operator
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use cascadb_core::{DataType, Value};
//! use cascadb_query::exec::operators::{ValuesOp, WindowAggregateOp};
//! use cascadb_query::exec::{ExecutionContext, Operator, Schema};
//! use cascadb_query::plan::{AggregateKind, ExprArena, SortKey, WindowAggregate, WindowPlan};
//!
//! let schema = Arc::new(Schema::from(vec![("a", DataType::Integer), ("b", DataType::Integer)]));
//! let rows = vec![
//!     vec![Value::Int(1), Value::Int(10)],
//!     vec![Value::Int(1), Value::Int(10)],
//!     vec![Value::Int(1), Value::Int(20)],
//! ];
//!
//! let mut exprs = ExprArena::new();
//! let a = exprs.column(0);
//! let b = exprs.column(1);
//! let plan = WindowPlan::new(vec![a], vec![SortKey::asc(b)])
//!     .with_aggregate(WindowAggregate::new(AggregateKind::Rank, "r"));
//!
//! let input = Box::new(ValuesOp::new(schema, rows));
//! let mut op = WindowAggregateOp::new(&plan, Arc::new(exprs), input)?;
//!
//! let ctx = ExecutionContext::new();
//! op.open(&ctx)?;
//! let mut ranks = Vec::new();
//! while let Some(row) = op.next()? {
//!     ranks.push(row.get_by_name("r").cloned());
//! }
//! op.close()?;
//!
//! assert_eq!(ranks, vec![Some(Value::Int(1)), Some(Value::Int(1)), Some(Value::Int(3))]);
//! # Ok::<(), cascadb_query::ExecError>(())
//! ```

mod context;
mod operator;
mod row;

pub mod operators;
pub mod window;

// Re-exports
pub use context::{CancellationToken, ExecutionConfig, ExecutionContext, ExecutionStats};
pub use operator::{BoxedOperator, Lifecycle, Operator, OperatorResult, OperatorState};
pub use row::{Field, Row, RowView, Schema};
