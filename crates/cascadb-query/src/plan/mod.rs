//! Plan descriptions consumed by the executor.
//!
//! Parsing and planning happen elsewhere; this module holds only the shapes
//! the executor needs: expression references and the window node.

mod expr;
mod window;

pub use expr::{BinaryOp, ExprArena, ExprId, ExpressionEvaluator, ScalarExpr};
pub use window::{
    AggregateKind, ColumnSource, OutputColumn, SortKey, WindowAggregate, WindowPlan,
};
