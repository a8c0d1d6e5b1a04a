//! Concrete operator implementations.
//!
//! # Operator Categories
//!
//! - **Source operators**: [`values`] - Inline rows and empty input
//! - **Window operators**: [`window`] - Streaming window aggregates
//! - **Limit operators**: [`limit`] - Limit/offset

pub mod limit;
pub mod values;
pub mod window;

// Re-exports for convenience
pub use limit::LimitOp;
pub use values::{EmptyOp, ValuesOp};
pub use window::WindowAggregateOp;
