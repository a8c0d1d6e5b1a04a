//! Building blocks of the streaming window aggregate.
//!
//! - [`keys`] - Lexicographic key comparison with per-key direction and null placement
//! - [`boundary`] - Partition and peer group detection over sorted input
//! - [`functor`] - Per-aggregate state machines
//! - [`output`] - Output row layout
//!
//! [`WindowAggregateOp`](crate::exec::operators::WindowAggregateOp) drives
//! these one row at a time.

pub mod boundary;
pub mod functor;
pub mod keys;
pub mod output;

#[cfg(test)]
mod proptest_tests;

pub use boundary::{Boundary, BoundaryTracker};
pub use functor::{SumAccumulator, WindowFunctor};
pub use keys::{KeyComparator, SortSpec};
pub use output::OutputLayout;
