//! Core data types for `CascaDB`.
//!
//! This module defines the scalar values carried by rows and the column
//! types used to validate plans before execution.

mod data_type;
mod value;

#[cfg(test)]
mod proptest_tests;

pub use data_type::DataType;
pub use value::Value;
