//! `CascaDB` Core
//!
//! This crate provides the scalar types shared by every layer of the
//! `CascaDB` query engine.
//!
//! # Overview
//!
//! - **Values**: [`Value`], the dynamically typed scalar flowing through rows
//! - **Types**: [`DataType`], the declared type of a column or expression
//! - **Ordering**: [`Value::sql_cmp`], the semantic ordering used by sorts,
//!   window keys and MIN/MAX
//!
//! # Example
//!
//! ```
//! use std::cmp::Ordering;
//!
//! use cascadb_core::{DataType, Value};
//!
//! let a: Value = 3i64.into();
//! let b: Value = 2.5f64.into();
//!
//! assert_eq!(a.data_type(), DataType::Integer);
//! assert_eq!(a.sql_cmp(&b), Ordering::Greater);
//! assert!(Value::Null.is_null());
//! ```
//!
//! # Modules
//!
//! - [`types`] - [`Value`] and [`DataType`]
//! - [`error`] - Error types ([`CoreError`])

// Deny unwrap in library code to ensure proper error handling
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod types;

pub use error::{CoreError, CoreResult};
pub use types::{DataType, Value};
