//! Declared column and expression types.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Value;

/// The declared type of a column or expression result.
///
/// Types are checked when a plan is bound to its input schema, so most
/// mismatches surface before any row is read. [`DataType::Any`] is used for
/// columns whose type is not known up front; values in such columns are
/// checked as they arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// `true` / `false`.
    Boolean,
    /// 64-bit signed integer.
    Integer,
    /// 64-bit floating point.
    Float,
    /// UTF-8 text.
    Text,
    /// Unknown until runtime.
    Any,
}

impl DataType {
    /// Returns `true` for types that support arithmetic.
    #[inline]
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }

    /// Returns `true` if a column of this type may hold `value`.
    ///
    /// NULL fits every type.
    #[must_use]
    pub fn admits(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) | (Self::Any, _) => true,
            (Self::Boolean, Value::Bool(_))
            | (Self::Integer, Value::Int(_))
            | (Self::Float, Value::Float(_))
            | (Self::Text, Value::String(_)) => true,
            _ => false,
        }
    }

    /// Returns the result type of an arithmetic operation on two operands.
    ///
    /// Returns `None` when either side is not numeric.
    #[must_use]
    pub const fn numeric_result(self, other: Self) -> Option<Self> {
        match (self, other) {
            (Self::Integer, Self::Integer) => Some(Self::Integer),
            (Self::Integer | Self::Float, Self::Integer | Self::Float) => Some(Self::Float),
            (Self::Any, Self::Any | Self::Integer | Self::Float)
            | (Self::Integer | Self::Float, Self::Any) => Some(Self::Any),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Boolean => "BOOLEAN",
            Self::Integer => "BIGINT",
            Self::Float => "FLOAT",
            Self::Text => "VARCHAR",
            Self::Any => "ANY",
        };
        f.write_str(name)
    }
}
