//! Expression references and the evaluator seam.
//!
//! Window plans never embed expression syntax. They refer to expressions by
//! [`ExprId`] and the executor asks an [`ExpressionEvaluator`] for values and
//! types. [`ExprArena`] is a small evaluator over [`ScalarExpr`] trees that
//! covers column references, literals, arithmetic and `abs`; engines with
//! their own expression layer implement the trait directly.

use std::fmt;

use cascadb_core::{CoreError, DataType, Value};
use serde::{Deserialize, Serialize};

use crate::error::{ExecError, ExecResult};
use crate::exec::{Row, Schema};

/// A reference to an expression owned by an [`ExpressionEvaluator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExprId(pub u32);

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// Evaluates expressions by reference.
///
/// Evaluation must be deterministic and side-effect free: the executor may
/// evaluate the same expression on the same row more than once.
pub trait ExpressionEvaluator: Send + Sync {
    /// Evaluates `expr` against `row`.
    fn evaluate(&self, expr: ExprId, row: &Row) -> ExecResult<Value>;

    /// Returns the result type of `expr` over rows of `schema`.
    ///
    /// Fails with [`ExecError::InvalidPlan`] if `expr` is unknown or refers to
    /// columns outside `schema`.
    fn data_type(&self, expr: ExprId, schema: &Schema) -> ExecResult<DataType>;
}

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
        };
        f.write_str(op)
    }
}

/// A scalar expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalarExpr {
    /// Column by position in the input row.
    Column(usize),
    /// A constant.
    Literal(Value),
    /// Arithmetic on two operands.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        left: Box<ScalarExpr>,
        /// Right operand.
        right: Box<ScalarExpr>,
    },
    /// Arithmetic negation.
    Negate(Box<ScalarExpr>),
    /// Absolute value.
    Abs(Box<ScalarExpr>),
}

impl ScalarExpr {
    /// Creates a column reference.
    #[must_use]
    pub const fn column(index: usize) -> Self {
        Self::Column(index)
    }

    /// Creates a literal.
    #[must_use]
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    /// Creates `self + other`.
    #[must_use]
    pub fn plus(self, other: Self) -> Self {
        self.binary(BinaryOp::Add, other)
    }

    /// Creates `self - other`.
    #[must_use]
    pub fn minus(self, other: Self) -> Self {
        self.binary(BinaryOp::Sub, other)
    }

    /// Creates `self * other`.
    #[must_use]
    pub fn times(self, other: Self) -> Self {
        self.binary(BinaryOp::Mul, other)
    }

    /// Creates `self / other`.
    #[must_use]
    pub fn divided_by(self, other: Self) -> Self {
        self.binary(BinaryOp::Div, other)
    }

    /// Creates `-self`.
    #[must_use]
    pub fn negate(self) -> Self {
        Self::Negate(Box::new(self))
    }

    /// Creates `abs(self)`.
    #[must_use]
    pub fn abs(self) -> Self {
        Self::Abs(Box::new(self))
    }

    fn binary(self, op: BinaryOp, other: Self) -> Self {
        Self::Binary { op, left: Box::new(self), right: Box::new(other) }
    }

    /// Evaluates this expression against a row.
    pub fn evaluate(&self, row: &Row) -> ExecResult<Value> {
        match self {
            Self::Column(index) => row.get(*index).cloned().ok_or_else(|| {
                ExecError::Expression(format!(
                    "column {index} out of range for row of width {}",
                    row.len()
                ))
            }),
            Self::Literal(value) => Ok(value.clone()),
            Self::Binary { op, left, right } => {
                let left = left.evaluate(row)?;
                let right = right.evaluate(row)?;
                Ok(evaluate_arithmetic(*op, &left, &right)?)
            }
            Self::Negate(operand) => match operand.evaluate(row)? {
                Value::Null => Ok(Value::Null),
                Value::Int(i) => i
                    .checked_neg()
                    .map(Value::Int)
                    .ok_or_else(|| ExecError::NumericOverflow(format!("-({i})"))),
                Value::Float(f) => Ok(Value::Float(-f)),
                other => {
                    Err(CoreError::type_mismatch_with_value("numeric", other.type_name(), &other)
                        .into())
                }
            },
            Self::Abs(operand) => match operand.evaluate(row)? {
                Value::Null => Ok(Value::Null),
                Value::Int(i) => i
                    .checked_abs()
                    .map(Value::Int)
                    .ok_or_else(|| ExecError::NumericOverflow(format!("abs({i})"))),
                Value::Float(f) => Ok(Value::Float(f.abs())),
                other => {
                    Err(CoreError::type_mismatch_with_value("numeric", other.type_name(), &other)
                        .into())
                }
            },
        }
    }

    /// Infers the result type of this expression over `schema`.
    pub fn data_type(&self, schema: &Schema) -> ExecResult<DataType> {
        match self {
            Self::Column(index) => schema.data_type(*index).ok_or_else(|| {
                ExecError::InvalidPlan(format!(
                    "column {index} out of range for input of {} columns",
                    schema.len()
                ))
            }),
            Self::Literal(value) => Ok(value.data_type()),
            Self::Binary { op, left, right } => {
                let l = left.data_type(schema)?;
                let r = right.data_type(schema)?;
                l.numeric_result(r).ok_or_else(|| {
                    let found = if l.is_numeric() || l == DataType::Any { r } else { l };
                    ExecError::type_mismatch(op.to_string(), "numeric operands", found)
                })
            }
            Self::Negate(operand) => match operand.data_type(schema)? {
                ty @ (DataType::Integer | DataType::Float | DataType::Any) => Ok(ty),
                other => Err(ExecError::type_mismatch("-", "numeric operand", other)),
            },
            Self::Abs(operand) => match operand.data_type(schema)? {
                ty @ (DataType::Integer | DataType::Float | DataType::Any) => Ok(ty),
                other => Err(ExecError::type_mismatch("abs", "numeric operand", other)),
            },
        }
    }
}

/// Applies an arithmetic operator with SQL NULL propagation.
///
/// Integer arithmetic is checked; overflow and integer division by zero are
/// errors rather than wrapped or NULL results.
fn evaluate_arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, CoreError> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::Int(a), Value::Int(b)) => {
            let result = match op {
                BinaryOp::Add => a.checked_add(*b),
                BinaryOp::Sub => a.checked_sub(*b),
                BinaryOp::Mul => a.checked_mul(*b),
                BinaryOp::Div | BinaryOp::Mod if *b == 0 => return Err(CoreError::DivisionByZero),
                BinaryOp::Div => a.checked_div(*b),
                BinaryOp::Mod => a.checked_rem(*b),
            };
            result.map(Value::Int).ok_or_else(|| CoreError::Overflow(format!("{a} {op} {b}")))
        }
        _ => match (left.to_f64(), right.to_f64()) {
            (Some(a), Some(b)) => Ok(Value::Float(match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                BinaryOp::Mod => a % b,
            })),
            _ => {
                let bad = if left.to_f64().is_none() { left } else { right };
                Err(CoreError::type_mismatch_with_value("numeric", bad.type_name(), bad))
            }
        },
    }
}

/// An evaluator owning a list of [`ScalarExpr`] trees.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExprArena {
    exprs: Vec<ScalarExpr>,
}

impl ExprArena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an expression and returns its reference.
    pub fn add(&mut self, expr: ScalarExpr) -> ExprId {
        let id = ExprId(u32::try_from(self.exprs.len()).unwrap_or(u32::MAX));
        self.exprs.push(expr);
        id
    }

    /// Adds a column reference and returns its expression id.
    pub fn column(&mut self, index: usize) -> ExprId {
        self.add(ScalarExpr::Column(index))
    }

    /// Looks up an expression.
    #[must_use]
    pub fn get(&self, id: ExprId) -> Option<&ScalarExpr> {
        self.exprs.get(id.0 as usize)
    }

    /// Returns the number of expressions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    /// Returns true if the arena holds no expressions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    fn lookup(&self, id: ExprId) -> ExecResult<&ScalarExpr> {
        self.get(id).ok_or_else(|| ExecError::InvalidPlan(format!("unknown expression {id}")))
    }
}

impl ExpressionEvaluator for ExprArena {
    fn evaluate(&self, expr: ExprId, row: &Row) -> ExecResult<Value> {
        self.lookup(expr)?.evaluate(row)
    }

    fn data_type(&self, expr: ExprId, schema: &Schema) -> ExecResult<DataType> {
        self.lookup(expr)?.data_type(schema)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn row(values: Vec<Value>) -> Row {
        let schema = Arc::new(Schema::from(vec![
            ("a", DataType::Integer),
            ("b", DataType::Integer),
            ("s", DataType::Text),
        ]));
        Row::new(schema, values)
    }

    #[test]
    fn column_and_literal() {
        let r = row(vec![Value::Int(1), Value::Int(2), Value::from("x")]);
        assert_eq!(ScalarExpr::column(2).evaluate(&r).unwrap(), Value::from("x"));
        assert_eq!(ScalarExpr::literal(9i64).evaluate(&r).unwrap(), Value::Int(9));
    }

    #[test]
    fn arithmetic_promotes_and_propagates_null() {
        let r = row(vec![Value::Int(3), Value::Null, Value::from("x")]);
        let sum = ScalarExpr::column(0).plus(ScalarExpr::literal(0.5));
        assert_eq!(sum.evaluate(&r).unwrap(), Value::Float(3.5));

        let with_null = ScalarExpr::column(0).times(ScalarExpr::column(1));
        assert_eq!(with_null.evaluate(&r).unwrap(), Value::Null);
    }

    #[test]
    fn integer_overflow_is_an_error() {
        let r = row(vec![Value::Int(i64::MAX), Value::Int(1), Value::Null]);
        let expr = ScalarExpr::column(0).plus(ScalarExpr::column(1));
        assert!(matches!(expr.evaluate(&r), Err(ExecError::NumericOverflow(_))));
    }

    #[test]
    fn integer_division_by_zero_is_an_error() {
        let r = row(vec![Value::Int(4), Value::Int(0), Value::Null]);
        let expr = ScalarExpr::column(0).divided_by(ScalarExpr::column(1));
        assert!(matches!(expr.evaluate(&r), Err(ExecError::Expression(_))));
    }

    #[test]
    fn arithmetic_on_text_fails() {
        let r = row(vec![Value::Int(4), Value::Int(0), Value::from("x")]);
        let expr = ScalarExpr::column(2).minus(ScalarExpr::column(0));
        assert!(matches!(expr.evaluate(&r), Err(ExecError::Expression(_))));
    }

    #[test]
    fn negate() {
        let r = row(vec![Value::Int(4), Value::Int(i64::MIN), Value::Null]);
        assert_eq!(ScalarExpr::column(0).negate().evaluate(&r).unwrap(), Value::Int(-4));
        assert!(ScalarExpr::column(1).negate().evaluate(&r).is_err());
    }

    #[test]
    fn abs() {
        let r = row(vec![Value::Int(4), Value::Int(i64::MIN), Value::from("x")]);
        let distance = ScalarExpr::literal(1i64).minus(ScalarExpr::column(0));
        assert_eq!(distance.abs().evaluate(&r).unwrap(), Value::Int(3));
        assert_eq!(ScalarExpr::literal(-2.5).abs().evaluate(&r).unwrap(), Value::Float(2.5));
        assert_eq!(ScalarExpr::literal(Value::Null).abs().evaluate(&r).unwrap(), Value::Null);
        assert!(matches!(
            ScalarExpr::column(1).abs().evaluate(&r),
            Err(ExecError::NumericOverflow(_))
        ));
        assert!(matches!(ScalarExpr::column(2).abs().evaluate(&r), Err(ExecError::Expression(_))));

        assert_eq!(ScalarExpr::column(0).abs().data_type(r.schema()).unwrap(), DataType::Integer);
        assert_eq!(
            ScalarExpr::column(2).abs().data_type(r.schema()),
            Err(ExecError::type_mismatch("abs", "numeric operand", DataType::Text))
        );
    }

    #[test]
    fn abs_reads_from_json() {
        let expr: ScalarExpr = serde_json::from_str(r#"{"Abs":{"Negate":{"Column":0}}}"#).unwrap();
        assert_eq!(expr, ScalarExpr::column(0).negate().abs());
    }

    #[test]
    fn type_inference() {
        let r = row(vec![Value::Null, Value::Null, Value::Null]);
        let schema = r.schema();
        let int_sum = ScalarExpr::column(0).plus(ScalarExpr::column(1));
        assert_eq!(int_sum.data_type(schema).unwrap(), DataType::Integer);

        let float_sum = ScalarExpr::column(0).plus(ScalarExpr::literal(1.5));
        assert_eq!(float_sum.data_type(schema).unwrap(), DataType::Float);

        let text_sum = ScalarExpr::column(0).plus(ScalarExpr::column(2));
        assert_eq!(
            text_sum.data_type(schema),
            Err(ExecError::type_mismatch("+", "numeric operands", DataType::Text))
        );

        assert!(matches!(
            ScalarExpr::column(7).data_type(schema),
            Err(ExecError::InvalidPlan(_))
        ));
    }

    #[test]
    fn arena_lookup() {
        let mut arena = ExprArena::new();
        let a = arena.column(0);
        let b = arena.add(ScalarExpr::column(0).plus(ScalarExpr::column(1)));
        assert_eq!(arena.len(), 2);
        assert_eq!(a, ExprId(0));
        assert_eq!(b.to_string(), "$1");

        let r = row(vec![Value::Int(1), Value::Int(2), Value::Null]);
        assert_eq!(arena.evaluate(b, &r).unwrap(), Value::Int(3));
        assert!(matches!(arena.evaluate(ExprId(5), &r), Err(ExecError::InvalidPlan(_))));
    }
}
