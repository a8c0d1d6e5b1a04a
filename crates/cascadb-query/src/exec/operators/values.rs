//! Values and Empty operators.
//!
//! These operators produce inline data. They stand in for a table scan or an
//! upstream sort when feeding a window operator.

use std::sync::Arc;

use cascadb_core::Value;

use crate::error::ExecError;
use crate::exec::context::ExecutionContext;
use crate::exec::operator::{Lifecycle, Operator, OperatorResult, OperatorState};
use crate::exec::row::{Row, Schema};

/// Values operator - produces rows from inline data.
pub struct ValuesOp {
    lifecycle: Lifecycle,
    /// The rows to produce.
    rows: Vec<Vec<Value>>,
    /// Current row index.
    current: usize,
}

impl ValuesOp {
    /// Creates a new values operator.
    ///
    /// Rows must have as many values as the schema has columns; see
    /// [`try_new`](Self::try_new) for a checked constructor.
    #[must_use]
    pub fn new(schema: Arc<Schema>, rows: Vec<Vec<Value>>) -> Self {
        Self { lifecycle: Lifecycle::new(schema), rows, current: 0 }
    }

    /// Creates a values operator, checking every row's arity and that each
    /// value fits its column's declared type.
    pub fn try_new(schema: Arc<Schema>, rows: Vec<Vec<Value>>) -> OperatorResult<Self> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != schema.len() {
                return Err(ExecError::InvalidPlan(format!(
                    "values row {i} has {} columns, schema has {}",
                    row.len(),
                    schema.len()
                )));
            }
            for (value, field) in row.iter().zip(schema.fields()) {
                if !field.data_type().admits(value) {
                    return Err(ExecError::InvalidPlan(format!(
                        "values row {i}: {value} does not fit column {} of type {}",
                        field.name(),
                        field.data_type()
                    )));
                }
            }
        }
        Ok(Self::new(schema, rows))
    }

    /// Creates a values operator with untyped columns.
    #[must_use]
    pub fn with_columns<S: AsRef<str>>(columns: &[S], rows: Vec<Vec<Value>>) -> Self {
        Self::new(Arc::new(Schema::untyped(columns)), rows)
    }
}

impl Operator for ValuesOp {
    fn open(&mut self, _ctx: &ExecutionContext) -> OperatorResult<()> {
        self.current = 0;
        self.lifecycle.start();
        Ok(())
    }

    fn next(&mut self) -> OperatorResult<Option<Row>> {
        if !self.lifecycle.poll(self.name())? {
            return Ok(None);
        }
        let Some(values) = self.rows.get(self.current) else {
            return Ok(self.lifecycle.drain());
        };

        let row = Row::new(self.lifecycle.schema(), values.clone());
        self.current += 1;
        Ok(self.lifecycle.emit(row))
    }

    fn close(&mut self) -> OperatorResult<()> {
        self.lifecycle.stop();
        Ok(())
    }

    fn schema(&self) -> Arc<Schema> {
        self.lifecycle.schema()
    }

    fn state(&self) -> OperatorState {
        self.lifecycle.state()
    }

    fn name(&self) -> &'static str {
        "Values"
    }
}

/// Empty operator - produces no rows.
pub struct EmptyOp {
    lifecycle: Lifecycle,
}

impl EmptyOp {
    /// Creates a new empty operator.
    #[must_use]
    pub fn new(schema: Arc<Schema>) -> Self {
        Self { lifecycle: Lifecycle::new(schema) }
    }
}

impl Operator for EmptyOp {
    fn open(&mut self, _ctx: &ExecutionContext) -> OperatorResult<()> {
        self.lifecycle.start();
        Ok(())
    }

    fn next(&mut self) -> OperatorResult<Option<Row>> {
        self.lifecycle.poll(self.name())?;
        Ok(self.lifecycle.drain())
    }

    fn close(&mut self) -> OperatorResult<()> {
        self.lifecycle.stop();
        Ok(())
    }

    fn schema(&self) -> Arc<Schema> {
        self.lifecycle.schema()
    }

    fn state(&self) -> OperatorState {
        self.lifecycle.state()
    }

    fn name(&self) -> &'static str {
        "Empty"
    }
}
