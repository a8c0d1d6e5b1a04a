//! LIMIT / OFFSET over a row stream.
//!
//! Once the limit is reached the operator stops pulling from its input, so a
//! window operator below it never finishes its current partition.

use std::sync::Arc;

use crate::exec::context::ExecutionContext;
use crate::exec::operator::{BoxedOperator, Lifecycle, Operator, OperatorResult, OperatorState};
use crate::exec::row::{Row, Schema};

/// Skips the first `offset` rows of its input and returns at most `limit`.
pub struct LimitOp {
    lifecycle: Lifecycle,
    input: BoxedOperator,
    limit: Option<usize>,
    offset: usize,
    /// Input rows still to discard in the current stream.
    to_skip: usize,
    /// Rows still allowed out in the current stream, `None` for no limit.
    remaining: Option<usize>,
}

impl LimitOp {
    /// Creates a limit operator. `None` means no limit or no offset.
    #[must_use]
    pub fn new(limit: Option<usize>, offset: Option<usize>, input: BoxedOperator) -> Self {
        let offset = offset.unwrap_or(0);
        Self {
            lifecycle: Lifecycle::new(input.schema()),
            input,
            limit,
            offset,
            to_skip: offset,
            remaining: limit,
        }
    }

    /// Returns at most `limit` rows.
    #[must_use]
    pub fn limit(limit: usize, input: BoxedOperator) -> Self {
        Self::new(Some(limit), None, input)
    }

    /// Skips the first `offset` rows.
    #[must_use]
    pub fn offset(offset: usize, input: BoxedOperator) -> Self {
        Self::new(None, Some(offset), input)
    }
}

impl Operator for LimitOp {
    fn open(&mut self, ctx: &ExecutionContext) -> OperatorResult<()> {
        self.input.open(ctx)?;
        self.to_skip = self.offset;
        self.remaining = self.limit;
        self.lifecycle.start();
        Ok(())
    }

    fn next(&mut self) -> OperatorResult<Option<Row>> {
        if !self.lifecycle.poll(self.name())? {
            return Ok(None);
        }
        if self.remaining == Some(0) {
            return Ok(self.lifecycle.drain());
        }

        loop {
            let Some(row) = self.lifecycle.guard(self.input.next())? else {
                return Ok(self.lifecycle.drain());
            };
            if self.to_skip > 0 {
                self.to_skip -= 1;
                continue;
            }
            if let Some(remaining) = self.remaining.as_mut() {
                *remaining -= 1;
            }
            return Ok(self.lifecycle.emit(row));
        }
    }

    fn close(&mut self) -> OperatorResult<()> {
        self.input.close()?;
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
        "Limit"
    }
}
