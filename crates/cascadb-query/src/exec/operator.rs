//! The pull-based operator contract.
//!
//! Every stage of a window pipeline (source, window node, limit) is an
//! [`Operator`]. [`Lifecycle`] holds the bookkeeping they share: the output
//! schema, the stream state and the number of rows handed downstream.

use std::sync::Arc;

use crate::error::ExecError;

use super::context::ExecutionContext;
use super::row::{Row, Schema};

/// Result type for operator operations.
pub type OperatorResult<T> = Result<T, ExecError>;

/// Where an operator's output stream stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorState {
    /// Built, not yet opened.
    Created,
    /// Opened; `next()` may still yield rows.
    Streaming,
    /// The stream ended normally; `next()` keeps returning `None`.
    Drained,
    /// `next()` returned an error; the stream is over and the error repeats.
    Failed,
    /// Closed; `open()` starts a fresh stream.
    Closed,
}

/// A stage of a pull-based pipeline.
///
/// A consumer calls [`open`](Self::open) once, then [`next`](Self::next)
/// until it returns `Ok(None)` or an error, then [`close`](Self::close).
/// An error ends the stream: no row is produced after it, and later calls to
/// `next()` return the same error. A consumer may close early without
/// draining; partial state is discarded.
///
/// Operators are `Send` so a pipeline can be built on one thread and run on
/// another. They are not `Sync`.
pub trait Operator: Send {
    /// Opens the operator and its inputs.
    ///
    /// Operators that need the context while producing rows capture its
    /// shared handles (cancellation token, statistics) here.
    fn open(&mut self, ctx: &ExecutionContext) -> OperatorResult<()>;

    /// Returns the next row, or `None` once the stream is drained.
    fn next(&mut self) -> OperatorResult<Option<Row>>;

    /// Closes the operator and its inputs.
    fn close(&mut self) -> OperatorResult<()>;

    /// Returns the output schema.
    fn schema(&self) -> Arc<Schema>;

    /// Returns the stream state.
    fn state(&self) -> OperatorState;

    /// Returns the operator's display name.
    fn name(&self) -> &'static str;
}

/// A boxed operator for dynamic dispatch.
pub type BoxedOperator = Box<dyn Operator>;

/// Stream bookkeeping shared by operator implementations.
///
/// A typical `next()` reads:
///
/// ```ignore
/// if !self.lifecycle.poll(self.name())? {
///     return Ok(None);
/// }
/// match self.lifecycle.guard(self.input.next())? {
///     Some(row) => Ok(self.lifecycle.emit(row)),
///     None => Ok(self.lifecycle.drain()),
/// }
/// ```
#[derive(Debug)]
pub struct Lifecycle {
    schema: Arc<Schema>,
    state: OperatorState,
    /// The error that ended the stream, returned again on every later poll.
    failure: Option<ExecError>,
    rows_emitted: u64,
}

impl Lifecycle {
    /// Creates the bookkeeping for an operator producing `schema`.
    #[must_use]
    pub fn new(schema: Arc<Schema>) -> Self {
        Self { schema, state: OperatorState::Created, failure: None, rows_emitted: 0 }
    }

    /// Returns the output schema.
    #[must_use]
    pub fn schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    /// Returns the stream state.
    #[must_use]
    pub const fn state(&self) -> OperatorState {
        self.state
    }

    /// Starts a fresh stream, forgetting any earlier failure.
    pub fn start(&mut self) {
        self.state = OperatorState::Streaming;
        self.failure = None;
        self.rows_emitted = 0;
    }

    /// Marks the operator closed.
    pub fn stop(&mut self) {
        self.state = OperatorState::Closed;
    }

    /// Checks whether `next()` may produce a row.
    ///
    /// Returns `Ok(true)` while streaming and `Ok(false)` once drained.
    ///
    /// # Errors
    ///
    /// Returns the stored error if the stream failed, and
    /// [`ExecError::InvalidState`] before `open()` or after `close()`.
    pub fn poll(&self, operator: &str) -> OperatorResult<bool> {
        match self.state {
            OperatorState::Streaming => Ok(true),
            OperatorState::Drained => Ok(false),
            OperatorState::Failed => Err(self.failure.clone().unwrap_or_else(|| {
                ExecError::InvalidState(format!("{operator}: stream aborted"))
            })),
            state @ (OperatorState::Created | OperatorState::Closed) => {
                Err(ExecError::InvalidState(format!("{operator}: next() called while {state:?}")))
            }
        }
    }

    /// Passes `result` through, ending the stream if it is an error.
    pub fn guard<T>(&mut self, result: OperatorResult<T>) -> OperatorResult<T> {
        if let Err(err) = &result {
            self.state = OperatorState::Failed;
            self.failure = Some(err.clone());
        }
        result
    }

    /// Counts `row` as handed downstream.
    pub fn emit(&mut self, row: Row) -> Option<Row> {
        self.rows_emitted += 1;
        Some(row)
    }

    /// Ends the stream normally.
    pub fn drain(&mut self) -> Option<Row> {
        self.state = OperatorState::Drained;
        None
    }

    /// Rows handed downstream since the last `start()`.
    #[must_use]
    pub const fn rows_emitted(&self) -> u64 {
        self.rows_emitted
    }
}
