//! Streaming window aggregate operator.
//!
//! Evaluates RANK, DENSE_RANK, ROW_NUMBER and cumulative COUNT/SUM/MIN/MAX/AVG
//! over input that is already sorted by the partition keys and then by the
//! order keys. Only the current peer group is buffered: its rows are held
//! until the next peer group (or partition, or end of input) starts, then
//! emitted with the group's final values.

use std::collections::VecDeque;
use std::sync::Arc;

use cascadb_core::Value;
use tracing::{debug, trace, warn};

use crate::error::{ExecError, ExecResult};
use crate::exec::context::{CancellationToken, ExecutionContext, ExecutionStats};
use crate::exec::operator::{BoxedOperator, Lifecycle, Operator, OperatorResult, OperatorState};
use crate::exec::row::{Row, RowView, Schema};
use crate::exec::window::{Boundary, BoundaryTracker, KeyComparator, OutputLayout, WindowFunctor};
use crate::plan::{ExprId, ExpressionEvaluator, WindowPlan};

/// Window aggregate operator.
///
/// Produces exactly one output row per input row, in input order. Rows of
/// one peer group all see the value computed over the partition prefix that
/// ends with that peer group.
pub struct WindowAggregateOp {
    /// Stream state; a failed pull latches it.
    lifecycle: Lifecycle,
    /// Input operator, sorted by partition keys then order keys.
    input: BoxedOperator,
    /// Evaluates key and measure expressions.
    evaluator: Arc<dyn ExpressionEvaluator>,
    /// PARTITION BY expressions.
    partition_by: Vec<ExprId>,
    /// ORDER BY expressions.
    order_by: Vec<ExprId>,
    /// ORDER BY directions.
    order_cmp: KeyComparator,
    /// Measure expression per aggregate.
    measures: Vec<Option<ExprId>>,
    /// Aggregate state per aggregate.
    functors: Vec<WindowFunctor>,
    /// Output row construction.
    layout: OutputLayout,
    /// Partition and peer group detection.
    tracker: BoundaryTracker,
    /// Reusable buffer for the current row's partition key.
    partition_key: Vec<Value>,
    /// Reusable buffer for the current row's order key.
    order_key: Vec<Value>,
    /// Reusable buffer for the current row's measures.
    measure_values: Vec<Value>,
    /// Rows of the current, still open peer group.
    peer_group: Vec<Row>,
    /// Finished rows waiting to be returned.
    ready: VecDeque<Row>,
    /// Whether the input is exhausted.
    input_done: bool,
    /// Cancellation handle captured at open.
    cancellation: CancellationToken,
    /// Statistics sink captured at open.
    stats: Option<Arc<ExecutionStats>>,
    /// Peer group buffer limit (0 for none).
    max_peer_group_rows: usize,
    /// Whether the current peer group already triggered a size warning.
    warned_large_group: bool,
}

impl WindowAggregateOp {
    /// Creates a window aggregate operator.
    ///
    /// The plan is validated against the input schema here, before any row
    /// is pulled.
    ///
    /// # Errors
    ///
    /// - [`ExecError::InvalidPlan`] if the plan has no aggregates or refers to
    ///   expressions or columns that do not exist
    /// - [`ExecError::UnsupportedAggregateKind`] for aggregates with no window form
    /// - [`ExecError::TypeMismatch`] for measures of the wrong type
    pub fn new(
        plan: &WindowPlan,
        evaluator: Arc<dyn ExpressionEvaluator>,
        input: BoxedOperator,
    ) -> ExecResult<Self> {
        if plan.aggregates.is_empty() {
            return Err(ExecError::InvalidPlan("window node computes no aggregates".into()));
        }

        let input_schema = input.schema();
        let partition_by = plan.partition_by.clone();
        let order_by: Vec<ExprId> = plan.order_by.iter().map(|key| key.expr).collect();
        for &expr in partition_by.iter().chain(&order_by) {
            evaluator.data_type(expr, &input_schema)?;
        }

        let mut functors = Vec::with_capacity(plan.aggregates.len());
        let mut measures = Vec::with_capacity(plan.aggregates.len());
        for aggregate in &plan.aggregates {
            let measure_type = aggregate
                .measure
                .map(|expr| evaluator.data_type(expr, &input_schema))
                .transpose()?;
            functors.push(WindowFunctor::for_kind(&aggregate.kind, measure_type)?);
            measures.push(aggregate.measure);
        }

        let result_types: Vec<_> = functors.iter().map(WindowFunctor::result_type).collect();
        let layout = OutputLayout::new(
            plan.output.as_deref(),
            &input_schema,
            &plan.aggregates,
            &result_types,
        )?;

        let order_cmp = KeyComparator::for_sort_keys(&plan.order_by);
        let tracker = BoundaryTracker::new(partition_by.len(), order_cmp.clone());

        Ok(Self {
            lifecycle: Lifecycle::new(layout.schema()),
            input,
            evaluator,
            partition_key: Vec::with_capacity(partition_by.len()),
            order_key: Vec::with_capacity(order_by.len()),
            measure_values: Vec::with_capacity(measures.len()),
            partition_by,
            order_by,
            order_cmp,
            measures,
            functors,
            layout,
            tracker,
            peer_group: Vec::new(),
            ready: VecDeque::new(),
            input_done: false,
            cancellation: CancellationToken::new(),
            stats: None,
            max_peer_group_rows: 0,
            warned_large_group: false,
        })
    }

    /// Pulls one input row and feeds it through the window state.
    fn pull(&mut self) -> ExecResult<()> {
        if self.cancellation.is_cancelled() {
            return Err(ExecError::Cancelled);
        }

        match self.input.next()? {
            Some(row) => {
                if let Some(stats) = &self.stats {
                    stats.record_rows_read(1);
                }
                self.consume(row)
            }
            None => {
                self.input_done = true;
                self.flush_peer_group();
                Ok(())
            }
        }
    }

    fn consume(&mut self, row: Row) -> ExecResult<()> {
        let view = RowView::new(&row, self.evaluator.as_ref());
        view.extract_keys_into(self.partition_by.iter().copied(), &mut self.partition_key)?;
        view.extract_keys_into(self.order_by.iter().copied(), &mut self.order_key)?;
        self.measure_values.clear();
        for measure in &self.measures {
            let value = match measure {
                Some(expr) => view.evaluate(*expr)?,
                None => Value::Null,
            };
            self.measure_values.push(value);
        }

        let boundary = self.tracker.classify(&mut self.partition_key, &mut self.order_key)?;
        match boundary {
            Boundary::NewPartition => {
                self.flush_peer_group();
                trace!(partition = self.tracker.partition_index(), "window partition started");
                if let Some(stats) = &self.stats {
                    stats.record_partition();
                    stats.record_peer_group();
                }
                self.functors.iter_mut().for_each(WindowFunctor::reset_partition);
            }
            Boundary::NewPeerGroup => {
                self.flush_peer_group();
                trace!(partition = self.tracker.partition_index(), "window peer group started");
                if let Some(stats) = &self.stats {
                    stats.record_peer_group();
                }
                self.functors.iter_mut().for_each(WindowFunctor::reset_peer_group);
            }
            Boundary::SamePeerGroup => {}
        }

        self.check_peer_group_size()?;

        for ((functor, measure), value) in
            self.functors.iter_mut().zip(&self.measures).zip(&self.measure_values)
        {
            functor.update(measure.map(|_| value))?;
        }
        self.peer_group.push(row);
        Ok(())
    }

    /// Fails if buffering one more row would exceed the peer group limit.
    fn check_peer_group_size(&mut self) -> ExecResult<()> {
        let limit = self.max_peer_group_rows;
        if limit == 0 {
            return Ok(());
        }

        let buffered = self.peer_group.len() + 1;
        if buffered > limit {
            return Err(ExecError::PeerGroupTooLarge { actual: buffered, limit });
        }
        if !self.warned_large_group && nearing_limit(buffered, limit) {
            warn!(
                buffered,
                limit,
                partition = self.tracker.partition_index(),
                "window peer group exceeds half of the buffer limit"
            );
            self.warned_large_group = true;
        }
        Ok(())
    }

    /// Emits the buffered peer group with its final window values.
    fn flush_peer_group(&mut self) {
        if self.peer_group.is_empty() {
            return;
        }

        let group_values: Vec<Value> = self.functors.iter().map(WindowFunctor::read).collect();
        for row in self.peer_group.drain(..) {
            let window_values = self
                .functors
                .iter_mut()
                .zip(&group_values)
                .map(|(functor, value)| {
                    if functor.varies_within_peer_group() {
                        functor.read_row()
                    } else {
                        value.clone()
                    }
                })
                .collect();
            self.ready.push_back(self.layout.build(row, window_values));
        }
        self.warned_large_group = false;
    }

    fn reset_state(&mut self) {
        self.tracker.reset();
        self.peer_group.clear();
        self.ready.clear();
        self.partition_key.clear();
        self.order_key.clear();
        self.measure_values.clear();
        self.input_done = false;
        self.warned_large_group = false;
    }
}

impl Operator for WindowAggregateOp {
    fn open(&mut self, ctx: &ExecutionContext) -> OperatorResult<()> {
        self.input.open(ctx)?;
        self.reset_state();
        self.tracker = BoundaryTracker::new(self.partition_by.len(), self.order_cmp.clone())
            .with_verification(ctx.config().verify_sort_order);
        self.cancellation = ctx.cancellation_token();
        self.stats = ctx.stats_handle();
        self.max_peer_group_rows = ctx.config().max_peer_group_rows;
        self.lifecycle.start();
        debug!(
            partition_keys = self.partition_by.len(),
            order_keys = self.order_by.len(),
            aggregates = self.functors.len(),
            verify_sort_order = ctx.config().verify_sort_order,
            "window aggregate opened"
        );
        Ok(())
    }

    fn next(&mut self) -> OperatorResult<Option<Row>> {
        if !self.lifecycle.poll(self.name())? {
            return Ok(None);
        }
        loop {
            if let Some(row) = self.ready.pop_front() {
                if let Some(stats) = &self.stats {
                    stats.record_rows_produced(1);
                }
                return Ok(self.lifecycle.emit(row));
            }
            if self.input_done {
                return Ok(self.lifecycle.drain());
            }
            // A row that fails part way has already touched some functors,
            // so the stream cannot resume after it.
            let pulled = self.pull();
            self.lifecycle.guard(pulled)?;
        }
    }

    fn close(&mut self) -> OperatorResult<()> {
        let pending = self.peer_group.len() + self.ready.len();
        self.input.close()?;
        self.reset_state();
        self.lifecycle.stop();
        debug!(
            rows_produced = self.lifecycle.rows_emitted(),
            discarded_rows = pending,
            "window aggregate closed"
        );
        Ok(())
    }

    fn schema(&self) -> Arc<Schema> {
        self.lifecycle.schema()
    }

    fn state(&self) -> OperatorState {
        self.lifecycle.state()
    }

    fn name(&self) -> &'static str {
        "WindowAggregate"
    }
}

/// Whether a peer group of `buffered` rows is past half of `limit`.
///
/// Limits below 2 leave no room between the first row and the limit, so they
/// never warn.
fn nearing_limit(buffered: usize, limit: usize) -> bool {
    limit >= 2 && buffered.saturating_mul(2) > limit
}
