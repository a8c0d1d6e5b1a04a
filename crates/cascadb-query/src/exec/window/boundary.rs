//! Partition and peer-group boundary detection over sorted input.

use std::cmp::Ordering;
use std::fmt::Write;

use cascadb_core::Value;

use super::keys::KeyComparator;
use crate::error::{ExecError, ExecResult};

/// How a row relates to the row before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// First row of a partition (including the first row of the input).
    NewPartition,
    /// First row of a new peer group within the current partition.
    NewPeerGroup,
    /// Same partition and peer group as the previous row.
    SamePeerGroup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrackerState {
    Start,
    InPartition,
}

/// Classifies each row transition of a sorted stream.
///
/// The tracker keeps the previous row's keys by swapping them with the
/// caller's buffers, so steady-state classification allocates nothing.
#[derive(Debug, Clone)]
pub struct BoundaryTracker {
    partition_cmp: KeyComparator,
    order_cmp: KeyComparator,
    state: TrackerState,
    prev_partition: Vec<Value>,
    prev_order: Vec<Value>,
    /// Zero-based index of the current partition.
    partition_index: u64,
    verify: bool,
}

impl BoundaryTracker {
    /// Creates a tracker.
    ///
    /// `partition_len` is the number of PARTITION BY keys; they are always
    /// compared ascending. `order_cmp` describes the ORDER BY keys.
    #[must_use]
    pub fn new(partition_len: usize, order_cmp: KeyComparator) -> Self {
        Self {
            partition_cmp: KeyComparator::ascending(partition_len),
            prev_partition: Vec::with_capacity(partition_len),
            prev_order: Vec::with_capacity(order_cmp.len()),
            order_cmp,
            state: TrackerState::Start,
            partition_index: 0,
            verify: false,
        }
    }

    /// Enables checking that partition keys strictly increase and order
    /// keys strictly advance at every boundary.
    #[must_use]
    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Returns the zero-based index of the current partition.
    #[must_use]
    pub const fn partition_index(&self) -> u64 {
        self.partition_index
    }

    /// Returns to the start state, forgetting the previous row.
    pub fn reset(&mut self) {
        self.state = TrackerState::Start;
        self.partition_index = 0;
        self.prev_partition.clear();
        self.prev_order.clear();
    }

    /// Classifies a row by its extracted keys.
    ///
    /// On success the tracker takes ownership of the keys by swapping them
    /// into its own buffers; the caller's buffers come back holding stale
    /// values and are meant to be refilled for the next row. On error the
    /// tracker is left unchanged.
    pub fn classify(
        &mut self,
        partition_key: &mut Vec<Value>,
        order_key: &mut Vec<Value>,
    ) -> ExecResult<Boundary> {
        let boundary = match self.state {
            TrackerState::Start => {
                self.state = TrackerState::InPartition;
                self.partition_index = 0;
                Boundary::NewPartition
            }
            TrackerState::InPartition => {
                if !self.partition_cmp.equal(partition_key, &self.prev_partition) {
                    if self.verify {
                        self.check_advances(
                            &self.partition_cmp,
                            partition_key,
                            &self.prev_partition,
                            "partition key",
                        )?;
                    }
                    self.partition_index += 1;
                    Boundary::NewPartition
                } else if !self.order_cmp.equal(order_key, &self.prev_order) {
                    if self.verify {
                        self.check_advances(
                            &self.order_cmp,
                            order_key,
                            &self.prev_order,
                            "order key",
                        )?;
                    }
                    Boundary::NewPeerGroup
                } else {
                    Boundary::SamePeerGroup
                }
            }
        };

        std::mem::swap(&mut self.prev_partition, partition_key);
        std::mem::swap(&mut self.prev_order, order_key);
        Ok(boundary)
    }

    fn check_advances(
        &self,
        cmp: &KeyComparator,
        current: &[Value],
        previous: &[Value],
        what: &str,
    ) -> ExecResult<()> {
        if cmp.compare(current, previous) == Ordering::Greater {
            return Ok(());
        }
        Err(ExecError::PreconditionViolation {
            partition: self.partition_index,
            message: format!(
                "{what} {} arrived after {}",
                display_key(current),
                display_key(previous)
            ),
        })
    }
}

fn display_key(key: &[Value]) -> String {
    let mut out = String::from("(");
    for (i, value) in key.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{value}");
    }
    out.push(')');
    out
}
