//! Execution context for query execution.
//!
//! The execution context carries runtime configuration, cancellation and
//! the statistics operators record while they run.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Execution context for a query.
///
/// The context provides access to:
/// - Cancellation support
/// - Execution statistics
/// - Runtime configuration
#[derive(Debug)]
pub struct ExecutionContext {
    /// Shared cancellation flag.
    cancellation: CancellationToken,
    /// Execution statistics, shared with the operators that record them.
    stats: Arc<ExecutionStats>,
    /// Configuration options.
    config: ExecutionConfig,
}

impl ExecutionContext {
    /// Creates a new execution context with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ExecutionConfig::default())
    }

    /// Creates a context with the given configuration.
    #[must_use]
    pub fn with_config(config: ExecutionConfig) -> Self {
        Self {
            cancellation: CancellationToken::new(),
            stats: Arc::new(ExecutionStats::new()),
            config,
        }
    }

    /// Replaces the cancellation token, so that an outside handle can
    /// cancel this query.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Returns a handle that cancels this query from another thread.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Cancels the query execution.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Returns the execution statistics.
    #[must_use]
    pub fn stats(&self) -> &ExecutionStats {
        &self.stats
    }

    /// Returns a shared handle to the statistics if collection is enabled.
    #[must_use]
    pub fn stats_handle(&self) -> Option<Arc<ExecutionStats>> {
        self.config.collect_stats.then(|| Arc::clone(&self.stats))
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Execution statistics collected during query execution.
#[derive(Debug)]
pub struct ExecutionStats {
    /// Number of rows pulled from upstream.
    rows_read: AtomicU64,
    /// Number of rows produced.
    rows_produced: AtomicU64,
    /// Number of window partitions seen.
    partitions: AtomicU64,
    /// Number of window peer groups seen.
    peer_groups: AtomicU64,
}

impl ExecutionStats {
    /// Creates new execution statistics.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows_read: AtomicU64::new(0),
            rows_produced: AtomicU64::new(0),
            partitions: AtomicU64::new(0),
            peer_groups: AtomicU64::new(0),
        }
    }

    /// Records that rows were read.
    pub fn record_rows_read(&self, count: u64) {
        self.rows_read.fetch_add(count, Ordering::Relaxed);
    }

    /// Records that rows were produced.
    pub fn record_rows_produced(&self, count: u64) {
        self.rows_produced.fetch_add(count, Ordering::Relaxed);
    }

    /// Records that a window partition started.
    pub fn record_partition(&self) {
        self.partitions.fetch_add(1, Ordering::Relaxed);
    }

    /// Records that a window peer group started.
    pub fn record_peer_group(&self) {
        self.peer_groups.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of rows read.
    #[must_use]
    pub fn rows_read(&self) -> u64 {
        self.rows_read.load(Ordering::Relaxed)
    }

    /// Returns the number of rows produced.
    #[must_use]
    pub fn rows_produced(&self) -> u64 {
        self.rows_produced.load(Ordering::Relaxed)
    }

    /// Returns the number of partitions.
    #[must_use]
    pub fn partitions(&self) -> u64 {
        self.partitions.load(Ordering::Relaxed)
    }

    /// Returns the number of peer groups.
    #[must_use]
    pub fn peer_groups(&self) -> u64 {
        self.peer_groups.load(Ordering::Relaxed)
    }
}

impl Default for ExecutionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration options for query execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionConfig {
    /// Maximum rows a window operator may buffer for one peer group
    /// (0 for no limit).
    pub max_peer_group_rows: usize,
    /// Whether window operators check that their input is sorted.
    pub verify_sort_order: bool,
    /// Whether to collect statistics.
    pub collect_stats: bool,
}

impl ExecutionConfig {
    /// Default peer group buffer limit.
    pub const DEFAULT_MAX_PEER_GROUP_ROWS: usize = 1_000_000;

    /// Creates a new configuration with defaults.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_peer_group_rows: Self::DEFAULT_MAX_PEER_GROUP_ROWS,
            verify_sort_order: cfg!(debug_assertions),
            collect_stats: true,
        }
    }

    /// Sets the peer group buffer limit.
    #[must_use]
    pub const fn with_max_peer_group_rows(mut self, limit: usize) -> Self {
        self.max_peer_group_rows = limit;
        self
    }

    /// Enables or disables input sort verification.
    #[must_use]
    pub const fn with_sort_verification(mut self, enabled: bool) -> Self {
        self.verify_sort_order = enabled;
        self
    }

    /// Disables statistics collection.
    #[must_use]
    pub const fn without_stats(mut self) -> Self {
        self.collect_stats = false;
        self
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A handle for cancelling query execution.
///
/// Can be shared between threads to allow cancellation from outside
/// the query execution thread.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a new cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self { cancelled: Arc::new(AtomicBool::new(false)) }
    }

    /// Cancels the associated query.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Checks if cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
