//! Transaction pool metrics.

use metrics::{counter, gauge, Counter, Gauge};

/// Transaction pool metrics.
pub struct TxPoolMetrics {
    /// Number of transactions inserted into the pool.
    pub(crate) inserted_transactions: Counter,
    /// Number of invalid transactions rejected at admission.
    pub(crate) invalid_transactions: Counter,
    /// Number of transactions removed from the pool.
    pub(crate) removed_transactions: Counter,
    /// Number of transactions replaced in place.
    pub(crate) replaced_transactions: Counter,
    /// Number of transactions promoted from queued to pending.
    pub(crate) promoted_transactions: Counter,
    /// Number of transactions evicted to enforce capacity limits.
    pub(crate) evicted_transactions: Counter,
    /// Number of transactions currently in the pending sub-pool.
    pub(crate) pending_pool_transactions: Gauge,
    /// Number of transactions currently in the queued sub-pool.
    pub(crate) queued_pool_transactions: Gauge,
}

impl Default for TxPoolMetrics {
    fn default() -> Self {
        Self {
            inserted_transactions: counter!("txpool.inserted_transactions"),
            invalid_transactions: counter!("txpool.invalid_transactions"),
            removed_transactions: counter!("txpool.removed_transactions"),
            replaced_transactions: counter!("txpool.replaced_transactions"),
            promoted_transactions: counter!("txpool.promoted_transactions"),
            evicted_transactions: counter!("txpool.evicted_transactions"),
            pending_pool_transactions: gauge!("txpool.pending_pool_transactions"),
            queued_pool_transactions: gauge!("txpool.queued_pool_transactions"),
        }
    }
}

impl std::fmt::Debug for TxPoolMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxPoolMetrics").finish_non_exhaustive()
    }
}
