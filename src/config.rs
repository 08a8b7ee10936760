//! Configuration options for the transaction pool.

/// Guarantees max transactions for one sender, compatible with geth/erigon
pub const MAX_ACCOUNT_SLOTS_PER_SENDER: usize = 16;

/// Default price bump (in %) for replacement transactions
pub const DEFAULT_PRICE_BUMP: u128 = 10;

/// The default maximum allowed number of transactions in the pending sub-pool
pub const TXPOOL_MAX_PENDING_TXS_DEFAULT: usize = 10_000;

/// The default maximum allowed number of transactions in the queued sub-pool
pub const TXPOOL_MAX_QUEUED_TXS_DEFAULT: usize = 10_000;

/// The default maximum allowed size of a sub-pool, in bytes
pub const TXPOOL_MAX_SIZE_BYTES_DEFAULT: usize = 20 * 1024 * 1024;

/// Configuration options for the pool.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolConfig {
    /// Max number of transactions in the pending sub-pool.
    pub pending_limit: SubPoolLimit,
    /// Max number of transactions in the queued sub-pool.
    pub queued_limit: SubPoolLimit,
    /// Max number of executable transaction slots guaranteed per account.
    pub max_account_slots: usize,
    /// Price bump (in %) a replacement transaction must provide.
    pub price_bump: u128,
    /// Max gas a single transaction may declare, mirrors the block gas limit.
    pub block_gas_limit: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pending_limit: SubPoolLimit::new(
                TXPOOL_MAX_PENDING_TXS_DEFAULT,
                TXPOOL_MAX_SIZE_BYTES_DEFAULT,
            ),
            queued_limit: SubPoolLimit::new(
                TXPOOL_MAX_QUEUED_TXS_DEFAULT,
                TXPOOL_MAX_SIZE_BYTES_DEFAULT,
            ),
            max_account_slots: MAX_ACCOUNT_SLOTS_PER_SENDER,
            price_bump: DEFAULT_PRICE_BUMP,
            block_gas_limit: 30_000_000,
        }
    }
}

/// Size limits for a sub-pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SubPoolLimit {
    /// Maximum number of transactions allowed in the sub-pool.
    pub max_txs: usize,
    /// Maximum combined encoded size (in bytes) of transactions allowed in the sub-pool.
    pub max_size: usize,
}

impl SubPoolLimit {
    /// Creates a new instance with the given limits.
    pub const fn new(max_txs: usize, max_size: usize) -> Self {
        Self { max_txs, max_size }
    }

    /// Returns `true` if the given number of transactions or combined size exceeds the limits.
    pub const fn is_exceeded(&self, txs: usize, size: usize) -> bool {
        txs > self.max_txs || size > self.max_size
    }
}
