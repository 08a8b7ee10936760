//! Transaction pool errors.

use crate::traits::TxHash;
use alloy_primitives::Address;

/// Transaction pool result type.
pub type PoolResult<T> = Result<T, PoolError>;

/// A transaction pool error, tied to the transaction that caused it.
///
/// No pool error is fatal to the process; every variant is a per-transaction outcome that is
/// reported to the submitting caller.
#[derive(Debug, thiserror::Error)]
#[error("[{hash}] {kind}")]
pub struct PoolError {
    /// Hash of the transaction that caused the error.
    pub hash: TxHash,
    /// The kind of error.
    pub kind: PoolErrorKind,
}

impl PoolError {
    /// Creates a new error for the given transaction.
    pub fn new(hash: TxHash, kind: PoolErrorKind) -> Self {
        Self { hash, kind }
    }

    /// Wraps an opaque error from the admission pipeline.
    pub fn other(hash: TxHash, error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self { hash, kind: PoolErrorKind::Other(Box::new(error)) }
    }

    /// Whether the error identifies the transaction content as already present.
    pub const fn is_already_known(&self) -> bool {
        self.kind.is_already_known()
    }
}

/// The kind of pool error.
#[derive(Debug, thiserror::Error)]
pub enum PoolErrorKind {
    /// Byte-identical transaction content is already tracked by the pool.
    ///
    /// Surfaced as an error only on direct submissions, see
    /// [`CheckTxHandler`](crate::admission::CheckTxHandler).
    #[error("transaction already known")]
    AlreadyKnown,

    /// Nonce is lower than the sender's baseline nonce, the slot can never execute again.
    #[error("nonce too low")]
    NonceLow,

    /// The slot is occupied and the candidate did not meet the replacement price bump.
    #[error("replacement transaction underpriced")]
    ReplacementUnderpriced,

    /// A non-local sender exhausted its transaction slot capacity.
    #[error("sender {0} exceeded its slot capacity")]
    ExceededSenderCapacity(Address),

    /// The transaction was admitted but immediately evicted under capacity pressure.
    #[error("discarded under capacity pressure on insert")]
    DiscardedOnInsert,

    /// A failure surfaced unchanged from the external admission pipeline.
    #[error("{0}")]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl PoolErrorKind {
    /// Whether the error identifies the transaction content as already present.
    pub const fn is_already_known(&self) -> bool {
        matches!(self, Self::AlreadyKnown)
    }
}
