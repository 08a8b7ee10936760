//! The CheckTx-shaped admission gateway.
//!
//! Raw transaction bytes from clients or peer gossip come through here: decode, duplicate
//! check, external validation, pool insertion. The one policy decision this layer owns is the
//! visibility of [`PoolErrorKind::AlreadyKnown`](crate::error::PoolErrorKind::AlreadyKnown): a
//! client resubmitting its own transaction deserves the error, a peer re-gossiping a
//! transaction we already hold does not.

use crate::{
    error::{PoolError, PoolResult},
    ordering::TransactionOrdering,
    pool::PoolInner,
    traits::{PoolTransaction, TransactionOrigin},
    validate::{ExecutionContext, ExecutionEvent, TransactionValidator},
};
use alloy_primitives::{Bytes, B256};
use std::sync::Arc;
use tracing::trace;

/// Failure to decode raw transaction bytes.
#[derive(Debug, thiserror::Error)]
#[error("failed to decode transaction: {0}")]
pub struct DecodeError(Box<dyn std::error::Error + Send + Sync>);

impl DecodeError {
    /// Wraps the underlying decoding failure.
    pub fn new(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self(Box::new(error))
    }

    /// A decode failure described by a message only.
    pub fn msg(msg: impl Into<String>) -> Self {
        Self(msg.into().into())
    }
}

/// Decodes raw transaction bytes into the pool's transaction type.
#[auto_impl::auto_impl(&, Arc)]
pub trait TransactionDecoder: Send + Sync {
    /// The transaction type produced.
    type Transaction: PoolTransaction;

    /// Decodes the raw bytes of a single transaction.
    fn decode(&self, bytes: &[u8]) -> Result<Self::Transaction, DecodeError>;
}

/// An admission request: raw bytes plus where they came from.
#[derive(Debug, Clone)]
pub struct CheckTxRequest {
    /// The raw transaction bytes.
    pub tx: Bytes,
    /// Submission channel the bytes arrived on.
    pub origin: TransactionOrigin,
}

/// The admission response for an accepted transaction.
#[derive(Debug, Clone, Default)]
pub struct CheckTxResponse {
    /// Gas requested by the transaction.
    pub gas_wanted: u64,
    /// Gas consumed during simulation.
    pub gas_used: u64,
    /// Free-form execution log.
    pub log: String,
    /// Result data of the simulation.
    pub data: Bytes,
    /// Events emitted during simulation.
    pub events: Vec<ExecutionEvent>,
}

impl CheckTxResponse {
    fn from_context(cx: ExecutionContext) -> Self {
        Self {
            gas_wanted: cx.gas_wanted,
            gas_used: cx.gas_used,
            log: cx.log,
            data: cx.data,
            events: cx.events,
        }
    }
}

/// Admission gateway in front of a pool.
#[derive(Debug)]
pub struct CheckTxHandler<D, V, T>
where
    D: TransactionDecoder,
    V: TransactionValidator<Transaction = D::Transaction>,
    T: TransactionOrdering<Transaction = D::Transaction>,
{
    pool: Arc<PoolInner<V, T>>,
    decoder: D,
}

impl<D, V, T> CheckTxHandler<D, V, T>
where
    D: TransactionDecoder,
    V: TransactionValidator<Transaction = D::Transaction>,
    T: TransactionOrdering<Transaction = D::Transaction>,
{
    /// Creates a new handler in front of the given pool.
    pub fn new(pool: Arc<PoolInner<V, T>>, decoder: D) -> Self {
        Self { pool, decoder }
    }

    /// The pool behind this handler.
    pub fn pool(&self) -> &Arc<PoolInner<V, T>> {
        &self.pool
    }

    /// The decoder in front of this handler.
    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Handles one admission request.
    ///
    /// A nonce-gapped transaction is accepted and parked in the queued sub-pool. A duplicate
    /// from a peer succeeds silently so that re-gossip does not look like a failure; a
    /// duplicate from a local client is reported back as
    /// [`PoolErrorKind::AlreadyKnown`](crate::error::PoolErrorKind::AlreadyKnown).
    pub fn check_tx(&self, request: CheckTxRequest) -> PoolResult<CheckTxResponse> {
        let transaction = self
            .decoder
            .decode(&request.tx)
            .map_err(|err| PoolError::other(B256::ZERO, err))?;
        let hash = *transaction.hash();

        match self.pool.add_transaction(request.origin, transaction) {
            Ok((_, cx)) => Ok(CheckTxResponse::from_context(cx)),
            Err(err) if err.is_already_known() && !request.origin.is_local() => {
                trace!(target: "txpool", ?hash, "ignoring re-gossiped transaction");
                Ok(CheckTxResponse::default())
            }
            Err(err) => Err(err),
        }
    }
}
