//! EVM-style transaction admission and ordering.
//!
//! The pool tracks per sender nonce queues split into a *pending* set (contiguous with the
//! on-chain nonce, executable right now) and a *queued* set (parked behind a nonce gap). On top
//! of that sit the pieces a node wires together:
//!
//! - [`admission::CheckTxHandler`]: the gateway raw transaction bytes enter through, with
//!   CheckTx-shaped responses and origin dependent duplicate visibility.
//! - [`validate::TransactionValidator`]: the seam for the external validation pipeline; the
//!   pool only interprets the classified nonce failures that decide placement.
//! - [`pool::best::BestTransactions`]: a priority ordered iterator over the pending set that
//!   never yields a nonce out of order and withholds descendants of transactions the consumer
//!   marks invalid.
//! - [`proposal::ProposalOrdering`]: merges the pending set with other transaction sources
//!   into one deterministic sequence for block construction.
//! - [`lock::CommitLock`]: pluggable coordination between snapshot readers and the block
//!   boundary synchronizer.
//!
//! Replacement at an occupied (sender, nonce) slot follows the price bump rule: both fee
//! components must improve on the incumbent by the configured percentage, and a legacy
//! transaction can never displace a dynamic fee one.

#![warn(missing_debug_implementations, missing_docs, unreachable_pub, rustdoc::all)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod admission;
pub mod config;
pub mod error;
pub mod identifier;
pub mod lock;
pub mod metrics;
pub mod ordering;
pub mod pool;
pub mod proposal;
pub mod traits;
pub mod validate;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use crate::{
    admission::{CheckTxHandler, CheckTxRequest, CheckTxResponse, TransactionDecoder},
    config::{PoolConfig, SubPoolLimit, DEFAULT_PRICE_BUMP, MAX_ACCOUNT_SLOTS_PER_SENDER},
    error::{PoolError, PoolErrorKind, PoolResult},
    lock::{CommitLock, NoopCommitLock, TrackingCommitLock},
    ordering::{EffectiveTipOrdering, TransactionOrdering},
    pool::{AddedTransaction, PoolInner},
    proposal::ProposalOrdering,
    traits::{
        AllPoolTransactions, ChangedAccount, OnNewBlockEvent, PoolSize, PoolTransaction,
        PooledTransaction, TransactionOrigin, TxFee, TxHash, TxStatus,
    },
    validate::{
        ClassifiedError, ExecutionContext, StagedValidator, TransactionValidator,
        ValidPoolTransaction,
    },
};

use crate::{pool::best::BestTransactions, pool::txpool::OnNewBlockOutcome};
use alloy_primitives::Address;
use std::sync::Arc;
use tokio::sync::mpsc;

/// A shared handle to the transaction pool.
///
/// Cheap to clone; every collaborator (admission gateway, gossip, proposal construction, the
/// block boundary synchronizer) holds one of these instead of reaching for a process global.
#[derive(Debug)]
pub struct Pool<V, T>
where
    V: TransactionValidator,
    T: TransactionOrdering<Transaction = V::Transaction>,
{
    inner: Arc<PoolInner<V, T>>,
}

impl<V, T> Clone for Pool<V, T>
where
    V: TransactionValidator,
    T: TransactionOrdering<Transaction = V::Transaction>,
{
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<V, T> Pool<V, T>
where
    V: TransactionValidator,
    T: TransactionOrdering<Transaction = V::Transaction>,
{
    /// Creates a new pool with the default no-op commit lock.
    pub fn new(validator: V, ordering: T, config: PoolConfig) -> Self {
        Self::with_commit_lock(validator, ordering, config, Arc::new(NoopCommitLock))
    }

    /// Creates a new pool with the given commit lock strategy.
    pub fn with_commit_lock(
        validator: V,
        ordering: T,
        config: PoolConfig,
        commit_lock: Arc<dyn CommitLock>,
    ) -> Self {
        Self { inner: Arc::new(PoolInner::new(validator, ordering, config, commit_lock)) }
    }

    /// The shared inner pool.
    pub fn inner(&self) -> &Arc<PoolInner<V, T>> {
        &self.inner
    }

    /// Validates a transaction and adds it to the pool.
    pub fn add_transaction(
        &self,
        origin: TransactionOrigin,
        transaction: T::Transaction,
    ) -> PoolResult<(AddedTransaction<T::Transaction>, ExecutionContext)> {
        self.inner.add_transaction(origin, transaction)
    }

    /// Whether the pool already tracks the transaction with the given hash.
    pub fn contains(&self, hash: &TxHash) -> bool {
        self.inner.contains(hash)
    }

    /// Returns the tracked transaction with the given hash.
    pub fn get(&self, hash: &TxHash) -> Option<Arc<ValidPoolTransaction<T::Transaction>>> {
        self.inner.get(hash)
    }

    /// Which side of the pool the transaction with the given hash resides in.
    pub fn status(&self, hash: &TxHash) -> Option<TxStatus> {
        self.inner.status(hash)
    }

    /// Counts and sizes of both sub-pools.
    pub fn size(&self) -> PoolSize {
        self.inner.size()
    }

    /// All transactions grouped by executability.
    pub fn all_transactions(&self) -> AllPoolTransactions<T::Transaction> {
        self.inner.all_transactions()
    }

    /// All currently executable transactions, per sender in nonce order.
    ///
    /// This is the gossip broadcast set: queued transactions are invisible to peers until
    /// promoted.
    pub fn pending_transactions(&self) -> Vec<Arc<ValidPoolTransaction<T::Transaction>>> {
        self.inner.pending_transactions()
    }

    /// Snapshot of the whole pool grouped by sender address.
    pub fn content(
        &self,
    ) -> std::collections::HashMap<Address, AllPoolTransactions<T::Transaction>> {
        self.inner.content()
    }

    /// Snapshot of one sender's transactions grouped by executability.
    pub fn content_from(&self, sender: Address) -> AllPoolTransactions<T::Transaction> {
        self.inner.content_from(sender)
    }

    /// All transactions of the given sender, in nonce order.
    pub fn txs_by_sender(
        &self,
        sender: Address,
    ) -> Vec<Arc<ValidPoolTransaction<T::Transaction>>> {
        self.inner.txs_by_sender(sender)
    }

    /// Returns a priority ordered snapshot of the pending set.
    ///
    /// This is the block construction read view; queued transactions never appear in it.
    pub fn best_transactions(&self) -> BestTransactions<T> {
        self.inner.best_transactions()
    }

    /// Registers a listener for hashes of transactions entering the pending set.
    pub fn pending_transactions_listener(&self) -> mpsc::Receiver<TxHash> {
        self.inner.add_pending_listener()
    }

    /// Removes the transactions with the given hashes, returning the ones that were tracked.
    pub fn remove_transactions(
        &self,
        hashes: impl IntoIterator<Item = TxHash>,
    ) -> Vec<Arc<ValidPoolTransaction<T::Transaction>>> {
        self.inner.remove_transactions(hashes)
    }

    /// Applies a committed block: prunes stale entries, promotes newly contiguous ones and
    /// re-enforces the capacity limits.
    pub fn on_new_block(&self, event: OnNewBlockEvent) -> OnNewBlockOutcome<T::Transaction> {
        self.inner.on_new_block(event)
    }
}
