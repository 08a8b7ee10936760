//! Transaction pool internals.
//!
//! The lock-guarded [`TxPool`] holds the actual state; [`PoolInner`] wraps it together with
//! sender interning, the admission pipeline, the commit lock and the pending-hash listeners.

use crate::{
    error::{PoolError, PoolErrorKind, PoolResult},
    identifier::{SenderId, SenderIdentifiers, TransactionId},
    lock::{CommitLock, CommitScope, ReadScope},
    ordering::TransactionOrdering,
    traits::{
        AllPoolTransactions, OnNewBlockEvent, PoolSize, PoolTransaction, TransactionOrigin,
        TxHash, TxStatus,
    },
    validate::{ClassifiedError, ExecutionContext, TransactionValidator, ValidPoolTransaction},
    PoolConfig,
};
use alloy_primitives::Address;
use parking_lot::{Mutex, RwLock};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};
use tokio::sync::mpsc;
use tracing::{debug, trace};

mod account;
pub mod best;
pub mod txpool;

use best::BestTransactions;
use txpool::{OnNewBlockOutcome, TxPool};

/// Buffer of the channel handed out by [`PoolInner::add_pending_listener`].
const PENDING_TX_LISTENER_BUFFER_SIZE: usize = 2048;

/// Shared state of the pool: the guarded [`TxPool`] plus everything around it.
pub struct PoolInner<V, T>
where
    V: TransactionValidator,
    T: TransactionOrdering<Transaction = V::Transaction>,
{
    /// Interns sender addresses.
    identifiers: RwLock<SenderIdentifiers>,
    /// The admission pipeline.
    validator: V,
    /// The actual pool state.
    pool: RwLock<TxPool<T>>,
    /// Coordination between snapshot readers and block-boundary commits.
    commit_lock: Arc<dyn CommitLock>,
    /// Assigns arrival order sequence numbers.
    submission_id: AtomicU64,
    /// Listeners for hashes of transactions entering the pending set.
    pending_listeners: Mutex<Vec<PendingTransactionHashListener>>,
}

impl<V, T> PoolInner<V, T>
where
    V: TransactionValidator,
    T: TransactionOrdering<Transaction = V::Transaction>,
{
    /// Creates a new pool.
    pub fn new(validator: V, ordering: T, config: PoolConfig, commit_lock: Arc<dyn CommitLock>) -> Self {
        Self {
            identifiers: Default::default(),
            validator,
            pool: RwLock::new(TxPool::new(ordering, config)),
            commit_lock,
            submission_id: AtomicU64::new(0),
            pending_listeners: Default::default(),
        }
    }

    /// Returns the pool's configuration.
    pub fn config(&self) -> PoolConfig {
        self.pool.read().config().clone()
    }

    /// Access to the admission pipeline.
    pub const fn validator(&self) -> &V {
        &self.validator
    }

    /// Registers a listener that receives the hash of every transaction entering the pending
    /// set.
    pub fn add_pending_listener(&self) -> mpsc::Receiver<TxHash> {
        let (sender, rx) = mpsc::channel(PENDING_TX_LISTENER_BUFFER_SIZE);
        self.pending_listeners.lock().push(PendingTransactionHashListener { sender });
        rx
    }

    /// Whether the pool already tracks the transaction with the given hash.
    pub fn contains(&self, hash: &TxHash) -> bool {
        self.pool.read().contains(hash)
    }

    /// Returns the tracked transaction with the given hash.
    pub fn get(&self, hash: &TxHash) -> Option<Arc<ValidPoolTransaction<T::Transaction>>> {
        self.pool.read().get(hash).cloned()
    }

    /// Which side of the pool the transaction with the given hash resides in.
    pub fn status(&self, hash: &TxHash) -> Option<TxStatus> {
        self.pool.read().status(hash)
    }

    /// Counts and sizes of both sub-pools.
    pub fn size(&self) -> PoolSize {
        self.pool.read().size()
    }

    /// All transactions grouped by executability.
    pub fn all_transactions(&self) -> AllPoolTransactions<T::Transaction> {
        self.pool.read().all_transactions()
    }

    /// All currently executable transactions, per sender in nonce order.
    pub fn pending_transactions(&self) -> Vec<Arc<ValidPoolTransaction<T::Transaction>>> {
        self.pool.read().pending_transactions()
    }

    /// Snapshot of the whole pool grouped by sender address.
    pub fn content(&self) -> HashMap<Address, AllPoolTransactions<T::Transaction>> {
        self.pool.read().content()
    }

    /// Snapshot of one sender's transactions grouped by executability.
    pub fn content_from(&self, sender: Address) -> AllPoolTransactions<T::Transaction> {
        let Some(id) = self.identifiers.read().sender_id(&sender) else {
            return AllPoolTransactions::default()
        };
        self.pool.read().content_from(id)
    }

    /// All transactions of the given sender, in nonce order.
    pub fn txs_by_sender(
        &self,
        sender: Address,
    ) -> Vec<Arc<ValidPoolTransaction<T::Transaction>>> {
        let Some(id) = self.identifiers.read().sender_id(&sender) else { return Vec::new() };
        self.pool.read().txs_by_sender(id)
    }

    /// Returns a priority ordered snapshot of the pending set.
    pub fn best_transactions(&self) -> BestTransactions<T> {
        let _read = ReadScope::enter(&*self.commit_lock);
        self.pool.read().best_transactions()
    }

    /// Validates a transaction and adds it to the pool.
    ///
    /// A nonce gap is not a rejection: the transaction lands in the queued sub-pool keyed off
    /// the state nonce the pipeline observed. On success the returned [`ExecutionContext`]
    /// carries the simulation results for the admission response.
    pub fn add_transaction(
        &self,
        origin: TransactionOrigin,
        transaction: T::Transaction,
    ) -> PoolResult<(AddedTransaction<T::Transaction>, ExecutionContext)> {
        let hash = *transaction.hash();
        let _read = ReadScope::enter(&*self.commit_lock);

        if self.pool.read().contains(&hash) {
            return Err(PoolError::new(hash, PoolErrorKind::AlreadyKnown))
        }

        let cx = match self.validator.validate(origin, &transaction) {
            Ok(cx) => cx,
            Err(ClassifiedError::NonceGap { state_nonce, tx_nonce }) => {
                trace!(target: "txpool", ?hash, tx_nonce, state_nonce, "nonce gap, queueing");
                ExecutionContext {
                    state_nonce,
                    gas_wanted: transaction.gas_limit(),
                    ..Default::default()
                }
            }
            Err(ClassifiedError::NonceLow { state_nonce, tx_nonce }) => {
                trace!(target: "txpool", ?hash, tx_nonce, state_nonce, "nonce too low");
                return Err(PoolError::new(hash, PoolErrorKind::NonceLow))
            }
            Err(ClassifiedError::Other(error)) => {
                return Err(PoolError::new(hash, PoolErrorKind::Other(error)))
            }
        };

        let sender_id = self.identifiers.write().sender_id_or_create(transaction.sender());
        let valid = ValidPoolTransaction {
            transaction_id: TransactionId::new(sender_id, transaction.nonce()),
            origin,
            submission_id: self.submission_id.fetch_add(1, Ordering::Relaxed),
            timestamp: Instant::now(),
            transaction,
        };

        let added = self.pool.write().add_transaction(valid, cx.state_nonce)?;
        if let AddedTransaction::Pending(pending) = &added {
            self.notify_pending(
                std::iter::once(*pending.transaction.hash())
                    .chain(pending.promoted.iter().map(|tx| *tx.hash())),
            );
        }
        Ok((added, cx))
    }

    /// Removes the transactions with the given hashes, returning the ones that were tracked.
    pub fn remove_transactions(
        &self,
        hashes: impl IntoIterator<Item = TxHash>,
    ) -> Vec<Arc<ValidPoolTransaction<T::Transaction>>> {
        self.pool.write().remove_transactions(hashes)
    }

    /// Applies a committed block to the pool.
    ///
    /// Runs under the commit side of the lock: a verifying [`CommitLock`] will flag any
    /// snapshot read that overlaps this call.
    pub fn on_new_block(&self, event: OnNewBlockEvent) -> OnNewBlockOutcome<T::Transaction> {
        let _commit = CommitScope::enter(&*self.commit_lock);

        let changed: Vec<(SenderId, u64)> = {
            let mut identifiers = self.identifiers.write();
            event
                .changed_accounts
                .iter()
                .map(|account| (identifiers.sender_id_or_create(account.address), account.nonce))
                .collect()
        };

        let outcome = self.pool.write().on_new_block(event.pending_base_fee, changed);
        if !outcome.promoted.is_empty() {
            self.notify_pending(outcome.promoted.iter().map(|tx| *tx.hash()));
        }
        outcome
    }

    /// Fans the given pending hashes out to all registered listeners, dropping listeners whose
    /// channel closed.
    fn notify_pending(&self, hashes: impl IntoIterator<Item = TxHash> + Clone) {
        let mut listeners = self.pending_listeners.lock();
        listeners.retain(|listener| listener.send_all(hashes.clone()));
    }
}

impl<V, T> std::fmt::Debug for PoolInner<V, T>
where
    V: TransactionValidator,
    T: TransactionOrdering<Transaction = V::Transaction>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolInner").field("pool", &*self.pool.read()).finish_non_exhaustive()
    }
}

/// A listener interested in the hashes of transactions entering the pending set.
struct PendingTransactionHashListener {
    sender: mpsc::Sender<TxHash>,
}

impl PendingTransactionHashListener {
    /// Attempts to send all hashes to the listener.
    ///
    /// Returns false if the channel is closed; a full channel drops the remaining hashes but
    /// keeps the listener.
    fn send_all(&self, hashes: impl IntoIterator<Item = TxHash>) -> bool {
        for tx_hash in hashes {
            match self.sender.try_send(tx_hash) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    debug!(target: "txpool", "pending listener channel full, dropping hashes");
                    return true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => return false,
            }
        }
        true
    }
}

/// A transaction that entered the pending sub-pool.
#[derive(Debug)]
pub struct AddedPendingTransaction<T: PoolTransaction> {
    /// The admitted transaction.
    pub transaction: Arc<ValidPoolTransaction<T>>,
    /// The incumbent this transaction replaced at its slot.
    pub replaced: Option<Arc<ValidPoolTransaction<T>>>,
    /// Queued transactions this admission unblocked.
    pub promoted: Vec<Arc<ValidPoolTransaction<T>>>,
    /// Transactions evicted to make room.
    pub discarded: Vec<Arc<ValidPoolTransaction<T>>>,
}

/// Outcome of adding a transaction to the pool.
#[derive(Debug)]
pub enum AddedTransaction<T: PoolTransaction> {
    /// The transaction joined the contiguous executable run of its sender.
    Pending(AddedPendingTransaction<T>),
    /// The transaction is parked behind a nonce gap.
    Queued {
        /// The admitted transaction.
        transaction: Arc<ValidPoolTransaction<T>>,
        /// The incumbent this transaction replaced at its slot.
        replaced: Option<Arc<ValidPoolTransaction<T>>>,
    },
}

impl<T: PoolTransaction> AddedTransaction<T> {
    /// The admitted transaction.
    pub fn transaction(&self) -> &Arc<ValidPoolTransaction<T>> {
        match self {
            Self::Pending(tx) => &tx.transaction,
            Self::Queued { transaction, .. } => transaction,
        }
    }

    /// Hash of the admitted transaction.
    pub fn hash(&self) -> &TxHash {
        self.transaction().hash()
    }

    /// Whether the transaction entered the pending sub-pool.
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// The incumbent the admitted transaction replaced, if any.
    pub fn replaced(&self) -> Option<&Arc<ValidPoolTransaction<T>>> {
        match self {
            Self::Pending(tx) => tx.replaced.as_ref(),
            Self::Queued { replaced, .. } => replaced.as_ref(),
        }
    }
}
