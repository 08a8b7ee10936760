//! The internal transaction pool state.

use crate::{
    config::PoolConfig,
    error::{PoolError, PoolErrorKind, PoolResult},
    identifier::{SenderId, TransactionId},
    metrics::TxPoolMetrics,
    ordering::TransactionOrdering,
    pool::{
        account::{AccountInsert, AccountQueue},
        best::{BestTransactions, PendingRef},
        AddedPendingTransaction, AddedTransaction,
    },
    traits::{AllPoolTransactions, PoolSize, PoolTransaction, TxHash, TxStatus},
    validate::ValidPoolTransaction,
};
use alloy_primitives::Address;
use rustc_hash::FxHashMap;
use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::Arc,
};
use tracing::{debug, trace};

/// The single source of truth for all transactions the pool tracks.
///
/// Transactions live in per sender [`AccountQueue`]s; the hash index maps a transaction's
/// content identity to its (sender, nonce) slot. The two structures are kept in lockstep: a
/// hash is present in the index if and only if the transaction occupies its slot.
///
/// This type is not thread safe, the surrounding pool guards it with a lock.
pub struct TxPool<T: TransactionOrdering> {
    /// How to order pending transactions.
    ordering: T,
    /// Pool settings.
    config: PoolConfig,
    /// Base fee the next block is expected to charge, the reference point for priority.
    pending_basefee: u128,
    /// All transactions, keyed by sender.
    accounts: FxHashMap<SenderId, AccountQueue<T::Transaction>>,
    /// Hash index: content identity to slot.
    by_hash: HashMap<TxHash, TransactionId>,
    /// Running counts and byte sizes of both sub-pools.
    size: PoolSize,
    /// Pool metrics.
    metrics: TxPoolMetrics,
}

impl<T: TransactionOrdering> TxPool<T> {
    /// Creates a new pool with the given ordering and configuration.
    pub fn new(ordering: T, config: PoolConfig) -> Self {
        Self {
            ordering,
            config,
            pending_basefee: 0,
            accounts: Default::default(),
            by_hash: Default::default(),
            size: Default::default(),
            metrics: Default::default(),
        }
    }

    /// Returns the pool's configuration.
    pub const fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// The base fee priorities are currently computed against.
    pub const fn pending_basefee(&self) -> u128 {
        self.pending_basefee
    }

    /// Total number of transactions in the pool.
    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    /// Whether the pool tracks no transactions at all.
    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    /// Whether the pool already tracks the transaction with the given hash.
    pub fn contains(&self, hash: &TxHash) -> bool {
        self.by_hash.contains_key(hash)
    }

    /// Returns the tracked transaction with the given hash.
    pub fn get(&self, hash: &TxHash) -> Option<&Arc<ValidPoolTransaction<T::Transaction>>> {
        let id = self.by_hash.get(hash)?;
        self.accounts.get(&id.sender)?.get(id.nonce)
    }

    /// Which side of the pool the transaction with the given hash resides in.
    pub fn status(&self, hash: &TxHash) -> Option<TxStatus> {
        let id = self.by_hash.get(hash)?;
        let queue = self.accounts.get(&id.sender)?;
        Some(if queue.is_pending(id.nonce) { TxStatus::Pending } else { TxStatus::Queued })
    }

    /// All transactions of the given sender, in nonce order.
    pub fn txs_by_sender(
        &self,
        sender: SenderId,
    ) -> Vec<Arc<ValidPoolTransaction<T::Transaction>>> {
        self.accounts
            .get(&sender)
            .map(|queue| queue.pending_txs().chain(queue.queued_txs()).cloned().collect())
            .unwrap_or_default()
    }

    /// Counts and sizes of both sub-pools.
    pub const fn size(&self) -> PoolSize {
        self.size
    }

    /// All transactions grouped by executability, each group in per sender nonce order.
    pub fn all_transactions(&self) -> AllPoolTransactions<T::Transaction> {
        let mut all = AllPoolTransactions::default();
        for queue in self.accounts.values() {
            all.pending.extend(queue.pending_txs().cloned());
            all.queued.extend(queue.queued_txs().cloned());
        }
        all
    }

    /// All currently executable transactions, per sender in nonce order.
    pub fn pending_transactions(&self) -> Vec<Arc<ValidPoolTransaction<T::Transaction>>> {
        self.accounts.values().flat_map(|queue| queue.pending_txs().cloned()).collect()
    }

    /// Snapshot of the whole pool grouped by sender address.
    pub fn content(&self) -> HashMap<Address, AllPoolTransactions<T::Transaction>> {
        self.accounts
            .values()
            .filter_map(|queue| {
                let sender = queue.pending_txs().chain(queue.queued_txs()).next()?.sender();
                Some((sender, Self::queue_content(queue)))
            })
            .collect()
    }

    /// Snapshot of one sender's transactions grouped by executability.
    pub fn content_from(&self, sender: SenderId) -> AllPoolTransactions<T::Transaction> {
        self.accounts.get(&sender).map(Self::queue_content).unwrap_or_default()
    }

    fn queue_content(queue: &AccountQueue<T::Transaction>) -> AllPoolTransactions<T::Transaction> {
        AllPoolTransactions {
            pending: queue.pending_txs().cloned().collect(),
            queued: queue.queued_txs().cloned().collect(),
        }
    }

    /// Returns an iterator over the pending set in priority order.
    ///
    /// The iterator operates on a snapshot: transactions added or removed after this call are
    /// not reflected.
    pub fn best_transactions(&self) -> BestTransactions<T> {
        let mut all = BTreeMap::new();
        let mut independent = BTreeSet::new();
        for queue in self.accounts.values() {
            for tx in queue.pending_txs() {
                let pending = PendingRef {
                    transaction: tx.clone(),
                    priority: self.ordering.priority(&tx.transaction, self.pending_basefee),
                };
                if tx.nonce() == queue.baseline() {
                    independent.insert(pending.clone());
                }
                all.insert(*tx.id(), pending);
            }
        }
        BestTransactions { all, independent, invalid: Default::default() }
    }

    /// Adds a validated transaction to the pool.
    ///
    /// `on_chain_nonce` is the sender's committed account nonce, used as the baseline for a
    /// sender the pool has not seen yet. The transaction lands in the pending set if it extends
    /// the sender's contiguous run, in the queued set otherwise. A replacement that wins the
    /// price bump arbitration removes the incumbent and takes over its slot atomically.
    ///
    /// Adding re-enforces the capacity limits; if the new transaction itself is the lowest
    /// priority entry of an overfull pool it is dropped again with
    /// [`PoolErrorKind::DiscardedOnInsert`].
    pub fn add_transaction(
        &mut self,
        tx: ValidPoolTransaction<T::Transaction>,
        on_chain_nonce: u64,
    ) -> PoolResult<AddedTransaction<T::Transaction>> {
        let hash = *tx.hash();
        if self.by_hash.contains_key(&hash) {
            return Err(PoolError::new(hash, PoolErrorKind::AlreadyKnown))
        }
        if tx.nonce() < on_chain_nonce {
            self.metrics.invalid_transactions.increment(1);
            return Err(PoolError::new(hash, PoolErrorKind::NonceLow))
        }

        let id = tx.transaction_id;
        let queue =
            self.accounts.entry(id.sender).or_insert_with(|| AccountQueue::new(on_chain_nonce));

        // Spam cap: an untrusted sender may not occupy more than a fixed number of slots.
        // Replacements are exempt, they do not grow the footprint.
        if !tx.origin.is_local()
            && queue.len() >= self.config.max_account_slots
            && queue.get(id.nonce).is_none()
        {
            self.metrics.invalid_transactions.increment(1);
            return Err(PoolError::new(hash, PoolErrorKind::ExceededSenderCapacity(tx.sender())))
        }

        let tx = Arc::new(tx);
        let before = account_footprint(queue);
        let outcome = queue.insert(tx.clone(), self.config.price_bump);
        let is_pending = queue.is_pending(id.nonce);
        let after = account_footprint(queue);
        self.apply_footprint_delta(before, after);

        let mut added = match outcome {
            Err(underpriced) => {
                trace!(target: "txpool", ?hash, existing = ?underpriced.existing, "replacement underpriced");
                self.metrics.invalid_transactions.increment(1);
                return Err(PoolError::new(hash, PoolErrorKind::ReplacementUnderpriced))
            }
            Ok(AccountInsert::Replaced { old }) => {
                self.by_hash.remove(old.hash());
                self.by_hash.insert(hash, id);
                self.metrics.replaced_transactions.increment(1);
                if is_pending {
                    AddedTransaction::Pending(AddedPendingTransaction {
                        transaction: tx,
                        replaced: Some(old),
                        promoted: Vec::new(),
                        discarded: Vec::new(),
                    })
                } else {
                    AddedTransaction::Queued { transaction: tx, replaced: Some(old) }
                }
            }
            Ok(AccountInsert::Inserted { promoted }) => {
                self.by_hash.insert(hash, id);
                self.metrics.inserted_transactions.increment(1);
                self.metrics.promoted_transactions.increment(promoted.len() as u64);
                if is_pending {
                    AddedTransaction::Pending(AddedPendingTransaction {
                        transaction: tx,
                        replaced: None,
                        promoted,
                        discarded: Vec::new(),
                    })
                } else {
                    AddedTransaction::Queued { transaction: tx, replaced: None }
                }
            }
        };

        let evicted = self.enforce_limits();
        if evicted.iter().any(|e| e.hash() == &hash) {
            return Err(PoolError::new(hash, PoolErrorKind::DiscardedOnInsert))
        }
        if let AddedTransaction::Pending(pending) = &mut added {
            pending.discarded = evicted;
        }

        self.update_size_metrics();
        Ok(added)
    }

    /// Removes the transaction with the given hash.
    ///
    /// Removing from inside a sender's pending run demotes the higher nonces of that run back
    /// to queued; they stay in the pool.
    pub fn remove_transaction(
        &mut self,
        hash: &TxHash,
    ) -> Option<Arc<ValidPoolTransaction<T::Transaction>>> {
        let id = self.by_hash.remove(hash)?;
        let tx = self.remove_from_account(id);
        if tx.is_some() {
            self.metrics.removed_transactions.increment(1);
            self.update_size_metrics();
        }
        tx
    }

    /// Removes all transactions with the given hashes and returns the ones that were tracked.
    pub fn remove_transactions(
        &mut self,
        hashes: impl IntoIterator<Item = TxHash>,
    ) -> Vec<Arc<ValidPoolTransaction<T::Transaction>>> {
        hashes.into_iter().filter_map(|hash| self.remove_transaction(&hash)).collect()
    }

    /// Applies a committed block to the pool.
    ///
    /// Advances the baseline of every changed account, pruning entries the block made stale and
    /// promoting entries it made contiguous, then re-enforces the capacity limits. Priorities
    /// of subsequent [`Self::best_transactions`] snapshots use the new base fee.
    pub fn on_new_block(
        &mut self,
        pending_base_fee: u128,
        changed: impl IntoIterator<Item = (SenderId, u64)>,
    ) -> OnNewBlockOutcome<T::Transaction> {
        self.pending_basefee = pending_base_fee;

        let mut outcome = OnNewBlockOutcome::default();
        for (sender, nonce) in changed {
            let Some(queue) = self.accounts.get_mut(&sender) else { continue };
            let before = account_footprint(queue);
            let baseline = queue.set_baseline(nonce);
            let after = account_footprint(queue);
            if queue.is_empty() {
                self.accounts.remove(&sender);
            }
            self.apply_footprint_delta(before, after);
            for tx in &baseline.discarded {
                self.by_hash.remove(tx.hash());
            }
            outcome.discarded.extend(baseline.discarded);
            outcome.promoted.extend(baseline.promoted);
        }

        self.metrics.removed_transactions.increment(outcome.discarded.len() as u64);
        self.metrics.promoted_transactions.increment(outcome.promoted.len() as u64);

        let evicted = self.enforce_limits();
        outcome.discarded.extend(evicted);

        debug!(
            target: "txpool",
            base_fee = pending_base_fee,
            promoted = outcome.promoted.len(),
            discarded = outcome.discarded.len(),
            "applied block to pool"
        );
        self.update_size_metrics();
        outcome
    }

    /// Enforces the per sub-pool limits by evicting the lowest priority entries.
    fn enforce_limits(&mut self) -> Vec<Arc<ValidPoolTransaction<T::Transaction>>> {
        let mut evicted = Vec::new();
        while self.config.queued_limit.is_exceeded(self.size.queued, self.size.queued_size) {
            let Some(tx) = self.evict_worst(TxStatus::Queued) else { break };
            evicted.push(tx);
        }
        while self.config.pending_limit.is_exceeded(self.size.pending, self.size.pending_size) {
            let Some(tx) = self.evict_worst(TxStatus::Pending) else { break };
            evicted.push(tx);
        }

        if !evicted.is_empty() {
            self.metrics.evicted_transactions.increment(evicted.len() as u64);
            debug!(target: "txpool", count = evicted.len(), "evicted transactions over capacity");
        }
        evicted
    }

    /// Evicts one transaction from the given sub-pool.
    ///
    /// The victim sender is the one owning the lowest priority entry in that sub-pool, ties
    /// broken towards the latest arrival. The evicted transaction is the highest nonce of that
    /// sender's run, so no gap opens below remaining entries.
    fn evict_worst(&mut self, pool: TxStatus) -> Option<Arc<ValidPoolTransaction<T::Transaction>>> {
        let mut worst: Option<(T::Priority, u64, TransactionId)> = None;
        for queue in self.accounts.values() {
            let candidate = match pool {
                TxStatus::Pending => queue.pending_txs().next_back(),
                TxStatus::Queued => queue.queued_txs().next_back(),
            };
            let Some(tail) = candidate else { continue };
            let priority = self.ordering.priority(&tail.transaction, self.pending_basefee);
            let is_worse = match &worst {
                Some((other, submission, _)) => {
                    priority < *other || (priority == *other && tail.submission_id > *submission)
                }
                None => true,
            };
            if is_worse {
                worst = Some((priority, tail.submission_id, *tail.id()));
            }
        }

        let (_, _, id) = worst?;
        let tx = self.remove_from_account(id)?;
        self.by_hash.remove(tx.hash());
        Some(tx)
    }

    /// Removes a transaction from its account queue, dropping the queue once empty.
    ///
    /// The caller maintains the hash index.
    fn remove_from_account(
        &mut self,
        id: TransactionId,
    ) -> Option<Arc<ValidPoolTransaction<T::Transaction>>> {
        let queue = self.accounts.get_mut(&id.sender)?;
        let before = account_footprint(queue);
        let tx = queue.remove(id.nonce);
        let after = account_footprint(queue);
        if queue.is_empty() {
            self.accounts.remove(&id.sender);
        }
        self.apply_footprint_delta(before, after);
        tx
    }

    /// Folds a single account's footprint change into the pool wide totals.
    fn apply_footprint_delta(&mut self, before: PoolSize, after: PoolSize) {
        self.size.pending = self.size.pending + after.pending - before.pending;
        self.size.pending_size = self.size.pending_size + after.pending_size - before.pending_size;
        self.size.queued = self.size.queued + after.queued - before.queued;
        self.size.queued_size = self.size.queued_size + after.queued_size - before.queued_size;
    }

    fn update_size_metrics(&self) {
        self.metrics.pending_pool_transactions.set(self.size.pending as f64);
        self.metrics.queued_pool_transactions.set(self.size.queued as f64);
    }

    /// Asserts the hash index, the account queues and the size tracker agree.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        let mut recomputed = PoolSize::default();
        for (sender, queue) in &self.accounts {
            assert!(!queue.is_empty(), "empty account queue retained");
            for tx in queue.pending_txs().chain(queue.queued_txs()) {
                assert_eq!(tx.sender_id(), *sender);
                assert_eq!(self.by_hash.get(tx.hash()), Some(tx.id()));
            }
            let footprint = account_footprint(queue);
            recomputed.pending += footprint.pending;
            recomputed.pending_size += footprint.pending_size;
            recomputed.queued += footprint.queued;
            recomputed.queued_size += footprint.queued_size;
        }
        assert_eq!(recomputed.total(), self.by_hash.len(), "hash index out of sync");
        assert_eq!(recomputed, self.size, "size tracker out of sync");
    }
}

impl<T: TransactionOrdering> std::fmt::Debug for TxPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxPool")
            .field("accounts", &self.accounts.len())
            .field("transactions", &self.by_hash.len())
            .field("pending_basefee", &self.pending_basefee)
            .finish_non_exhaustive()
    }
}

/// Counts and byte sizes of a single account queue.
fn account_footprint<T: PoolTransaction>(queue: &AccountQueue<T>) -> PoolSize {
    let mut footprint = PoolSize::default();
    for tx in queue.pending_txs() {
        footprint.pending += 1;
        footprint.pending_size += tx.encoded_size();
    }
    for tx in queue.queued_txs() {
        footprint.queued += 1;
        footprint.queued_size += tx.encoded_size();
    }
    footprint
}

/// Result of applying a committed block to the pool.
#[derive(Debug)]
pub struct OnNewBlockOutcome<T: PoolTransaction> {
    /// Transactions that became executable through the block.
    pub promoted: Vec<Arc<ValidPoolTransaction<T>>>,
    /// Transactions the block made stale, plus any evicted over capacity.
    pub discarded: Vec<Arc<ValidPoolTransaction<T>>>,
}

impl<T: PoolTransaction> Default for OnNewBlockOutcome<T> {
    fn default() -> Self {
        Self { promoted: Vec::new(), discarded: Vec::new() }
    }
}
