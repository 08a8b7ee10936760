//! Iterator over the pending set in priority order.

use crate::{
    identifier::TransactionId,
    ordering::TransactionOrdering,
    traits::TxHash,
    validate::ValidPoolTransaction,
};
use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet, HashSet},
    sync::Arc,
};
use tracing::debug;

/// An iterator that returns transactions that can be executed on the current state (*best*
/// transactions).
///
/// Operates on a point-in-time snapshot of the pending set. Per sender, transactions are always
/// yielded in nonce order: a transaction only becomes a candidate once its ancestor was yielded.
/// Across senders the order is by priority, ties broken by arrival (first seen wins).
pub struct BestTransactions<T: TransactionOrdering> {
    /// Snapshot of all pending transactions, keyed by (sender, nonce).
    pub(crate) all: BTreeMap<TransactionId, PendingRef<T>>,
    /// Transactions that can be executed right away: one per sender, the lowest pending nonce.
    ///
    /// Yielding a transaction with nonce `n` unlocks `n + 1`, which moves from `all` into this
    /// set.
    pub(crate) independent: BTreeSet<PendingRef<T>>,
    /// Transactions the consumer flagged as unusable; their descendants are withheld.
    pub(crate) invalid: HashSet<TxHash>,
}

impl<T: TransactionOrdering> BestTransactions<T> {
    /// Marks the transaction as invalid for this block.
    ///
    /// Descendants of an invalid transaction are never yielded, since their ancestor slot will
    /// not execute.
    pub fn mark_invalid(&mut self, tx: &Arc<ValidPoolTransaction<T::Transaction>>) {
        self.invalid.insert(*tx.hash());
    }
}

impl<T: TransactionOrdering> std::fmt::Debug for BestTransactions<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BestTransactions")
            .field("all", &self.all.len())
            .field("independent", &self.independent.len())
            .field("invalid", &self.invalid.len())
            .finish()
    }
}

impl<T: TransactionOrdering> Iterator for BestTransactions<T> {
    type Item = Arc<ValidPoolTransaction<T::Transaction>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let best = self.independent.pop_last()?;
            let hash = best.transaction.hash();

            if self.invalid.contains(hash) {
                debug!(target: "txpool", ?hash, "skipping invalid transaction");
                continue
            }

            // Unlock the sender's next nonce.
            if let Some(unlocked) = self.all.get(&best.transaction.id().descendant()) {
                self.independent.insert(unlocked.clone());
            }

            return Some(best.transaction)
        }
    }
}

/// A reference to a pending transaction together with its priority score.
#[derive(Debug)]
pub(crate) struct PendingRef<T: TransactionOrdering> {
    /// The actual transaction.
    pub(crate) transaction: Arc<ValidPoolTransaction<T::Transaction>>,
    /// The priority value assigned by the pool's ordering.
    pub(crate) priority: T::Priority,
}

impl<T: TransactionOrdering> PendingRef<T> {
    fn submission_id(&self) -> u64 {
        self.transaction.submission_id
    }
}

impl<T: TransactionOrdering> Clone for PendingRef<T> {
    fn clone(&self) -> Self {
        Self { transaction: Arc::clone(&self.transaction), priority: self.priority.clone() }
    }
}

impl<T: TransactionOrdering> Eq for PendingRef<T> {}

impl<T: TransactionOrdering> PartialEq<Self> for PendingRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: TransactionOrdering> PartialOrd<Self> for PendingRef<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: TransactionOrdering> Ord for PendingRef<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Compares by priority; for equal priorities the transaction that arrived earlier ranks
        // higher. The submission id also keeps distinct transactions unequal so they are never
        // collapsed in the set.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.submission_id().cmp(&self.submission_id()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ordering::EffectiveTipOrdering,
        test_utils::{MockTransaction, MockTransactionFactory},
        traits::PoolTransaction,
    };

    type MockBest = BestTransactions<EffectiveTipOrdering<MockTransaction>>;

    fn snapshot(refs: Vec<PendingRef<EffectiveTipOrdering<MockTransaction>>>) -> MockBest {
        let mut all = BTreeMap::new();
        let mut independent = BTreeSet::new();
        for tx_ref in refs {
            let id = *tx_ref.transaction.id();
            if !all.contains_key(&TransactionId::new(id.sender, id.nonce.wrapping_sub(1))) {
                independent.insert(tx_ref.clone());
            }
            all.insert(id, tx_ref);
        }
        BestTransactions { all, independent, invalid: Default::default() }
    }

    fn pending_ref(
        f: &mut MockTransactionFactory,
        sender: alloy_primitives::Address,
        nonce: u64,
        price: u128,
    ) -> PendingRef<EffectiveTipOrdering<MockTransaction>> {
        let transaction = f.validated_legacy(sender, nonce, price);
        PendingRef { priority: Some(price), transaction }
    }

    #[test]
    fn yields_nonce_order_per_sender() {
        let mut f = MockTransactionFactory::default();
        let sender = f.rng_sender();

        // later nonces pay more, nonce order must still win
        let best = snapshot(vec![
            pending_ref(&mut f, sender, 0, 10),
            pending_ref(&mut f, sender, 1, 500),
            pending_ref(&mut f, sender, 2, 100),
        ]);
        let nonces = best.map(|tx| tx.nonce()).collect::<Vec<_>>();
        assert_eq!(nonces, vec![0, 1, 2]);
    }

    #[test]
    fn orders_senders_by_priority() {
        let mut f = MockTransactionFactory::default();
        let cheap = f.rng_sender();
        let rich = f.rng_sender();

        let best = snapshot(vec![
            pending_ref(&mut f, cheap, 0, 10),
            pending_ref(&mut f, rich, 0, 100),
        ]);
        let prices =
            best.map(|tx| tx.transaction.fee().fee_cap()).collect::<Vec<_>>();
        assert_eq!(prices, vec![100, 10]);
    }

    #[test]
    fn equal_priority_first_seen_wins() {
        let mut f = MockTransactionFactory::default();
        let first = f.rng_sender();
        let second = f.rng_sender();

        let early = pending_ref(&mut f, first, 0, 50);
        let late = pending_ref(&mut f, second, 0, 50);
        assert!(early.transaction.submission_id < late.transaction.submission_id);

        let best = snapshot(vec![late, early]);
        let senders = best.map(|tx| tx.sender()).collect::<Vec<_>>();
        assert_eq!(senders, vec![first, second]);
    }

    #[test]
    fn invalid_withholds_descendants() {
        let mut f = MockTransactionFactory::default();
        let sender = f.rng_sender();
        let other = f.rng_sender();

        let head = pending_ref(&mut f, sender, 0, 100);
        let mut best = snapshot(vec![
            head.clone(),
            pending_ref(&mut f, sender, 1, 100),
            pending_ref(&mut f, other, 0, 10),
        ]);
        best.mark_invalid(&head.transaction);

        let senders = best.map(|tx| tx.sender()).collect::<Vec<_>>();
        assert_eq!(senders, vec![other]);
    }
}
