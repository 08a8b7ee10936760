//! Per-sender transaction queue.

use crate::{
    traits::{PoolTransaction, TxHash},
    validate::ValidPoolTransaction,
};
use std::{collections::BTreeMap, ops::Range, sync::Arc};

/// All transactions of a single sender, split into an executable contiguous run and a gapped
/// remainder.
///
/// Invariants:
///   - all entries have `nonce >= baseline`; entries below the baseline are pruned eagerly
///   - the pending view is exactly the nonce range `[baseline, pending_until)` and every nonce
///     in that range is occupied
///   - every entry outside that range is queued, and `pending_until` itself is unoccupied
///     unless it equals the upper end of the pending run
pub(crate) struct AccountQueue<T: PoolTransaction> {
    /// The sender's next expected nonce per the committed state.
    baseline: u64,
    /// Exclusive upper end of the contiguous pending run.
    pending_until: u64,
    /// All transactions of this sender keyed by nonce.
    txs: BTreeMap<u64, Arc<ValidPoolTransaction<T>>>,
}

/// Outcome of inserting into an [`AccountQueue`].
#[derive(Debug)]
pub(crate) enum AccountInsert<T: PoolTransaction> {
    /// The slot was vacant.
    Inserted {
        /// Previously queued entries that became pending because this insert closed their gap.
        /// Does not include the inserted transaction itself.
        promoted: Vec<Arc<ValidPoolTransaction<T>>>,
    },
    /// The slot was occupied and the candidate won the replacement arbitration.
    Replaced {
        /// The displaced transaction, already unlinked from this queue.
        old: Arc<ValidPoolTransaction<T>>,
    },
}

/// The candidate lost the replacement arbitration.
#[derive(Debug)]
pub(crate) struct Underpriced {
    /// Hash of the incumbent transaction occupying the slot.
    pub(crate) existing: TxHash,
}

/// Outcome of advancing the baseline at a block boundary.
pub(crate) struct BaselineOutcome<T: PoolTransaction> {
    /// Entries below the new baseline, now stale.
    pub(crate) discarded: Vec<Arc<ValidPoolTransaction<T>>>,
    /// Queued entries that became pending.
    pub(crate) promoted: Vec<Arc<ValidPoolTransaction<T>>>,
}

impl<T: PoolTransaction> Default for BaselineOutcome<T> {
    fn default() -> Self {
        Self { discarded: Vec::new(), promoted: Vec::new() }
    }
}

impl<T: PoolTransaction> AccountQueue<T> {
    /// Creates an empty queue for a sender at the given baseline nonce.
    pub(crate) const fn new(baseline: u64) -> Self {
        Self { baseline, pending_until: baseline, txs: BTreeMap::new() }
    }

    /// The sender's baseline nonce.
    pub(crate) const fn baseline(&self) -> u64 {
        self.baseline
    }

    /// The contiguous pending nonce range `[baseline, pending_until)`.
    pub(crate) const fn pending_range(&self) -> Range<u64> {
        self.baseline..self.pending_until
    }

    /// Number of transactions tracked for this sender.
    pub(crate) fn len(&self) -> usize {
        self.txs.len()
    }

    /// Whether this queue holds no transactions at all.
    pub(crate) fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }

    /// Returns the transaction occupying the given nonce slot.
    pub(crate) fn get(&self, nonce: u64) -> Option<&Arc<ValidPoolTransaction<T>>> {
        self.txs.get(&nonce)
    }

    /// Whether the given nonce is part of the pending run.
    pub(crate) const fn is_pending(&self, nonce: u64) -> bool {
        nonce >= self.baseline && nonce < self.pending_until
    }

    /// Iterates the pending run in nonce order.
    pub(crate) fn pending_txs(
        &self,
    ) -> impl DoubleEndedIterator<Item = &Arc<ValidPoolTransaction<T>>> + '_ {
        self.txs.range(self.pending_range()).map(|(_, tx)| tx)
    }

    /// Iterates the queued remainder in nonce order.
    pub(crate) fn queued_txs(
        &self,
    ) -> impl DoubleEndedIterator<Item = &Arc<ValidPoolTransaction<T>>> + '_ {
        self.txs.range(self.pending_until..).map(|(_, tx)| tx)
    }

    /// Inserts a transaction, applying replacement arbitration if the slot is occupied.
    ///
    /// The caller must have rejected nonces below the baseline already.
    pub(crate) fn insert(
        &mut self,
        tx: Arc<ValidPoolTransaction<T>>,
        price_bump: u128,
    ) -> Result<AccountInsert<T>, Underpriced> {
        let nonce = tx.nonce();
        debug_assert!(nonce >= self.baseline, "insert below baseline");

        if let Some(existing) = self.txs.get(&nonce) {
            if existing.is_underpriced(&tx.transaction, price_bump) {
                return Err(Underpriced { existing: *existing.hash() })
            }
            // The winning candidate takes over the slot; the pending boundary is unaffected
            // because the set of occupied nonces does not change.
            let old = self.txs.insert(nonce, tx).expect("slot was occupied");
            return Ok(AccountInsert::Replaced { old })
        }

        self.txs.insert(nonce, tx);
        let mut promoted = self.advance_pending_boundary();
        promoted.retain(|p| p.nonce() != nonce);
        Ok(AccountInsert::Inserted { promoted })
    }

    /// Removes the transaction at the given nonce.
    ///
    /// Removing from inside the pending run re-opens a gap: every higher entry becomes queued.
    pub(crate) fn remove(&mut self, nonce: u64) -> Option<Arc<ValidPoolTransaction<T>>> {
        let tx = self.txs.remove(&nonce)?;
        if nonce < self.pending_until {
            self.pending_until = nonce;
        }
        Some(tx)
    }

    /// Advances the baseline to the committed nonce, pruning stale entries and promoting
    /// newly contiguous ones.
    ///
    /// A baseline behind the current one is ignored; the pool does not track reorgs.
    pub(crate) fn set_baseline(&mut self, new_baseline: u64) -> BaselineOutcome<T> {
        if new_baseline <= self.baseline {
            return BaselineOutcome::default()
        }

        let mut outcome = BaselineOutcome::default();
        while let Some((&nonce, _)) = self.txs.first_key_value() {
            if nonce >= new_baseline {
                break
            }
            outcome.discarded.push(self.txs.remove(&nonce).expect("first key exists"));
        }

        self.baseline = new_baseline;
        if self.pending_until < new_baseline {
            self.pending_until = new_baseline;
        }
        outcome.promoted = self.advance_pending_boundary();
        outcome
    }

    /// Walks the boundary forward over newly contiguous entries and returns the entries that
    /// crossed from queued into pending.
    ///
    /// Amortized O(1) for sequential submission: each entry crosses the boundary at most once.
    fn advance_pending_boundary(&mut self) -> Vec<Arc<ValidPoolTransaction<T>>> {
        let mut promoted = Vec::new();
        while let Some(tx) = self.txs.get(&self.pending_until) {
            promoted.push(tx.clone());
            self.pending_until += 1;
        }
        promoted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockTransactionFactory;

    #[test]
    fn pending_is_contiguous_prefix() {
        let mut f = MockTransactionFactory::default();
        let mut queue = AccountQueue::new(0);
        let sender = f.rng_sender();

        // gap at nonce 1
        for nonce in [0u64, 2, 3] {
            queue.insert(f.validated_legacy(sender, nonce, 100), 10).unwrap();
        }
        assert_eq!(queue.pending_range(), 0..1);
        assert_eq!(queue.queued_txs().count(), 2);

        // filling the gap promotes 2 and 3 in one operation
        let res = queue.insert(f.validated_legacy(sender, 1, 100), 10).unwrap();
        let AccountInsert::Inserted { promoted } = res else { panic!("expected insert") };
        assert_eq!(promoted.iter().map(|tx| tx.nonce()).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(queue.pending_range(), 0..4);
        assert_eq!(queue.queued_txs().count(), 0);
    }

    #[test]
    fn replacement_keeps_boundary() {
        let mut f = MockTransactionFactory::default();
        let mut queue = AccountQueue::new(0);
        let sender = f.rng_sender();

        queue.insert(f.validated_legacy(sender, 0, 100), 10).unwrap();
        let err = queue.insert(f.validated_legacy(sender, 0, 105), 10).unwrap_err();
        assert_eq!(queue.get(0).map(|tx| *tx.hash()), Some(err.existing));

        let winner = f.validated_legacy(sender, 0, 150);
        let winner_hash = *winner.hash();
        let AccountInsert::Replaced { old } = queue.insert(winner, 10).unwrap() else {
            panic!("expected replacement")
        };
        assert_eq!(*old.hash(), err.existing);
        assert_eq!(queue.get(0).map(|tx| *tx.hash()), Some(winner_hash));
        assert_eq!(queue.pending_range(), 0..1);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn remove_reopens_gap() {
        let mut f = MockTransactionFactory::default();
        let mut queue = AccountQueue::new(0);
        let sender = f.rng_sender();

        for nonce in 0..3 {
            queue.insert(f.validated_legacy(sender, nonce, 100), 10).unwrap();
        }
        assert_eq!(queue.pending_range(), 0..3);

        queue.remove(1);
        assert_eq!(queue.pending_range(), 0..1);
        assert_eq!(queue.queued_txs().map(|tx| tx.nonce()).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn baseline_advance_prunes_and_promotes() {
        let mut f = MockTransactionFactory::default();
        let mut queue = AccountQueue::new(0);
        let sender = f.rng_sender();

        // pending 0, 1; queued 3
        for nonce in [0u64, 1, 3] {
            queue.insert(f.validated_legacy(sender, nonce, 100), 10).unwrap();
        }
        assert_eq!(queue.pending_range(), 0..2);

        // commit advanced the account to nonce 3
        let outcome = queue.set_baseline(3);
        assert_eq!(outcome.discarded.iter().map(|tx| tx.nonce()).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(outcome.promoted.iter().map(|tx| tx.nonce()).collect::<Vec<_>>(), vec![3]);
        assert_eq!(queue.pending_range(), 3..4);

        // stale baselines are ignored
        let outcome = queue.set_baseline(1);
        assert!(outcome.discarded.is_empty() && outcome.promoted.is_empty());
        assert_eq!(queue.baseline(), 3);
    }

    #[test]
    fn baseline_advance_past_everything_empties_queue() {
        let mut f = MockTransactionFactory::default();
        let mut queue = AccountQueue::new(0);
        let sender = f.rng_sender();

        queue.insert(f.validated_legacy(sender, 0, 100), 10).unwrap();
        queue.insert(f.validated_legacy(sender, 1, 100), 10).unwrap();

        let outcome = queue.set_baseline(5);
        assert_eq!(outcome.discarded.len(), 2);
        assert!(outcome.promoted.is_empty());
        assert!(queue.is_empty());
        assert_eq!(queue.pending_range(), 5..5);
    }
}
