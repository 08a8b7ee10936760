//! Priority ordered transaction sequences for block construction.

use crate::{traits::PoolTransaction, validate::ValidPoolTransaction};
use alloy_primitives::Address;
use std::{collections::HashSet, iter::Peekable, sync::Arc};

/// Boxed stream of admitted transactions, each source already in its own priority order.
type SourceIter<T> = Peekable<Box<dyn Iterator<Item = Arc<ValidPoolTransaction<T>>>>>;

/// Merges priority ordered transaction streams into a single proposal sequence.
///
/// Sources are merged by effective tip at the given base fee; ties break by arrival order so
/// the sequence is deterministic across replays. A source must yield its own transactions in
/// priority order with per sender nonce order intact, which the merge then preserves: it only
/// ever consumes the head of one source at a time.
///
/// Built once per block-construction cycle.
pub struct ProposalOrdering<T: PoolTransaction> {
    sources: Vec<SourceIter<T>>,
    base_fee: u128,
}

impl<T: PoolTransaction> std::fmt::Debug for ProposalOrdering<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProposalOrdering")
            .field("sources", &self.sources.len())
            .field("base_fee", &self.base_fee)
            .finish()
    }
}

impl<T: PoolTransaction> ProposalOrdering<T> {
    /// Creates an empty merge over the given base fee.
    pub fn new(base_fee: u128) -> Self {
        Self { sources: Vec::new(), base_fee }
    }

    /// Adds a contributing source.
    pub fn with_source(
        mut self,
        source: impl Iterator<Item = Arc<ValidPoolTransaction<T>>> + 'static,
    ) -> Self {
        let boxed: Box<dyn Iterator<Item = Arc<ValidPoolTransaction<T>>>> = Box::new(source);
        self.sources.push(boxed.peekable());
        self
    }

    /// Produces the proposal sequence, at most `limit` transactions long.
    ///
    /// Transactions whose fee cap cannot cover the base fee are skipped, and so are the same
    /// sender's later nonces: without their ancestor they cannot execute in this block. All of
    /// them stay in their pool.
    pub fn ordered_pending(mut self, limit: usize) -> Vec<Arc<ValidPoolTransaction<T>>> {
        let mut ordered = Vec::new();
        let mut priced_out: HashSet<Address> = HashSet::new();
        while ordered.len() < limit {
            let Some(best) = self.pop_best() else { break };
            if priced_out.contains(&best.sender()) {
                continue
            }
            if best.transaction.effective_tip_per_gas(self.base_fee).is_some() {
                ordered.push(best);
            } else {
                priced_out.insert(best.sender());
            }
        }
        ordered
    }

    /// Consumes the highest ranked head across all sources.
    fn pop_best(&mut self) -> Option<Arc<ValidPoolTransaction<T>>> {
        let base_fee = self.base_fee;
        let (idx, _) = self
            .sources
            .iter_mut()
            .enumerate()
            .filter_map(|(idx, source)| {
                let head = source.peek()?;
                Some((idx, (head.transaction.effective_tip_per_gas(base_fee), head.submission_id)))
            })
            .max_by(|(_, (tip_a, sub_a)), (_, (tip_b, sub_b))| {
                tip_a.cmp(tip_b).then_with(|| sub_b.cmp(sub_a))
            })?;
        self.sources[idx].next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockTransactionFactory;

    #[test]
    fn merges_sources_by_effective_tip() {
        let mut f = MockTransactionFactory::default();
        let a = f.rng_sender();
        let b = f.rng_sender();

        let evm = vec![f.validated_legacy(a, 0, 50), f.validated_legacy(a, 1, 40)];
        let other = vec![f.validated_legacy(b, 0, 45)];

        let ordered = ProposalOrdering::new(0)
            .with_source(evm.into_iter())
            .with_source(other.into_iter())
            .ordered_pending(usize::MAX);

        let prices: Vec<_> =
            ordered.iter().map(|tx| tx.transaction.fee().fee_cap()).collect();
        assert_eq!(prices, vec![50, 45, 40]);
    }

    #[test]
    fn sender_nonce_order_survives_the_merge() {
        let mut f = MockTransactionFactory::default();
        let sender = f.rng_sender();

        // A later nonce with a higher price must not jump its predecessor.
        let txs = vec![f.validated_legacy(sender, 0, 10), f.validated_legacy(sender, 1, 99)];
        let ordered =
            ProposalOrdering::new(0).with_source(txs.into_iter()).ordered_pending(usize::MAX);

        let nonces: Vec<_> = ordered.iter().map(|tx| tx.nonce()).collect();
        assert_eq!(nonces, vec![0, 1]);
    }

    #[test]
    fn equal_tips_keep_arrival_order() {
        let mut f = MockTransactionFactory::default();
        let (a, b) = (f.rng_sender(), f.rng_sender());
        let first = f.validated_legacy(a, 0, 10);
        let second = f.validated_legacy(b, 0, 10);

        let ordered = ProposalOrdering::new(0)
            .with_source(vec![second.clone()].into_iter())
            .with_source(vec![first.clone()].into_iter())
            .ordered_pending(usize::MAX);

        assert_eq!(*ordered[0].hash(), *first.hash());
        assert_eq!(*ordered[1].hash(), *second.hash());
    }

    #[test]
    fn limit_truncates_the_sequence() {
        let mut f = MockTransactionFactory::default();
        let sender = f.rng_sender();
        let txs: Vec<_> = (0..5).map(|nonce| f.validated_legacy(sender, nonce, 10)).collect();

        let ordered =
            ProposalOrdering::new(0).with_source(txs.into_iter()).ordered_pending(3);
        assert_eq!(ordered.len(), 3);
    }

    #[test]
    fn exhausted_source_does_not_derail_the_merge() {
        let mut f = MockTransactionFactory::default();
        let (a, b) = (f.rng_sender(), f.rng_sender());

        // The short source runs dry first; the other one must still drain completely.
        let short = vec![f.validated_legacy(a, 0, 90)];
        let long = vec![f.validated_legacy(b, 0, 80), f.validated_legacy(b, 1, 70)];

        let ordered = ProposalOrdering::new(0)
            .with_source(short.into_iter())
            .with_source(long.into_iter())
            .ordered_pending(usize::MAX);

        let prices: Vec<_> = ordered.iter().map(|tx| tx.transaction.fee().fee_cap()).collect();
        assert_eq!(prices, vec![90, 80, 70]);
    }

    #[test]
    fn priced_out_sender_withholds_descendants() {
        let mut f = MockTransactionFactory::default();
        let (blocked, payable) = (f.rng_sender(), f.rng_sender());

        // The blocked sender's head cannot cover the base fee; its richer nonce 1 must not
        // enter the sequence without it.
        let txs = vec![
            f.validated_dynamic(blocked, 0, 20, 5),
            f.validated_dynamic(blocked, 1, 100, 5),
            f.validated_dynamic(payable, 0, 100, 5),
        ];

        let ordered =
            ProposalOrdering::new(50).with_source(txs.into_iter()).ordered_pending(usize::MAX);

        assert_eq!(ordered.len(), 1);
        assert_eq!(ordered[0].sender(), payable);
    }

    #[test]
    fn priced_out_transactions_are_skipped() {
        let mut f = MockTransactionFactory::default();
        let (a, b) = (f.rng_sender(), f.rng_sender());
        let affordable = f.validated_dynamic(a, 0, 100, 5);
        let priced_out = f.validated_dynamic(b, 0, 20, 5);

        let ordered = ProposalOrdering::new(50)
            .with_source(vec![affordable.clone(), priced_out].into_iter())
            .ordered_pending(usize::MAX);

        assert_eq!(ordered.len(), 1);
        assert_eq!(*ordered[0].hash(), *affordable.hash());
    }
}
