//! Block construction over multiple transaction sources.

use evm_txpool::{
    test_utils::{MockTransaction, MockTransactionFactory, MockValidator},
    EffectiveTipOrdering, Pool, PoolConfig, PoolTransaction, ProposalOrdering,
    TransactionOrigin,
};

#[test]
fn proposal_merges_pool_with_secondary_source() {
    let pool = Pool::new(
        MockValidator::default(),
        EffectiveTipOrdering::default(),
        PoolConfig::default(),
    );

    // Two senders in the pool, one of them with a two transaction run.
    let hot = MockTransaction::legacy().with_gas_price(90);
    let hot_sender = hot.sender;
    pool.add_transaction(TransactionOrigin::Local, hot.clone()).unwrap();
    pool.add_transaction(
        TransactionOrigin::Local,
        MockTransaction::legacy().with_sender(hot_sender).with_nonce(1).with_gas_price(30),
    )
    .unwrap();
    pool.add_transaction(TransactionOrigin::Local, MockTransaction::legacy().with_gas_price(60))
        .unwrap();

    // A foreign source contributes its own, already priority ordered stream.
    let mut f = MockTransactionFactory::default();
    let (a, b) = (f.rng_sender(), f.rng_sender());
    let foreign = vec![f.validated_legacy(a, 0, 70), f.validated_legacy(b, 0, 20)];

    let ordered = ProposalOrdering::new(0)
        .with_source(pool.best_transactions())
        .with_source(foreign.into_iter())
        .ordered_pending(usize::MAX);

    let prices: Vec<_> = ordered.iter().map(|tx| tx.transaction.fee().fee_cap()).collect();
    assert_eq!(prices, vec![90, 70, 60, 30, 20]);

    // The hot sender's nonces stay ordered despite the price inversion.
    let hot_nonces: Vec<_> = ordered
        .iter()
        .filter(|tx| tx.sender() == hot_sender)
        .map(|tx| tx.nonce())
        .collect();
    assert_eq!(hot_nonces, vec![0, 1]);
}

#[test]
fn proposal_respects_block_space() {
    let pool = Pool::new(
        MockValidator::default(),
        EffectiveTipOrdering::default(),
        PoolConfig::default(),
    );
    for _ in 0..5 {
        pool.add_transaction(TransactionOrigin::Local, MockTransaction::legacy()).unwrap();
    }

    let ordered =
        ProposalOrdering::new(0).with_source(pool.best_transactions()).ordered_pending(3);
    assert_eq!(ordered.len(), 3);
}
