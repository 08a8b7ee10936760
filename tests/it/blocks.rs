//! Pool lifecycle across block boundaries.

use assert_matches::assert_matches;
use evm_txpool::{
    test_utils::{MockTransaction, MockValidator},
    ChangedAccount, EffectiveTipOrdering, OnNewBlockEvent, Pool, PoolConfig, PoolErrorKind,
    PoolTransaction, SubPoolLimit, TrackingCommitLock, TransactionOrigin, TxFee, TxStatus,
};
use std::sync::Arc;

type MockPool = Pool<MockValidator, EffectiveTipOrdering<MockTransaction>>;

fn pool() -> (MockPool, Arc<TrackingCommitLock>) {
    let lock = Arc::new(TrackingCommitLock::default());
    let pool = Pool::with_commit_lock(
        MockValidator::default(),
        EffectiveTipOrdering::default(),
        PoolConfig::default(),
        lock.clone(),
    );
    (pool, lock)
}

#[test]
fn commit_prunes_promotes_and_notifies() {
    let (pool, lock) = pool();
    let mut pending = pool.pending_transactions_listener();

    let first = MockTransaction::legacy();
    let sender = first.sender;
    let gapped = first.clone().with_nonce(2);

    pool.add_transaction(TransactionOrigin::Local, first.clone()).unwrap();
    pool.add_transaction(TransactionOrigin::Local, gapped.clone()).unwrap();
    assert_eq!(pending.try_recv().unwrap(), first.hash);
    assert!(pending.try_recv().is_err());
    assert_eq!(pool.size().pending, 1);
    assert_eq!(pool.size().queued, 1);

    // The block executes nonce 0; the sender's committed nonce is now 1.
    pool.on_new_block(OnNewBlockEvent {
        pending_base_fee: 5,
        changed_accounts: vec![ChangedAccount { address: sender, nonce: 1 }],
    });
    pool.inner().validator().set_nonce(sender, 1);

    assert!(!pool.contains(&first.hash));
    assert_eq!(pool.status(&gapped.hash), Some(TxStatus::Queued));

    // Filling the hole promotes the parked transaction.
    let filler = first.with_nonce(1);
    pool.add_transaction(TransactionOrigin::Local, filler.clone()).unwrap();
    assert_eq!(pool.status(&gapped.hash), Some(TxStatus::Pending));
    assert_eq!(pending.try_recv().unwrap(), filler.hash);
    assert_eq!(pending.try_recv().unwrap(), gapped.hash);

    // The proposal view walks the sender in nonce order.
    let nonces: Vec<_> = pool.best_transactions().map(|tx| tx.nonce()).collect();
    assert_eq!(nonces, vec![1, 2]);
    assert_eq!(lock.commits(), 1);
}

#[test]
fn commit_enforces_capacity() {
    let config = PoolConfig {
        pending_limit: SubPoolLimit::new(2, usize::MAX),
        ..Default::default()
    };
    let pool = Pool::new(MockValidator::default(), EffectiveTipOrdering::default(), config);

    let cheap = MockTransaction::legacy().with_gas_price(1);
    let rich_a = MockTransaction::legacy().with_gas_price(100);
    let rich_b = MockTransaction::legacy().with_gas_price(100);
    pool.add_transaction(TransactionOrigin::Local, rich_a.clone()).unwrap();
    pool.add_transaction(TransactionOrigin::Local, rich_b.clone()).unwrap();

    // The cheapest transaction in an overfull pool never sticks.
    let err = pool.add_transaction(TransactionOrigin::Local, cheap.clone()).unwrap_err();
    assert_matches!(err.kind, PoolErrorKind::DiscardedOnInsert);
    assert!(!pool.contains(&cheap.hash));
    assert_eq!(pool.size().total(), 2);
    assert!(pool.contains(&rich_a.hash));
    assert!(pool.contains(&rich_b.hash));
}

#[test]
fn base_fee_reprices_the_pending_view() {
    let (pool, _) = pool();

    let tx = MockTransaction::legacy();
    let sender = tx.sender;
    let tx = MockTransaction {
        fee: TxFee::DynamicFee { max_fee_per_gas: 40, max_priority_fee_per_gas: 7 },
        ..tx
    };
    pool.add_transaction(TransactionOrigin::Local, tx.clone()).unwrap();

    pool.on_new_block(OnNewBlockEvent {
        pending_base_fee: 35,
        changed_accounts: vec![ChangedAccount { address: sender, nonce: 0 }],
    });

    // After the base fee rise the effective tip is capped by the remaining headroom.
    let best: Vec<_> = pool.best_transactions().collect();
    assert_eq!(best.len(), 1);
    assert_eq!(best[0].transaction.effective_tip_per_gas(35), Some(5));
}
