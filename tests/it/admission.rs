//! Admission gateway scenarios.

use alloy_primitives::Bytes;
use assert_matches::assert_matches;
use evm_txpool::{
    admission::{DecodeError, TransactionDecoder},
    test_utils::{MockTransaction, MockValidator},
    CheckTxHandler, CheckTxRequest, EffectiveTipOrdering, Pool, PoolConfig, PoolErrorKind,
    PoolTransaction, TransactionOrigin,
};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Hands out opaque byte keys for registered transactions.
#[derive(Debug, Default)]
struct KeyedDecoder {
    txs: Mutex<HashMap<Bytes, MockTransaction>>,
}

impl KeyedDecoder {
    fn register(&self, tx: MockTransaction) -> Bytes {
        let key = Bytes::copy_from_slice(tx.hash().as_slice());
        self.txs.lock().insert(key.clone(), tx);
        key
    }
}

impl TransactionDecoder for KeyedDecoder {
    type Transaction = MockTransaction;

    fn decode(&self, bytes: &[u8]) -> Result<Self::Transaction, DecodeError> {
        self.txs.lock().get(bytes).cloned().ok_or_else(|| DecodeError::msg("unknown bytes"))
    }
}

type Handler = CheckTxHandler<KeyedDecoder, MockValidator, EffectiveTipOrdering<MockTransaction>>;

fn handler() -> Handler {
    let pool = Pool::new(
        MockValidator::default(),
        EffectiveTipOrdering::default(),
        PoolConfig::default(),
    );
    CheckTxHandler::new(pool.inner().clone(), KeyedDecoder::default())
}

fn submit(handler: &Handler, tx: MockTransaction, origin: TransactionOrigin) -> CheckTxRequest {
    CheckTxRequest { tx: handler.decoder().register(tx), origin }
}

#[test]
fn resubmission_visibility_depends_on_origin() {
    let handler = handler();
    let tx = MockTransaction::legacy();

    handler.check_tx(submit(&handler, tx.clone(), TransactionOrigin::Local)).unwrap();

    // The submitting client is told its transaction is already in.
    let err = handler.check_tx(submit(&handler, tx.clone(), TransactionOrigin::Local)).unwrap_err();
    assert!(err.is_already_known());

    // A re-gossiping peer is not; duplicates on the wire are business as usual.
    handler.check_tx(submit(&handler, tx, TransactionOrigin::External)).unwrap();
    assert_eq!(handler.pool().size().total(), 1);
}

#[test]
fn replacement_needs_the_full_price_bump() {
    let handler = handler();
    let original = MockTransaction::legacy().with_gas_price(100);
    let sender = original.sender;

    handler.check_tx(submit(&handler, original, TransactionOrigin::Local)).unwrap();

    // 5% over the incumbent is short of the 10% bump.
    let lowball = MockTransaction::legacy().with_sender(sender).with_gas_price(105);
    let err = handler.check_tx(submit(&handler, lowball, TransactionOrigin::Local)).unwrap_err();
    assert_matches!(err.kind, PoolErrorKind::ReplacementUnderpriced);

    // 50% over clears it.
    let winner = MockTransaction::legacy().with_sender(sender).with_gas_price(150);
    let winner_hash = winner.hash;
    handler.check_tx(submit(&handler, winner, TransactionOrigin::Local)).unwrap();

    assert_eq!(handler.pool().size().total(), 1);
    assert!(handler.pool().contains(&winner_hash));
}
