//! Mock transaction types and factories.

use crate::{
    identifier::{SenderId, SenderIdentifiers, TransactionId},
    traits::{PoolTransaction, TransactionOrigin, TxFee, TxHash},
    validate::{ClassifiedError, ExecutionContext, TransactionValidator, ValidPoolTransaction},
};
use alloy_primitives::{Address, B256};
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc, time::Instant};

/// A transaction for testing, carrying exactly the fields the pool looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockTransaction {
    /// Content identity.
    pub hash: B256,
    /// The sender.
    pub sender: Address,
    /// The nonce.
    pub nonce: u64,
    /// The fee descriptor.
    pub fee: TxFee,
    /// Declared gas limit.
    pub gas_limit: u64,
    /// Encoded size in bytes.
    pub size: usize,
}

impl MockTransaction {
    /// A legacy transaction from a fresh random sender at nonce 0.
    pub fn legacy() -> Self {
        Self {
            hash: rng_hash(),
            sender: rng_address(),
            nonce: 0,
            fee: TxFee::Legacy { gas_price: 10 },
            gas_limit: 100_000,
            size: 200,
        }
    }

    /// A dynamic fee transaction from a fresh random sender at nonce 0.
    pub fn dynamic_fee() -> Self {
        Self {
            fee: TxFee::DynamicFee { max_fee_per_gas: 10, max_priority_fee_per_gas: 1 },
            ..Self::legacy()
        }
    }

    /// Sets the nonce. A modified transaction is a different transaction, so the hash is
    /// regenerated.
    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self.hash = rng_hash();
        self
    }

    /// Sets a flat legacy gas price, regenerating the hash.
    pub fn with_gas_price(mut self, gas_price: u128) -> Self {
        self.fee = TxFee::Legacy { gas_price };
        self.hash = rng_hash();
        self
    }

    /// Sets the sender, regenerating the hash.
    pub fn with_sender(mut self, sender: Address) -> Self {
        self.sender = sender;
        self.hash = rng_hash();
        self
    }

    /// The flat price of the fee descriptor.
    pub const fn gas_price(&self) -> u128 {
        self.fee.fee_cap()
    }
}

impl PoolTransaction for MockTransaction {
    fn hash(&self) -> &TxHash {
        &self.hash
    }

    fn sender(&self) -> Address {
        self.sender
    }

    fn nonce(&self) -> u64 {
        self.nonce
    }

    fn fee(&self) -> &TxFee {
        &self.fee
    }

    fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    fn encoded_size(&self) -> usize {
        self.size
    }
}

fn rng_hash() -> B256 {
    B256::from(rand::random::<[u8; 32]>())
}

fn rng_address() -> Address {
    Address::from(rand::random::<[u8; 20]>())
}

/// Stamps mock transactions into pool-owned [`ValidPoolTransaction`]s, interning senders and
/// assigning monotonically increasing submission ids the way the pool would at admission.
#[derive(Debug, Default)]
pub struct MockTransactionFactory {
    identifiers: SenderIdentifiers,
    submission_id: u64,
}

impl MockTransactionFactory {
    /// A fresh random sender, pre-interned.
    pub fn rng_sender(&mut self) -> Address {
        let sender = rng_address();
        self.identifiers.sender_id_or_create(sender);
        sender
    }

    /// The interned id of the given sender.
    pub fn sender_id(&mut self, sender: Address) -> SenderId {
        self.identifiers.sender_id_or_create(sender)
    }

    /// Stamps the given transaction as admitted.
    pub fn validate(&mut self, transaction: MockTransaction) -> ValidPoolTransaction<MockTransaction> {
        let transaction_id =
            TransactionId::new(self.sender_id(transaction.sender), transaction.nonce);
        let submission_id = self.submission_id;
        self.submission_id += 1;
        ValidPoolTransaction {
            transaction,
            transaction_id,
            origin: TransactionOrigin::Local,
            submission_id,
            timestamp: Instant::now(),
        }
    }

    /// An admitted legacy transaction.
    pub fn validate_legacy(
        &mut self,
        sender: Address,
        nonce: u64,
        gas_price: u128,
    ) -> ValidPoolTransaction<MockTransaction> {
        self.validate(
            MockTransaction::legacy()
                .with_sender(sender)
                .with_nonce(nonce)
                .with_gas_price(gas_price),
        )
    }

    /// Like [`Self::validate_legacy`], shared.
    pub fn validated_legacy(
        &mut self,
        sender: Address,
        nonce: u64,
        gas_price: u128,
    ) -> Arc<ValidPoolTransaction<MockTransaction>> {
        Arc::new(self.validate_legacy(sender, nonce, gas_price))
    }

    /// An admitted dynamic fee transaction.
    pub fn validate_dynamic(
        &mut self,
        sender: Address,
        nonce: u64,
        max_fee_per_gas: u128,
        max_priority_fee_per_gas: u128,
    ) -> ValidPoolTransaction<MockTransaction> {
        self.validate(MockTransaction {
            fee: TxFee::DynamicFee { max_fee_per_gas, max_priority_fee_per_gas },
            ..MockTransaction::legacy().with_sender(sender).with_nonce(nonce)
        })
    }

    /// Like [`Self::validate_dynamic`], shared.
    pub fn validated_dynamic(
        &mut self,
        sender: Address,
        nonce: u64,
        max_fee_per_gas: u128,
        max_priority_fee_per_gas: u128,
    ) -> Arc<ValidPoolTransaction<MockTransaction>> {
        Arc::new(self.validate_dynamic(sender, nonce, max_fee_per_gas, max_priority_fee_per_gas))
    }
}

/// A validator backed by an in-memory nonce table.
///
/// Classifies purely on nonces and reports half the gas limit as used, so admission responses
/// have something observable in them.
#[derive(Debug, Default)]
pub struct MockValidator {
    nonces: Mutex<HashMap<Address, u64>>,
}

impl MockValidator {
    /// Sets the on-chain nonce the validator reports for the given sender.
    pub fn set_nonce(&self, sender: Address, nonce: u64) {
        self.nonces.lock().insert(sender, nonce);
    }
}

impl TransactionValidator for MockValidator {
    type Transaction = MockTransaction;

    fn validate(
        &self,
        _origin: TransactionOrigin,
        transaction: &Self::Transaction,
    ) -> Result<ExecutionContext, ClassifiedError> {
        let state_nonce =
            self.nonces.lock().get(&transaction.sender).copied().unwrap_or_default();
        if transaction.nonce < state_nonce {
            return Err(ClassifiedError::NonceLow { state_nonce, tx_nonce: transaction.nonce })
        }
        if transaction.nonce > state_nonce {
            return Err(ClassifiedError::NonceGap { state_nonce, tx_nonce: transaction.nonce })
        }
        Ok(ExecutionContext {
            state_nonce,
            gas_wanted: transaction.gas_limit,
            gas_used: transaction.gas_limit / 2,
            ..Default::default()
        })
    }
}
