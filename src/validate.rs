//! Admission pipeline abstractions.
//!
//! Full transaction validation (signature recovery, balance and fee sufficiency, gas
//! computation) is supplied externally. The pool consumes it through the
//! [`TransactionValidator`] trait and only interprets the *classified* failures that affect pool
//! placement: a nonce gap routes the transaction to the queued sub-pool, a low nonce rejects it,
//! anything else propagates unchanged.

use crate::{
    identifier::{SenderId, TransactionId},
    traits::{PoolTransaction, TransactionOrigin, TxHash},
};
use alloy_primitives::{Address, Bytes};
use std::{fmt, time::Instant};

/// A classified failure returned by the admission pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ClassifiedError {
    /// The transaction's nonce is ahead of the sender's baseline: it cannot execute yet but may
    /// become executable once the gap closes.
    #[error("nonce gap: transaction nonce {tx_nonce}, expected {state_nonce}")]
    NonceGap {
        /// The sender's next expected nonce.
        state_nonce: u64,
        /// The nonce carried by the transaction.
        tx_nonce: u64,
    },
    /// The transaction's nonce is behind the sender's baseline: the slot already executed.
    #[error("nonce too low: transaction nonce {tx_nonce}, expected {state_nonce}")]
    NonceLow {
        /// The sender's next expected nonce.
        state_nonce: u64,
        /// The nonce carried by the transaction.
        tx_nonce: u64,
    },
    /// Any other validation failure, propagated to the caller as-is.
    #[error("{0}")]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl ClassifiedError {
    /// Wraps an opaque validation failure.
    pub fn other(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Other(Box::new(error))
    }
}

/// An event emitted during simulated execution, part of the CheckTx response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionEvent {
    /// Event kind.
    pub kind: String,
    /// Key/value attributes of the event.
    pub attributes: Vec<(String, String)>,
}

/// The outcome of a successful pipeline run.
///
/// Carries the sender's state as observed during validation plus the simulated execution
/// results that make up the CheckTx response.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    /// The sender's current on-chain nonce, the pool baseline.
    pub state_nonce: u64,
    /// Gas requested by the transaction.
    pub gas_wanted: u64,
    /// Gas consumed during simulation.
    pub gas_used: u64,
    /// Free-form execution log.
    pub log: String,
    /// Result data of the simulation.
    pub data: Bytes,
    /// Events emitted during simulation.
    pub events: Vec<ExecutionEvent>,
}

/// Provides support for validating a transaction against the current chain state.
#[auto_impl::auto_impl(&, Arc)]
pub trait TransactionValidator: Send + Sync {
    /// The transaction type to validate.
    type Transaction: PoolTransaction;

    /// Validates the transaction and returns the execution context on success, or a classified
    /// failure.
    ///
    /// Callers never hold a pool lock across this call.
    fn validate(
        &self,
        origin: TransactionOrigin,
        transaction: &Self::Transaction,
    ) -> Result<ExecutionContext, ClassifiedError>;
}

/// A single step of a [`StagedValidator`].
///
/// Stages run in the order they were added; the first failure aborts the run. Each stage may
/// refine the [`ExecutionContext`] produced so far.
pub trait ValidationStage<T: PoolTransaction>: Send + Sync {
    /// Validates one aspect of the transaction, updating the context.
    fn validate(
        &self,
        origin: TransactionOrigin,
        transaction: &T,
        cx: &mut ExecutionContext,
    ) -> Result<(), ClassifiedError>;
}

impl<T, F> ValidationStage<T> for F
where
    T: PoolTransaction,
    F: Fn(TransactionOrigin, &T, &mut ExecutionContext) -> Result<(), ClassifiedError>
        + Send
        + Sync,
{
    fn validate(
        &self,
        origin: TransactionOrigin,
        transaction: &T,
        cx: &mut ExecutionContext,
    ) -> Result<(), ClassifiedError> {
        (self)(origin, transaction, cx)
    }
}

/// An admission pipeline assembled from an ordered list of [`ValidationStage`]s.
pub struct StagedValidator<T: PoolTransaction> {
    stages: Vec<Box<dyn ValidationStage<T>>>,
}

impl<T: PoolTransaction> StagedValidator<T> {
    /// Returns a builder for assembling the stage list.
    pub fn builder() -> StagedValidatorBuilder<T> {
        StagedValidatorBuilder { stages: Vec::new() }
    }
}

impl<T: PoolTransaction> TransactionValidator for StagedValidator<T> {
    type Transaction = T;

    fn validate(
        &self,
        origin: TransactionOrigin,
        transaction: &T,
    ) -> Result<ExecutionContext, ClassifiedError> {
        let mut cx = ExecutionContext { gas_wanted: transaction.gas_limit(), ..Default::default() };
        for stage in &self.stages {
            stage.validate(origin, transaction, &mut cx)?;
        }
        Ok(cx)
    }
}

impl<T: PoolTransaction> fmt::Debug for StagedValidator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StagedValidator").field("stages", &self.stages.len()).finish()
    }
}

/// Assembles a [`StagedValidator`] at startup.
pub struct StagedValidatorBuilder<T: PoolTransaction> {
    stages: Vec<Box<dyn ValidationStage<T>>>,
}

impl<T: PoolTransaction> StagedValidatorBuilder<T> {
    /// Appends a stage to the end of the chain.
    pub fn stage(mut self, stage: impl ValidationStage<T> + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Builds the validator.
    pub fn build(self) -> StagedValidator<T> {
        StagedValidator { stages: self.stages }
    }
}

/// A transaction that passed admission and is owned by the pool.
///
/// Never mutated in place: a replacement removes this value and inserts a different one at the
/// same (sender, nonce) slot.
pub struct ValidPoolTransaction<T: PoolTransaction> {
    /// The actual transaction.
    pub transaction: T,
    /// The (sender, nonce) slot identifier assigned by the pool.
    pub transaction_id: TransactionId,
    /// Where this transaction came from.
    pub origin: TransactionOrigin,
    /// Monotonic sequence number assigned at admission, used for arrival-order tie breaks.
    pub submission_id: u64,
    /// When the pool first saw this transaction.
    pub timestamp: Instant,
}

impl<T: PoolTransaction> ValidPoolTransaction<T> {
    /// Hash of the transaction.
    pub fn hash(&self) -> &TxHash {
        self.transaction.hash()
    }

    /// The slot identifier of this transaction.
    pub const fn id(&self) -> &TransactionId {
        &self.transaction_id
    }

    /// The internal identifier of the sender.
    pub const fn sender_id(&self) -> SenderId {
        self.transaction_id.sender
    }

    /// The address of the sender.
    pub fn sender(&self) -> Address {
        self.transaction.sender()
    }

    /// Nonce of the transaction.
    pub fn nonce(&self) -> u64 {
        self.transaction.nonce()
    }

    /// Encoded size of the transaction.
    pub fn encoded_size(&self) -> usize {
        self.transaction.encoded_size()
    }

    /// Whether the given candidate fails to out-bid this transaction at the same slot by the
    /// required bump.
    pub fn is_underpriced(&self, candidate: &T, price_bump: u128) -> bool {
        !self.transaction.fee().is_replaceable_by(candidate.fee(), price_bump)
    }
}

impl<T: PoolTransaction> fmt::Debug for ValidPoolTransaction<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidPoolTransaction")
            .field("hash", self.hash())
            .field("id", &self.transaction_id)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}
