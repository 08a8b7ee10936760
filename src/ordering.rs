//! Transaction priority for block construction.

use crate::traits::PoolTransaction;
use std::{fmt, marker::PhantomData};

/// Transaction ordering trait to determine the order of transactions.
///
/// Decides how transactions should be ordered within the pending set, depending on a `Priority`
/// value.
///
/// The returned priority must reflect [total order](https://en.wikipedia.org/wiki/Total_order).
pub trait TransactionOrdering: Send + Sync + 'static {
    /// Priority of a transaction.
    ///
    /// Higher is better.
    type Priority: Ord + Clone + fmt::Debug + Send + Sync;

    /// The transaction type to determine the priority of.
    type Transaction: PoolTransaction;

    /// Returns the priority score for the given transaction at the given base fee.
    fn priority(&self, transaction: &Self::Transaction, base_fee: u128) -> Self::Priority;
}

/// Default ordering: priority is the effective tip per gas net of the base fee.
///
/// `None` (fee cap below the base fee) sorts below any payable transaction.
#[derive(Debug)]
pub struct EffectiveTipOrdering<T>(PhantomData<T>);

impl<T: PoolTransaction> TransactionOrdering for EffectiveTipOrdering<T> {
    type Priority = Option<u128>;
    type Transaction = T;

    fn priority(&self, transaction: &Self::Transaction, base_fee: u128) -> Self::Priority {
        transaction.effective_tip_per_gas(base_fee)
    }
}

impl<T> Default for EffectiveTipOrdering<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T> Clone for EffectiveTipOrdering<T> {
    fn clone(&self) -> Self {
        Self::default()
    }
}
