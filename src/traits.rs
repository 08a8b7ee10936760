//! Transaction abstractions used by the pool.

use crate::validate::ValidPoolTransaction;
use alloy_primitives::{Address, Bytes, B256};
use std::{fmt, sync::Arc};

/// Transaction hash type, the content identity of a transaction.
pub type TxHash = B256;

/// Trait for transaction types stored in the pool.
pub trait PoolTransaction: fmt::Debug + Clone + Send + Sync + 'static {
    /// Hash of the transaction, its identity in the pool.
    fn hash(&self) -> &TxHash;

    /// The sender of the transaction.
    fn sender(&self) -> Address;

    /// The nonce of the transaction.
    fn nonce(&self) -> u64;

    /// The fee descriptor of the transaction.
    fn fee(&self) -> &TxFee;

    /// Amount of gas the transaction may consume.
    fn gas_limit(&self) -> u64;

    /// Encoded length of the transaction, used for size based capacity accounting.
    fn encoded_size(&self) -> usize;

    /// Whether this is a dynamic fee transaction.
    fn is_dynamic_fee(&self) -> bool {
        self.fee().is_dynamic()
    }

    /// Effective tip per gas for the given base fee.
    ///
    /// Returns `None` if the fee cap is below the base fee.
    fn effective_tip_per_gas(&self, base_fee: u128) -> Option<u128> {
        self.fee().effective_tip(base_fee)
    }
}

/// The fee descriptor of a transaction.
///
/// Legacy transactions carry a single flat price, dynamic fee transactions a
/// `{fee cap, tip cap}` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TxFee {
    /// Flat gas price.
    Legacy {
        /// Price the sender pays per unit of gas.
        gas_price: u128,
    },
    /// EIP-1559 style fee pair.
    DynamicFee {
        /// Maximum fee per gas the sender is willing to pay, inclusive of the base fee.
        max_fee_per_gas: u128,
        /// Maximum tip per gas the sender is willing to pay on top of the base fee.
        max_priority_fee_per_gas: u128,
    },
}

impl TxFee {
    /// Whether this is a dynamic fee descriptor.
    pub const fn is_dynamic(&self) -> bool {
        matches!(self, Self::DynamicFee { .. })
    }

    /// The maximum price per gas the sender is willing to pay.
    pub const fn fee_cap(&self) -> u128 {
        match self {
            Self::Legacy { gas_price } => *gas_price,
            Self::DynamicFee { max_fee_per_gas, .. } => *max_fee_per_gas,
        }
    }

    /// The maximum tip per gas. For legacy transactions this is the full price.
    pub const fn tip_cap(&self) -> u128 {
        match self {
            Self::Legacy { gas_price } => *gas_price,
            Self::DynamicFee { max_priority_fee_per_gas, .. } => *max_priority_fee_per_gas,
        }
    }

    /// Effective tip per gas net of the given base fee.
    ///
    /// Returns `None` if the fee cap is below the base fee, i.e. the transaction cannot be
    /// included at that base fee.
    pub fn effective_tip(&self, base_fee: u128) -> Option<u128> {
        let fee_cap = self.fee_cap();
        if fee_cap < base_fee {
            return None
        }
        Some(self.tip_cap().min(fee_cap - base_fee))
    }

    /// Whether a `candidate` fee is allowed to replace `self` at the same (sender, nonce) slot,
    /// given a minimum bump percentage.
    ///
    /// A dynamic fee incumbent can never be displaced by a legacy candidate: the fee pair is
    /// strictly more expressive and a downgrade would override the sender's expressed intent.
    /// In all other pairings both the fee cap and the tip cap must improve by at least `bump`
    /// percent, and strictly.
    pub fn is_replaceable_by(&self, candidate: &Self, price_bump: u128) -> bool {
        if self.is_dynamic() && !candidate.is_dynamic() {
            return false
        }
        bumped(self.fee_cap(), candidate.fee_cap(), price_bump) &&
            bumped(self.tip_cap(), candidate.tip_cap(), price_bump)
    }
}

/// Returns true if `candidate` exceeds `existing` by at least `bump` percent.
///
/// A tie with the existing value is always underpriced, even with a zero bump.
fn bumped(existing: u128, candidate: u128, bump: u128) -> bool {
    let threshold = existing.saturating_add(existing.saturating_mul(bump) / 100);
    candidate >= threshold && candidate > existing
}

/// A concrete pooled transaction, as produced by the external decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PooledTransaction {
    /// Content hash of the transaction.
    pub hash: TxHash,
    /// Recovered sender.
    pub sender: Address,
    /// Sender nonce.
    pub nonce: u64,
    /// Fee descriptor.
    pub fee: TxFee,
    /// Gas limit of the transaction.
    pub gas_limit: u64,
    /// Raw payload bytes.
    pub input: Bytes,
}

impl PoolTransaction for PooledTransaction {
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
        self.input.len()
    }
}

/// Where the transaction originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionOrigin {
    /// Transaction is coming from a local client submission.
    #[default]
    Local,
    /// Transaction has been received externally, e.g. over gossip.
    External,
}

impl TransactionOrigin {
    /// Whether the transaction originates from a local submission.
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Local)
    }
}

/// An account whose on-chain nonce advanced in a committed block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangedAccount {
    /// The account's address.
    pub address: Address,
    /// The account's nonce after the commit, i.e. its new baseline.
    pub nonce: u64,
}

/// Event fired once per committed block.
#[derive(Debug, Clone)]
pub struct OnNewBlockEvent {
    /// Base fee of the next block.
    pub pending_base_fee: u128,
    /// Accounts whose nonce advanced in the committed block.
    pub changed_accounts: Vec<ChangedAccount>,
}

/// Stats about the current state of the pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolSize {
    /// Number of transactions in the pending set.
    pub pending: usize,
    /// Combined encoded size of the pending set, in bytes.
    pub pending_size: usize,
    /// Number of transactions in the queued set.
    pub queued: usize,
    /// Combined encoded size of the queued set, in bytes.
    pub queued_size: usize,
}

impl PoolSize {
    /// Total number of transactions in the pool.
    pub const fn total(&self) -> usize {
        self.pending + self.queued
    }
}

/// All transactions of the pool grouped by their executability.
#[derive(Debug)]
pub struct AllPoolTransactions<T: PoolTransaction> {
    /// Transactions that are executable on the current state.
    pub pending: Vec<Arc<ValidPoolTransaction<T>>>,
    /// Transactions that are blocked on a nonce gap.
    pub queued: Vec<Arc<ValidPoolTransaction<T>>>,
}

impl<T: PoolTransaction> Default for AllPoolTransactions<T> {
    fn default() -> Self {
        Self { pending: Vec::new(), queued: Vec::new() }
    }
}

/// Which side of the pool a transaction currently resides in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    /// Part of the contiguous executable run.
    Pending,
    /// Waiting for a nonce gap to close.
    Queued,
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY_100: TxFee = TxFee::Legacy { gas_price: 100 };

    #[test]
    fn effective_tip_respects_base_fee() {
        let fee = TxFee::DynamicFee { max_fee_per_gas: 100, max_priority_fee_per_gas: 10 };
        assert_eq!(fee.effective_tip(0), Some(10));
        assert_eq!(fee.effective_tip(95), Some(5));
        assert_eq!(fee.effective_tip(101), None);
        assert_eq!(LEGACY_100.effective_tip(40), Some(60));
    }

    #[test]
    fn legacy_bump_threshold() {
        // 10% bump: 105 is underpriced, 110 meets the threshold
        assert!(!LEGACY_100.is_replaceable_by(&TxFee::Legacy { gas_price: 105 }, 10));
        assert!(!LEGACY_100.is_replaceable_by(&TxFee::Legacy { gas_price: 109 }, 10));
        assert!(LEGACY_100.is_replaceable_by(&TxFee::Legacy { gas_price: 110 }, 10));
        assert!(LEGACY_100.is_replaceable_by(&TxFee::Legacy { gas_price: 150 }, 10));
    }

    #[test]
    fn zero_bump_still_requires_improvement() {
        assert!(!LEGACY_100.is_replaceable_by(&LEGACY_100, 0));
        assert!(LEGACY_100.is_replaceable_by(&TxFee::Legacy { gas_price: 101 }, 0));
    }

    #[test]
    fn legacy_never_replaces_dynamic() {
        let dynamic = TxFee::DynamicFee { max_fee_per_gas: 10, max_priority_fee_per_gas: 1 };
        assert!(!dynamic.is_replaceable_by(&TxFee::Legacy { gas_price: u128::MAX }, 10));
    }

    #[test]
    fn dynamic_replaces_legacy_with_bump() {
        let candidate = TxFee::DynamicFee { max_fee_per_gas: 150, max_priority_fee_per_gas: 150 };
        assert!(LEGACY_100.is_replaceable_by(&candidate, 10));
        let low_tip = TxFee::DynamicFee { max_fee_per_gas: 150, max_priority_fee_per_gas: 100 };
        assert!(!LEGACY_100.is_replaceable_by(&low_tip, 10));
    }
}
