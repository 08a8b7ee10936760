//! Internal helpers for testing the pool itself.

mod mock;

pub use mock::{MockTransaction, MockTransactionFactory, MockValidator};
