//! Integration tests for the transaction pool.

mod admission;
mod blocks;
mod proposal;

const fn main() {}
