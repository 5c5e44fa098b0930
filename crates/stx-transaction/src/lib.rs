//! Stacks SDK - Transaction construction, signing, and serialization.
//!
//! Provides the transaction envelope with its authorization structure,
//! payload and post-condition codecs, the multi-party signer state
//! machine, and high-level builders.

pub mod address;
pub mod auth;
pub mod builder;
pub mod clarity;
pub mod payload;
pub mod post_condition;
pub mod signer;
pub mod transaction;

mod error;
pub use error::TransactionError;

pub use address::StacksAddress;
pub use auth::{SpendingCondition, TransactionAuth};
pub use signer::TransactionSigner;
pub use transaction::{AnchorMode, Network, StacksTransaction, TransactionVersion, Txid};

#[cfg(test)]
mod tests;
