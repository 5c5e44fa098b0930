#![deny(missing_docs)]

//! Stacks SDK - Complete SDK.
//!
//! Re-exports all Stacks SDK components for convenient single-crate usage.

pub use stx_primitives as primitives;
pub use stx_transaction as transaction;
