//! Stacks SDK - Cryptographic primitives, hashing, and encoding.
//!
//! This crate provides the foundational building blocks for the Stacks SDK:
//! - Hash functions (SHA-256, SHA-256d, RIPEMD-160, Hash160, SHA-512/256)
//! - Big-endian binary reader/writer for the Stacks wire format
//! - c32 / c32check encoding for Stacks addresses
//! - Elliptic curve cryptography (secp256k1 keys, recoverable signatures)

pub mod hash;
pub mod util;
pub mod c32;
pub mod ec;

mod error;
pub use error::PrimitivesError;
