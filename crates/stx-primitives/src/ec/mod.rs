/// Elliptic curve cryptography on secp256k1.
///
/// Provides private keys, compression-aware public keys, and the 65-byte
/// recoverable ECDSA signatures carried in spending conditions.

pub mod private_key;
pub mod public_key;
pub mod signature;

pub use private_key::PrivateKey;
pub use public_key::PublicKey;
pub use signature::RecoverableSignature;
