//! 65-byte recoverable ECDSA signatures.
//!
//! The wire layout is the recovery id followed by the big-endian R and S
//! components. Signatures are low-S normalized at creation; normalizing S
//! flips the parity of the recovery id.

use k256::ecdsa::{self, RecoveryId, VerifyingKey};
use std::fmt;

use crate::ec::private_key::PrivateKey;
use crate::ec::public_key::PublicKey;
use crate::PrimitivesError;

/// Wire length of a recoverable signature: 1 recovery id byte plus the
/// 32-byte R and S components.
pub const RECOVERABLE_SIGNATURE_LEN: usize = 65;

/// A recoverable ECDSA signature in wire layout.
///
/// Holds `recovery_id || R || S` as 65 bytes. An all-zero value stands
/// for "no signature yet" in cleared spending conditions.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature([u8; RECOVERABLE_SIGNATURE_LEN]);

impl RecoverableSignature {
    /// Create the empty (all-zero) signature placeholder.
    ///
    /// # Returns
    /// A `RecoverableSignature` of 65 zero bytes.
    pub fn empty() -> Self {
        RecoverableSignature([0u8; RECOVERABLE_SIGNATURE_LEN])
    }

    /// Create a signature from its 65-byte wire form.
    ///
    /// # Arguments
    /// * `bytes` - The `recovery_id || R || S` bytes.
    ///
    /// # Returns
    /// `Ok(RecoverableSignature)` on success, or an error for a wrong length.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.len() != RECOVERABLE_SIGNATURE_LEN {
            return Err(PrimitivesError::InvalidSignature(format!(
                "expected {} bytes, got {}",
                RECOVERABLE_SIGNATURE_LEN,
                bytes.len()
            )));
        }
        let mut out = [0u8; RECOVERABLE_SIGNATURE_LEN];
        out.copy_from_slice(bytes);
        Ok(RecoverableSignature(out))
    }

    /// Create a signature from a 130-character hex string.
    ///
    /// # Arguments
    /// * `hex_str` - Hex of the 65 wire bytes.
    ///
    /// # Returns
    /// `Ok(RecoverableSignature)` on success, or an error for bad hex or length.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        let bytes = hex::decode(hex_str)?;
        Self::from_bytes(&bytes)
    }

    /// Access the 65 wire bytes.
    ///
    /// # Returns
    /// A reference to the `recovery_id || R || S` array.
    pub fn as_bytes(&self) -> &[u8; RECOVERABLE_SIGNATURE_LEN] {
        &self.0
    }

    /// Serialize the signature as a lowercase hex string.
    ///
    /// # Returns
    /// A 130-character hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Whether this is the all-zero placeholder.
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Sign a 32-byte message digest with the given private key.
    ///
    /// The signature is low-S normalized; when S is replaced by N - S the
    /// recovery id parity is flipped so that recovery still yields the
    /// signing key.
    ///
    /// # Arguments
    /// * `digest` - The 32-byte message digest.
    /// * `private_key` - The key to sign with.
    ///
    /// # Returns
    /// `Ok(RecoverableSignature)` on success, or an error if signing fails.
    pub fn sign(
        digest: &[u8; 32],
        private_key: &PrivateKey,
    ) -> Result<Self, PrimitivesError> {
        let (sig, recovery_id) = private_key
            .signing_key()
            .sign_prehash_recoverable(digest)
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;

        let (sig, recovery_id) = match sig.normalize_s() {
            Some(normalized) => {
                let flipped = RecoveryId::from_byte(recovery_id.to_byte() ^ 1)
                    .ok_or_else(|| {
                        PrimitivesError::InvalidSignature(
                            "recovery id out of range".to_string(),
                        )
                    })?;
                (normalized, flipped)
            }
            None => (sig, recovery_id),
        };

        let mut out = [0u8; RECOVERABLE_SIGNATURE_LEN];
        out[0] = recovery_id.to_byte();
        out[1..].copy_from_slice(&sig.to_bytes());
        Ok(RecoverableSignature(out))
    }

    /// Recover the public key that produced this signature over a digest.
    ///
    /// The recovered key carries the compressed flag; callers adjust it
    /// when the wire declares an uncompressed key encoding.
    ///
    /// # Arguments
    /// * `digest` - The 32-byte message digest that was signed.
    ///
    /// # Returns
    /// `Ok(PublicKey)` if recovery succeeds, or an error otherwise.
    pub fn recover(&self, digest: &[u8; 32]) -> Result<PublicKey, PrimitivesError> {
        let recovery_id = RecoveryId::from_byte(self.0[0]).ok_or_else(|| {
            PrimitivesError::InvalidSignature(format!(
                "invalid recovery id {}",
                self.0[0]
            ))
        })?;
        let sig = ecdsa::Signature::from_slice(&self.0[1..])
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;
        let vk = VerifyingKey::recover_from_prehash(digest, &sig, recovery_id)
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;
        Ok(PublicKey::from_verifying_key(&vk, true))
    }
}

impl fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecoverableSignature({})", self.to_hex())
    }
}

impl fmt::Display for RecoverableSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
