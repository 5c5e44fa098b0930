//! secp256k1 public key with Stacks-specific functionality.
//!
//! Wraps a k256 verifying key together with a compression flag. The flag
//! matters on the wire: a signer hash is computed over the key bytes as
//! encoded, so the same curve point hashes differently in its compressed
//! and uncompressed forms.

use k256::ecdsa::VerifyingKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use std::fmt;

use crate::hash::hash160;
use crate::PrimitivesError;

/// Length of a compressed public key in bytes (prefix + 32 byte x-coordinate).
const COMPRESSED_LEN: usize = 33;

/// Length of an uncompressed public key in bytes (prefix + 32 byte x + 32 byte y).
const UNCOMPRESSED_LEN: usize = 65;

/// A secp256k1 public key with an encoding preference.
///
/// Wraps a k256 `VerifyingKey` plus a flag recording whether this key is
/// treated as compressed. Serialization, hashing, and equality all honor
/// the flag.
#[derive(Clone, Debug)]
pub struct PublicKey {
    /// The underlying k256 verifying key.
    inner: VerifyingKey,
    /// Whether the key serializes in compressed form.
    compressed: bool,
}

impl PublicKey {
    /// Create a PublicKey from raw SEC1 encoded bytes.
    ///
    /// Accepts both compressed (33-byte) and uncompressed (65-byte)
    /// formats; the compression flag is taken from the input length.
    ///
    /// # Arguments
    /// * `bytes` - SEC1-encoded public key bytes.
    ///
    /// # Returns
    /// `Ok(PublicKey)` on success, or an error if the bytes don't
    /// represent a valid point.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let compressed = match bytes.len() {
            COMPRESSED_LEN => true,
            UNCOMPRESSED_LEN => false,
            n => {
                return Err(PrimitivesError::InvalidPublicKey(format!(
                    "expected 33 or 65 bytes, got {}",
                    n
                )));
            }
        };
        let vk = VerifyingKey::from_sec1_bytes(bytes)
            .map_err(|e| PrimitivesError::InvalidPublicKey(e.to_string()))?;
        Ok(PublicKey {
            inner: vk,
            compressed,
        })
    }

    /// Create a PublicKey from a hex-encoded SEC1 string.
    ///
    /// # Arguments
    /// * `hex_str` - A hex string of a compressed (66 chars) or
    ///   uncompressed (130 chars) key.
    ///
    /// # Returns
    /// `Ok(PublicKey)` on success, or an error if the hex or point is invalid.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        let bytes = hex::decode(hex_str)?;
        Self::from_bytes(&bytes)
    }

    /// Serialize the public key per its compression flag.
    ///
    /// # Returns
    /// 33 bytes for a compressed key, 65 bytes for an uncompressed one.
    pub fn encode(&self) -> Vec<u8> {
        self.inner
            .to_encoded_point(self.compressed)
            .as_bytes()
            .to_vec()
    }

    /// Serialize the public key in compressed SEC1 format (33 bytes),
    /// regardless of the compression flag.
    ///
    /// # Returns
    /// A 33-byte array containing the compressed public key.
    pub fn to_compressed(&self) -> [u8; COMPRESSED_LEN] {
        let point = self.inner.to_encoded_point(true);
        let mut out = [0u8; COMPRESSED_LEN];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// Serialize the public key in uncompressed SEC1 format (65 bytes),
    /// regardless of the compression flag.
    ///
    /// # Returns
    /// A 65-byte array containing the uncompressed public key.
    pub fn to_uncompressed(&self) -> [u8; UNCOMPRESSED_LEN] {
        let point = self.inner.to_encoded_point(false);
        let mut out = [0u8; UNCOMPRESSED_LEN];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// Serialize the public key as a lowercase hexadecimal string,
    /// honoring the compression flag.
    ///
    /// # Returns
    /// A 66 or 130 character hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.encode())
    }

    /// Whether this key serializes in compressed form.
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Set the compression flag.
    ///
    /// # Arguments
    /// * `compressed` - The new encoding preference.
    pub fn set_compressed(&mut self, compressed: bool) {
        self.compressed = compressed;
    }

    /// Compute the Hash160 of the public key as encoded.
    ///
    /// Hash160 = RIPEMD160(SHA256(key bytes)). The input honors the
    /// compression flag.
    ///
    /// # Returns
    /// A 20-byte hash digest.
    pub fn hash160(&self) -> [u8; 20] {
        hash160(&self.encode())
    }

    /// Construct a PublicKey from a k256 `VerifyingKey`.
    ///
    /// # Arguments
    /// * `vk` - A k256 VerifyingKey.
    /// * `compressed` - The encoding preference for the new key.
    ///
    /// # Returns
    /// A new `PublicKey` wrapping the verifying key.
    pub fn from_verifying_key(vk: &VerifyingKey, compressed: bool) -> Self {
        PublicKey {
            inner: *vk,
            compressed,
        }
    }

    /// Access the underlying k256 `VerifyingKey`.
    ///
    /// # Returns
    /// A reference to the inner `VerifyingKey`.
    pub(crate) fn verifying_key(&self) -> &VerifyingKey {
        &self.inner
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_compressed() == other.to_compressed()
    }
}

impl Eq for PublicKey {}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPRESSED_HEX: &str =
        "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
    const UNCOMPRESSED_HEX: &str =
        "0479be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798\
         483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8";

    #[test]
    fn test_from_bytes_sets_compression_flag() {
        let c = PublicKey::from_hex(COMPRESSED_HEX).unwrap();
        assert!(c.is_compressed());
        let u = PublicKey::from_hex(UNCOMPRESSED_HEX).unwrap();
        assert!(!u.is_compressed());
        // Same point, different encodings.
        assert_eq!(c, u);
        assert_ne!(c.encode(), u.encode());
    }

    #[test]
    fn test_encode_honors_flag() {
        let mut key = PublicKey::from_hex(COMPRESSED_HEX).unwrap();
        assert_eq!(key.encode().len(), 33);
        key.set_compressed(false);
        assert_eq!(key.encode().len(), 65);
        assert_eq!(hex::encode(key.encode()), UNCOMPRESSED_HEX);
    }

    #[test]
    fn test_hash160_depends_on_encoding() {
        let compressed = PublicKey::from_hex(COMPRESSED_HEX).unwrap();
        let uncompressed = PublicKey::from_hex(UNCOMPRESSED_HEX).unwrap();
        assert_ne!(compressed.hash160(), uncompressed.hash160());
    }

    #[test]
    fn test_rejects_invalid_points() {
        // Wrong length.
        assert!(PublicKey::from_bytes(&[0x02]).is_err());
        // x not on the curve.
        let mut bad = hex::decode(COMPRESSED_HEX).unwrap();
        bad[1] ^= 0xff;
        assert!(PublicKey::from_bytes(&bad).is_err());
    }

    #[test]
    fn test_display_outputs_hex() {
        let key = PublicKey::from_hex(COMPRESSED_HEX).unwrap();
        assert_eq!(format!("{}", key), COMPRESSED_HEX);
    }
}
