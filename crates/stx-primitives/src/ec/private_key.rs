//! secp256k1 private key with Stacks-specific functionality.
//!
//! Wraps a k256 signing key and tracks whether the corresponding public
//! key should be treated as compressed, which determines the key encoding
//! byte placed in spending conditions.

use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;

use crate::ec::public_key::PublicKey;
use crate::ec::signature::RecoverableSignature;
use crate::PrimitivesError;

/// Length of a serialized private key scalar in bytes.
const PRIVATE_KEY_BYTES_LEN: usize = 32;

/// Flag byte appended to a 33-byte private key encoding to indicate a
/// compressed public key.
const COMPRESS_MAGIC: u8 = 0x01;

/// A secp256k1 private key for signing.
///
/// Wraps a k256 `SigningKey` and carries a compression flag for the
/// derived public key. Signing produces 65-byte recoverable signatures.
#[derive(Clone, Debug)]
pub struct PrivateKey {
    /// The underlying k256 signing key.
    inner: SigningKey,
    /// Whether the derived public key uses the compressed encoding.
    compress_public: bool,
}

impl PrivateKey {
    /// Generate a new random private key using the OS random number generator.
    ///
    /// The derived public key defaults to the compressed encoding.
    ///
    /// # Returns
    /// A new randomly generated `PrivateKey`.
    pub fn new() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        PrivateKey {
            inner: signing_key,
            compress_public: true,
        }
    }

    /// Create a private key from raw bytes.
    ///
    /// Accepts a 32-byte scalar, or a 33-byte scalar whose trailing 0x01
    /// flag marks the public key as compressed. A bare 32-byte scalar
    /// yields an uncompressed public key.
    ///
    /// # Arguments
    /// * `bytes` - A 32 or 33 byte slice.
    ///
    /// # Returns
    /// `Ok(PrivateKey)` if the bytes represent a valid scalar on
    /// secp256k1, or an error otherwise.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let (scalar, compress_public) = match bytes.len() {
            PRIVATE_KEY_BYTES_LEN => (bytes, false),
            33 => {
                if bytes[32] != COMPRESS_MAGIC {
                    return Err(PrimitivesError::InvalidPrivateKey(
                        "33-byte key must end with the 0x01 compression flag".to_string(),
                    ));
                }
                (&bytes[..32], true)
            }
            n => {
                return Err(PrimitivesError::InvalidPrivateKey(format!(
                    "expected 32 or 33 bytes, got {}",
                    n
                )));
            }
        };
        let signing_key = SigningKey::from_bytes(scalar.into())
            .map_err(|e| PrimitivesError::InvalidPrivateKey(e.to_string()))?;
        Ok(PrivateKey {
            inner: signing_key,
            compress_public,
        })
    }

    /// Create a private key from a hexadecimal string.
    ///
    /// # Arguments
    /// * `hex_str` - A 64 or 66 character hex string (see `from_bytes`).
    ///
    /// # Returns
    /// `Ok(PrivateKey)` on success, or an error if the hex or scalar is invalid.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        if hex_str.is_empty() {
            return Err(PrimitivesError::InvalidPrivateKey(
                "private key hex is empty".to_string(),
            ));
        }
        let bytes =
            hex::decode(hex_str).map_err(|e| PrimitivesError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Serialize the private key as a 32-byte big-endian scalar.
    ///
    /// # Returns
    /// A 32-byte array containing the private key scalar.
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.inner.to_bytes());
        out
    }

    /// Serialize the private key as a lowercase hexadecimal string,
    /// with the trailing 0x01 flag when the public key is compressed.
    ///
    /// # Returns
    /// A 64 or 66 character hex string.
    pub fn to_hex(&self) -> String {
        let mut s = hex::encode(self.to_bytes());
        if self.compress_public {
            s.push_str("01");
        }
        s
    }

    /// Whether the derived public key uses the compressed encoding.
    pub fn compress_public(&self) -> bool {
        self.compress_public
    }

    /// Set whether the derived public key uses the compressed encoding.
    pub fn set_compress_public(&mut self, compressed: bool) {
        self.compress_public = compressed;
    }

    /// Derive the corresponding public key for this private key.
    ///
    /// # Returns
    /// The `PublicKey` corresponding to this private key, carrying this
    /// key's compression flag.
    pub fn public_key(&self) -> PublicKey {
        let verifying_key = self.inner.verifying_key();
        PublicKey::from_verifying_key(verifying_key, self.compress_public)
    }

    /// Sign a 32-byte message digest, producing a recoverable signature.
    ///
    /// The signature is low-S normalized.
    ///
    /// # Arguments
    /// * `digest` - The 32-byte message digest to sign.
    ///
    /// # Returns
    /// `Ok(RecoverableSignature)` on success, or an error if signing fails.
    pub fn sign(&self, digest: &[u8; 32]) -> Result<RecoverableSignature, PrimitivesError> {
        RecoverableSignature::sign(digest, self)
    }

    /// Access the underlying k256 `SigningKey`.
    ///
    /// # Returns
    /// A reference to the inner `SigningKey`.
    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.inner
    }
}

impl Default for PrivateKey {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes() && self.compress_public == other.compress_public
    }
}

impl Eq for PrivateKey {}
