//! Transaction authorization: spending conditions and the sighash chain.
//!
//! An authorization is either standard (origin pays) or sponsored (a
//! second condition pays the fee). Each spending condition commits to a
//! signer hash, a nonce, and a fee, and carries either one signature or
//! a multisig field list. Signing and verification walk a chained
//! signature hash so that each signature commits to everything signed
//! before it.

use stx_primitives::ec::{PrivateKey, PublicKey, RecoverableSignature};
use stx_primitives::hash::sha512_256;
use stx_primitives::util::{StacksReader, StacksWriter};

use crate::address::{public_keys_to_address_hash, AddressHashMode, StacksAddress};
use crate::transaction::Network;
use crate::TransactionError;

/// Authorization type byte: standard (origin pays).
pub const AUTH_TYPE_STANDARD: u8 = 0x04;
/// Authorization type byte: sponsored (sponsor pays).
pub const AUTH_TYPE_SPONSORED: u8 = 0x05;

const SIGHASH_LEN: usize = 32;

/// The authorization flag mixed into every presign hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthType {
    /// Origin signatures use the standard flag.
    Standard,
    /// Sponsor signatures use the sponsored flag.
    Sponsored,
}

impl AuthType {
    /// The wire byte for this flag.
    pub fn as_byte(&self) -> u8 {
        match self {
            AuthType::Standard => AUTH_TYPE_STANDARD,
            AuthType::Sponsored => AUTH_TYPE_SPONSORED,
        }
    }
}

/// Hash modes for single-signature spending conditions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SinglesigHashMode {
    /// Hash160 of the public key as encoded.
    P2PKH = 0x00,
    /// Segwit-nested single key; compressed keys only.
    P2WPKH = 0x02,
}

impl SinglesigHashMode {
    /// Decode a hash mode byte, if it names a single-sig mode.
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(SinglesigHashMode::P2PKH),
            0x02 => Some(SinglesigHashMode::P2WPKH),
            _ => None,
        }
    }

    /// The address hashing rule for this mode.
    pub fn to_address_hash_mode(&self) -> AddressHashMode {
        match self {
            SinglesigHashMode::P2PKH => AddressHashMode::SerializeP2PKH,
            SinglesigHashMode::P2WPKH => AddressHashMode::SerializeP2WPKH,
        }
    }
}

/// Hash modes for multisig spending conditions.
///
/// The sequential modes chain each signature's hash onto the previous
/// one; the non-sequential modes let every signer sign the same initial
/// hash so signatures can be collected in any order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MultisigHashMode {
    /// Sequential m-of-n over a redeem script.
    P2SH = 0x01,
    /// Sequential segwit-nested m-of-n; compressed keys only.
    P2WSH = 0x03,
    /// Order-independent m-of-n over a redeem script.
    P2SHNonSequential = 0x05,
    /// Order-independent segwit-nested m-of-n; compressed keys only.
    P2WSHNonSequential = 0x07,
}

impl MultisigHashMode {
    /// Decode a hash mode byte, if it names a multisig mode.
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(MultisigHashMode::P2SH),
            0x03 => Some(MultisigHashMode::P2WSH),
            0x05 => Some(MultisigHashMode::P2SHNonSequential),
            0x07 => Some(MultisigHashMode::P2WSHNonSequential),
            _ => None,
        }
    }

    /// Whether signatures chain onto one another.
    pub fn is_sequential(&self) -> bool {
        matches!(self, MultisigHashMode::P2SH | MultisigHashMode::P2WSH)
    }

    /// Whether this mode requires compressed keys.
    pub fn is_segwit(&self) -> bool {
        matches!(
            self,
            MultisigHashMode::P2WSH | MultisigHashMode::P2WSHNonSequential
        )
    }

    /// The address hashing rule for this mode.
    ///
    /// The non-sequential modes hash identically to their sequential
    /// counterparts; the distinction only affects the sighash chain.
    pub fn to_address_hash_mode(&self) -> AddressHashMode {
        match self {
            MultisigHashMode::P2SH | MultisigHashMode::P2SHNonSequential => {
                AddressHashMode::SerializeP2SH
            }
            MultisigHashMode::P2WSH | MultisigHashMode::P2WSHNonSequential => {
                AddressHashMode::SerializeP2WSH
            }
        }
    }
}

/// Key encoding byte for signatures and recovered keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum KeyEncoding {
    /// 33-byte compressed SEC1 encoding.
    Compressed = 0x00,
    /// 65-byte uncompressed SEC1 encoding.
    Uncompressed = 0x01,
}

impl KeyEncoding {
    /// Decode a key encoding byte.
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(KeyEncoding::Compressed),
            0x01 => Some(KeyEncoding::Uncompressed),
            _ => None,
        }
    }

    /// The encoding matching a public key's compression flag.
    pub fn from_public_key(key: &PublicKey) -> Self {
        if key.is_compressed() {
            KeyEncoding::Compressed
        } else {
            KeyEncoding::Uncompressed
        }
    }
}

/// Auth field id: a compressed public key follows.
const AUTH_FIELD_PUBKEY_COMPRESSED: u8 = 0x00;
/// Auth field id: an uncompressed public key follows.
const AUTH_FIELD_PUBKEY_UNCOMPRESSED: u8 = 0x01;
/// Auth field id: a signature over a compressed key follows.
const AUTH_FIELD_SIG_COMPRESSED: u8 = 0x02;
/// Auth field id: a signature over an uncompressed key follows.
const AUTH_FIELD_SIG_UNCOMPRESSED: u8 = 0x03;

/// One entry in a multisig field list: a bare public key or a signature.
///
/// Public keys are always carried as their 33 compressed bytes; the
/// field id records whether the key counts as compressed or uncompressed
/// for hashing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransactionAuthField {
    /// A bare public key from a committee member who did not sign.
    PublicKey(PublicKey),
    /// A signature plus the encoding of the key that made it.
    Signature(KeyEncoding, RecoverableSignature),
}

impl TransactionAuthField {
    /// Write the field id and body.
    pub fn serialize_to(&self, writer: &mut StacksWriter) {
        match self {
            TransactionAuthField::PublicKey(key) => {
                if key.is_compressed() {
                    writer.write_u8(AUTH_FIELD_PUBKEY_COMPRESSED);
                } else {
                    writer.write_u8(AUTH_FIELD_PUBKEY_UNCOMPRESSED);
                }
                writer.write_bytes(&key.to_compressed());
            }
            TransactionAuthField::Signature(encoding, sig) => {
                match encoding {
                    KeyEncoding::Compressed => writer.write_u8(AUTH_FIELD_SIG_COMPRESSED),
                    KeyEncoding::Uncompressed => writer.write_u8(AUTH_FIELD_SIG_UNCOMPRESSED),
                }
                writer.write_bytes(sig.as_bytes());
            }
        }
    }

    /// Read a field id and body.
    pub fn read_from(reader: &mut StacksReader) -> Result<Self, TransactionError> {
        let offset = reader.position();
        let field_id = reader
            .read_u8()
            .map_err(|_| TransactionError::Truncated("reading auth field id".to_string()))?;
        match field_id {
            AUTH_FIELD_PUBKEY_COMPRESSED | AUTH_FIELD_PUBKEY_UNCOMPRESSED => {
                let bytes = reader.read_bytes(33).map_err(|_| {
                    TransactionError::Truncated("reading auth field public key".to_string())
                })?;
                let mut key = PublicKey::from_bytes(bytes)?;
                key.set_compressed(field_id == AUTH_FIELD_PUBKEY_COMPRESSED);
                Ok(TransactionAuthField::PublicKey(key))
            }
            AUTH_FIELD_SIG_COMPRESSED | AUTH_FIELD_SIG_UNCOMPRESSED => {
                let bytes = reader.read_bytes(65).map_err(|_| {
                    TransactionError::Truncated("reading auth field signature".to_string())
                })?;
                let sig = RecoverableSignature::from_bytes(bytes)?;
                let encoding = if field_id == AUTH_FIELD_SIG_COMPRESSED {
                    KeyEncoding::Compressed
                } else {
                    KeyEncoding::Uncompressed
                };
                Ok(TransactionAuthField::Signature(encoding, sig))
            }
            tag => Err(TransactionError::UnknownVariant {
                kind: "auth field",
                tag,
                offset,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Sighash chain
// ---------------------------------------------------------------------------

/// Compute the presign hash: what a signer actually signs.
///
/// Commits to the current chain value, the authorization flag, and the
/// paying condition's fee and nonce. Note the fee precedes the nonce
/// here even though the wire order of a spending condition is nonce
/// first.
///
/// # Arguments
/// * `cur_sighash` - The current value of the sighash chain.
/// * `auth_type` - Standard for origin signers, sponsored for sponsors.
/// * `tx_fee` - The condition's fee.
/// * `nonce` - The condition's nonce.
///
/// # Returns
/// The 32-byte digest to sign.
pub fn make_sighash_presign(
    cur_sighash: &[u8; SIGHASH_LEN],
    auth_type: AuthType,
    tx_fee: u64,
    nonce: u64,
) -> [u8; SIGHASH_LEN] {
    let mut preimage = Vec::with_capacity(SIGHASH_LEN + 1 + 8 + 8);
    preimage.extend_from_slice(cur_sighash);
    preimage.push(auth_type.as_byte());
    preimage.extend_from_slice(&tx_fee.to_be_bytes());
    preimage.extend_from_slice(&nonce.to_be_bytes());
    sha512_256(&preimage)
}

/// Compute the postsign hash: the chain value after a signature.
///
/// Commits to the presign hash, the signer's key encoding, and the
/// signature itself.
///
/// # Arguments
/// * `presign_sighash` - The digest the signature covers.
/// * `key_encoding` - The signer's key encoding.
/// * `signature` - The 65-byte recoverable signature.
///
/// # Returns
/// The next 32-byte chain value.
pub fn make_sighash_postsign(
    presign_sighash: &[u8; SIGHASH_LEN],
    key_encoding: KeyEncoding,
    signature: &RecoverableSignature,
) -> [u8; SIGHASH_LEN] {
    let mut preimage = Vec::with_capacity(SIGHASH_LEN + 1 + 65);
    preimage.extend_from_slice(presign_sighash);
    preimage.push(key_encoding as u8);
    preimage.extend_from_slice(signature.as_bytes());
    sha512_256(&preimage)
}

/// Sign the presign hash derived from the current chain value.
///
/// # Arguments
/// * `cur_sighash` - The current chain value.
/// * `auth_type` - The authorization flag for this signer.
/// * `tx_fee` - The condition's fee.
/// * `nonce` - The condition's nonce.
/// * `private_key` - The signing key.
///
/// # Returns
/// The signature and the postsign chain value.
pub fn next_signature(
    cur_sighash: &[u8; SIGHASH_LEN],
    auth_type: AuthType,
    tx_fee: u64,
    nonce: u64,
    private_key: &PrivateKey,
) -> Result<(RecoverableSignature, [u8; SIGHASH_LEN]), TransactionError> {
    let presign = make_sighash_presign(cur_sighash, auth_type, tx_fee, nonce);
    let signature = private_key
        .sign(&presign)
        .map_err(|e| TransactionError::SigningError(e.to_string()))?;
    let key_encoding = if private_key.compress_public() {
        KeyEncoding::Compressed
    } else {
        KeyEncoding::Uncompressed
    };
    let postsign = make_sighash_postsign(&presign, key_encoding, &signature);
    Ok((signature, postsign))
}

/// Recover the signer of one link in the chain and advance it.
///
/// # Arguments
/// * `cur_sighash` - The chain value the signature was made over.
/// * `auth_type` - The authorization flag for this signer.
/// * `tx_fee` - The condition's fee.
/// * `nonce` - The condition's nonce.
/// * `key_encoding` - The declared encoding of the signing key.
/// * `signature` - The signature to recover from.
///
/// # Returns
/// The recovered public key (with the declared encoding applied) and the
/// postsign chain value.
pub fn next_verification(
    cur_sighash: &[u8; SIGHASH_LEN],
    auth_type: AuthType,
    tx_fee: u64,
    nonce: u64,
    key_encoding: KeyEncoding,
    signature: &RecoverableSignature,
) -> Result<(PublicKey, [u8; SIGHASH_LEN]), TransactionError> {
    let presign = make_sighash_presign(cur_sighash, auth_type, tx_fee, nonce);
    let mut public_key = signature
        .recover(&presign)
        .map_err(|e| TransactionError::SignatureVerification(e.to_string()))?;
    public_key.set_compressed(key_encoding == KeyEncoding::Compressed);
    let postsign = make_sighash_postsign(&presign, key_encoding, signature);
    Ok((public_key, postsign))
}

// ---------------------------------------------------------------------------
// Spending conditions
// ---------------------------------------------------------------------------

/// A single-signature spending condition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SinglesigSpendingCondition {
    /// How the signer hash was derived.
    pub hash_mode: SinglesigHashMode,
    /// Hash160 of the signer's public key.
    pub signer: [u8; 20],
    /// The account nonce this condition spends.
    pub nonce: u64,
    /// The fee this condition pays, in microunits.
    pub tx_fee: u64,
    /// The encoding of the signing key.
    pub key_encoding: KeyEncoding,
    /// The signature, or the all-zero placeholder before signing.
    pub signature: RecoverableSignature,
}

impl SinglesigSpendingCondition {
    /// Create an unsigned condition for a public key.
    ///
    /// # Arguments
    /// * `hash_mode` - The signer hashing rule.
    /// * `public_key` - The signer's key.
    ///
    /// # Returns
    /// `Ok(SinglesigSpendingCondition)` with fee and nonce zero, or an
    /// error for a segwit mode with an uncompressed key.
    pub fn new(
        hash_mode: SinglesigHashMode,
        public_key: &PublicKey,
    ) -> Result<Self, TransactionError> {
        let signer = public_keys_to_address_hash(
            hash_mode.to_address_hash_mode(),
            1,
            std::slice::from_ref(public_key),
        )?;
        Ok(SinglesigSpendingCondition {
            hash_mode,
            signer,
            nonce: 0,
            tx_fee: 0,
            key_encoding: KeyEncoding::from_public_key(public_key),
            signature: RecoverableSignature::empty(),
        })
    }

    /// Write the condition in wire order.
    pub fn serialize_to(&self, writer: &mut StacksWriter) {
        writer.write_u8(self.hash_mode as u8);
        writer.write_bytes(&self.signer);
        writer.write_u64_be(self.nonce);
        writer.write_u64_be(self.tx_fee);
        writer.write_u8(self.key_encoding as u8);
        writer.write_bytes(self.signature.as_bytes());
    }

    /// Verify the signature and derive the next chain value.
    ///
    /// Recovers the signing key, checks the key encoding against the
    /// hash mode, and re-derives the signer hash.
    pub fn verify(
        &self,
        cur_sighash: &[u8; SIGHASH_LEN],
        auth_type: AuthType,
    ) -> Result<[u8; SIGHASH_LEN], TransactionError> {
        if self.hash_mode == SinglesigHashMode::P2WPKH
            && self.key_encoding == KeyEncoding::Uncompressed
        {
            return Err(TransactionError::UncompressedKeyNotAllowed);
        }
        let (public_key, next_sighash) = next_verification(
            cur_sighash,
            auth_type,
            self.tx_fee,
            self.nonce,
            self.key_encoding,
            &self.signature,
        )?;
        let derived = public_keys_to_address_hash(
            self.hash_mode.to_address_hash_mode(),
            1,
            &[public_key],
        )?;
        if derived != self.signer {
            return Err(TransactionError::SignatureVerification(format!(
                "recovered signer hash {} does not match {}",
                hex::encode(derived),
                hex::encode(self.signer)
            )));
        }
        Ok(next_sighash)
    }
}

/// A multisig spending condition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultisigSpendingCondition {
    /// How the signer hash was derived and whether signatures chain.
    pub hash_mode: MultisigHashMode,
    /// Hash160 of the committee's redeem script.
    pub signer: [u8; 20],
    /// The account nonce this condition spends.
    pub nonce: u64,
    /// The fee this condition pays, in microunits.
    pub tx_fee: u64,
    /// Signatures and bare public keys, in committee order.
    pub fields: Vec<TransactionAuthField>,
    /// The signature threshold m.
    pub signatures_required: u16,
}

impl MultisigSpendingCondition {
    /// Create an unsigned condition for a committee.
    ///
    /// The key order is significant; see `reconcile_key_order` for
    /// matching an existing address.
    ///
    /// # Arguments
    /// * `hash_mode` - The signer hashing rule.
    /// * `signatures_required` - The threshold m.
    /// * `public_keys` - The committee keys in redeem-script order.
    ///
    /// # Returns
    /// `Ok(MultisigSpendingCondition)` with fee and nonce zero and no
    /// fields, or an error for a bad committee shape or key encoding.
    pub fn new(
        hash_mode: MultisigHashMode,
        signatures_required: u16,
        public_keys: &[PublicKey],
    ) -> Result<Self, TransactionError> {
        let signer = public_keys_to_address_hash(
            hash_mode.to_address_hash_mode(),
            signatures_required as usize,
            public_keys,
        )?;
        Ok(MultisigSpendingCondition {
            hash_mode,
            signer,
            nonce: 0,
            tx_fee: 0,
            fields: Vec::new(),
            signatures_required,
        })
    }

    /// Write the condition in wire order.
    pub fn serialize_to(&self, writer: &mut StacksWriter) {
        writer.write_u8(self.hash_mode as u8);
        writer.write_bytes(&self.signer);
        writer.write_u64_be(self.nonce);
        writer.write_u64_be(self.tx_fee);
        writer.write_u32_be(self.fields.len() as u32);
        for field in &self.fields {
            field.serialize_to(writer);
        }
        writer.write_u16_be(self.signatures_required);
    }

    /// The number of signature fields present.
    pub fn num_signatures(&self) -> u16 {
        self.fields
            .iter()
            .filter(|f| matches!(f, TransactionAuthField::Signature(..)))
            .count() as u16
    }

    /// Append a signature field.
    pub fn push_signature(&mut self, encoding: KeyEncoding, signature: RecoverableSignature) {
        self.fields
            .push(TransactionAuthField::Signature(encoding, signature));
    }

    /// Append a bare public key field.
    pub fn push_public_key(&mut self, public_key: PublicKey) {
        self.fields.push(TransactionAuthField::PublicKey(public_key));
    }

    /// Verify every signature field and re-derive the signer hash.
    ///
    /// Sequential modes require exactly the threshold number of
    /// signatures and chain each one onto the last; order-independent
    /// modes accept any number at or above the threshold, each over the
    /// initial chain value.
    pub fn verify(
        &self,
        cur_sighash: &[u8; SIGHASH_LEN],
        auth_type: AuthType,
    ) -> Result<[u8; SIGHASH_LEN], TransactionError> {
        let mut public_keys = Vec::with_capacity(self.fields.len());
        let mut chain_sighash = *cur_sighash;
        let mut num_sigs: u16 = 0;

        for field in &self.fields {
            match field {
                TransactionAuthField::PublicKey(key) => public_keys.push(key.clone()),
                TransactionAuthField::Signature(encoding, signature) => {
                    let base = if self.hash_mode.is_sequential() {
                        chain_sighash
                    } else {
                        *cur_sighash
                    };
                    let (key, next_sighash) = next_verification(
                        &base,
                        auth_type,
                        self.tx_fee,
                        self.nonce,
                        *encoding,
                        signature,
                    )?;
                    if self.hash_mode.is_sequential() {
                        chain_sighash = next_sighash;
                    }
                    public_keys.push(key);
                    num_sigs = num_sigs.checked_add(1).ok_or_else(|| {
                        TransactionError::SignatureVerification(
                            "too many signature fields".to_string(),
                        )
                    })?;
                }
            }
        }

        if self.hash_mode.is_sequential() && num_sigs != self.signatures_required {
            return Err(TransactionError::SignatureVerification(format!(
                "expected exactly {} signatures, got {}",
                self.signatures_required, num_sigs
            )));
        }
        if !self.hash_mode.is_sequential() && num_sigs < self.signatures_required {
            return Err(TransactionError::SignatureVerification(format!(
                "expected at least {} signatures, got {}",
                self.signatures_required, num_sigs
            )));
        }
        if self.hash_mode.is_segwit() && public_keys.iter().any(|k| !k.is_compressed()) {
            return Err(TransactionError::UncompressedKeyNotAllowed);
        }

        let derived = public_keys_to_address_hash(
            self.hash_mode.to_address_hash_mode(),
            self.signatures_required as usize,
            &public_keys,
        )?;
        if derived != self.signer {
            return Err(TransactionError::SignatureVerification(format!(
                "recovered signer hash {} does not match {}",
                hex::encode(derived),
                hex::encode(self.signer)
            )));
        }
        Ok(chain_sighash)
    }
}

/// A spending condition of either arity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpendingCondition {
    /// One signer.
    Singlesig(SinglesigSpendingCondition),
    /// An m-of-n committee.
    Multisig(MultisigSpendingCondition),
}

impl SpendingCondition {
    /// Create an unsigned single-signature condition.
    pub fn new_singlesig(
        hash_mode: SinglesigHashMode,
        public_key: &PublicKey,
    ) -> Result<Self, TransactionError> {
        Ok(SpendingCondition::Singlesig(
            SinglesigSpendingCondition::new(hash_mode, public_key)?,
        ))
    }

    /// Create an unsigned multisig condition.
    pub fn new_multisig(
        hash_mode: MultisigHashMode,
        signatures_required: u16,
        public_keys: &[PublicKey],
    ) -> Result<Self, TransactionError> {
        Ok(SpendingCondition::Multisig(MultisigSpendingCondition::new(
            hash_mode,
            signatures_required,
            public_keys,
        )?))
    }

    /// The sentinel sponsor condition used while computing the initial
    /// sighash of a sponsored transaction: single-sig P2PKH over an
    /// all-zero signer hash with fee, nonce, and signature cleared.
    pub fn new_initial_sighash() -> Self {
        SpendingCondition::Singlesig(SinglesigSpendingCondition {
            hash_mode: SinglesigHashMode::P2PKH,
            signer: [0u8; 20],
            nonce: 0,
            tx_fee: 0,
            key_encoding: KeyEncoding::Compressed,
            signature: RecoverableSignature::empty(),
        })
    }

    /// The condition's signer hash.
    pub fn signer(&self) -> &[u8; 20] {
        match self {
            SpendingCondition::Singlesig(c) => &c.signer,
            SpendingCondition::Multisig(c) => &c.signer,
        }
    }

    /// The condition's nonce.
    pub fn nonce(&self) -> u64 {
        match self {
            SpendingCondition::Singlesig(c) => c.nonce,
            SpendingCondition::Multisig(c) => c.nonce,
        }
    }

    /// The condition's fee.
    pub fn tx_fee(&self) -> u64 {
        match self {
            SpendingCondition::Singlesig(c) => c.tx_fee,
            SpendingCondition::Multisig(c) => c.tx_fee,
        }
    }

    /// Set the condition's nonce.
    pub fn set_nonce(&mut self, nonce: u64) {
        match self {
            SpendingCondition::Singlesig(c) => c.nonce = nonce,
            SpendingCondition::Multisig(c) => c.nonce = nonce,
        }
    }

    /// Set the condition's fee.
    pub fn set_tx_fee(&mut self, tx_fee: u64) {
        match self {
            SpendingCondition::Singlesig(c) => c.tx_fee = tx_fee,
            SpendingCondition::Multisig(c) => c.tx_fee = tx_fee,
        }
    }

    /// The signature threshold: 1 for single-sig, m for multisig.
    pub fn signatures_required(&self) -> u16 {
        match self {
            SpendingCondition::Singlesig(_) => 1,
            SpendingCondition::Multisig(c) => c.signatures_required,
        }
    }

    /// The number of signatures present.
    pub fn num_signatures(&self) -> u16 {
        match self {
            SpendingCondition::Singlesig(c) => {
                if c.signature.is_empty() {
                    0
                } else {
                    1
                }
            }
            SpendingCondition::Multisig(c) => c.num_signatures(),
        }
    }

    /// The address hashing rule of this condition.
    pub fn address_hash_mode(&self) -> AddressHashMode {
        match self {
            SpendingCondition::Singlesig(c) => c.hash_mode.to_address_hash_mode(),
            SpendingCondition::Multisig(c) => c.hash_mode.to_address_hash_mode(),
        }
    }

    /// The signer's address on the given network.
    pub fn signer_address(&self, network: &Network) -> StacksAddress {
        let version = self
            .address_hash_mode()
            .to_address_version(network.is_mainnet());
        StacksAddress::new(version, *self.signer())
    }

    /// A copy with signatures emptied and fee and nonce zeroed, as used
    /// in the initial sighash computation.
    pub fn cleared(&self) -> Self {
        match self {
            SpendingCondition::Singlesig(c) => {
                SpendingCondition::Singlesig(SinglesigSpendingCondition {
                    hash_mode: c.hash_mode,
                    signer: c.signer,
                    nonce: 0,
                    tx_fee: 0,
                    key_encoding: KeyEncoding::Compressed,
                    signature: RecoverableSignature::empty(),
                })
            }
            SpendingCondition::Multisig(c) => {
                SpendingCondition::Multisig(MultisigSpendingCondition {
                    hash_mode: c.hash_mode,
                    signer: c.signer,
                    nonce: 0,
                    tx_fee: 0,
                    fields: Vec::new(),
                    signatures_required: c.signatures_required,
                })
            }
        }
    }

    /// Sign the current chain value and append or store the signature.
    ///
    /// Single-sig conditions store the signature. Sequential multisig
    /// conditions append a signature field and advance the chain;
    /// order-independent multisig appends the field but leaves the chain
    /// value unchanged, since every signer signs the same hash.
    ///
    /// # Arguments
    /// * `cur_sighash` - The current chain value.
    /// * `auth_type` - The authorization flag for this signer.
    /// * `private_key` - The signing key.
    ///
    /// # Returns
    /// The chain value after this signature.
    pub fn sign_and_append(
        &mut self,
        cur_sighash: &[u8; SIGHASH_LEN],
        auth_type: AuthType,
        private_key: &PrivateKey,
    ) -> Result<[u8; SIGHASH_LEN], TransactionError> {
        match self {
            SpendingCondition::Singlesig(c) => {
                let (signature, next_sighash) =
                    next_signature(cur_sighash, auth_type, c.tx_fee, c.nonce, private_key)?;
                c.key_encoding = if private_key.compress_public() {
                    KeyEncoding::Compressed
                } else {
                    KeyEncoding::Uncompressed
                };
                c.signature = signature;
                Ok(next_sighash)
            }
            SpendingCondition::Multisig(c) => {
                let (signature, next_sighash) =
                    next_signature(cur_sighash, auth_type, c.tx_fee, c.nonce, private_key)?;
                let encoding = if private_key.compress_public() {
                    KeyEncoding::Compressed
                } else {
                    KeyEncoding::Uncompressed
                };
                c.push_signature(encoding, signature);
                if c.hash_mode.is_sequential() {
                    Ok(next_sighash)
                } else {
                    Ok(*cur_sighash)
                }
            }
        }
    }

    /// Append a bare public key field to a multisig condition.
    ///
    /// Bare keys never alter the chain value.
    ///
    /// # Returns
    /// `Ok(())`, or `NotMultiSig` for a single-sig condition.
    pub fn push_public_key(&mut self, public_key: PublicKey) -> Result<(), TransactionError> {
        match self {
            SpendingCondition::Singlesig(_) => Err(TransactionError::NotMultiSig),
            SpendingCondition::Multisig(c) => {
                c.push_public_key(public_key);
                Ok(())
            }
        }
    }

    /// Verify the condition's signatures against the chain.
    pub fn verify(
        &self,
        cur_sighash: &[u8; SIGHASH_LEN],
        auth_type: AuthType,
    ) -> Result<[u8; SIGHASH_LEN], TransactionError> {
        match self {
            SpendingCondition::Singlesig(c) => c.verify(cur_sighash, auth_type),
            SpendingCondition::Multisig(c) => c.verify(cur_sighash, auth_type),
        }
    }

    /// Write the condition in wire order.
    pub fn serialize_to(&self, writer: &mut StacksWriter) {
        match self {
            SpendingCondition::Singlesig(c) => c.serialize_to(writer),
            SpendingCondition::Multisig(c) => c.serialize_to(writer),
        }
    }

    /// Read a condition, dispatching on the hash mode byte.
    pub fn read_from(reader: &mut StacksReader) -> Result<Self, TransactionError> {
        let offset = reader.position();
        let hash_mode_byte = reader
            .read_u8()
            .map_err(|_| TransactionError::Truncated("reading hash mode".to_string()))?;

        if let Some(hash_mode) = SinglesigHashMode::from_u8(hash_mode_byte) {
            let signer = read_signer_hash(reader)?;
            let nonce = reader
                .read_u64_be()
                .map_err(|_| TransactionError::Truncated("reading nonce".to_string()))?;
            let tx_fee = reader
                .read_u64_be()
                .map_err(|_| TransactionError::Truncated("reading fee".to_string()))?;
            let encoding_offset = reader.position();
            let encoding_byte = reader
                .read_u8()
                .map_err(|_| TransactionError::Truncated("reading key encoding".to_string()))?;
            let key_encoding = KeyEncoding::from_u8(encoding_byte).ok_or(
                TransactionError::UnknownVariant {
                    kind: "key encoding",
                    tag: encoding_byte,
                    offset: encoding_offset,
                },
            )?;
            if hash_mode == SinglesigHashMode::P2WPKH
                && key_encoding == KeyEncoding::Uncompressed
            {
                return Err(TransactionError::UncompressedKeyNotAllowed);
            }
            let sig_bytes = reader
                .read_bytes(65)
                .map_err(|_| TransactionError::Truncated("reading signature".to_string()))?;
            let signature = RecoverableSignature::from_bytes(sig_bytes)?;
            return Ok(SpendingCondition::Singlesig(SinglesigSpendingCondition {
                hash_mode,
                signer,
                nonce,
                tx_fee,
                key_encoding,
                signature,
            }));
        }

        if let Some(hash_mode) = MultisigHashMode::from_u8(hash_mode_byte) {
            let signer = read_signer_hash(reader)?;
            let nonce = reader
                .read_u64_be()
                .map_err(|_| TransactionError::Truncated("reading nonce".to_string()))?;
            let tx_fee = reader
                .read_u64_be()
                .map_err(|_| TransactionError::Truncated("reading fee".to_string()))?;
            let field_count = reader
                .read_u32_be()
                .map_err(|_| TransactionError::Truncated("reading field count".to_string()))?;
            let mut fields = Vec::with_capacity(field_count.min(64) as usize);
            for _ in 0..field_count {
                fields.push(TransactionAuthField::read_from(reader)?);
            }
            let signatures_required = reader.read_u16_be().map_err(|_| {
                TransactionError::Truncated("reading signature threshold".to_string())
            })?;
            return Ok(SpendingCondition::Multisig(MultisigSpendingCondition {
                hash_mode,
                signer,
                nonce,
                tx_fee,
                fields,
                signatures_required,
            }));
        }

        Err(TransactionError::UnknownVariant {
            kind: "hash mode",
            tag: hash_mode_byte,
            offset,
        })
    }
}

fn read_signer_hash(reader: &mut StacksReader) -> Result<[u8; 20], TransactionError> {
    let bytes = reader
        .read_bytes(20)
        .map_err(|_| TransactionError::Truncated("reading signer hash".to_string()))?;
    let mut signer = [0u8; 20];
    signer.copy_from_slice(bytes);
    Ok(signer)
}

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

/// A transaction's authorization structure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransactionAuth {
    /// The origin pays its own fee.
    Standard(SpendingCondition),
    /// A sponsor pays the fee for the origin.
    Sponsored(SpendingCondition, SpendingCondition),
}

impl TransactionAuth {
    /// Whether this authorization is sponsored.
    pub fn is_sponsored(&self) -> bool {
        matches!(self, TransactionAuth::Sponsored(..))
    }

    /// The origin spending condition.
    pub fn origin(&self) -> &SpendingCondition {
        match self {
            TransactionAuth::Standard(origin) => origin,
            TransactionAuth::Sponsored(origin, _) => origin,
        }
    }

    /// The origin spending condition, mutably.
    pub fn origin_mut(&mut self) -> &mut SpendingCondition {
        match self {
            TransactionAuth::Standard(origin) => origin,
            TransactionAuth::Sponsored(origin, _) => origin,
        }
    }

    /// The sponsor spending condition, if sponsored.
    pub fn sponsor(&self) -> Option<&SpendingCondition> {
        match self {
            TransactionAuth::Standard(_) => None,
            TransactionAuth::Sponsored(_, sponsor) => Some(sponsor),
        }
    }

    /// The sponsor spending condition mutably, if sponsored.
    pub fn sponsor_mut(&mut self) -> Option<&mut SpendingCondition> {
        match self {
            TransactionAuth::Standard(_) => None,
            TransactionAuth::Sponsored(_, sponsor) => Some(sponsor),
        }
    }

    /// Set the fee on the condition that pays it: the sponsor when
    /// sponsored, the origin otherwise.
    pub fn set_tx_fee(&mut self, tx_fee: u64) {
        match self {
            TransactionAuth::Standard(origin) => origin.set_tx_fee(tx_fee),
            TransactionAuth::Sponsored(_, sponsor) => sponsor.set_tx_fee(tx_fee),
        }
    }

    /// The fee of the paying condition.
    pub fn tx_fee(&self) -> u64 {
        match self {
            TransactionAuth::Standard(origin) => origin.tx_fee(),
            TransactionAuth::Sponsored(_, sponsor) => sponsor.tx_fee(),
        }
    }

    /// Set the origin nonce.
    pub fn set_origin_nonce(&mut self, nonce: u64) {
        self.origin_mut().set_nonce(nonce)
    }

    /// Set the sponsor nonce.
    ///
    /// # Returns
    /// `Ok(())`, or `NotSponsored` on a standard authorization.
    pub fn set_sponsor_nonce(&mut self, nonce: u64) -> Result<(), TransactionError> {
        match self.sponsor_mut() {
            Some(sponsor) => {
                sponsor.set_nonce(nonce);
                Ok(())
            }
            None => Err(TransactionError::NotSponsored),
        }
    }

    /// Replace the sponsor condition.
    ///
    /// # Returns
    /// `Ok(())`, or `NotSponsored` on a standard authorization.
    pub fn set_sponsor(
        &mut self,
        condition: SpendingCondition,
    ) -> Result<(), TransactionError> {
        match self {
            TransactionAuth::Sponsored(_, sponsor) => {
                *sponsor = condition;
                Ok(())
            }
            TransactionAuth::Standard(_) => Err(TransactionError::NotSponsored),
        }
    }

    /// The authorization as used for the initial sighash: origin
    /// cleared, and any sponsor replaced by the signing sentinel.
    pub fn into_initial_sighash_auth(&self) -> TransactionAuth {
        match self {
            TransactionAuth::Standard(origin) => TransactionAuth::Standard(origin.cleared()),
            TransactionAuth::Sponsored(origin, _) => TransactionAuth::Sponsored(
                origin.cleared(),
                SpendingCondition::new_initial_sighash(),
            ),
        }
    }

    /// Verify the origin's signatures and return the chain value sponsor
    /// signing starts from.
    pub fn verify_origin(
        &self,
        initial_sighash: &[u8; SIGHASH_LEN],
    ) -> Result<[u8; SIGHASH_LEN], TransactionError> {
        self.origin().verify(initial_sighash, AuthType::Standard)
    }

    /// Verify all signatures, origin then sponsor.
    pub fn verify(
        &self,
        initial_sighash: &[u8; SIGHASH_LEN],
    ) -> Result<(), TransactionError> {
        let origin_sighash = self.verify_origin(initial_sighash)?;
        if let TransactionAuth::Sponsored(_, sponsor) = self {
            sponsor.verify(&origin_sighash, AuthType::Sponsored)?;
        }
        Ok(())
    }

    /// Write the auth type byte and conditions.
    pub fn serialize_to(&self, writer: &mut StacksWriter) {
        match self {
            TransactionAuth::Standard(origin) => {
                writer.write_u8(AUTH_TYPE_STANDARD);
                origin.serialize_to(writer);
            }
            TransactionAuth::Sponsored(origin, sponsor) => {
                writer.write_u8(AUTH_TYPE_SPONSORED);
                origin.serialize_to(writer);
                sponsor.serialize_to(writer);
            }
        }
    }

    /// Read an authorization.
    pub fn read_from(reader: &mut StacksReader) -> Result<Self, TransactionError> {
        let offset = reader.position();
        let auth_type = reader
            .read_u8()
            .map_err(|_| TransactionError::Truncated("reading auth type".to_string()))?;
        match auth_type {
            AUTH_TYPE_STANDARD => {
                let origin = SpendingCondition::read_from(reader)?;
                Ok(TransactionAuth::Standard(origin))
            }
            AUTH_TYPE_SPONSORED => {
                let origin = SpendingCondition::read_from(reader)?;
                let sponsor = SpendingCondition::read_from(reader)?;
                Ok(TransactionAuth::Sponsored(origin, sponsor))
            }
            tag => Err(TransactionError::UnknownVariant {
                kind: "auth type",
                tag,
                offset,
            }),
        }
    }
}
