//! The transaction envelope: versioning, the top-level codec, the
//! transaction id, and the low-level signing entry points.

use stx_primitives::ec::{PrivateKey, PublicKey};
use stx_primitives::hash::sha512_256;
use stx_primitives::util::{StacksReader, StacksWriter};

use crate::auth::{AuthType, TransactionAuth};
use crate::payload::TransactionPayload;
use crate::post_condition::PostCondition;
use crate::TransactionError;

/// Chain id of the Stacks mainnet.
pub const CHAIN_ID_MAINNET: u32 = 0x00000001;
/// Chain id of the Stacks testnet.
pub const CHAIN_ID_TESTNET: u32 = 0x80000000;

/// The envelope version byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TransactionVersion {
    /// Mainnet transactions.
    Mainnet = 0x00,
    /// Testnet transactions.
    Testnet = 0x80,
}

impl TransactionVersion {
    /// Decode a version byte.
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(TransactionVersion::Mainnet),
            0x80 => Some(TransactionVersion::Testnet),
            _ => None,
        }
    }
}

/// A network target: the envelope version and chain id to stamp on
/// transactions, plus the address versions that go with them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Network {
    /// The envelope version byte.
    pub version: TransactionVersion,
    /// The chain id.
    pub chain_id: u32,
}

impl Network {
    /// The Stacks mainnet.
    pub fn mainnet() -> Self {
        Network {
            version: TransactionVersion::Mainnet,
            chain_id: CHAIN_ID_MAINNET,
        }
    }

    /// The Stacks testnet.
    pub fn testnet() -> Self {
        Network {
            version: TransactionVersion::Testnet,
            chain_id: CHAIN_ID_TESTNET,
        }
    }

    /// Whether this network uses mainnet address versions.
    pub fn is_mainnet(&self) -> bool {
        self.version == TransactionVersion::Mainnet
    }
}

/// How a transaction may be mined relative to a burnchain block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum AnchorMode {
    /// Must go into an anchored block.
    OnChainOnly = 0x01,
    /// Must go into a microblock stream.
    OffChainOnly = 0x02,
    /// Either placement is acceptable.
    Any = 0x03,
}

impl AnchorMode {
    /// Decode an anchor mode byte.
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(AnchorMode::OnChainOnly),
            0x02 => Some(AnchorMode::OffChainOnly),
            0x03 => Some(AnchorMode::Any),
            _ => None,
        }
    }
}

/// How post-conditions constrain asset movements not listed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PostConditionMode {
    /// Unlisted movements are allowed.
    Allow = 0x01,
    /// Unlisted movements abort the transaction.
    Deny = 0x02,
}

impl PostConditionMode {
    /// Decode a post-condition mode byte.
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(PostConditionMode::Allow),
            0x02 => Some(PostConditionMode::Deny),
            _ => None,
        }
    }
}

/// A transaction id: the sha512/256 of the serialized envelope.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Txid(pub [u8; 32]);

impl Txid {
    /// The id as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse an id from hex.
    pub fn from_hex(s: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(s)
            .map_err(|e| TransactionError::SerializationError(format!("invalid txid hex: {e}")))?;
        if bytes.len() != 32 {
            return Err(TransactionError::SerializationError(format!(
                "txid must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        let mut buf = [0u8; 32];
        buf.copy_from_slice(&bytes);
        Ok(Txid(buf))
    }
}

impl std::fmt::Debug for Txid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Txid({})", self.to_hex())
    }
}

impl std::fmt::Display for Txid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl serde::Serialize for Txid {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Txid {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Txid::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A complete Stacks transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StacksTransaction {
    /// The envelope version byte.
    pub version: TransactionVersion,
    /// The chain id the transaction is valid on.
    pub chain_id: u32,
    /// Who authorizes the transaction and pays its fee.
    pub auth: TransactionAuth,
    /// Where the transaction may be mined.
    pub anchor_mode: AnchorMode,
    /// How post-conditions are enforced.
    pub post_condition_mode: PostConditionMode,
    /// Asset-movement constraints.
    pub post_conditions: Vec<PostCondition>,
    /// What the transaction does.
    pub payload: TransactionPayload,
}

impl StacksTransaction {
    /// Create a transaction with no post-conditions in deny mode.
    ///
    /// # Arguments
    /// * `network` - Supplies the version byte and chain id.
    /// * `auth` - The authorization structure.
    /// * `payload` - The transaction body.
    pub fn new(network: &Network, auth: TransactionAuth, payload: TransactionPayload) -> Self {
        StacksTransaction {
            version: network.version,
            chain_id: network.chain_id,
            auth,
            anchor_mode: AnchorMode::Any,
            post_condition_mode: PostConditionMode::Deny,
            post_conditions: Vec::new(),
            payload,
        }
    }

    /// Serialize the envelope to bytes.
    pub fn serialize_to_vec(&self) -> Vec<u8> {
        let mut writer = StacksWriter::with_capacity(256);
        self.serialize_to(&mut writer);
        writer.into_bytes()
    }

    /// Write the envelope in wire order.
    pub fn serialize_to(&self, writer: &mut StacksWriter) {
        writer.write_u8(self.version as u8);
        writer.write_u32_be(self.chain_id);
        self.auth.serialize_to(writer);
        writer.write_u8(self.anchor_mode as u8);
        writer.write_u8(self.post_condition_mode as u8);
        writer.write_u32_be(self.post_conditions.len() as u32);
        for condition in &self.post_conditions {
            condition.serialize_to(writer);
        }
        self.payload.serialize_to(writer);
    }

    /// The envelope as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.serialize_to_vec())
    }

    /// Read an envelope from a reader.
    pub fn read_from(reader: &mut StacksReader) -> Result<Self, TransactionError> {
        let version_offset = reader.position();
        let version_byte = reader
            .read_u8()
            .map_err(|_| TransactionError::Truncated("reading transaction version".to_string()))?;
        let version = TransactionVersion::from_u8(version_byte).ok_or(
            TransactionError::UnknownVariant {
                kind: "transaction version",
                tag: version_byte,
                offset: version_offset,
            },
        )?;
        let chain_id = reader
            .read_u32_be()
            .map_err(|_| TransactionError::Truncated("reading chain id".to_string()))?;
        let auth = TransactionAuth::read_from(reader)?;
        let anchor_offset = reader.position();
        let anchor_byte = reader
            .read_u8()
            .map_err(|_| TransactionError::Truncated("reading anchor mode".to_string()))?;
        let anchor_mode =
            AnchorMode::from_u8(anchor_byte).ok_or(TransactionError::UnknownVariant {
                kind: "anchor mode",
                tag: anchor_byte,
                offset: anchor_offset,
            })?;
        let pc_mode_offset = reader.position();
        let pc_mode_byte = reader
            .read_u8()
            .map_err(|_| TransactionError::Truncated("reading post-condition mode".to_string()))?;
        let post_condition_mode = PostConditionMode::from_u8(pc_mode_byte).ok_or(
            TransactionError::UnknownVariant {
                kind: "post-condition mode",
                tag: pc_mode_byte,
                offset: pc_mode_offset,
            },
        )?;
        let pc_count = reader
            .read_u32_be()
            .map_err(|_| TransactionError::Truncated("reading post-condition count".to_string()))?;
        let mut post_conditions = Vec::with_capacity(pc_count.min(64) as usize);
        for _ in 0..pc_count {
            post_conditions.push(PostCondition::read_from(reader)?);
        }
        let payload = TransactionPayload::read_from(reader)?;
        Ok(StacksTransaction {
            version,
            chain_id,
            auth,
            anchor_mode,
            post_condition_mode,
            post_conditions,
            payload,
        })
    }

    /// Parse an envelope, requiring the input to be fully consumed.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut reader = StacksReader::new(bytes);
        let tx = StacksTransaction::read_from(&mut reader)?;
        if reader.remaining() != 0 {
            return Err(TransactionError::SerializationError(format!(
                "trailing {} bytes after transaction",
                reader.remaining()
            )));
        }
        Ok(tx)
    }

    /// Parse an envelope from hex, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, TransactionError> {
        let stripped = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|e| {
            TransactionError::SerializationError(format!("invalid transaction hex: {e}"))
        })?;
        StacksTransaction::from_bytes(&bytes)
    }

    /// The transaction id of the envelope as currently signed.
    pub fn txid(&self) -> Txid {
        Txid(sha512_256(&self.serialize_to_vec()))
    }

    /// The sighash every signature chain starts from: the txid of the
    /// envelope with its authorization cleared.
    pub fn sign_begin(&self) -> [u8; 32] {
        let mut cleared = self.clone();
        cleared.auth = self.auth.into_initial_sighash_auth();
        cleared.txid().0
    }

    /// Alias of `sign_begin` for the verification side.
    pub fn verify_begin(&self) -> [u8; 32] {
        self.sign_begin()
    }

    /// Sign the next origin slot.
    ///
    /// # Arguments
    /// * `cur_sighash` - The current chain value.
    /// * `private_key` - The origin signer's key.
    ///
    /// # Returns
    /// The chain value after this signature.
    pub fn sign_next_origin(
        &mut self,
        cur_sighash: &[u8; 32],
        private_key: &PrivateKey,
    ) -> Result<[u8; 32], TransactionError> {
        self.auth
            .origin_mut()
            .sign_and_append(cur_sighash, AuthType::Standard, private_key)
    }

    /// Append a non-signing committee member's key to the origin.
    ///
    /// # Returns
    /// The chain value, unchanged.
    pub fn append_next_origin(
        &mut self,
        cur_sighash: &[u8; 32],
        public_key: &PublicKey,
    ) -> Result<[u8; 32], TransactionError> {
        self.auth.origin_mut().push_public_key(public_key.clone())?;
        Ok(*cur_sighash)
    }

    /// Sign the next sponsor slot.
    ///
    /// # Returns
    /// The chain value after this signature, or `NotSponsored`.
    pub fn sign_next_sponsor(
        &mut self,
        cur_sighash: &[u8; 32],
        private_key: &PrivateKey,
    ) -> Result<[u8; 32], TransactionError> {
        match self.auth.sponsor_mut() {
            Some(sponsor) => {
                sponsor.sign_and_append(cur_sighash, AuthType::Sponsored, private_key)
            }
            None => Err(TransactionError::NotSponsored),
        }
    }

    /// Append a non-signing committee member's key to the sponsor.
    pub fn append_next_sponsor(
        &mut self,
        cur_sighash: &[u8; 32],
        public_key: &PublicKey,
    ) -> Result<[u8; 32], TransactionError> {
        match self.auth.sponsor_mut() {
            Some(sponsor) => {
                sponsor.push_public_key(public_key.clone())?;
                Ok(*cur_sighash)
            }
            None => Err(TransactionError::NotSponsored),
        }
    }

    /// Set the fee on the paying condition.
    ///
    /// Existing signatures are left in place and will no longer verify;
    /// fee changes must happen before signing.
    pub fn set_tx_fee(&mut self, tx_fee: u64) {
        self.auth.set_tx_fee(tx_fee);
    }

    /// The fee of the paying condition.
    pub fn tx_fee(&self) -> u64 {
        self.auth.tx_fee()
    }

    /// Set the origin nonce.
    pub fn set_origin_nonce(&mut self, nonce: u64) {
        self.auth.set_origin_nonce(nonce);
    }

    /// Set the sponsor nonce.
    pub fn set_sponsor_nonce(&mut self, nonce: u64) -> Result<(), TransactionError> {
        self.auth.set_sponsor_nonce(nonce)
    }

    /// Verify the origin's signatures and return the chain value the
    /// sponsor signs from.
    pub fn verify_origin(&self) -> Result<[u8; 32], TransactionError> {
        self.auth.verify_origin(&self.verify_begin())
    }

    /// Verify all signatures on the transaction.
    pub fn verify(&self) -> Result<(), TransactionError> {
        self.auth.verify(&self.verify_begin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{SinglesigHashMode, SpendingCondition};
    use crate::clarity::{Memo, PrincipalData};

    fn privk(seed: u8) -> PrivateKey {
        let mut scalar = [0u8; 32];
        scalar[31] = seed;
        PrivateKey::from_bytes(&scalar).unwrap()
    }

    fn transfer_tx(network: &Network, key: &PrivateKey) -> StacksTransaction {
        let origin =
            SpendingCondition::new_singlesig(SinglesigHashMode::P2PKH, &key.public_key())
                .unwrap();
        let recipient =
            PrincipalData::from_string("SP3FGQ8Z7JY9BWYZ5WM53E0M9NK7WHJF0691NZ159").unwrap();
        StacksTransaction::new(
            network,
            TransactionAuth::Standard(origin),
            TransactionPayload::TokenTransfer(recipient, 12345, Memo::empty()),
        )
    }

    #[test]
    fn test_network_constants() {
        let mainnet = Network::mainnet();
        assert_eq!(mainnet.version as u8, 0x00);
        assert_eq!(mainnet.chain_id, 0x00000001);
        assert!(mainnet.is_mainnet());

        let testnet = Network::testnet();
        assert_eq!(testnet.version as u8, 0x80);
        assert_eq!(testnet.chain_id, 0x80000000);
        assert!(!testnet.is_mainnet());
    }

    #[test]
    fn test_envelope_prefix_bytes() {
        let key = privk(1);
        let tx = transfer_tx(&Network::testnet(), &key);
        let bytes = tx.serialize_to_vec();
        assert_eq!(bytes[0], 0x80);
        assert_eq!(&bytes[1..5], &0x80000000u32.to_be_bytes());
        // Standard auth type byte follows the chain id.
        assert_eq!(bytes[5], 0x04);
    }

    #[test]
    fn test_sign_and_roundtrip() {
        let key = privk(2);
        let mut tx = transfer_tx(&Network::testnet(), &key);
        tx.set_tx_fee(180);
        tx.set_origin_nonce(3);

        let sighash = tx.sign_begin();
        tx.sign_next_origin(&sighash, &key).unwrap();
        tx.verify().unwrap();

        let bytes = tx.serialize_to_vec();
        let parsed = StacksTransaction::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, tx);
        assert_eq!(parsed.serialize_to_vec(), bytes);
        assert_eq!(parsed.txid(), tx.txid());
        parsed.verify().unwrap();
    }

    #[test]
    fn test_hex_roundtrip_with_prefix() {
        let key = privk(3);
        let mut tx = transfer_tx(&Network::mainnet(), &key);
        let sighash = tx.sign_begin();
        tx.sign_next_origin(&sighash, &key).unwrap();

        let hex_plain = tx.to_hex();
        let hex_prefixed = format!("0x{hex_plain}");
        assert_eq!(StacksTransaction::from_hex(&hex_plain).unwrap(), tx);
        assert_eq!(StacksTransaction::from_hex(&hex_prefixed).unwrap(), tx);
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let key = privk(4);
        let tx = transfer_tx(&Network::testnet(), &key);
        let mut bytes = tx.serialize_to_vec();
        bytes.push(0x00);
        assert!(matches!(
            StacksTransaction::from_bytes(&bytes),
            Err(TransactionError::SerializationError(_))
        ));
    }

    #[test]
    fn test_fee_change_invalidates_signature() {
        let key = privk(5);
        let mut tx = transfer_tx(&Network::testnet(), &key);
        let sighash = tx.sign_begin();
        tx.sign_next_origin(&sighash, &key).unwrap();
        tx.verify().unwrap();

        tx.set_tx_fee(9999);
        assert!(tx.verify().is_err());
    }

    #[test]
    fn test_txid_changes_with_signature() {
        let key = privk(6);
        let mut tx = transfer_tx(&Network::testnet(), &key);
        let unsigned_txid = tx.txid();
        let sighash = tx.sign_begin();
        tx.sign_next_origin(&sighash, &key).unwrap();
        assert_ne!(tx.txid(), unsigned_txid);
    }

    #[test]
    fn test_sponsor_ops_on_standard_fail() {
        let key = privk(7);
        let mut tx = transfer_tx(&Network::testnet(), &key);
        let sighash = tx.sign_begin();
        assert!(matches!(
            tx.sign_next_sponsor(&sighash, &key),
            Err(TransactionError::NotSponsored)
        ));
        assert!(matches!(
            tx.set_sponsor_nonce(1),
            Err(TransactionError::NotSponsored)
        ));
    }

    #[test]
    fn test_txid_serde_as_hex_string() {
        let txid = Txid([0xab; 32]);
        let json = serde_json::to_string(&txid).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(32)));
        let back: Txid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, txid);
    }
}
