//! Transaction payload variants and their wire codecs.

use stx_primitives::util::{StacksReader, StacksWriter};

use crate::address::StacksAddress;
use crate::clarity::{
    read_raw_address, write_raw_address, ClarityName, ClarityValue, ContractName, Memo,
    PrincipalData, CLARITY_TYPE_OPTIONAL_NONE, CLARITY_TYPE_OPTIONAL_SOME,
    CLARITY_TYPE_PRINCIPAL_CONTRACT, CLARITY_TYPE_PRINCIPAL_STANDARD,
};
use crate::TransactionError;

/// Payload id: STX token transfer.
pub const PAYLOAD_ID_TOKEN_TRANSFER: u8 = 0x00;
/// Payload id: smart contract deploy.
pub const PAYLOAD_ID_SMART_CONTRACT: u8 = 0x01;
/// Payload id: contract function call.
pub const PAYLOAD_ID_CONTRACT_CALL: u8 = 0x02;
/// Payload id: poison microblock report.
pub const PAYLOAD_ID_POISON_MICROBLOCK: u8 = 0x03;
/// Payload id: coinbase.
pub const PAYLOAD_ID_COINBASE: u8 = 0x04;
/// Payload id: coinbase paying an alternate recipient.
pub const PAYLOAD_ID_COINBASE_TO_ALT_RECIPIENT: u8 = 0x05;
/// Payload id: smart contract deploy pinned to a Clarity version.
pub const PAYLOAD_ID_VERSIONED_SMART_CONTRACT: u8 = 0x06;
/// Payload id: tenure change.
pub const PAYLOAD_ID_TENURE_CHANGE: u8 = 0x07;
/// Payload id: Nakamoto coinbase with VRF proof.
pub const PAYLOAD_ID_NAKAMOTO_COINBASE: u8 = 0x08;

/// A Clarity language version pin for a contract deploy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ClarityVersion {
    /// Clarity 1.
    Clarity1 = 1,
    /// Clarity 2.
    Clarity2 = 2,
    /// Clarity 3.
    Clarity3 = 3,
}

impl ClarityVersion {
    /// Decode a version byte.
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            1 => Some(ClarityVersion::Clarity1),
            2 => Some(ClarityVersion::Clarity2),
            3 => Some(ClarityVersion::Clarity3),
            _ => None,
        }
    }
}

/// Why a tenure changed hands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TenureChangeCause {
    /// A new winning block-commit was found.
    BlockFound = 0,
    /// The current tenure was extended across a sortition.
    Extended = 1,
}

impl TenureChangeCause {
    /// Decode a cause byte.
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0 => Some(TenureChangeCause::BlockFound),
            1 => Some(TenureChangeCause::Extended),
            _ => None,
        }
    }
}

/// An 80-byte VRF proof carried by Nakamoto coinbases.
#[derive(Clone, PartialEq, Eq)]
pub struct VrfProof(pub [u8; 80]);

impl VrfProof {
    /// Wrap proof bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        if bytes.len() != 80 {
            return Err(TransactionError::SerializationError(format!(
                "vrf proof must be 80 bytes, got {}",
                bytes.len()
            )));
        }
        let mut buf = [0u8; 80];
        buf.copy_from_slice(bytes);
        Ok(VrfProof(buf))
    }

    fn read_from(reader: &mut StacksReader) -> Result<Self, TransactionError> {
        let bytes = reader
            .read_bytes(80)
            .map_err(|_| TransactionError::Truncated("reading vrf proof".to_string()))?;
        VrfProof::from_bytes(bytes)
    }
}

impl std::fmt::Debug for VrfProof {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VrfProof({})", hex::encode(self.0))
    }
}

/// A microblock stream header, as carried in a poison report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MicroblockHeader {
    /// Stream version byte.
    pub version: u8,
    /// Position in the stream.
    pub sequence: u16,
    /// Hash of the parent block or microblock.
    pub prev_block: [u8; 32],
    /// Merkle root of the microblock's transactions.
    pub tx_merkle_root: [u8; 32],
    /// The miner's recoverable signature over the header.
    pub signature: [u8; 65],
}

impl MicroblockHeader {
    /// Write the header in wire order.
    pub fn serialize_to(&self, writer: &mut StacksWriter) {
        writer.write_u8(self.version);
        writer.write_u16_be(self.sequence);
        writer.write_bytes(&self.prev_block);
        writer.write_bytes(&self.tx_merkle_root);
        writer.write_bytes(&self.signature);
    }

    /// Read a header.
    pub fn read_from(reader: &mut StacksReader) -> Result<Self, TransactionError> {
        let version = reader
            .read_u8()
            .map_err(|_| TransactionError::Truncated("reading microblock version".to_string()))?;
        let sequence = reader
            .read_u16_be()
            .map_err(|_| TransactionError::Truncated("reading microblock sequence".to_string()))?;
        let mut prev_block = [0u8; 32];
        prev_block.copy_from_slice(reader.read_bytes(32).map_err(|_| {
            TransactionError::Truncated("reading microblock parent hash".to_string())
        })?);
        let mut tx_merkle_root = [0u8; 32];
        tx_merkle_root.copy_from_slice(reader.read_bytes(32).map_err(|_| {
            TransactionError::Truncated("reading microblock merkle root".to_string())
        })?);
        let mut signature = [0u8; 65];
        signature.copy_from_slice(reader.read_bytes(65).map_err(|_| {
            TransactionError::Truncated("reading microblock signature".to_string())
        })?);
        Ok(MicroblockHeader {
            version,
            sequence,
            prev_block,
            tx_merkle_root,
            signature,
        })
    }
}

/// The body of a tenure change payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TenureChangePayload {
    /// Consensus hash of the tenure being entered.
    pub tenure_consensus_hash: [u8; 20],
    /// Consensus hash of the previous tenure.
    pub prev_tenure_consensus_hash: [u8; 20],
    /// Last-seen consensus hash on the burnchain.
    pub burn_view_consensus_hash: [u8; 20],
    /// Block id of the last block of the previous tenure.
    pub previous_tenure_end: [u8; 32],
    /// Blocks produced since the last sortition-linked tenure.
    pub previous_tenure_blocks: u32,
    /// Why the tenure changed.
    pub cause: TenureChangeCause,
    /// Hash160 of the new tenure's signing key.
    pub pubkey_hash: [u8; 20],
}

impl TenureChangePayload {
    fn serialize_to(&self, writer: &mut StacksWriter) {
        writer.write_bytes(&self.tenure_consensus_hash);
        writer.write_bytes(&self.prev_tenure_consensus_hash);
        writer.write_bytes(&self.burn_view_consensus_hash);
        writer.write_bytes(&self.previous_tenure_end);
        writer.write_u32_be(self.previous_tenure_blocks);
        writer.write_u8(self.cause as u8);
        writer.write_bytes(&self.pubkey_hash);
    }

    fn read_from(reader: &mut StacksReader) -> Result<Self, TransactionError> {
        let tenure_consensus_hash = read_hash20(reader, "tenure consensus hash")?;
        let prev_tenure_consensus_hash = read_hash20(reader, "previous tenure consensus hash")?;
        let burn_view_consensus_hash = read_hash20(reader, "burn view consensus hash")?;
        let mut previous_tenure_end = [0u8; 32];
        previous_tenure_end.copy_from_slice(reader.read_bytes(32).map_err(|_| {
            TransactionError::Truncated("reading previous tenure end".to_string())
        })?);
        let previous_tenure_blocks = reader.read_u32_be().map_err(|_| {
            TransactionError::Truncated("reading previous tenure block count".to_string())
        })?;
        let cause_offset = reader.position();
        let cause_byte = reader
            .read_u8()
            .map_err(|_| TransactionError::Truncated("reading tenure change cause".to_string()))?;
        let cause =
            TenureChangeCause::from_u8(cause_byte).ok_or(TransactionError::UnknownVariant {
                kind: "tenure change cause",
                tag: cause_byte,
                offset: cause_offset,
            })?;
        let pubkey_hash = read_hash20(reader, "tenure pubkey hash")?;
        Ok(TenureChangePayload {
            tenure_consensus_hash,
            prev_tenure_consensus_hash,
            burn_view_consensus_hash,
            previous_tenure_end,
            previous_tenure_blocks,
            cause,
            pubkey_hash,
        })
    }
}

fn read_hash20(reader: &mut StacksReader, what: &str) -> Result<[u8; 20], TransactionError> {
    let bytes = reader
        .read_bytes(20)
        .map_err(|_| TransactionError::Truncated(format!("reading {what}")))?;
    let mut hash = [0u8; 20];
    hash.copy_from_slice(bytes);
    Ok(hash)
}

fn read_hash32(reader: &mut StacksReader, what: &str) -> Result<[u8; 32], TransactionError> {
    let bytes = reader
        .read_bytes(32)
        .map_err(|_| TransactionError::Truncated(format!("reading {what}")))?;
    let mut hash = [0u8; 32];
    hash.copy_from_slice(bytes);
    Ok(hash)
}

/// What a transaction does.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransactionPayload {
    /// Move STX to a recipient, with an amount in microunits and a memo.
    TokenTransfer(PrincipalData, u64, Memo),
    /// Deploy a contract: name, source code, and an optional Clarity
    /// version pin.
    SmartContract {
        /// The contract's on-chain name.
        name: ContractName,
        /// The Clarity source text.
        code_body: String,
        /// Pin to a Clarity version, or use the chain's current one.
        clarity_version: Option<ClarityVersion>,
    },
    /// Call a public function of a deployed contract.
    ContractCall {
        /// The deploying address.
        address: StacksAddress,
        /// The contract's name.
        contract_name: ContractName,
        /// The function to call.
        function_name: ClarityName,
        /// Encoded arguments, in order.
        function_args: Vec<ClarityValue>,
    },
    /// Report two conflicting microblock headers from one stream.
    PoisonMicroblock(MicroblockHeader, MicroblockHeader),
    /// A miner coinbase committing to 32 bytes of control-plane data.
    Coinbase([u8; 32]),
    /// A coinbase paying out to an alternate principal.
    CoinbaseToAltRecipient([u8; 32], PrincipalData),
    /// A tenure change attesting to a new miner taking over.
    TenureChange(TenureChangePayload),
    /// A Nakamoto coinbase: optional alternate recipient plus the
    /// miner's VRF proof for the tenure.
    NakamotoCoinbase([u8; 32], Option<PrincipalData>, VrfProof),
}

impl TransactionPayload {
    /// The payload's wire id byte.
    pub fn payload_id(&self) -> u8 {
        match self {
            TransactionPayload::TokenTransfer(..) => PAYLOAD_ID_TOKEN_TRANSFER,
            TransactionPayload::SmartContract {
                clarity_version: None,
                ..
            } => PAYLOAD_ID_SMART_CONTRACT,
            TransactionPayload::SmartContract {
                clarity_version: Some(_),
                ..
            } => PAYLOAD_ID_VERSIONED_SMART_CONTRACT,
            TransactionPayload::ContractCall { .. } => PAYLOAD_ID_CONTRACT_CALL,
            TransactionPayload::PoisonMicroblock(..) => PAYLOAD_ID_POISON_MICROBLOCK,
            TransactionPayload::Coinbase(..) => PAYLOAD_ID_COINBASE,
            TransactionPayload::CoinbaseToAltRecipient(..) => {
                PAYLOAD_ID_COINBASE_TO_ALT_RECIPIENT
            }
            TransactionPayload::TenureChange(..) => PAYLOAD_ID_TENURE_CHANGE,
            TransactionPayload::NakamotoCoinbase(..) => PAYLOAD_ID_NAKAMOTO_COINBASE,
        }
    }

    /// Write the id byte and body.
    pub fn serialize_to(&self, writer: &mut StacksWriter) {
        writer.write_u8(self.payload_id());
        match self {
            TransactionPayload::TokenTransfer(recipient, amount, memo) => {
                recipient.serialize_to(writer);
                writer.write_u64_be(*amount);
                writer.write_bytes(memo.as_bytes());
            }
            TransactionPayload::SmartContract {
                name,
                code_body,
                clarity_version,
            } => {
                if let Some(version) = clarity_version {
                    writer.write_u8(*version as u8);
                }
                name.serialize_to(writer);
                writer.write_u32_be(code_body.len() as u32);
                writer.write_bytes(code_body.as_bytes());
            }
            TransactionPayload::ContractCall {
                address,
                contract_name,
                function_name,
                function_args,
            } => {
                write_raw_address(writer, address);
                contract_name.serialize_to(writer);
                function_name.serialize_to(writer);
                writer.write_u32_be(function_args.len() as u32);
                for arg in function_args {
                    arg.serialize_to(writer);
                }
            }
            TransactionPayload::PoisonMicroblock(h1, h2) => {
                h1.serialize_to(writer);
                h2.serialize_to(writer);
            }
            TransactionPayload::Coinbase(buf) => {
                writer.write_bytes(buf);
            }
            TransactionPayload::CoinbaseToAltRecipient(buf, recipient) => {
                writer.write_bytes(buf);
                recipient.serialize_to(writer);
            }
            TransactionPayload::TenureChange(tc) => {
                tc.serialize_to(writer);
            }
            TransactionPayload::NakamotoCoinbase(buf, recipient, proof) => {
                writer.write_bytes(buf);
                // The recipient rides as a Clarity optional principal.
                match recipient {
                    Some(principal) => {
                        writer.write_u8(CLARITY_TYPE_OPTIONAL_SOME);
                        principal.serialize_to(writer);
                    }
                    None => writer.write_u8(CLARITY_TYPE_OPTIONAL_NONE),
                }
                writer.write_bytes(&proof.0);
            }
        }
    }

    /// Read an id byte and body.
    pub fn read_from(reader: &mut StacksReader) -> Result<Self, TransactionError> {
        let offset = reader.position();
        let payload_id = reader
            .read_u8()
            .map_err(|_| TransactionError::Truncated("reading payload id".to_string()))?;
        match payload_id {
            PAYLOAD_ID_TOKEN_TRANSFER => {
                let recipient = PrincipalData::read_from(reader)?;
                let amount = reader
                    .read_u64_be()
                    .map_err(|_| TransactionError::Truncated("reading amount".to_string()))?;
                let memo_bytes = reader
                    .read_bytes(crate::clarity::MEMO_LEN)
                    .map_err(|_| TransactionError::Truncated("reading memo".to_string()))?;
                let mut memo = Memo::empty();
                memo.0.copy_from_slice(memo_bytes);
                Ok(TransactionPayload::TokenTransfer(recipient, amount, memo))
            }
            PAYLOAD_ID_SMART_CONTRACT => {
                let (name, code_body) = read_smart_contract(reader)?;
                Ok(TransactionPayload::SmartContract {
                    name,
                    code_body,
                    clarity_version: None,
                })
            }
            PAYLOAD_ID_VERSIONED_SMART_CONTRACT => {
                let version_offset = reader.position();
                let version_byte = reader.read_u8().map_err(|_| {
                    TransactionError::Truncated("reading clarity version".to_string())
                })?;
                let version = ClarityVersion::from_u8(version_byte).ok_or(
                    TransactionError::UnknownVariant {
                        kind: "clarity version",
                        tag: version_byte,
                        offset: version_offset,
                    },
                )?;
                let (name, code_body) = read_smart_contract(reader)?;
                Ok(TransactionPayload::SmartContract {
                    name,
                    code_body,
                    clarity_version: Some(version),
                })
            }
            PAYLOAD_ID_CONTRACT_CALL => {
                let address = read_raw_address(reader)?;
                let contract_name = ContractName::read_from(reader)?;
                let function_name = ClarityName::read_from(reader)?;
                let arg_count = reader
                    .read_u32_be()
                    .map_err(|_| TransactionError::Truncated("reading argument count".to_string()))?;
                let mut function_args = Vec::with_capacity(arg_count.min(64) as usize);
                for _ in 0..arg_count {
                    function_args.push(ClarityValue::read_from(reader)?);
                }
                Ok(TransactionPayload::ContractCall {
                    address,
                    contract_name,
                    function_name,
                    function_args,
                })
            }
            PAYLOAD_ID_POISON_MICROBLOCK => {
                let h1 = MicroblockHeader::read_from(reader)?;
                let h2 = MicroblockHeader::read_from(reader)?;
                if h1 == h2 {
                    return Err(TransactionError::InvalidTransaction(
                        "poison microblock headers are identical".to_string(),
                    ));
                }
                if h1.sequence != h2.sequence && h1.prev_block != h2.prev_block {
                    return Err(TransactionError::InvalidTransaction(
                        "poison microblock headers do not identify a fork".to_string(),
                    ));
                }
                Ok(TransactionPayload::PoisonMicroblock(h1, h2))
            }
            PAYLOAD_ID_COINBASE => {
                let buf = read_hash32(reader, "coinbase payload")?;
                Ok(TransactionPayload::Coinbase(buf))
            }
            PAYLOAD_ID_COINBASE_TO_ALT_RECIPIENT => {
                let buf = read_hash32(reader, "coinbase payload")?;
                let tag_offset = reader.position();
                let tag = reader.read_u8().map_err(|_| {
                    TransactionError::Truncated("reading coinbase recipient".to_string())
                })?;
                if tag != CLARITY_TYPE_PRINCIPAL_STANDARD && tag != CLARITY_TYPE_PRINCIPAL_CONTRACT
                {
                    return Err(TransactionError::UnknownVariant {
                        kind: "coinbase recipient",
                        tag,
                        offset: tag_offset,
                    });
                }
                let recipient = read_principal_body(reader, tag)?;
                Ok(TransactionPayload::CoinbaseToAltRecipient(buf, recipient))
            }
            PAYLOAD_ID_NAKAMOTO_COINBASE => {
                let buf = read_hash32(reader, "coinbase payload")?;
                let tag_offset = reader.position();
                let tag = reader.read_u8().map_err(|_| {
                    TransactionError::Truncated("reading coinbase recipient".to_string())
                })?;
                let recipient = match tag {
                    CLARITY_TYPE_OPTIONAL_NONE => None,
                    CLARITY_TYPE_OPTIONAL_SOME => {
                        let inner_offset = reader.position();
                        let inner_tag = reader.read_u8().map_err(|_| {
                            TransactionError::Truncated("reading coinbase recipient".to_string())
                        })?;
                        if inner_tag != CLARITY_TYPE_PRINCIPAL_STANDARD
                            && inner_tag != CLARITY_TYPE_PRINCIPAL_CONTRACT
                        {
                            return Err(TransactionError::UnknownVariant {
                                kind: "coinbase recipient",
                                tag: inner_tag,
                                offset: inner_offset,
                            });
                        }
                        Some(read_principal_body(reader, inner_tag)?)
                    }
                    other => {
                        return Err(TransactionError::UnknownVariant {
                            kind: "coinbase recipient",
                            tag: other,
                            offset: tag_offset,
                        })
                    }
                };
                let proof = VrfProof::read_from(reader)?;
                Ok(TransactionPayload::NakamotoCoinbase(buf, recipient, proof))
            }
            PAYLOAD_ID_TENURE_CHANGE => Ok(TransactionPayload::TenureChange(
                TenureChangePayload::read_from(reader)?,
            )),
            tag => Err(TransactionError::UnknownVariant {
                kind: "payload id",
                tag,
                offset,
            }),
        }
    }
}

fn read_smart_contract(
    reader: &mut StacksReader,
) -> Result<(ContractName, String), TransactionError> {
    let name = ContractName::read_from(reader)?;
    let code_len = reader
        .read_u32_be()
        .map_err(|_| TransactionError::Truncated("reading code body length".to_string()))?;
    let code_bytes = reader
        .read_bytes(code_len as usize)
        .map_err(|_| TransactionError::Truncated("reading code body".to_string()))?;
    let code_body = String::from_utf8(code_bytes.to_vec())
        .map_err(|e| TransactionError::SerializationError(format!("code body not utf8: {e}")))?;
    Ok((name, code_body))
}

// The principal tag byte has already been consumed.
fn read_principal_body(
    reader: &mut StacksReader,
    tag: u8,
) -> Result<PrincipalData, TransactionError> {
    let address = read_raw_address(reader)?;
    if tag == CLARITY_TYPE_PRINCIPAL_STANDARD {
        Ok(PrincipalData::Standard(address))
    } else {
        let name = ContractName::read_from(reader)?;
        Ok(PrincipalData::Contract(address, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(payload: &TransactionPayload) -> TransactionPayload {
        let mut writer = StacksWriter::new();
        payload.serialize_to(&mut writer);
        let bytes = writer.into_bytes();
        let mut reader = StacksReader::new(&bytes);
        let parsed = TransactionPayload::read_from(&mut reader).unwrap();
        assert_eq!(reader.remaining(), 0);
        parsed
    }

    fn header(sequence: u16, prev: u8, sig: u8) -> MicroblockHeader {
        MicroblockHeader {
            version: 0,
            sequence,
            prev_block: [prev; 32],
            tx_merkle_root: [0xaa; 32],
            signature: [sig; 65],
        }
    }

    #[test]
    fn test_token_transfer_roundtrip() {
        let recipient =
            PrincipalData::from_string("SP3FGQ8Z7JY9BWYZ5WM53E0M9NK7WHJF0691NZ159").unwrap();
        let payload = TransactionPayload::TokenTransfer(
            recipient,
            2_500_000,
            Memo::from_string("test memo").unwrap(),
        );
        assert_eq!(roundtrip(&payload), payload);
        assert_eq!(payload.payload_id(), PAYLOAD_ID_TOKEN_TRANSFER);
    }

    #[test]
    fn test_smart_contract_roundtrip() {
        let payload = TransactionPayload::SmartContract {
            name: ContractName::new("kv-store").unwrap(),
            code_body: "(define-map store { key: (buff 32) } { value: (buff 32) })".to_string(),
            clarity_version: None,
        };
        assert_eq!(payload.payload_id(), PAYLOAD_ID_SMART_CONTRACT);
        assert_eq!(roundtrip(&payload), payload);

        let versioned = TransactionPayload::SmartContract {
            name: ContractName::new("kv-store").unwrap(),
            code_body: "(define-read-only (get-value (key (buff 32))) key)".to_string(),
            clarity_version: Some(ClarityVersion::Clarity2),
        };
        assert_eq!(versioned.payload_id(), PAYLOAD_ID_VERSIONED_SMART_CONTRACT);
        assert_eq!(roundtrip(&versioned), versioned);
    }

    #[test]
    fn test_contract_call_roundtrip() {
        let address =
            StacksAddress::from_string("SP3FGQ8Z7JY9BWYZ5WM53E0M9NK7WHJF0691NZ159").unwrap();
        let payload = TransactionPayload::ContractCall {
            address,
            contract_name: ContractName::new("kv-store").unwrap(),
            function_name: ClarityName::new("set-value").unwrap(),
            function_args: vec![
                ClarityValue::buffer(b"foo"),
                ClarityValue::uint(42),
            ],
        };
        assert_eq!(roundtrip(&payload), payload);
    }

    #[test]
    fn test_contract_call_with_no_args() {
        let address =
            StacksAddress::from_string("SP3FGQ8Z7JY9BWYZ5WM53E0M9NK7WHJF0691NZ159").unwrap();
        let payload = TransactionPayload::ContractCall {
            address,
            contract_name: ContractName::new("pox").unwrap(),
            function_name: ClarityName::new("get-pox-info").unwrap(),
            function_args: vec![],
        };
        assert_eq!(roundtrip(&payload), payload);
    }

    #[test]
    fn test_poison_microblock_requires_fork() {
        // Same sequence, different content: a fork.
        let fork = TransactionPayload::PoisonMicroblock(header(3, 1, 1), header(3, 2, 2));
        assert_eq!(roundtrip(&fork), fork);

        // Identical headers are rejected.
        let mut writer = StacksWriter::new();
        TransactionPayload::PoisonMicroblock(header(3, 1, 1), header(3, 1, 1))
            .serialize_to(&mut writer);
        let bytes = writer.into_bytes();
        let mut reader = StacksReader::new(&bytes);
        assert!(TransactionPayload::read_from(&mut reader).is_err());

        // Different sequence and different parent do not identify a fork.
        let mut writer = StacksWriter::new();
        TransactionPayload::PoisonMicroblock(header(3, 1, 1), header(4, 2, 2))
            .serialize_to(&mut writer);
        let bytes = writer.into_bytes();
        let mut reader = StacksReader::new(&bytes);
        assert!(TransactionPayload::read_from(&mut reader).is_err());
    }

    #[test]
    fn test_coinbase_variants_roundtrip() {
        let plain = TransactionPayload::Coinbase([0x12; 32]);
        assert_eq!(roundtrip(&plain), plain);

        let recipient =
            PrincipalData::from_string("SP3FGQ8Z7JY9BWYZ5WM53E0M9NK7WHJF0691NZ159.pool").unwrap();
        let alt = TransactionPayload::CoinbaseToAltRecipient([0x12; 32], recipient.clone());
        assert_eq!(roundtrip(&alt), alt);

        let nakamoto =
            TransactionPayload::NakamotoCoinbase([0x12; 32], None, VrfProof([0x9b; 80]));
        assert_eq!(roundtrip(&nakamoto), nakamoto);

        let nakamoto_alt = TransactionPayload::NakamotoCoinbase(
            [0x12; 32],
            Some(recipient),
            VrfProof([0x9b; 80]),
        );
        assert_eq!(roundtrip(&nakamoto_alt), nakamoto_alt);
    }

    #[test]
    fn test_tenure_change_roundtrip() {
        let payload = TransactionPayload::TenureChange(TenureChangePayload {
            tenure_consensus_hash: [1; 20],
            prev_tenure_consensus_hash: [2; 20],
            burn_view_consensus_hash: [3; 20],
            previous_tenure_end: [4; 32],
            previous_tenure_blocks: 10,
            cause: TenureChangeCause::Extended,
            pubkey_hash: [5; 20],
        });
        assert_eq!(roundtrip(&payload), payload);
    }

    #[test]
    fn test_unknown_payload_id() {
        let mut reader = StacksReader::new(&[0x4f, 0x00]);
        match TransactionPayload::read_from(&mut reader) {
            Err(TransactionError::UnknownVariant { kind, tag, offset }) => {
                assert_eq!(kind, "payload id");
                assert_eq!(tag, 0x4f);
                assert_eq!(offset, 0);
            }
            other => panic!("expected unknown variant, got {other:?}"),
        }
    }

    #[test]
    fn test_truncated_token_transfer() {
        let recipient =
            PrincipalData::from_string("SP3FGQ8Z7JY9BWYZ5WM53E0M9NK7WHJF0691NZ159").unwrap();
        let payload = TransactionPayload::TokenTransfer(
            recipient,
            100,
            Memo::empty(),
        );
        let mut writer = StacksWriter::new();
        payload.serialize_to(&mut writer);
        let bytes = writer.into_bytes();
        let mut reader = StacksReader::new(&bytes[..bytes.len() - 1]);
        assert!(matches!(
            TransactionPayload::read_from(&mut reader),
            Err(TransactionError::Truncated(_))
        ));
    }
}
