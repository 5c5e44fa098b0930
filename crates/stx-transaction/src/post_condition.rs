//! Post-conditions: asset-movement constraints checked after execution.

use stx_primitives::util::{StacksReader, StacksWriter};

use crate::address::StacksAddress;
use crate::clarity::{read_raw_address, write_raw_address, ClarityName, ClarityValue, ContractName};
use crate::TransactionError;

/// Asset id: the native STX token.
pub const ASSET_ID_STX: u8 = 0x00;
/// Asset id: a contract-defined fungible token.
pub const ASSET_ID_FUNGIBLE: u8 = 0x01;
/// Asset id: a contract-defined non-fungible token.
pub const ASSET_ID_NONFUNGIBLE: u8 = 0x02;

const PRINCIPAL_ID_ORIGIN: u8 = 0x01;
const PRINCIPAL_ID_STANDARD: u8 = 0x02;
const PRINCIPAL_ID_CONTRACT: u8 = 0x03;

/// Whose asset movements a post-condition constrains.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PostConditionPrincipal {
    /// The transaction's origin account.
    Origin,
    /// A named standard account.
    Standard(StacksAddress),
    /// A named contract.
    Contract(StacksAddress, ContractName),
}

impl PostConditionPrincipal {
    /// Write the principal id and body.
    pub fn serialize_to(&self, writer: &mut StacksWriter) {
        match self {
            PostConditionPrincipal::Origin => writer.write_u8(PRINCIPAL_ID_ORIGIN),
            PostConditionPrincipal::Standard(address) => {
                writer.write_u8(PRINCIPAL_ID_STANDARD);
                write_raw_address(writer, address);
            }
            PostConditionPrincipal::Contract(address, name) => {
                writer.write_u8(PRINCIPAL_ID_CONTRACT);
                write_raw_address(writer, address);
                name.serialize_to(writer);
            }
        }
    }

    /// Read a principal id and body.
    pub fn read_from(reader: &mut StacksReader) -> Result<Self, TransactionError> {
        let offset = reader.position();
        let principal_id = reader.read_u8().map_err(|_| {
            TransactionError::Truncated("reading post-condition principal id".to_string())
        })?;
        match principal_id {
            PRINCIPAL_ID_ORIGIN => Ok(PostConditionPrincipal::Origin),
            PRINCIPAL_ID_STANDARD => {
                Ok(PostConditionPrincipal::Standard(read_raw_address(reader)?))
            }
            PRINCIPAL_ID_CONTRACT => {
                let address = read_raw_address(reader)?;
                let name = ContractName::read_from(reader)?;
                Ok(PostConditionPrincipal::Contract(address, name))
            }
            tag => Err(TransactionError::UnknownVariant {
                kind: "post-condition principal",
                tag,
                offset,
            }),
        }
    }
}

/// Comparison codes for fungible amounts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FungibleConditionCode {
    /// Sent exactly this amount.
    SentEq = 0x01,
    /// Sent more than this amount.
    SentGt = 0x02,
    /// Sent at least this amount.
    SentGe = 0x03,
    /// Sent less than this amount.
    SentLt = 0x04,
    /// Sent at most this amount.
    SentLe = 0x05,
}

impl FungibleConditionCode {
    /// Decode a condition code byte.
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(FungibleConditionCode::SentEq),
            0x02 => Some(FungibleConditionCode::SentGt),
            0x03 => Some(FungibleConditionCode::SentGe),
            0x04 => Some(FungibleConditionCode::SentLt),
            0x05 => Some(FungibleConditionCode::SentLe),
            _ => None,
        }
    }

    /// Whether an actual sent amount satisfies this condition.
    pub fn check(&self, amount_condition: u64, amount_sent: u64) -> bool {
        match self {
            FungibleConditionCode::SentEq => amount_sent == amount_condition,
            FungibleConditionCode::SentGt => amount_sent > amount_condition,
            FungibleConditionCode::SentGe => amount_sent >= amount_condition,
            FungibleConditionCode::SentLt => amount_sent < amount_condition,
            FungibleConditionCode::SentLe => amount_sent <= amount_condition,
        }
    }
}

/// Sent-or-not codes for non-fungible assets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum NonfungibleConditionCode {
    /// The asset was sent.
    Sent = 0x10,
    /// The asset was not sent.
    NotSent = 0x11,
}

impl NonfungibleConditionCode {
    /// Decode a condition code byte.
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x10 => Some(NonfungibleConditionCode::Sent),
            0x11 => Some(NonfungibleConditionCode::NotSent),
            _ => None,
        }
    }
}

/// Identifies a contract-defined asset class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetInfo {
    /// The deploying address.
    pub contract_address: StacksAddress,
    /// The defining contract's name.
    pub contract_name: ContractName,
    /// The asset's name within the contract.
    pub asset_name: ClarityName,
}

impl AssetInfo {
    fn serialize_to(&self, writer: &mut StacksWriter) {
        write_raw_address(writer, &self.contract_address);
        self.contract_name.serialize_to(writer);
        self.asset_name.serialize_to(writer);
    }

    fn read_from(reader: &mut StacksReader) -> Result<Self, TransactionError> {
        let contract_address = read_raw_address(reader)?;
        let contract_name = ContractName::read_from(reader)?;
        let asset_name = ClarityName::read_from(reader)?;
        Ok(AssetInfo {
            contract_address,
            contract_name,
            asset_name,
        })
    }
}

/// One post-condition entry in a transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PostCondition {
    /// Constrain STX sent by a principal.
    Stx(PostConditionPrincipal, FungibleConditionCode, u64),
    /// Constrain a fungible token sent by a principal.
    Fungible(
        PostConditionPrincipal,
        AssetInfo,
        FungibleConditionCode,
        u64,
    ),
    /// Constrain whether a specific non-fungible asset was sent.
    Nonfungible(
        PostConditionPrincipal,
        AssetInfo,
        ClarityValue,
        NonfungibleConditionCode,
    ),
}

impl PostCondition {
    /// Write the asset id and body.
    ///
    /// The non-fungible form carries the asset value before the
    /// condition code and has no amount.
    pub fn serialize_to(&self, writer: &mut StacksWriter) {
        match self {
            PostCondition::Stx(principal, code, amount) => {
                writer.write_u8(ASSET_ID_STX);
                principal.serialize_to(writer);
                writer.write_u8(*code as u8);
                writer.write_u64_be(*amount);
            }
            PostCondition::Fungible(principal, asset, code, amount) => {
                writer.write_u8(ASSET_ID_FUNGIBLE);
                principal.serialize_to(writer);
                asset.serialize_to(writer);
                writer.write_u8(*code as u8);
                writer.write_u64_be(*amount);
            }
            PostCondition::Nonfungible(principal, asset, value, code) => {
                writer.write_u8(ASSET_ID_NONFUNGIBLE);
                principal.serialize_to(writer);
                asset.serialize_to(writer);
                value.serialize_to(writer);
                writer.write_u8(*code as u8);
            }
        }
    }

    /// Read an asset id and body.
    pub fn read_from(reader: &mut StacksReader) -> Result<Self, TransactionError> {
        let offset = reader.position();
        let asset_id = reader
            .read_u8()
            .map_err(|_| TransactionError::Truncated("reading post-condition asset id".to_string()))?;
        match asset_id {
            ASSET_ID_STX => {
                let principal = PostConditionPrincipal::read_from(reader)?;
                let code = read_fungible_code(reader)?;
                let amount = reader.read_u64_be().map_err(|_| {
                    TransactionError::Truncated("reading post-condition amount".to_string())
                })?;
                Ok(PostCondition::Stx(principal, code, amount))
            }
            ASSET_ID_FUNGIBLE => {
                let principal = PostConditionPrincipal::read_from(reader)?;
                let asset = AssetInfo::read_from(reader)?;
                let code = read_fungible_code(reader)?;
                let amount = reader.read_u64_be().map_err(|_| {
                    TransactionError::Truncated("reading post-condition amount".to_string())
                })?;
                Ok(PostCondition::Fungible(principal, asset, code, amount))
            }
            ASSET_ID_NONFUNGIBLE => {
                let principal = PostConditionPrincipal::read_from(reader)?;
                let asset = AssetInfo::read_from(reader)?;
                let value = ClarityValue::read_from(reader)?;
                let code_offset = reader.position();
                let code_byte = reader.read_u8().map_err(|_| {
                    TransactionError::Truncated("reading post-condition code".to_string())
                })?;
                let code = NonfungibleConditionCode::from_u8(code_byte).ok_or(
                    TransactionError::UnknownVariant {
                        kind: "non-fungible condition code",
                        tag: code_byte,
                        offset: code_offset,
                    },
                )?;
                Ok(PostCondition::Nonfungible(principal, asset, value, code))
            }
            tag => Err(TransactionError::UnknownVariant {
                kind: "post-condition asset",
                tag,
                offset,
            }),
        }
    }
}

fn read_fungible_code(
    reader: &mut StacksReader,
) -> Result<FungibleConditionCode, TransactionError> {
    let offset = reader.position();
    let byte = reader
        .read_u8()
        .map_err(|_| TransactionError::Truncated("reading post-condition code".to_string()))?;
    FungibleConditionCode::from_u8(byte).ok_or(TransactionError::UnknownVariant {
        kind: "fungible condition code",
        tag: byte,
        offset,
    })
}
