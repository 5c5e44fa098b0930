//! Clarity names, principals, and opaque pre-encoded values.
//!
//! Contract-call arguments and non-fungible post-condition values travel
//! as already-encoded Clarity values. The codec does not interpret them;
//! it walks the type tag just far enough to consume exactly one value
//! per entry. A handful of constructors cover the value shapes the
//! builders and tests need.

use std::fmt;

use stx_primitives::util::{StacksReader, StacksWriter};

use crate::address::StacksAddress;
use crate::TransactionError;

/// Clarity value type tags.
pub const CLARITY_TYPE_INT: u8 = 0x00;
pub const CLARITY_TYPE_UINT: u8 = 0x01;
pub const CLARITY_TYPE_BUFFER: u8 = 0x02;
pub const CLARITY_TYPE_BOOL_TRUE: u8 = 0x03;
pub const CLARITY_TYPE_BOOL_FALSE: u8 = 0x04;
pub const CLARITY_TYPE_PRINCIPAL_STANDARD: u8 = 0x05;
pub const CLARITY_TYPE_PRINCIPAL_CONTRACT: u8 = 0x06;
pub const CLARITY_TYPE_RESPONSE_OK: u8 = 0x07;
pub const CLARITY_TYPE_RESPONSE_ERR: u8 = 0x08;
pub const CLARITY_TYPE_OPTIONAL_NONE: u8 = 0x09;
pub const CLARITY_TYPE_OPTIONAL_SOME: u8 = 0x0a;
pub const CLARITY_TYPE_LIST: u8 = 0x0b;
pub const CLARITY_TYPE_TUPLE: u8 = 0x0c;
pub const CLARITY_TYPE_STRING_ASCII: u8 = 0x0d;
pub const CLARITY_TYPE_STRING_UTF8: u8 = 0x0e;

/// Maximum nesting depth the value scanner will follow.
const MAX_VALUE_DEPTH: usize = 64;

/// Maximum byte length of a Clarity name.
const MAX_CLARITY_NAME_LEN: usize = 128;

/// Maximum byte length of a contract name.
const MAX_CONTRACT_NAME_LEN: usize = 40;

/// Byte length of a token transfer memo.
pub const MEMO_LEN: usize = 34;

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic()
}

fn is_clarity_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!?+<>=/*-_".contains(c)
}

fn is_contract_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// A validated Clarity identifier (function, argument, or asset name).
///
/// 1 to 128 ASCII bytes, starting with a letter, continuing with
/// letters, digits, or the Clarity operator characters.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClarityName(String);

impl ClarityName {
    /// Validate and wrap a Clarity name.
    ///
    /// # Arguments
    /// * `name` - The candidate identifier.
    ///
    /// # Returns
    /// `Ok(ClarityName)` on success, or an `InvalidName` error.
    pub fn new(name: &str) -> Result<Self, TransactionError> {
        if name.is_empty() || name.len() > MAX_CLARITY_NAME_LEN {
            return Err(TransactionError::InvalidName(format!(
                "clarity name must be 1..={} bytes, got {}",
                MAX_CLARITY_NAME_LEN,
                name.len()
            )));
        }
        let mut chars = name.chars();
        let first = chars.next().unwrap_or('\0');
        if !is_name_start(first) || !name.chars().all(is_clarity_name_char) {
            return Err(TransactionError::InvalidName(format!(
                "invalid clarity name '{}'",
                name
            )));
        }
        Ok(ClarityName(name.to_string()))
    }

    /// Access the name string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Write the name with its 1-byte length prefix.
    pub fn serialize_to(&self, writer: &mut StacksWriter) {
        writer.write_u8(self.0.len() as u8);
        writer.write_bytes(self.0.as_bytes());
    }

    /// Read a length-prefixed name.
    pub fn read_from(reader: &mut StacksReader) -> Result<Self, TransactionError> {
        let name = read_prefixed_name(reader, "clarity name")?;
        Self::new(&name)
    }
}

impl fmt::Display for ClarityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated contract name.
///
/// 1 to 40 ASCII bytes, starting with a letter, continuing with letters,
/// digits, hyphens, or underscores.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContractName(String);

impl ContractName {
    /// Validate and wrap a contract name.
    ///
    /// # Arguments
    /// * `name` - The candidate name.
    ///
    /// # Returns
    /// `Ok(ContractName)` on success, or an `InvalidName` error.
    pub fn new(name: &str) -> Result<Self, TransactionError> {
        if name.is_empty() || name.len() > MAX_CONTRACT_NAME_LEN {
            return Err(TransactionError::InvalidName(format!(
                "contract name must be 1..={} bytes, got {}",
                MAX_CONTRACT_NAME_LEN,
                name.len()
            )));
        }
        let mut chars = name.chars();
        let first = chars.next().unwrap_or('\0');
        if !is_name_start(first) || !name.chars().all(is_contract_name_char) {
            return Err(TransactionError::InvalidName(format!(
                "invalid contract name '{}'",
                name
            )));
        }
        Ok(ContractName(name.to_string()))
    }

    /// Access the name string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Write the name with its 1-byte length prefix.
    pub fn serialize_to(&self, writer: &mut StacksWriter) {
        writer.write_u8(self.0.len() as u8);
        writer.write_bytes(self.0.as_bytes());
    }

    /// Read a length-prefixed name.
    pub fn read_from(reader: &mut StacksReader) -> Result<Self, TransactionError> {
        let name = read_prefixed_name(reader, "contract name")?;
        Self::new(&name)
    }
}

impl fmt::Display for ContractName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn read_prefixed_name(
    reader: &mut StacksReader,
    what: &'static str,
) -> Result<String, TransactionError> {
    let len = reader
        .read_u8()
        .map_err(|_| TransactionError::Truncated(format!("reading {} length", what)))?;
    let bytes = reader
        .read_bytes(len as usize)
        .map_err(|_| TransactionError::Truncated(format!("reading {}", what)))?;
    String::from_utf8(bytes.to_vec())
        .map_err(|_| TransactionError::InvalidName(format!("{} is not valid UTF-8", what)))
}

// ---------------------------------------------------------------------------
// Principals
// ---------------------------------------------------------------------------

/// A Clarity principal: a standard account or a contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PrincipalData {
    /// A standard account address.
    Standard(StacksAddress),
    /// A contract: its deployer address plus contract name.
    Contract(StacksAddress, ContractName),
}

impl PrincipalData {
    /// Parse a principal from its string form, with an optional
    /// `.contract-name` suffix.
    ///
    /// # Arguments
    /// * `s` - An address string, optionally followed by a dot and a
    ///   contract name.
    ///
    /// # Returns
    /// `Ok(PrincipalData)` on success, or an error for bad encoding.
    pub fn from_string(s: &str) -> Result<Self, TransactionError> {
        match s.split_once('.') {
            Some((addr, name)) => Ok(PrincipalData::Contract(
                StacksAddress::from_string(addr)?,
                ContractName::new(name)?,
            )),
            None => Ok(PrincipalData::Standard(StacksAddress::from_string(s)?)),
        }
    }

    /// The address component of this principal.
    pub fn address(&self) -> &StacksAddress {
        match self {
            PrincipalData::Standard(addr) => addr,
            PrincipalData::Contract(addr, _) => addr,
        }
    }

    /// Write the principal in Clarity value form (type tag included).
    pub fn serialize_to(&self, writer: &mut StacksWriter) {
        match self {
            PrincipalData::Standard(addr) => {
                writer.write_u8(CLARITY_TYPE_PRINCIPAL_STANDARD);
                writer.write_u8(addr.version);
                writer.write_bytes(&addr.hash);
            }
            PrincipalData::Contract(addr, name) => {
                writer.write_u8(CLARITY_TYPE_PRINCIPAL_CONTRACT);
                writer.write_u8(addr.version);
                writer.write_bytes(&addr.hash);
                name.serialize_to(writer);
            }
        }
    }

    /// Read a principal in Clarity value form.
    pub fn read_from(reader: &mut StacksReader) -> Result<Self, TransactionError> {
        let offset = reader.position();
        let tag = reader
            .read_u8()
            .map_err(|_| TransactionError::Truncated("reading principal tag".to_string()))?;
        match tag {
            CLARITY_TYPE_PRINCIPAL_STANDARD => {
                Ok(PrincipalData::Standard(read_raw_address(reader)?))
            }
            CLARITY_TYPE_PRINCIPAL_CONTRACT => {
                let addr = read_raw_address(reader)?;
                let name = ContractName::read_from(reader)?;
                Ok(PrincipalData::Contract(addr, name))
            }
            tag => Err(TransactionError::UnknownVariant {
                kind: "principal",
                tag,
                offset,
            }),
        }
    }
}

impl fmt::Display for PrincipalData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrincipalData::Standard(addr) => write!(f, "{}", addr),
            PrincipalData::Contract(addr, name) => write!(f, "{}.{}", addr, name),
        }
    }
}

/// Read the raw 21-byte address form: version byte then Hash160.
pub(crate) fn read_raw_address(
    reader: &mut StacksReader,
) -> Result<StacksAddress, TransactionError> {
    let version = reader
        .read_u8()
        .map_err(|_| TransactionError::Truncated("reading address version".to_string()))?;
    let bytes = reader
        .read_bytes(20)
        .map_err(|_| TransactionError::Truncated("reading address hash".to_string()))?;
    let mut hash = [0u8; 20];
    hash.copy_from_slice(bytes);
    Ok(StacksAddress::new(version, hash))
}

/// Write the raw 21-byte address form: version byte then Hash160.
pub(crate) fn write_raw_address(writer: &mut StacksWriter, addr: &StacksAddress) {
    writer.write_u8(addr.version);
    writer.write_bytes(&addr.hash);
}

// ---------------------------------------------------------------------------
// Opaque Clarity values
// ---------------------------------------------------------------------------

/// An opaque, already-encoded Clarity value.
///
/// The bytes are validated to spell exactly one well-formed value, but
/// are otherwise carried verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClarityValue {
    bytes: Vec<u8>,
}

impl ClarityValue {
    /// Wrap pre-encoded value bytes, validating that they spell exactly
    /// one value with nothing trailing.
    ///
    /// # Arguments
    /// * `bytes` - The encoded value.
    ///
    /// # Returns
    /// `Ok(ClarityValue)` on success, or a decode error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut reader = StacksReader::new(bytes);
        scan_value(&mut reader, 0)?;
        if reader.remaining() != 0 {
            return Err(TransactionError::SerializationError(format!(
                "trailing {} bytes after clarity value",
                reader.remaining()
            )));
        }
        Ok(ClarityValue {
            bytes: bytes.to_vec(),
        })
    }

    /// Access the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The value's type tag byte.
    pub fn type_tag(&self) -> u8 {
        self.bytes[0]
    }

    /// Write the encoded bytes verbatim.
    pub fn serialize_to(&self, writer: &mut StacksWriter) {
        writer.write_bytes(&self.bytes);
    }

    /// Consume exactly one value from the reader.
    pub fn read_from(reader: &mut StacksReader) -> Result<Self, TransactionError> {
        let start = reader.position();
        scan_value(reader, 0)?;
        Ok(ClarityValue {
            bytes: reader.span_from(start).to_vec(),
        })
    }

    // ---- constructors ----

    /// An unsigned 128-bit integer value.
    pub fn uint(value: u128) -> Self {
        let mut bytes = Vec::with_capacity(17);
        bytes.push(CLARITY_TYPE_UINT);
        bytes.extend_from_slice(&value.to_be_bytes());
        ClarityValue { bytes }
    }

    /// A signed 128-bit integer value.
    pub fn int(value: i128) -> Self {
        let mut bytes = Vec::with_capacity(17);
        bytes.push(CLARITY_TYPE_INT);
        bytes.extend_from_slice(&value.to_be_bytes());
        ClarityValue { bytes }
    }

    /// A boolean value.
    pub fn bool(value: bool) -> Self {
        ClarityValue {
            bytes: vec![if value {
                CLARITY_TYPE_BOOL_TRUE
            } else {
                CLARITY_TYPE_BOOL_FALSE
            }],
        }
    }

    /// A byte buffer value.
    pub fn buffer(data: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(5 + data.len());
        bytes.push(CLARITY_TYPE_BUFFER);
        bytes.extend_from_slice(&(data.len() as u32).to_be_bytes());
        bytes.extend_from_slice(data);
        ClarityValue { bytes }
    }

    /// A principal value.
    pub fn principal(principal: &PrincipalData) -> Self {
        let mut writer = StacksWriter::new();
        principal.serialize_to(&mut writer);
        ClarityValue {
            bytes: writer.into_bytes(),
        }
    }

    /// The `none` optional value.
    pub fn none() -> Self {
        ClarityValue {
            bytes: vec![CLARITY_TYPE_OPTIONAL_NONE],
        }
    }

    /// A `(some inner)` optional value.
    pub fn some(inner: &ClarityValue) -> Self {
        let mut bytes = Vec::with_capacity(1 + inner.bytes.len());
        bytes.push(CLARITY_TYPE_OPTIONAL_SOME);
        bytes.extend_from_slice(&inner.bytes);
        ClarityValue { bytes }
    }

    /// An ASCII string value.
    pub fn string_ascii(s: &str) -> Self {
        let mut bytes = Vec::with_capacity(5 + s.len());
        bytes.push(CLARITY_TYPE_STRING_ASCII);
        bytes.extend_from_slice(&(s.len() as u32).to_be_bytes());
        bytes.extend_from_slice(s.as_bytes());
        ClarityValue { bytes }
    }
}

/// Walk one encoded value, consuming exactly its bytes.
fn scan_value(reader: &mut StacksReader, depth: usize) -> Result<(), TransactionError> {
    if depth > MAX_VALUE_DEPTH {
        return Err(TransactionError::SerializationError(
            "clarity value nesting too deep".to_string(),
        ));
    }
    let offset = reader.position();
    let tag = reader
        .read_u8()
        .map_err(|_| TransactionError::Truncated("reading clarity value tag".to_string()))?;
    match tag {
        CLARITY_TYPE_INT | CLARITY_TYPE_UINT => {
            reader
                .read_bytes(16)
                .map_err(|_| TransactionError::Truncated("reading clarity integer".to_string()))?;
        }
        CLARITY_TYPE_BUFFER | CLARITY_TYPE_STRING_ASCII | CLARITY_TYPE_STRING_UTF8 => {
            let len = reader.read_u32_be().map_err(|_| {
                TransactionError::Truncated("reading clarity byte length".to_string())
            })?;
            reader
                .read_bytes(len as usize)
                .map_err(|_| TransactionError::Truncated("reading clarity bytes".to_string()))?;
        }
        CLARITY_TYPE_BOOL_TRUE | CLARITY_TYPE_BOOL_FALSE | CLARITY_TYPE_OPTIONAL_NONE => {}
        CLARITY_TYPE_PRINCIPAL_STANDARD => {
            reader
                .read_bytes(21)
                .map_err(|_| TransactionError::Truncated("reading principal".to_string()))?;
        }
        CLARITY_TYPE_PRINCIPAL_CONTRACT => {
            reader
                .read_bytes(21)
                .map_err(|_| TransactionError::Truncated("reading principal".to_string()))?;
            read_prefixed_name(reader, "contract name")?;
        }
        CLARITY_TYPE_RESPONSE_OK | CLARITY_TYPE_RESPONSE_ERR | CLARITY_TYPE_OPTIONAL_SOME => {
            scan_value(reader, depth + 1)?;
        }
        CLARITY_TYPE_LIST => {
            let count = reader.read_u32_be().map_err(|_| {
                TransactionError::Truncated("reading clarity list length".to_string())
            })?;
            for _ in 0..count {
                scan_value(reader, depth + 1)?;
            }
        }
        CLARITY_TYPE_TUPLE => {
            let count = reader.read_u32_be().map_err(|_| {
                TransactionError::Truncated("reading clarity tuple length".to_string())
            })?;
            for _ in 0..count {
                read_prefixed_name(reader, "tuple key")?;
                scan_value(reader, depth + 1)?;
            }
        }
        tag => {
            return Err(TransactionError::UnknownVariant {
                kind: "clarity value",
                tag,
                offset,
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Memo
// ---------------------------------------------------------------------------

/// A fixed-width token transfer memo.
///
/// Always 34 bytes on the wire; shorter text is zero-padded.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Memo(pub [u8; MEMO_LEN]);

impl Memo {
    /// The empty (all-zero) memo.
    pub fn empty() -> Self {
        Memo([0u8; MEMO_LEN])
    }

    /// Build a memo from text, zero-padded to 34 bytes.
    ///
    /// # Arguments
    /// * `s` - The memo text, at most 34 bytes.
    ///
    /// # Returns
    /// `Ok(Memo)` on success, or an error when the text is too long.
    pub fn from_string(s: &str) -> Result<Self, TransactionError> {
        let bytes = s.as_bytes();
        if bytes.len() > MEMO_LEN {
            return Err(TransactionError::InvalidTransaction(format!(
                "memo must be at most {} bytes, got {}",
                MEMO_LEN,
                bytes.len()
            )));
        }
        let mut out = [0u8; MEMO_LEN];
        out[..bytes.len()].copy_from_slice(bytes);
        Ok(Memo(out))
    }

    /// Access the raw memo bytes.
    pub fn as_bytes(&self) -> &[u8; MEMO_LEN] {
        &self.0
    }

    /// The memo text with trailing zero padding removed.
    pub fn to_string_lossy(&self) -> String {
        let end = self
            .0
            .iter()
            .rposition(|&b| b != 0)
            .map(|i| i + 1)
            .unwrap_or(0);
        String::from_utf8_lossy(&self.0[..end]).into_owned()
    }
}

impl fmt::Debug for Memo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Memo({:?})", self.to_string_lossy())
    }
}
