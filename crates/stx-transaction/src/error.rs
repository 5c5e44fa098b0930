/// Error types for transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// The input ended before a complete structure could be decoded.
    #[error("truncated input: {0}")]
    Truncated(String),
    /// An enum tag byte on the wire had no defined meaning.
    #[error("unknown {kind} tag 0x{tag:02x} at byte offset {offset}")]
    UnknownVariant {
        /// The kind of field being decoded (hash mode, payload id, and so on).
        kind: &'static str,
        /// The offending tag byte.
        tag: u8,
        /// The byte offset of the tag within the input.
        offset: usize,
    },
    /// A transfer or post-condition amount is outside the allowed range.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    /// An uncompressed public key was used with a segwit hash mode.
    #[error("uncompressed public keys are not allowed in segwit hash modes")]
    UncompressedKeyNotAllowed,
    /// The derived signer hash does not match the target address.
    #[error("address mismatch: {0}")]
    AddressMismatch(String),
    /// A sponsor operation was attempted on a standard authorization.
    #[error("transaction is not sponsored")]
    NotSponsored,
    /// A multisig-only operation was attempted on a single-sig condition.
    #[error("spending condition is not multisig")]
    NotMultiSig,
    /// Signature verification failed.
    #[error("signature verification failed: {0}")]
    SignatureVerification(String),
    /// A Clarity or contract name failed validation.
    #[error("invalid name: {0}")]
    InvalidName(String),
    /// The transaction structure is invalid.
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),
    /// An error occurred while building or signing.
    #[error("signing error: {0}")]
    SigningError(String),
    /// An error occurred during binary/hex serialization or deserialization.
    #[error("serialization error: {0}")]
    SerializationError(String),
    /// A contract call does not match the contract's declared interface.
    #[error("abi mismatch: {0}")]
    AbiMismatch(String),
    /// An underlying primitives error (forwarded from `stx-primitives`).
    #[error("primitives error: {0}")]
    Primitives(#[from] stx_primitives::PrimitivesError),
}
