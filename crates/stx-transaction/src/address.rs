//! Stacks addresses and signer hash derivation.
//!
//! An address is a version byte plus the 20-byte Hash160 of the signer:
//! either a single public key or a multisig redeem script. Addresses
//! display as c32check strings with an 'S' prefix.

use std::fmt;

use stx_primitives::c32;
use stx_primitives::ec::PublicKey;
use stx_primitives::hash::{hash160, sha256};

use crate::TransactionError;

/// Mainnet single-sig address version (displays as 'P').
pub const C32_ADDRESS_VERSION_MAINNET_SINGLESIG: u8 = 22;
/// Mainnet multisig address version (displays as 'M').
pub const C32_ADDRESS_VERSION_MAINNET_MULTISIG: u8 = 20;
/// Testnet single-sig address version (displays as 'T').
pub const C32_ADDRESS_VERSION_TESTNET_SINGLESIG: u8 = 26;
/// Testnet multisig address version (displays as 'N').
pub const C32_ADDRESS_VERSION_TESTNET_MULTISIG: u8 = 21;

/// Maximum committee size for a multisig redeem script.
///
/// The script encodes the counts with the one-byte OP_1 through OP_16
/// opcodes, so both the threshold and the key count are capped at 16.
pub const MAX_MULTISIG_KEYS: usize = 16;

/// How the signer bytes of an address were derived.
///
/// Determines whether the Hash160 covers a single public key, a multisig
/// redeem script, or the segwit-nested form of either.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressHashMode {
    /// Hash160 of a single public key as encoded.
    SerializeP2PKH,
    /// Hash160 of an m-of-n redeem script.
    SerializeP2SH,
    /// Hash160 of a segwit v0 program wrapping a single compressed key.
    SerializeP2WPKH,
    /// Hash160 of a segwit v0 program wrapping the SHA-256 of a redeem script.
    SerializeP2WSH,
}

impl AddressHashMode {
    /// Whether this mode requires compressed public keys.
    pub fn is_segwit(&self) -> bool {
        matches!(
            self,
            AddressHashMode::SerializeP2WPKH | AddressHashMode::SerializeP2WSH
        )
    }

    /// Whether this mode hashes a multisig redeem script.
    pub fn is_multisig(&self) -> bool {
        matches!(
            self,
            AddressHashMode::SerializeP2SH | AddressHashMode::SerializeP2WSH
        )
    }

    /// The address version byte for this mode on the given network.
    ///
    /// # Arguments
    /// * `mainnet` - Whether the address is for mainnet.
    ///
    /// # Returns
    /// The single-sig or multisig c32 version byte.
    pub fn to_address_version(&self, mainnet: bool) -> u8 {
        match (self.is_multisig(), mainnet) {
            (false, true) => C32_ADDRESS_VERSION_MAINNET_SINGLESIG,
            (false, false) => C32_ADDRESS_VERSION_TESTNET_SINGLESIG,
            (true, true) => C32_ADDRESS_VERSION_MAINNET_MULTISIG,
            (true, false) => C32_ADDRESS_VERSION_TESTNET_MULTISIG,
        }
    }
}

/// A Stacks address: a c32 version byte and a 20-byte signer hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StacksAddress {
    /// The c32 address version byte.
    pub version: u8,
    /// The Hash160 of the signer.
    pub hash: [u8; 20],
}

impl StacksAddress {
    /// Create an address from a version byte and signer hash.
    ///
    /// # Arguments
    /// * `version` - The c32 version byte (below 32).
    /// * `hash` - The 20-byte signer hash.
    ///
    /// # Returns
    /// A new `StacksAddress`.
    pub fn new(version: u8, hash: [u8; 20]) -> Self {
        StacksAddress { version, hash }
    }

    /// Parse an address from its c32check string form.
    ///
    /// # Arguments
    /// * `s` - An address string beginning with 'S'.
    ///
    /// # Returns
    /// `Ok(StacksAddress)` on success, or an error for bad encoding or
    /// checksum.
    pub fn from_string(s: &str) -> Result<Self, TransactionError> {
        let (version, hash) = c32::address_decode(s)?;
        Ok(StacksAddress { version, hash })
    }

    /// Derive an address from public keys.
    ///
    /// For single-key modes exactly one key must be supplied. For
    /// multisig modes the key order is significant: the same keys in a
    /// different order produce a different address.
    ///
    /// # Arguments
    /// * `version` - The c32 version byte for the resulting address.
    /// * `hash_mode` - How to hash the keys into signer bytes.
    /// * `num_sigs` - The signature threshold (m of m-of-n).
    /// * `public_keys` - The committee keys, in redeem-script order.
    ///
    /// # Returns
    /// `Ok(StacksAddress)` on success, or an error for an invalid
    /// committee shape or key encoding.
    pub fn from_public_keys(
        version: u8,
        hash_mode: AddressHashMode,
        num_sigs: usize,
        public_keys: &[PublicKey],
    ) -> Result<Self, TransactionError> {
        let hash = public_keys_to_address_hash(hash_mode, num_sigs, public_keys)?;
        Ok(StacksAddress { version, hash })
    }

    /// Render the address as its c32check string form.
    ///
    /// # Returns
    /// The address string, or an error if the version byte is out of range.
    pub fn to_string_c32(&self) -> Result<String, TransactionError> {
        Ok(c32::address_encode(self.version, &self.hash)?)
    }
}

impl fmt::Display for StacksAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match c32::address_encode(self.version, &self.hash) {
            Ok(s) => write!(f, "{}", s),
            Err(_) => write!(f, "S??{}", hex::encode(self.hash)),
        }
    }
}

/// Build the m-of-n multisig redeem script for the given keys.
///
/// Layout: `OP_m <push key>... OP_n OP_CHECKMULTISIG`, with the counts
/// encoded as the one-byte opcodes `0x50 + count`.
///
/// # Arguments
/// * `num_sigs` - The signature threshold m.
/// * `public_keys` - The committee keys in script order.
///
/// # Returns
/// The redeem script bytes, or an error for an invalid committee shape.
fn multisig_redeem_script(
    num_sigs: usize,
    public_keys: &[PublicKey],
) -> Result<Vec<u8>, TransactionError> {
    let num_keys = public_keys.len();
    if num_sigs == 0 || num_sigs > MAX_MULTISIG_KEYS {
        return Err(TransactionError::InvalidTransaction(format!(
            "signature threshold {} out of range 1..={}",
            num_sigs, MAX_MULTISIG_KEYS
        )));
    }
    if num_keys == 0 || num_keys > MAX_MULTISIG_KEYS || num_sigs > num_keys {
        return Err(TransactionError::InvalidTransaction(format!(
            "invalid committee: {} signatures over {} keys",
            num_sigs, num_keys
        )));
    }

    let mut script = Vec::with_capacity(3 + num_keys * 34);
    script.push(0x50 + num_sigs as u8);
    for key in public_keys {
        let encoded = key.encode();
        script.push(encoded.len() as u8);
        script.extend_from_slice(&encoded);
    }
    script.push(0x50 + num_keys as u8);
    script.push(0xae); // OP_CHECKMULTISIG
    Ok(script)
}

/// Hash public keys into the 20-byte signer bytes of an address.
///
/// Single-key modes take exactly one key. Segwit modes reject
/// uncompressed keys.
///
/// # Arguments
/// * `hash_mode` - How to hash the keys.
/// * `num_sigs` - The signature threshold for multisig modes.
/// * `public_keys` - The keys, in redeem-script order for multisig modes.
///
/// # Returns
/// The 20-byte signer hash, or an error for an invalid committee shape
/// or key encoding.
pub fn public_keys_to_address_hash(
    hash_mode: AddressHashMode,
    num_sigs: usize,
    public_keys: &[PublicKey],
) -> Result<[u8; 20], TransactionError> {
    if hash_mode.is_segwit() && public_keys.iter().any(|k| !k.is_compressed()) {
        return Err(TransactionError::UncompressedKeyNotAllowed);
    }

    match hash_mode {
        AddressHashMode::SerializeP2PKH => {
            let key = single_key(public_keys)?;
            Ok(key.hash160())
        }
        AddressHashMode::SerializeP2SH => {
            let script = multisig_redeem_script(num_sigs, public_keys)?;
            Ok(hash160(&script))
        }
        AddressHashMode::SerializeP2WPKH => {
            let key = single_key(public_keys)?;
            let key_hash = hash160(&key.to_compressed());
            let mut program = Vec::with_capacity(22);
            program.push(0x00);
            program.push(0x14);
            program.extend_from_slice(&key_hash);
            Ok(hash160(&program))
        }
        AddressHashMode::SerializeP2WSH => {
            let script = multisig_redeem_script(num_sigs, public_keys)?;
            let script_hash = sha256(&script);
            let mut program = Vec::with_capacity(34);
            program.push(0x00);
            program.push(0x20);
            program.extend_from_slice(&script_hash);
            Ok(hash160(&program))
        }
    }
}

fn single_key(public_keys: &[PublicKey]) -> Result<&PublicKey, TransactionError> {
    match public_keys {
        [key] => Ok(key),
        keys => Err(TransactionError::InvalidTransaction(format!(
            "single-key hash mode requires exactly one key, got {}",
            keys.len()
        ))),
    }
}

/// Find a key order that reproduces a target multisig signer hash.
///
/// Tries the supplied order first, then the keys sorted by their
/// compressed encoding. Wallets disagree on whether multisig committees
/// are hashed in supplied or sorted order, so both are attempted before
/// giving up.
///
/// # Arguments
/// * `hash_mode` - The multisig hash mode of the target.
/// * `num_sigs` - The signature threshold.
/// * `public_keys` - The committee keys in any order.
/// * `target` - The signer hash the order must reproduce.
///
/// # Returns
/// The keys in the matching order, or an `AddressMismatch` error naming
/// both attempted hashes.
pub fn reconcile_key_order(
    hash_mode: AddressHashMode,
    num_sigs: usize,
    public_keys: &[PublicKey],
    target: &[u8; 20],
) -> Result<Vec<PublicKey>, TransactionError> {
    let supplied = public_keys.to_vec();
    let supplied_hash = public_keys_to_address_hash(hash_mode, num_sigs, &supplied)?;
    if supplied_hash == *target {
        return Ok(supplied);
    }

    let mut sorted = public_keys.to_vec();
    sorted.sort_by_key(|k| k.to_compressed());
    let sorted_hash = public_keys_to_address_hash(hash_mode, num_sigs, &sorted)?;
    if sorted_hash == *target {
        return Ok(sorted);
    }

    Err(TransactionError::AddressMismatch(format!(
        "neither supplied order ({}) nor sorted order ({}) reproduces signer hash {}",
        hex::encode(supplied_hash),
        hex::encode(sorted_hash),
        hex::encode(target)
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stx_primitives::ec::PrivateKey;

    fn key(seed: u8) -> PublicKey {
        let mut scalar = [0u8; 32];
        scalar[31] = seed;
        let mut private = PrivateKey::from_bytes(&scalar).unwrap();
        private.set_compress_public(true);
        private.public_key()
    }

    #[test]
    fn test_p2pkh_hash_is_hash160_of_encoded_key() {
        let k = key(1);
        let hash =
            public_keys_to_address_hash(AddressHashMode::SerializeP2PKH, 1, &[k.clone()])
                .unwrap();
        assert_eq!(hash, hash160(&k.encode()));

        // An uncompressed rendering of the same point hashes differently.
        let mut unc = k.clone();
        unc.set_compressed(false);
        let unc_hash =
            public_keys_to_address_hash(AddressHashMode::SerializeP2PKH, 1, &[unc]).unwrap();
        assert_ne!(hash, unc_hash);
    }

    #[test]
    fn test_multisig_order_matters() {
        let keys = vec![key(1), key(2), key(3)];
        let mut reversed = keys.clone();
        reversed.reverse();

        let a = public_keys_to_address_hash(AddressHashMode::SerializeP2SH, 2, &keys).unwrap();
        let b =
            public_keys_to_address_hash(AddressHashMode::SerializeP2SH, 2, &reversed).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_redeem_script_shape() {
        let keys = vec![key(1), key(2), key(3)];
        let script = multisig_redeem_script(2, &keys).unwrap();
        assert_eq!(script[0], 0x52); // OP_2
        assert_eq!(script[1], 33); // compressed key push
        assert_eq!(script[script.len() - 2], 0x53); // OP_3
        assert_eq!(script[script.len() - 1], 0xae); // OP_CHECKMULTISIG
        assert_eq!(script.len(), 3 + 3 * 34);
    }

    #[test]
    fn test_committee_shape_limits() {
        let keys: Vec<PublicKey> = (1..=17).map(key).collect();
        assert!(multisig_redeem_script(2, &keys).is_err());
        assert!(multisig_redeem_script(0, &keys[..3]).is_err());
        assert!(multisig_redeem_script(4, &keys[..3]).is_err());
        assert!(multisig_redeem_script(2, &keys[..3]).is_ok());
    }

    #[test]
    fn test_segwit_rejects_uncompressed() {
        let mut unc = key(1);
        unc.set_compressed(false);
        assert!(matches!(
            public_keys_to_address_hash(AddressHashMode::SerializeP2WPKH, 1, &[unc.clone()]),
            Err(TransactionError::UncompressedKeyNotAllowed)
        ));
        assert!(matches!(
            public_keys_to_address_hash(
                AddressHashMode::SerializeP2WSH,
                1,
                &[key(2), unc]
            ),
            Err(TransactionError::UncompressedKeyNotAllowed)
        ));
    }

    #[test]
    fn test_reconcile_supplied_order() {
        let keys = vec![key(3), key(1), key(2)];
        let target =
            public_keys_to_address_hash(AddressHashMode::SerializeP2SH, 2, &keys).unwrap();
        let order =
            reconcile_key_order(AddressHashMode::SerializeP2SH, 2, &keys, &target).unwrap();
        assert_eq!(order, keys);
    }

    #[test]
    fn test_reconcile_sorted_order() {
        let keys = vec![key(3), key(1), key(2)];
        let mut sorted = keys.clone();
        sorted.sort_by_key(|k| k.to_compressed());
        let target =
            public_keys_to_address_hash(AddressHashMode::SerializeP2SH, 2, &sorted).unwrap();

        let order =
            reconcile_key_order(AddressHashMode::SerializeP2SH, 2, &keys, &target).unwrap();
        assert_eq!(order, sorted);
    }

    #[test]
    fn test_reconcile_mismatch_names_both_attempts() {
        let keys = vec![key(1), key(2), key(3)];
        let err = reconcile_key_order(AddressHashMode::SerializeP2SH, 2, &keys, &[0xab; 20])
            .unwrap_err();
        match err {
            TransactionError::AddressMismatch(msg) => {
                assert!(msg.contains("supplied order"));
                assert!(msg.contains("sorted order"));
                assert!(msg.contains(&hex::encode([0xab; 20])));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_address_string_roundtrip() {
        let addr = StacksAddress::new(C32_ADDRESS_VERSION_MAINNET_SINGLESIG, [0x42; 20]);
        let s = addr.to_string_c32().unwrap();
        assert!(s.starts_with("SP"));
        assert_eq!(StacksAddress::from_string(&s).unwrap(), addr);
    }

    #[test]
    fn test_version_selection() {
        assert_eq!(
            AddressHashMode::SerializeP2PKH.to_address_version(true),
            C32_ADDRESS_VERSION_MAINNET_SINGLESIG
        );
        assert_eq!(
            AddressHashMode::SerializeP2SH.to_address_version(true),
            C32_ADDRESS_VERSION_MAINNET_MULTISIG
        );
        assert_eq!(
            AddressHashMode::SerializeP2WPKH.to_address_version(false),
            C32_ADDRESS_VERSION_TESTNET_SINGLESIG
        );
        assert_eq!(
            AddressHashMode::SerializeP2WSH.to_address_version(false),
            C32_ADDRESS_VERSION_TESTNET_MULTISIG
        );
    }
}
