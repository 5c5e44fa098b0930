//! c32 encoding and decoding with checksum support.
//!
//! Provides raw c32 encode/decode (a Crockford-style base-32 alphabet
//! restricted to unambiguous characters) and c32check encode/decode
//! (with a double-SHA-256 checksum) used for Stacks addresses.

use crate::hash::sha256d;
use crate::PrimitivesError;

/// The c32 alphabet.
///
/// Excludes O, L, I and U to reduce visual ambiguity. The decoder maps
/// the O, L, and I homoglyphs back to 0 and 1.
const ALPHABET: &[u8] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Look up the 5-bit value of a normalized c32 character.
fn char_value(c: u8) -> Option<u8> {
    ALPHABET.iter().position(|&a| a == c).map(|i| i as u8)
}

/// Normalize a single address character: uppercase, then map the
/// O, L, and I homoglyphs to 0 and 1.
fn normalize_char(c: u8) -> u8 {
    let upper = c.to_ascii_uppercase();
    match upper {
        b'O' => b'0',
        b'L' | b'I' => b'1',
        other => other,
    }
}

/// Encode a byte slice to a c32 string.
///
/// Leading zero bytes are encoded as leading '0' characters.
///
/// # Arguments
/// * `data` - The bytes to encode.
///
/// # Returns
/// A c32-encoded string.
pub fn encode(data: &[u8]) -> String {
    // Base 32 is a power of two, so the digits can be produced by
    // walking the input in 5-bit groups from the least significant end.
    let mut result: Vec<u8> = Vec::with_capacity(data.len() * 2);
    let mut carry: u8 = 0;
    let mut carry_bits: u8 = 0;

    for current in data.iter().rev() {
        let low_bits_to_take = 5 - carry_bits;
        let low_bits = current & ((1 << low_bits_to_take) - 1);
        let c32_value = (low_bits << carry_bits) | carry;
        result.push(ALPHABET[c32_value as usize]);
        carry_bits = (8 + carry_bits) - 5;
        carry = current >> (8 - carry_bits);

        if carry_bits >= 5 {
            let c32_value = carry & 0x1f;
            result.push(ALPHABET[c32_value as usize]);
            carry_bits -= 5;
            carry >>= 5;
        }
    }
    if carry_bits > 0 {
        result.push(ALPHABET[carry as usize]);
    }

    // Strip the high-order zero digits the grouping produced.
    while let Some(v) = result.pop() {
        if v != ALPHABET[0] {
            result.push(v);
            break;
        }
    }

    // Re-add one '0' digit per leading zero byte of the input.
    for current in data.iter() {
        if *current == 0 {
            result.push(ALPHABET[0]);
        } else {
            break;
        }
    }

    result.reverse();
    String::from_utf8(result).unwrap_or_default()
}

/// Decode a c32 string to a byte vector.
///
/// Lowercase input is accepted, and the O, L, and I homoglyphs are
/// normalized to 0 and 1. Leading '0' characters decode to leading
/// zero bytes.
///
/// # Arguments
/// * `s` - The c32 string to decode.
///
/// # Returns
/// `Ok(Vec<u8>)` on success, or an error for invalid characters.
pub fn decode(s: &str) -> Result<Vec<u8>, PrimitivesError> {
    if !s.is_ascii() {
        return Err(PrimitivesError::InvalidC32(
            "string contains non-ASCII characters".to_string(),
        ));
    }

    let normalized: Vec<u8> = s.bytes().map(normalize_char).collect();

    let mut result: Vec<u8> = Vec::with_capacity(s.len());
    let mut carry: u16 = 0;
    let mut carry_bits: u8 = 0;

    for &c in normalized.iter().rev() {
        let value = char_value(c).ok_or_else(|| {
            PrimitivesError::InvalidC32(format!("invalid character '{}'", c as char))
        })? as u16;
        carry |= value << carry_bits;
        carry_bits += 5;

        while carry_bits >= 8 {
            result.push((carry & 0xff) as u8);
            carry_bits -= 8;
            carry >>= 8;
        }
    }
    if carry_bits > 0 && carry != 0 {
        result.push(carry as u8);
    }

    // Strip high-order zero bytes, then re-add one zero byte per
    // leading '0' digit of the input.
    while let Some(v) = result.pop() {
        if v != 0 {
            result.push(v);
            break;
        }
    }
    for &c in normalized.iter() {
        if c == ALPHABET[0] {
            result.push(0);
        } else {
            break;
        }
    }

    result.reverse();
    Ok(result)
}

/// Encode a version byte and payload with a 4-byte checksum appended
/// (c32check).
///
/// The checksum is the first 4 bytes of SHA-256d(version || data). The
/// result is the version character followed by `encode(data || checksum)`.
/// Note the version is hashed into the checksum but is represented by
/// its own leading character rather than being c32-encoded with the
/// payload.
///
/// # Arguments
/// * `version` - The version byte (must be below 32).
/// * `data` - The payload bytes.
///
/// # Returns
/// A c32check-encoded string, or an error if the version is out of range.
pub fn check_encode(version: u8, data: &[u8]) -> Result<String, PrimitivesError> {
    if version >= 32 {
        return Err(PrimitivesError::InvalidC32(format!(
            "version {} out of range (must be below 32)",
            version
        )));
    }

    let mut check_data = Vec::with_capacity(1 + data.len());
    check_data.push(version);
    check_data.extend_from_slice(data);
    let checksum = sha256d(&check_data);

    let mut payload = data.to_vec();
    payload.extend_from_slice(&checksum[..4]);

    let mut out = String::with_capacity(1 + payload.len() * 2);
    out.push(ALPHABET[version as usize] as char);
    out.push_str(&encode(&payload));
    Ok(out)
}

/// Decode a c32check string, verifying the 4-byte checksum.
///
/// # Arguments
/// * `s` - The c32check string (version character followed by payload).
///
/// # Returns
/// `Ok((version, payload))` on success, or an error for invalid
/// encoding or checksum mismatch.
pub fn check_decode(s: &str) -> Result<(u8, Vec<u8>), PrimitivesError> {
    if s.len() < 2 {
        return Err(PrimitivesError::InvalidC32(
            "string too short for version and checksum".to_string(),
        ));
    }
    if !s.is_ascii() {
        return Err(PrimitivesError::InvalidC32(
            "string contains non-ASCII characters".to_string(),
        ));
    }

    let version_char = normalize_char(s.as_bytes()[0]);
    let version = char_value(version_char).ok_or_else(|| {
        PrimitivesError::InvalidC32(format!(
            "invalid version character '{}'",
            version_char as char
        ))
    })?;

    let decoded = decode(&s[1..])?;
    if decoded.len() < 4 {
        return Err(PrimitivesError::InvalidC32(
            "data too short for checksum".to_string(),
        ));
    }
    let (payload, checksum) = decoded.split_at(decoded.len() - 4);

    let mut check_data = Vec::with_capacity(1 + payload.len());
    check_data.push(version);
    check_data.extend_from_slice(payload);
    let expected = sha256d(&check_data);
    if expected[..4] != *checksum {
        return Err(PrimitivesError::ChecksumMismatch);
    }

    Ok((version, payload.to_vec()))
}

/// Encode a Stacks address: the 'S' prefix, a version character, and the
/// c32check encoding of a 20-byte Hash160.
///
/// # Arguments
/// * `version` - The address version byte (must be below 32).
/// * `hash` - The 20-byte Hash160 of the signer.
///
/// # Returns
/// A Stacks address string, or an error if the version is out of range.
pub fn address_encode(version: u8, hash: &[u8; 20]) -> Result<String, PrimitivesError> {
    Ok(format!("S{}", check_encode(version, hash)?))
}

/// Decode a Stacks address string into its version byte and 20-byte hash.
///
/// # Arguments
/// * `s` - The address string, starting with 'S'.
///
/// # Returns
/// `Ok((version, hash))` on success, or an error for a bad prefix,
/// invalid encoding, wrong payload length, or checksum mismatch.
pub fn address_decode(s: &str) -> Result<(u8, [u8; 20]), PrimitivesError> {
    let rest = s.strip_prefix('S').ok_or_else(|| {
        PrimitivesError::InvalidC32("address must start with 'S'".to_string())
    })?;
    let (version, payload) = check_decode(rest)?;
    if payload.len() != 20 {
        return Err(PrimitivesError::InvalidC32(format!(
            "address payload must be 20 bytes, got {}",
            payload.len()
        )));
    }
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&payload);
    Ok((version, hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let cases: Vec<Vec<u8>> = vec![
            vec![],
            vec![0],
            vec![0, 0, 0],
            vec![1],
            vec![0, 1],
            vec![0xff],
            vec![0xde, 0xad, 0xbe, 0xef],
            vec![0; 20],
            (0u8..20).collect(),
        ];
        for data in cases {
            let encoded = encode(&data);
            let decoded = decode(&encoded).unwrap();
            assert_eq!(decoded, data, "roundtrip failed for {:?}", data);
        }
    }

    #[test]
    fn test_leading_zero_bytes() {
        assert_eq!(encode(&[0]), "0");
        assert_eq!(encode(&[0, 0]), "00");
        assert_eq!(decode("0").unwrap(), vec![0]);
        assert_eq!(decode("00").unwrap(), vec![0, 0]);
    }

    #[test]
    fn test_decode_normalizes_homoglyphs() {
        // O reads as 0; L and I read as 1. Lowercase is accepted.
        let canonical = decode("A1B20").unwrap();
        assert_eq!(decode("AlB2O").unwrap(), canonical);
        assert_eq!(decode("aIb2o").unwrap(), canonical);
    }

    #[test]
    fn test_decode_rejects_invalid_characters() {
        assert!(decode("U").is_err());
        assert!(decode("A*B").is_err());
        assert!(decode("ABCé").is_err());
    }

    #[test]
    fn test_check_roundtrip() {
        let data = [0x6fu8; 20];
        for version in [0u8, 1, 20, 21, 22, 26, 31] {
            let encoded = check_encode(version, &data).unwrap();
            let (v, payload) = check_decode(&encoded).unwrap();
            assert_eq!(v, version);
            assert_eq!(payload, data.to_vec());
        }
    }

    #[test]
    fn test_check_detects_corruption() {
        let encoded = check_encode(22, &[0x6fu8; 20]).unwrap();
        // Flip one payload character to another alphabet member.
        let mut corrupted: Vec<char> = encoded.chars().collect();
        let idx = 5;
        corrupted[idx] = if corrupted[idx] == 'A' { 'B' } else { 'A' };
        let corrupted: String = corrupted.into_iter().collect();
        assert!(check_decode(&corrupted).is_err());
    }

    #[test]
    fn test_check_encode_rejects_large_version() {
        assert!(check_encode(32, &[0u8; 20]).is_err());
    }

    #[test]
    fn test_address_roundtrip_known_string() {
        // A well-formed mainnet single-sig address string survives a
        // decode/encode cycle byte for byte.
        let addr = "SP3FGQ8Z7JY9BWYZ5WM53E0M9NK7WHJF0691NZ159";
        let (version, hash) = address_decode(addr).unwrap();
        assert_eq!(version, 22);
        assert_eq!(address_encode(version, &hash).unwrap(), addr);
    }

    #[test]
    fn test_address_rejects_bad_prefix() {
        assert!(address_decode("P3FGQ8Z7JY9BWYZ5WM53E0M9NK7WHJF0691NZ159").is_err());
    }

    #[test]
    fn test_address_rejects_truncation() {
        assert!(address_decode("SP3FGQ8Z7JY9BWYZ5WM53E0M9NK7WHJF0691NZ15").is_err());
    }
}
