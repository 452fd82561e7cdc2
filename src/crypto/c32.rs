//! c32check address encoding
//!
//! Stacks addresses are Crockford base-32 strings with a version character
//! and a four-byte double SHA-256 checksum:
//!
//! ```text
//! 'S' || c32(version) || c32(payload || checksum(version || payload))
//! ```
//!
//! Also converts between legacy base58check addresses and c32 addresses,
//! since multisig addresses are usually first derived as BTC P2SH addresses.

use super::hash::{checksum, double_sha256};
use thiserror::Error;

/// Crockford base-32 alphabet used by c32
pub const C32_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Errors that can occur while encoding or decoding c32 strings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum C32Error {
    #[error("Invalid c32 character: {0:?}")]
    InvalidCharacter(char),
    #[error("Invalid version {0}: must be below 32")]
    InvalidVersion(u8),
    #[error("Invalid checksum")]
    InvalidChecksum,
    #[error("Input too short")]
    TooShort,
    #[error("Address must start with 'S'")]
    MissingPrefix,
    #[error("Invalid payload length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("Invalid base58 address: {0}")]
    InvalidBase58(String),
}

/// Legacy base58 versions and their c32 counterparts
const B58_C32_VERSIONS: [(u8, u8); 4] = [
    (0, 22),   // mainnet p2pkh -> mainnet single-sig
    (5, 20),   // mainnet p2sh -> mainnet multisig
    (111, 26), // testnet p2pkh -> testnet single-sig
    (196, 21), // testnet p2sh -> testnet multisig
];

fn c32_value(ch: char) -> Result<u8, C32Error> {
    let normalized = match ch.to_ascii_uppercase() {
        'O' => '0',
        'L' | 'I' => '1',
        other => other,
    };
    C32_ALPHABET
        .iter()
        .position(|&c| c as char == normalized)
        .map(|p| p as u8)
        .ok_or(C32Error::InvalidCharacter(ch))
}

/// Encode bytes as c32, keeping one '0' per leading zero byte
pub fn c32_encode(data: &[u8]) -> String {
    let mut digits: Vec<u8> = Vec::with_capacity(data.len() * 8 / 5 + 1);
    let mut acc: u16 = 0;
    let mut bits = 0;

    for &byte in data.iter().rev() {
        acc |= (byte as u16) << bits;
        bits += 8;
        while bits >= 5 {
            digits.push(C32_ALPHABET[(acc & 0x1f) as usize]);
            acc >>= 5;
            bits -= 5;
        }
    }
    if bits > 0 {
        digits.push(C32_ALPHABET[(acc & 0x1f) as usize]);
    }

    // Digits are least significant first here
    while digits.last() == Some(&C32_ALPHABET[0]) {
        digits.pop();
    }
    for _ in data.iter().take_while(|&&b| b == 0) {
        digits.push(C32_ALPHABET[0]);
    }

    digits.reverse();
    digits.into_iter().map(char::from).collect()
}

/// Decode a c32 string into bytes
///
/// Accepts lowercase input and the Crockford substitutions `O`, `I`, `L`.
pub fn c32_decode(input: &str) -> Result<Vec<u8>, C32Error> {
    let values = input.chars().map(c32_value).collect::<Result<Vec<u8>, _>>()?;

    let mut bytes = Vec::with_capacity(values.len() * 5 / 8 + 1);
    let mut acc: u16 = 0;
    let mut bits = 0;

    for &value in values.iter().rev() {
        acc |= (value as u16) << bits;
        bits += 5;
        if bits >= 8 {
            bytes.push((acc & 0xff) as u8);
            acc >>= 8;
            bits -= 8;
        }
    }
    if bits > 0 {
        bytes.push(acc as u8);
    }

    while bytes.last() == Some(&0) {
        bytes.pop();
    }
    for _ in values.iter().take_while(|&&v| v == 0) {
        bytes.push(0);
    }

    bytes.reverse();
    Ok(bytes)
}

/// Encode `data` with a version character and checksum
pub fn c32check_encode(version: u8, data: &[u8]) -> Result<String, C32Error> {
    if version >= 32 {
        return Err(C32Error::InvalidVersion(version));
    }

    let mut check_data = Vec::with_capacity(data.len() + 1);
    check_data.push(version);
    check_data.extend_from_slice(data);

    let mut payload = data.to_vec();
    payload.extend_from_slice(&checksum(&check_data));

    Ok(format!(
        "{}{}",
        C32_ALPHABET[version as usize] as char,
        c32_encode(&payload)
    ))
}

/// Decode a c32check string into its version and payload
pub fn c32check_decode(input: &str) -> Result<(u8, Vec<u8>), C32Error> {
    let mut chars = input.chars();
    let version_char = chars.next().ok_or(C32Error::TooShort)?;
    let version = c32_value(version_char)?;

    let decoded = c32_decode(chars.as_str())?;
    if decoded.len() < 4 {
        return Err(C32Error::TooShort);
    }
    let (data, expected) = decoded.split_at(decoded.len() - 4);

    let mut check_data = Vec::with_capacity(data.len() + 1);
    check_data.push(version);
    check_data.extend_from_slice(data);

    if checksum(&check_data)[..] != *expected {
        return Err(C32Error::InvalidChecksum);
    }

    Ok((version, data.to_vec()))
}

/// Build a Stacks address from a version and hash160
pub fn c32_address(version: u8, hash160: &[u8; 20]) -> Result<String, C32Error> {
    Ok(format!("S{}", c32check_encode(version, hash160)?))
}

/// Decode a Stacks address into its version and hash160
pub fn c32_address_decode(address: &str) -> Result<(u8, [u8; 20]), C32Error> {
    if address.len() <= 5 {
        return Err(C32Error::TooShort);
    }
    let rest = address.strip_prefix('S').ok_or(C32Error::MissingPrefix)?;
    let (version, data) = c32check_decode(rest)?;

    let hash160: [u8; 20] = data
        .as_slice()
        .try_into()
        .map_err(|_| C32Error::InvalidLength {
            expected: 20,
            actual: data.len(),
        })?;

    Ok((version, hash160))
}

/// Convert a base58check address (e.g. a BTC P2SH `3...`) to a c32 address
pub fn b58_to_c32(address: &str) -> Result<String, C32Error> {
    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|e| C32Error::InvalidBase58(e.to_string()))?;
    if bytes.len() != 25 {
        return Err(C32Error::InvalidLength {
            expected: 25,
            actual: bytes.len(),
        });
    }

    let (body, expected) = bytes.split_at(21);
    if double_sha256(body)[..4] != *expected {
        return Err(C32Error::InvalidChecksum);
    }

    let b58_version = body[0];
    let version = B58_C32_VERSIONS
        .iter()
        .find(|(b58, _)| *b58 == b58_version)
        .map(|(_, c32)| *c32)
        .unwrap_or(b58_version);

    let mut hash160 = [0u8; 20];
    hash160.copy_from_slice(&body[1..]);
    c32_address(version, &hash160)
}

/// Convert a c32 address to its base58check form
pub fn c32_to_b58(address: &str) -> Result<String, C32Error> {
    let (version, hash160) = c32_address_decode(address)?;
    let b58_version = B58_C32_VERSIONS
        .iter()
        .find(|(_, c32)| *c32 == version)
        .map(|(b58, _)| *b58)
        .unwrap_or(version);

    let mut body = vec![b58_version];
    body.extend_from_slice(&hash160);
    let check = checksum(&body);
    body.extend_from_slice(&check);

    Ok(bs58::encode(body).into_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MULTISIG_HASH: &str = "b01162ecda72c57ed419f7966ec4e8dd7987c704";

    fn multisig_hash() -> [u8; 20] {
        hex::decode(MULTISIG_HASH).unwrap().try_into().unwrap()
    }

    #[test]
    fn test_zero_hash_address() {
        assert_eq!(
            c32_address(22, &[0u8; 20]).unwrap(),
            "SP000000000000000000002Q6VF78"
        );
    }

    #[test]
    fn test_multisig_address() {
        assert_eq!(
            c32_address(20, &multisig_hash()).unwrap(),
            "SM2R12RQCV9SCAZPM37VSCVP4X3EQK1Y70KCV7EDE"
        );
        assert_eq!(
            c32_address(21, &multisig_hash()).unwrap(),
            "SN2R12RQCV9SCAZPM37VSCVP4X3EQK1Y70GY6BDZW"
        );
    }

    #[test]
    fn test_address_decode() {
        let (version, hash) =
            c32_address_decode("SM2R12RQCV9SCAZPM37VSCVP4X3EQK1Y70KCV7EDE").unwrap();
        assert_eq!(version, 20);
        assert_eq!(hash, multisig_hash());

        let (version, hash) = c32_address_decode("ST2ZRX0K27GW0SP3GJCEMHD95TQGJMKB7G9Y0X1MH").unwrap();
        assert_eq!(version, 26);
        assert_eq!(
            hex::encode(hash),
            "bf8e82623c380cd870931d48b525d5e12a4d6782"
        );
    }

    #[test]
    fn test_decode_normalizes_input() {
        assert_eq!(c32_decode("2r12").unwrap(), c32_decode("2R12").unwrap());
        assert_eq!(c32_decode("O1").unwrap(), c32_decode("01").unwrap());
        assert_eq!(c32_decode("L").unwrap(), c32_decode("1").unwrap());
        assert_eq!(c32_decode("i").unwrap(), c32_decode("1").unwrap());
    }

    #[test]
    fn test_leading_zeros_preserved() {
        let data = [0u8, 0, 1, 2];
        let encoded = c32_encode(&data);
        assert!(encoded.starts_with("00"));
        assert_eq!(c32_decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_bad_checksum_rejected() {
        let result = c32_address_decode("SM2R12RQCV9SCAZPM37VSCVP4X3EQK1Y70KCV7EDF");
        assert_eq!(result, Err(C32Error::InvalidChecksum));
    }

    #[test]
    fn test_invalid_inputs() {
        assert_eq!(
            c32_address_decode("XM2R12RQCV9SCAZPM37VSCVP4X3EQK1Y70KCV7EDE"),
            Err(C32Error::MissingPrefix)
        );
        assert_eq!(c32_address_decode("SM2"), Err(C32Error::TooShort));
        assert_eq!(c32_decode("U"), Err(C32Error::InvalidCharacter('U')));
        assert_eq!(
            c32check_encode(32, &[1, 2, 3]),
            Err(C32Error::InvalidVersion(32))
        );
    }

    #[test]
    fn test_b58_conversion() {
        assert_eq!(
            b58_to_c32("3HjygLSaPnmV5KZoptFNpQgmm6adRDUoHd").unwrap(),
            "SM2R12RQCV9SCAZPM37VSCVP4X3EQK1Y70KCV7EDE"
        );
        assert_eq!(
            c32_to_b58("SM2R12RQCV9SCAZPM37VSCVP4X3EQK1Y70KCV7EDE").unwrap(),
            "3HjygLSaPnmV5KZoptFNpQgmm6adRDUoHd"
        );
        assert_eq!(
            b58_to_c32("1111111111111111111114oLvT2").unwrap(),
            "SP000000000000000000002Q6VF78"
        );
    }
}
