//! Stacks addresses
//!
//! Addresses are c32check strings: `S` + version character + c32 encoding of
//! `hash160 || checksum`, where the checksum is the first 4 bytes of
//! `sha256d(version || hash160)`.

use bitcoin::hashes::{hash160, sha256d, Hash};
use secp256k1::PublicKey;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const C32_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("address is too short: {0}")]
    TooShort(String),

    #[error("address must start with 'S': {0}")]
    MissingPrefix(String),

    #[error("invalid c32 character '{0}'")]
    InvalidCharacter(char),

    #[error("invalid version {0}")]
    InvalidVersion(u8),

    #[error("checksum mismatch for {0}")]
    BadChecksum(String),

    #[error("expected a 20 byte hash, got {0} bytes")]
    BadLength(usize),
}

/// A standard (single-sig) principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StacksAddress {
    pub version: u8,
    pub hash160: [u8; 20],
}

impl StacksAddress {
    pub fn new(version: u8, hash160: [u8; 20]) -> Self {
        Self { version, hash160 }
    }

    /// P2PKH address of a compressed public key
    pub fn from_public_key(version: u8, public_key: &PublicKey) -> Self {
        Self::new(version, hash160_of(&public_key.serialize()))
    }
}

impl fmt::Display for StacksAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", c32check_encode(self.version, &self.hash160))
    }
}

impl FromStr for StacksAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() < 3 {
            return Err(AddressError::TooShort(s.to_string()));
        }
        let rest = s
            .strip_prefix('S')
            .ok_or_else(|| AddressError::MissingPrefix(s.to_string()))?;
        let (version, data) = c32check_decode(rest)?;
        let hash160: [u8; 20] = data
            .as_slice()
            .try_into()
            .map_err(|_| AddressError::BadLength(data.len()))?;
        Ok(Self::new(version, hash160))
    }
}

/// RIPEMD160(SHA256(data))
pub fn hash160_of(data: &[u8]) -> [u8; 20] {
    hash160::Hash::hash(data).to_byte_array()
}

fn checksum(version: u8, data: &[u8]) -> [u8; 4] {
    let mut buf = Vec::with_capacity(data.len() + 1);
    buf.push(version);
    buf.extend_from_slice(data);
    let digest = sha256d::Hash::hash(&buf).to_byte_array();
    [digest[0], digest[1], digest[2], digest[3]]
}

/// Encode bytes as c32, keeping one `0` per leading zero byte
pub fn c32_encode(input: &[u8]) -> String {
    let mut result: Vec<u8> = Vec::with_capacity(input.len() * 8 / 5 + 1);
    let mut carry: u16 = 0;
    let mut carry_bits: u32 = 0;

    for byte in input.iter().rev() {
        carry |= (*byte as u16) << carry_bits;
        carry_bits += 8;
        while carry_bits >= 5 {
            result.push(C32_ALPHABET[(carry & 0x1f) as usize]);
            carry >>= 5;
            carry_bits -= 5;
        }
    }
    if carry_bits > 0 {
        result.push(C32_ALPHABET[(carry & 0x1f) as usize]);
    }

    while result.last() == Some(&C32_ALPHABET[0]) {
        result.pop();
    }
    for byte in input {
        if *byte != 0 {
            break;
        }
        result.push(C32_ALPHABET[0]);
    }

    result.reverse();
    result.into_iter().map(char::from).collect()
}

fn c32_value(c: char) -> Result<u8, AddressError> {
    let normalized = match c.to_ascii_uppercase() {
        'O' => '0',
        'L' | 'I' => '1',
        other => other,
    };
    C32_ALPHABET
        .iter()
        .position(|a| *a as char == normalized)
        .map(|p| p as u8)
        .ok_or(AddressError::InvalidCharacter(c))
}

/// Decode a c32 string, keeping one zero byte per leading `0`
pub fn c32_decode(input: &str) -> Result<Vec<u8>, AddressError> {
    let digits = input
        .chars()
        .map(c32_value)
        .collect::<Result<Vec<u8>, _>>()?;

    let mut result: Vec<u8> = Vec::with_capacity(digits.len() * 5 / 8 + 1);
    let mut carry: u16 = 0;
    let mut carry_bits: u32 = 0;
    for digit in digits.iter().rev() {
        carry |= (*digit as u16) << carry_bits;
        carry_bits += 5;
        if carry_bits >= 8 {
            result.push((carry & 0xff) as u8);
            carry >>= 8;
            carry_bits -= 8;
        }
    }
    if carry_bits > 0 && carry != 0 {
        result.push(carry as u8);
    }

    while result.last() == Some(&0) {
        result.pop();
    }
    for digit in &digits {
        if *digit != 0 {
            break;
        }
        result.push(0);
    }

    result.reverse();
    Ok(result)
}

/// Version character followed by c32(data || checksum)
pub fn c32check_encode(version: u8, data: &[u8]) -> String {
    let mut payload = data.to_vec();
    payload.extend_from_slice(&checksum(version, data));
    format!(
        "{}{}",
        C32_ALPHABET[(version & 0x1f) as usize] as char,
        c32_encode(&payload)
    )
}

pub fn c32check_decode(input: &str) -> Result<(u8, Vec<u8>), AddressError> {
    let mut chars = input.chars();
    let version_char = chars
        .next()
        .ok_or_else(|| AddressError::TooShort(input.to_string()))?;
    let version = c32_value(version_char)?;
    let payload = c32_decode(chars.as_str())?;
    if payload.len() < 4 {
        return Err(AddressError::TooShort(input.to_string()));
    }
    let (data, expected) = payload.split_at(payload.len() - 4);
    if checksum(version, data) != expected {
        return Err(AddressError::BadChecksum(input.to_string()));
    }
    Ok((version, data.to_vec()))
}

/// Shortened form for display: `ST1PQ...PGZGM`
pub fn format_stx_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 12 {
        return address.to_string();
    }
    let head: String = chars[..5].iter().collect();
    let tail: String = chars[chars.len() - 5..].iter().collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEPLOYER: &str = "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM";

    #[test]
    fn test_decode_known_testnet_address() {
        let address: StacksAddress = DEPLOYER.parse().unwrap();
        assert_eq!(address.version, 26);
        assert_eq!(address.to_string(), DEPLOYER);
    }

    #[test]
    fn test_corrupted_address_fails_checksum() {
        let mut corrupted = DEPLOYER.to_string();
        corrupted.replace_range(10..11, "A");
        assert!(matches!(
            corrupted.parse::<StacksAddress>(),
            Err(AddressError::BadChecksum(_))
        ));
    }

    #[test]
    fn test_rejects_non_stacks_prefix() {
        assert!(matches!(
            "XT1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM".parse::<StacksAddress>(),
            Err(AddressError::MissingPrefix(_))
        ));
    }

    #[test]
    fn test_leading_zero_bytes_are_preserved() {
        let encoded = c32_encode(&[0, 0, 1]);
        assert_eq!(encoded, "001");
        assert_eq!(c32_decode(&encoded).unwrap(), vec![0, 0, 1]);
    }

    #[test]
    fn test_mainnet_version_prefix() {
        let address = StacksAddress::new(22, [7u8; 20]);
        assert!(address.to_string().starts_with("SP"));
    }

    #[test]
    fn test_format_stx_address() {
        assert_eq!(format_stx_address(DEPLOYER), "ST1PQ...PGZGM");
        assert_eq!(format_stx_address("ST123"), "ST123");
    }
}
