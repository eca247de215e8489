//! # Domain Identity Newtypes
//!
//! Newtype wrappers for every identifier the coordinator handles. These
//! prevent accidental identifier confusion: a collateral token `Address`
//! cannot be passed where a `LoanId` is expected, and an `AssetConfigId` is
//! only ever produced by hashing the three addresses it stands for.
//!
//! ## Security Invariant
//!
//! The zero address is representable (it is what an unset field looks like)
//! but is rejected by every entry point that accepts an address. Use
//! [`Address::is_zero`] at the boundary.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::HexParseError;

/// A 20-byte account or contract address.
///
/// Serialized as a lowercase `0x`-prefixed hex string.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; 20]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Address = Address([0u8; 20]);

    /// Wrap raw address bytes.
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Build an address whose low 8 bytes hold `n` (big-endian).
    ///
    /// Convenient for simulations and fixtures where addresses are just
    /// distinct labels.
    pub fn from_low_u64(n: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }

    /// Access the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Whether this is the zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("0x")?;
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = HexParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| HexParseError::MissingPrefix(s.to_string()))?;
        Ok(Self(decode_hex(hex)?))
    }
}

/// Decode exactly `N` bytes of hex (no prefix).
fn decode_hex<const N: usize>(hex: &str) -> Result<[u8; N], HexParseError> {
    if hex.len() != N * 2 {
        return Err(HexParseError::WrongLength {
            expected: N * 2,
            got: hex.len(),
        });
    }
    let mut bytes = [0u8; N];
    for (i, pair) in hex.as_bytes().chunks(2).enumerate() {
        let hi = nibble(pair[0] as char)?;
        let lo = nibble(pair[1] as char)?;
        bytes[i] = (hi << 4) | lo;
    }
    Ok(bytes)
}

fn nibble(c: char) -> Result<u8, HexParseError> {
    c.to_digit(16)
        .map(|d| d as u8)
        .ok_or(HexParseError::InvalidDigit(c))
}

impl TryFrom<String> for Address {
    type Error = HexParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.to_string()
    }
}

/// Identifier of a loan request.
///
/// Assigned by the external auction engine; the coordinator only accepts it
/// when it equals the id it predicted before opening the auction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LoanId(pub u64);

impl LoanId {
    /// Access the inner value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for LoanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "loan:{}", self.0)
    }
}

/// Composite key of an approved (collateral, price feed, settlement) triple.
///
/// SHA-256 over the three addresses concatenated in that order. Two configs
/// are the same config exactly when all three addresses match. Serialized as
/// 64 lowercase hex digits.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetConfigId([u8; 32]);

impl AssetConfigId {
    /// Derive the key for a triple.
    pub fn derive(collateral_token: &Address, price_feed: &Address, settlement_token: &Address) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(collateral_token.as_bytes());
        hasher.update(price_feed.as_bytes());
        hasher.update(settlement_token.as_bytes());
        Self(hasher.finalize().into())
    }

    /// Access the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex encoding of the digest.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl FromStr for AssetConfigId {
    type Err = HexParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(decode_hex(s)?))
    }
}

impl TryFrom<String> for AssetConfigId {
    type Error = HexParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AssetConfigId> for String {
    fn from(value: AssetConfigId) -> Self {
        value.to_hex()
    }
}

impl std::fmt::Display for AssetConfigId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "asset:{}", &self.to_hex()[..16])
    }
}

impl std::fmt::Debug for AssetConfigId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AssetConfigId({})", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_display_roundtrips_through_parse() {
        let a = Address::from_low_u64(0xdead_beef);
        let s = a.to_string();
        assert_eq!(s, "0x00000000000000000000000000000000deadbeef");
        assert_eq!(s.parse::<Address>().unwrap(), a);
    }

    #[test]
    fn address_parse_accepts_mixed_case() {
        let a: Address = "0xABCDEF0000000000000000000000000000000001".parse().unwrap();
        assert_eq!(a.as_bytes()[0], 0xab);
        assert_eq!(a.as_bytes()[19], 0x01);
    }

    #[test]
    fn address_parse_rejects_missing_prefix() {
        let err = "00000000000000000000000000000000deadbeef"
            .parse::<Address>()
            .unwrap_err();
        assert!(matches!(err, HexParseError::MissingPrefix(_)));
    }

    #[test]
    fn address_parse_rejects_wrong_length() {
        let err = "0x1234".parse::<Address>().unwrap_err();
        assert_eq!(err, HexParseError::WrongLength { expected: 40, got: 4 });
    }

    #[test]
    fn address_parse_rejects_non_hex() {
        let err = "0x000000000000000000000000000000000000000g"
            .parse::<Address>()
            .unwrap_err();
        assert_eq!(err, HexParseError::InvalidDigit('g'));
    }

    #[test]
    fn zero_address_is_zero() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address::from_low_u64(1).is_zero());
    }

    #[test]
    fn address_serializes_as_hex_string() {
        let a = Address::from_low_u64(42);
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, "\"0x000000000000000000000000000000000000002a\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn asset_config_id_depends_on_order() {
        let a = Address::from_low_u64(1);
        let b = Address::from_low_u64(2);
        let c = Address::from_low_u64(3);
        assert_eq!(AssetConfigId::derive(&a, &b, &c), AssetConfigId::derive(&a, &b, &c));
        assert_ne!(AssetConfigId::derive(&a, &b, &c), AssetConfigId::derive(&c, &b, &a));
    }

    #[test]
    fn asset_config_id_serializes_as_hex() {
        let id = AssetConfigId::derive(
            &Address::from_low_u64(1),
            &Address::from_low_u64(2),
            &Address::from_low_u64(3),
        );
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json.len(), 64 + 2);
        let back: AssetConfigId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn loan_id_display() {
        assert_eq!(LoanId(7).to_string(), "loan:7");
    }
}
