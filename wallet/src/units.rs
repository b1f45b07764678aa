/// Core value types for the wallet
///
/// Addresses and ETH amounts as they cross the boundary between user input,
/// the wallet provider and the history API.
use crate::errors::{WalletError, WalletResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

static ADDRESS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0x[a-fA-F0-9]{40}$").expect("address pattern must compile"));

static AMOUNT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)$").expect("amount pattern must compile")
});

/// An Ethereum account address
///
/// Addresses are written as `0x{40_hex_chars}`. Input in a single case is accepted as-is;
/// mixed-case input must carry a valid EIP-55 checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; 20]);

impl Address {
    /// Address length in bytes
    pub const LENGTH: usize = 20;

    /// Create an address from raw bytes
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }

    /// Parse a `0x`-prefixed hex address, enforcing the EIP-55 checksum on mixed case
    pub fn parse(address: &str) -> WalletResult<Self> {
        if address.is_empty() {
            return Err(WalletError::InvalidAddress(
                "Address cannot be empty".to_string(),
            ));
        }

        if !ADDRESS_PATTERN.is_match(address) {
            return Err(WalletError::InvalidAddress(
                "Address format is invalid".to_string(),
            ));
        }

        let hex_part = &address[2..];
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(hex_part, &mut bytes)
            .map_err(|_| WalletError::InvalidAddress("Invalid hex in address".to_string()))?;
        let parsed = Address(bytes);

        let has_lower = hex_part.bytes().any(|b| b.is_ascii_lowercase());
        let has_upper = hex_part.bytes().any(|b| b.is_ascii_uppercase());
        if has_lower && has_upper && parsed.to_checksum()[2..] != *hex_part {
            return Err(WalletError::InvalidAddress(
                "Address checksum mismatch".to_string(),
            ));
        }

        Ok(parsed)
    }

    /// Get the raw address bytes
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// EIP-55 mixed-case representation
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = Keccak256::digest(lower.as_bytes());

        let mut out = String::with_capacity(2 + lower.len());
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let byte = hash[i / 2];
            let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }

    /// Lowercase representation used on the wire
    pub fn to_lower_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Shortened form for compact displays, e.g. `0x5aAe...eAed`
    pub fn truncated(&self) -> String {
        let full = self.to_checksum();
        format!("{}...{}", &full[..6], &full[full.len() - 4..])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_checksum())
    }
}

impl FromStr for Address {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = WalletError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Address::parse(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_checksum()
    }
}

/// An amount of ETH in its smallest unit
///
/// Uses integer arithmetic throughout; 1 ETH = 10^18 wei.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Wei(u128);

impl Wei {
    /// Number of decimal places for ETH
    pub const DECIMALS: usize = 18;
    /// Wei per ETH (10^18)
    pub const PER_ETHER: u128 = 1_000_000_000_000_000_000;
    pub const ZERO: Wei = Wei(0);

    pub const fn new(wei: u128) -> Self {
        Wei(wei)
    }

    /// Create an amount from whole ETH
    pub fn from_ether(ether: u128) -> WalletResult<Self> {
        ether
            .checked_mul(Self::PER_ETHER)
            .map(Wei)
            .ok_or_else(|| WalletError::InvalidAmount("Amount overflow".to_string()))
    }

    /// Parse a non-negative ETH decimal string such as `"0.25"`
    pub fn parse_ether(amount: &str) -> WalletResult<Self> {
        let signed = SignedEther::parse(amount)?;
        if signed.overflowed {
            return Err(WalletError::InvalidAmount("Amount overflow".to_string()));
        }
        if signed.negative && !signed.magnitude.is_zero() {
            return Err(WalletError::InvalidAmount(
                "Amount cannot be negative".to_string(),
            ));
        }
        Ok(signed.magnitude)
    }

    /// Parse a JSON-RPC hex quantity such as `"0xde0b6b3a7640000"`
    pub fn from_hex_quantity(quantity: &str) -> WalletResult<Self> {
        let digits = quantity.strip_prefix("0x").ok_or_else(|| {
            WalletError::InvalidAmount(format!("Quantity '{}' is missing 0x prefix", quantity))
        })?;
        if digits.is_empty() {
            return Err(WalletError::InvalidAmount(format!(
                "Quantity '{}' has no digits",
                quantity
            )));
        }
        u128::from_str_radix(digits, 16)
            .map(Wei)
            .map_err(|_| WalletError::InvalidAmount(format!("Invalid quantity '{}'", quantity)))
    }

    /// Encode as a JSON-RPC hex quantity
    pub fn to_hex_quantity(&self) -> String {
        format!("0x{:x}", self.0)
    }

    pub fn as_u128(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Full-precision ETH string, always carrying at least one fractional digit (`"1.0"`)
    pub fn format_ether(&self) -> String {
        let whole = self.0 / Self::PER_ETHER;
        let fractional = self.0 % Self::PER_ETHER;
        let digits = format!("{:018}", fractional);
        let trimmed = digits.trim_end_matches('0');
        if trimmed.is_empty() {
            format!("{}.0", whole)
        } else {
            format!("{}.{}", whole, trimmed)
        }
    }

    pub fn checked_add(&self, other: Wei) -> Option<Wei> {
        self.0.checked_add(other.0).map(Wei)
    }

    pub fn checked_sub(&self, other: Wei) -> Option<Wei> {
        self.0.checked_sub(other.0).map(Wei)
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ETH", self.format_ether())
    }
}

impl TryFrom<String> for Wei {
    type Error = WalletError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value
            .parse::<u128>()
            .map(Wei)
            .map_err(|_| WalletError::InvalidAmount(format!("Invalid wei value '{}'", value)))
    }
}

impl From<Wei> for String {
    fn from(value: Wei) -> Self {
        value.0.to_string()
    }
}

/// A parsed ETH amount that keeps its sign, so negative input can be told apart from
/// malformed input.
///
/// Amounts too large for [`Wei`] still parse: `overflowed` is set and `magnitude`
/// saturates at `u128::MAX`, which exceeds any real balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedEther {
    pub negative: bool,
    pub magnitude: Wei,
    pub overflowed: bool,
}

impl SignedEther {
    /// Parse a decimal ETH string with up to 18 significant fractional digits
    pub fn parse(amount: &str) -> WalletResult<Self> {
        let trimmed = amount.trim();
        if trimmed.is_empty() {
            return Err(WalletError::InvalidAmount(
                "Amount cannot be empty".to_string(),
            ));
        }

        if !AMOUNT_PATTERN.is_match(trimmed) {
            return Err(WalletError::InvalidAmount(
                "Amount format is invalid".to_string(),
            ));
        }

        let (negative, unsigned) = match trimmed.as_bytes()[0] {
            b'-' => (true, &trimmed[1..]),
            b'+' => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };

        let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        // Trailing zeros carry no precision.
        let fraction = fraction.trim_end_matches('0');
        if fraction.len() > Wei::DECIMALS {
            return Err(WalletError::InvalidAmount(
                "Too many decimal places".to_string(),
            ));
        }

        let fractional_units: u128 = if fraction.is_empty() {
            0
        } else {
            format!("{:0<18}", fraction)
                .parse()
                .map_err(|_| WalletError::InvalidAmount("Invalid fractional part".to_string()))?
        };

        // The pattern guarantees ASCII digits, so a failed parse can only be overflow.
        let total = if whole.is_empty() {
            Some(fractional_units)
        } else {
            whole
                .parse::<u128>()
                .ok()
                .and_then(|units| units.checked_mul(Wei::PER_ETHER))
                .and_then(|w| w.checked_add(fractional_units))
        };

        Ok(match total {
            Some(total) => SignedEther {
                negative,
                magnitude: Wei(total),
                overflowed: false,
            },
            None => SignedEther {
                negative,
                magnitude: Wei(u128::MAX),
                overflowed: true,
            },
        })
    }

    /// Strictly greater than zero
    pub fn is_positive(&self) -> bool {
        !self.negative && (self.overflowed || !self.magnitude.is_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eip55_vectors_round_trip() {
        let vectors = [
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
            "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
            "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
        ];
        for vector in vectors {
            let address = Address::parse(vector).unwrap();
            assert_eq!(address.to_checksum(), vector);
        }
    }

    #[test]
    fn single_case_addresses_are_accepted() {
        let lower = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";
        let upper = "0x5AAEB6053F3E94C9B9A09F33669435E7EF1BEAED";
        assert_eq!(Address::parse(lower).unwrap(), Address::parse(upper).unwrap());
        assert_eq!(Address::parse(lower).unwrap().to_lower_hex(), lower);
    }

    #[test]
    fn bad_checksum_is_rejected() {
        let corrupted = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAeD";
        let err = Address::parse(corrupted).unwrap_err();
        assert!(matches!(err, WalletError::InvalidAddress(msg) if msg.contains("checksum")));
    }

    #[test]
    fn malformed_addresses_are_rejected() {
        for input in [
            "",
            "not-an-address",
            "5aaeb6053f3e94c9b9a09f33669435e7ef1beaed",
            "0x5aaeb6053f3e94c9b9a09f33669435e7ef1bea",
            "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaedff",
            "0xzzaeb6053f3e94c9b9a09f33669435e7ef1beaed",
            " 0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed",
        ] {
            assert!(
                matches!(Address::parse(input), Err(WalletError::InvalidAddress(_))),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn address_truncates_for_display() {
        let address = Address::parse("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").unwrap();
        assert_eq!(address.truncated(), "0x5aAe...eAed");
    }

    #[test]
    fn address_serializes_checksummed() {
        let address = Address::parse("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap();
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, "\"0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, address);
    }

    #[test]
    fn parse_ether_decimal_forms() {
        assert_eq!(
            Wei::parse_ether("1.5").unwrap().as_u128(),
            1_500_000_000_000_000_000
        );
        assert_eq!(Wei::parse_ether("0.000000000000000001").unwrap().as_u128(), 1);
        assert_eq!(
            Wei::parse_ether(".5").unwrap().as_u128(),
            500_000_000_000_000_000
        );
        assert_eq!(Wei::parse_ether("2.").unwrap(), Wei::from_ether(2).unwrap());
        assert_eq!(Wei::parse_ether(" 3 ").unwrap(), Wei::from_ether(3).unwrap());
    }

    #[test]
    fn trailing_zeros_beyond_precision_are_lossless() {
        let amount = Wei::parse_ether("1.0000000000000000010000").unwrap();
        assert_eq!(amount.as_u128(), Wei::PER_ETHER + 10);
    }

    #[test]
    fn more_than_eighteen_significant_decimals_rejected() {
        let err = Wei::parse_ether("0.0000000000000000001").unwrap_err();
        assert!(matches!(err, WalletError::InvalidAmount(msg) if msg.contains("decimal")));
    }

    #[test]
    fn malformed_amounts_rejected() {
        for input in ["", ".", "abc", "1.2.3", "1e18", "0x10", "--1", "1,5", "\u{661}", "0.\u{661}"] {
            assert!(
                matches!(SignedEther::parse(input), Err(WalletError::InvalidAmount(_))),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn overflow_is_invalid_amount() {
        let huge = "9".repeat(40);
        assert!(matches!(
            Wei::parse_ether(&huge),
            Err(WalletError::InvalidAmount(msg)) if msg.contains("overflow")
        ));
    }

    #[test]
    fn oversized_amounts_keep_sign_and_saturate() {
        let large = SignedEther::parse("400000000000000000000").unwrap();
        assert!(large.overflowed);
        assert!(large.is_positive());
        assert_eq!(large.magnitude.as_u128(), u128::MAX);

        let negative = SignedEther::parse("-400000000000000000000").unwrap();
        assert!(negative.overflowed);
        assert!(negative.negative);
        assert!(!negative.is_positive());

        let exact = SignedEther::parse("1.5").unwrap();
        assert!(!exact.overflowed);
    }

    #[test]
    fn signed_parse_keeps_sign() {
        let negative = SignedEther::parse("-0.5").unwrap();
        assert!(negative.negative);
        assert!(!negative.is_positive());
        assert_eq!(negative.magnitude.as_u128(), 500_000_000_000_000_000);

        assert!(!SignedEther::parse("0").unwrap().is_positive());
        assert!(!SignedEther::parse("-0.000").unwrap().is_positive());
        assert!(SignedEther::parse("+0.1").unwrap().is_positive());
        assert!(Wei::parse_ether("-1").is_err());
        assert_eq!(Wei::parse_ether("-0").unwrap(), Wei::ZERO);
    }

    #[test]
    fn format_ether_matches_wallet_display() {
        assert_eq!(Wei::from_ether(1).unwrap().format_ether(), "1.0");
        assert_eq!(Wei::ZERO.format_ether(), "0.0");
        assert_eq!(Wei::new(1).format_ether(), "0.000000000000000001");
        assert_eq!(
            Wei::parse_ether("12.3400").unwrap().to_string(),
            "12.34 ETH"
        );
    }

    #[test]
    fn hex_quantities() {
        let one = Wei::from_hex_quantity("0xde0b6b3a7640000").unwrap();
        assert_eq!(one, Wei::from_ether(1).unwrap());
        assert_eq!(one.to_hex_quantity(), "0xde0b6b3a7640000");
        assert_eq!(Wei::from_hex_quantity("0x0").unwrap(), Wei::ZERO);
        assert!(Wei::from_hex_quantity("0x").is_err());
        assert!(Wei::from_hex_quantity("12").is_err());
    }

    #[test]
    fn wei_arithmetic() {
        let a = Wei::from_ether(3).unwrap();
        let b = Wei::from_ether(2).unwrap();
        assert_eq!(a.checked_sub(b), Some(Wei::from_ether(1).unwrap()));
        assert_eq!(b.checked_sub(a), None);
        assert_eq!(a.checked_add(b), Some(Wei::from_ether(5).unwrap()));
    }
}
