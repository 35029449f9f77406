// src/utils.rs
use anyhow::{Context, Result, bail};
use ethers::types::U256;
use ethers::utils::hex;

/// Parses a `uint256` written either in decimal or as `0x`-prefixed hex.
pub fn parse_u256(value: &str) -> Result<U256> {
    let value = value.trim();
    if value.is_empty() {
        bail!("empty integer");
    }
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(digits) => U256::from_str_radix(digits, 16)
            .with_context(|| format!("invalid hex integer {value}")),
        None => U256::from_dec_str(value).with_context(|| format!("invalid integer {value}")),
    }
}

pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_and_hex() {
        assert_eq!(parse_u256("42").unwrap(), U256::from(42));
        assert_eq!(parse_u256("0x2a").unwrap(), U256::from(42));
        assert_eq!(parse_u256(" 0X2A ").unwrap(), U256::from(42));
        assert_eq!(
            parse_u256("115792089237316195423570985008687907853269984665640564039457584007913129639935")
                .unwrap(),
            U256::MAX
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_u256("").is_err());
        assert!(parse_u256("12ab").is_err());
        assert!(parse_u256("0xzz").is_err());
        assert!(parse_u256("-1").is_err());
    }

    #[test]
    fn hex_is_prefixed() {
        assert_eq!(to_hex(&[0xde, 0xad, 0xbe, 0xef]), "0xdeadbeef");
        assert_eq!(to_hex(&[0u8; 4]), "0x00000000");
    }
}
