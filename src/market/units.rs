//! Decimal <-> integer conversions
//!
//! Everything here is exact integer arithmetic on `U256`. No floats.

use crate::{Error, Result};
use alloy::primitives::U256;

/// Wei per ether
pub const ETH_DECIMALS: u32 = 18;

/// Implied decimals of on-chain prices (`$1` = `100_000_000`)
pub const PRICE_DECIMALS: u32 = 8;

/// Parse a non-negative decimal string into an integer scaled by `10^decimals`.
///
/// Accepts `"1"`, `"0.001"`, `".5"` and `"2."`. Rejects signs, exponents,
/// separators and more fractional digits than `decimals`.
pub fn parse_units(value: &str, decimals: u32) -> Result<U256> {
    let value = value.trim();
    let (whole, frac) = match value.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (value, ""),
    };

    if whole.is_empty() && frac.is_empty() {
        return Err(Error::Validation(format!("Invalid amount: {:?}", value)));
    }
    if !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
        return Err(Error::Validation(format!("Invalid amount: {:?}", value)));
    }
    if frac.len() > decimals as usize {
        return Err(Error::Validation(format!(
            "Amount {} has more than {} decimal places",
            value, decimals
        )));
    }

    let digits = format!("{}{:0<width$}", whole, frac, width = decimals as usize);
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 10)
        .map_err(|e| Error::Validation(format!("Amount {} out of range: {}", value, e)))
}

/// Format a scaled integer as a decimal string, trimming trailing zeros
pub fn format_units(value: U256, decimals: u32) -> String {
    if value.is_zero() {
        return "0".to_string();
    }

    let divisor = U256::from(10).pow(U256::from(decimals));
    let whole = value / divisor;
    let remainder = value % divisor;

    if remainder.is_zero() {
        whole.to_string()
    } else {
        let remainder_str = format!("{:0>width$}", remainder, width = decimals as usize);
        format!("{}.{}", whole, remainder_str.trim_end_matches('0'))
    }
}

/// ETH decimal string to wei
pub fn parse_ether(value: &str) -> Result<U256> {
    parse_units(value, ETH_DECIMALS)
}

/// Wei to ETH decimal string
pub fn format_ether(wei: U256) -> String {
    format_units(wei, ETH_DECIMALS)
}

/// USD decimal string to the contract's 8-decimal price encoding
pub fn encode_price(usd: &str) -> Result<U256> {
    parse_units(usd, PRICE_DECIMALS)
}

/// Parse an already-encoded integer (wei, price, id) passed as a string
pub fn parse_integer(value: &str, field: &str) -> Result<U256> {
    let value = value.trim();
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::Validation(format!(
            "{} must be a non-negative integer, got {:?}",
            field, value
        )));
    }
    U256::from_str_radix(value, 10)
        .map_err(|e| Error::Validation(format!("{} out of range: {}", field, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hundred_thousand_dollars_encodes_to_eight_decimals() {
        assert_eq!(encode_price("100000").unwrap().to_string(), "10000000000000");
        assert_eq!(encode_price("100000.00").unwrap().to_string(), "10000000000000");
    }

    #[test]
    fn ether_conversion_is_exact() {
        assert_eq!(
            parse_ether("0.001").unwrap(),
            U256::from(1_000_000_000_000_000u64)
        );
        assert_eq!(
            parse_ether("0.0035").unwrap(),
            U256::from(3_500_000_000_000_000u64)
        );
        assert_eq!(
            parse_ether("1").unwrap(),
            U256::from(1_000_000_000_000_000_000u128)
        );
        assert_eq!(parse_ether(".5").unwrap(), U256::from(500_000_000_000_000_000u128));
        assert_eq!(parse_ether("0").unwrap(), U256::ZERO);
        // smallest unit survives
        assert_eq!(parse_ether("0.000000000000000001").unwrap(), U256::from(1));
    }

    #[test]
    fn rejects_malformed_amounts() {
        for bad in ["", ".", "-0.001", "+1", "1e-3", "0.0.1", "abc", "1,000"] {
            assert!(
                matches!(parse_ether(bad), Err(Error::Validation(_))),
                "accepted {:?}",
                bad
            );
        }
        assert!(parse_ether("0.0000000000000000001").is_err());
    }

    #[test]
    fn test_format_units() {
        let one_eth = U256::from(1_000_000_000_000_000_000u128);
        assert_eq!(format_units(one_eth, 18), "1");

        let one_point_five = U256::from(1_500_000_000_000_000_000u128);
        assert_eq!(format_units(one_point_five, 18), "1.5");

        assert_eq!(format_ether(U256::from(1_000_000_000_000_000u64)), "0.001");
        assert_eq!(format_units(U256::from(10_000_000_000_000u64), 8), "100000");
        assert_eq!(format_units(U256::ZERO, 18), "0");
    }

    #[test]
    fn integers_pass_through() {
        assert_eq!(
            parse_integer("10000000000000", "predictionPrice").unwrap(),
            U256::from(10_000_000_000_000u64)
        );
        assert!(parse_integer("100.5", "predictionPrice").is_err());
        assert!(parse_integer("-1", "marketId").is_err());
    }
}
