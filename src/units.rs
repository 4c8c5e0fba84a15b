//! Exact conversion between wei and the ether amounts users type and read.
//!
//! Nothing here goes through floating point: display strings come from
//! `format_ether` and parsing is done on the decimal digits themselves, so any
//! wei amount survives a display round trip unchanged.

use crate::error::ValidationError;
use alloy::primitives::{
    U256,
    utils::{
        format_ether,
        parse_ether,
    },
};

pub const NATIVE_DECIMALS: usize = 18;
pub const NATIVE_SYMBOL: &str = "ETH";

/// `1500000000000000000` wei renders as `1.5`; whole amounts keep one
/// fractional digit (`2.0`).
pub fn to_display(amount: U256) -> String {
    let full = format_ether(amount);
    match full.split_once('.') {
        Some((whole, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() {
                format!("{whole}.0")
            } else {
                format!("{whole}.{fraction}")
            }
        }
        None => full,
    }
}

pub fn to_display_with_symbol(amount: U256) -> String {
    format!("{} {NATIVE_SYMBOL}", to_display(amount))
}

/// Parses an ether amount typed by the user into wei.
///
/// Accepts plain decimal notation only: no sign, no exponent, no grouping and
/// at most 18 fractional digits.
pub fn parse_amount(input: &str) -> Result<U256, ValidationError> {
    let bad = || ValidationError::BadAmount(input.to_string());
    let trimmed = input.trim();
    let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    let is_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty())
        || !is_digits(whole)
        || !is_digits(fraction)
        || fraction.len() > NATIVE_DECIMALS
    {
        return Err(bad());
    }
    parse_ether(trimmed).map_err(|_| bad())
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn to_display__trims_trailing_zeros() {
        let one_and_half = U256::from(1_500_000_000_000_000_000u128);
        assert_eq!(to_display(one_and_half), "1.5");
        assert_eq!(to_display(U256::from(2_000_000_000_000_000_000u128)), "2.0");
        assert_eq!(to_display(U256::ZERO), "0.0");
        assert_eq!(to_display(U256::from(1u64)), "0.000000000000000001");
    }

    #[test]
    fn parse_amount__accepts_plain_decimals() {
        assert_eq!(
            parse_amount("0.25"),
            Ok(U256::from(250_000_000_000_000_000u128))
        );
        assert_eq!(parse_amount(" 3 "), Ok(U256::from(3_000_000_000_000_000_000u128)));
        assert_eq!(parse_amount(".5"), Ok(U256::from(500_000_000_000_000_000u128)));
        assert_eq!(parse_amount("1."), Ok(U256::from(1_000_000_000_000_000_000u128)));
    }

    #[test]
    fn parse_amount__rejects_malformed_input() {
        for input in [
            "", " ", ".", "abc", "-1", "+1", "1e18", "1,5", "1.2.3", "0x10",
            "0.0000000000000000001",
        ] {
            assert_eq!(
                parse_amount(input),
                Err(ValidationError::BadAmount(input.to_string())),
                "input {input:?}"
            );
        }
    }

    proptest! {
        #[test]
        fn display_round_trip__is_exact_up_to_1e24_wei(wei in 0u128..=1_000_000_000_000_000_000_000_000u128) {
            let amount = U256::from(wei);
            let display = to_display(amount);
            prop_assert_eq!(parse_amount(&display), Ok(amount));
        }
    }
}
