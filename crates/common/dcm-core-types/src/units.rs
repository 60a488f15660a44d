//! Fixed-point token amounts: every balance is a `u128` count of base units,
//! with 18 implied fractional digits.

use thiserror::Error;

pub const DECIMALS: u32 = 18;
pub const ONE_TOKEN: u128 = 1_000_000_000_000_000_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitsError {
    #[error("Empty amount")]
    Empty,
    #[error("Invalid digit in amount: {0}")]
    InvalidDigit(String),
    #[error("Too many fractional digits (max {DECIMALS}): {0}")]
    TooPrecise(String),
    #[error("Amount overflows u128: {0}")]
    Overflow(String),
}

/// Parse a decimal string such as `"12.5"` into base units.
pub fn parse_units(input: &str) -> Result<u128, UnitsError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(UnitsError::Empty);
    }
    let (whole, frac) = match input.split_once('.') {
        Some((w, f)) => (w, f),
        None => (input, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(UnitsError::InvalidDigit(input.to_string()));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(UnitsError::InvalidDigit(input.to_string()));
    }
    if frac.len() > DECIMALS as usize {
        return Err(UnitsError::TooPrecise(input.to_string()));
    }

    let overflow = || UnitsError::Overflow(input.to_string());
    let whole_units = if whole.is_empty() {
        0
    } else {
        whole.parse::<u128>().map_err(|_| overflow())?
    };
    let frac_units = if frac.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac, width = DECIMALS as usize);
        padded.parse::<u128>().map_err(|_| overflow())?
    };

    whole_units
        .checked_mul(ONE_TOKEN)
        .and_then(|v| v.checked_add(frac_units))
        .ok_or_else(overflow)
}

/// Render base units as a decimal string without trailing fractional zeroes.
pub fn format_units(amount: u128) -> String {
    let whole = amount / ONE_TOKEN;
    let frac = amount % ONE_TOKEN;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0>width$}", frac, width = DECIMALS as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

/// Serde adapter writing base-unit amounts as decimal strings, so `u128`
/// values survive JSON consumers and buffered (tagged) enum decoding.
pub mod amount_str {
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(amount: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&amount.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }

    struct AmountVisitor;

    impl<'de> Visitor<'de> for AmountVisitor {
        type Value = u128;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a base-unit amount as a decimal string or unsigned integer")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u128, E> {
            Ok(v as u128)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u128, E> {
            v.parse::<u128>().map_err(|_| E::custom(format!("invalid amount: {}", v)))
        }
    }
}
