/// MONEY UNITS
///
/// Parsing and formatting of native-currency amounts. Amounts are accepted
/// either as plain wei integers or as `"<decimal> <unit>"` strings
/// (`"1.5 ether"`, `"20 gwei"`, `"7 wei"`).

use crate::types::{Money, ETHER, GWEI};
use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum UnitError {
    #[error("Empty amount")]
    Empty,
    #[error("Unknown unit: {0}")]
    UnknownUnit(String),
    #[error("Malformed amount: {0}")]
    Malformed(String),
    #[error("Amount has more precision than wei: {0}")]
    TooPrecise(String),
    #[error("Amount overflows: {0}")]
    Overflow(String),
}

fn unit_scale(unit: &str) -> Result<(Money, u32), UnitError> {
    match unit.to_ascii_lowercase().as_str() {
        "" | "wei" => Ok((1, 0)),
        "gwei" => Ok((GWEI, 9)),
        "ether" | "eth" => Ok((ETHER, 18)),
        other => Err(UnitError::UnknownUnit(other.to_string())),
    }
}

/// Parse an amount such as `"1.5 ether"` into wei.
pub fn parse_amount(input: &str) -> Result<Money, UnitError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UnitError::Empty);
    }

    let split = trimmed
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);
    let number = number.trim().replace('_', "");
    let (scale, decimals) = unit_scale(unit.trim())?;

    let (whole, fraction) = match number.split_once('.') {
        Some((w, f)) => (w, f),
        None => (number.as_str(), ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(UnitError::Malformed(input.to_string()));
    }
    if fraction.len() as u32 > decimals {
        return Err(UnitError::TooPrecise(input.to_string()));
    }

    let parse = |digits: &str| -> Result<Money, UnitError> {
        if digits.is_empty() {
            return Ok(0);
        }
        digits
            .parse::<Money>()
            .map_err(|_| UnitError::Malformed(input.to_string()))
    };

    let whole_wei = parse(whole)?
        .checked_mul(scale)
        .ok_or_else(|| UnitError::Overflow(input.to_string()))?;
    let fraction_wei = parse(fraction)? * 10u128.pow(decimals - fraction.len() as u32);

    whole_wei
        .checked_add(fraction_wei)
        .ok_or_else(|| UnitError::Overflow(input.to_string()))
}

/// Render an amount in ether with trailing zeros stripped (`1500000000000000000` -> `"1.5 ether"`).
pub fn format_ether(amount: Money) -> String {
    let whole = amount / ETHER;
    let fraction = amount % ETHER;
    if fraction == 0 {
        return format!("{} ether", whole);
    }
    let digits = format!("{:018}", fraction);
    format!("{}.{} ether", whole, digits.trim_end_matches('0'))
}

/// Serde adapter for `Money` fields: accepts integers or unit strings, writes unit strings.
pub mod serde_amount {
    use super::*;

    pub fn serialize<S: Serializer>(amount: &Money, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{} wei", amount))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Money, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }

    struct AmountVisitor;

    impl<'de> Visitor<'de> for AmountVisitor {
        type Value = Money;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a wei integer or an amount string such as \"1.5 ether\"")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
            Ok(v as Money)
        }

        fn visit_u128<E: de::Error>(self, v: u128) -> Result<Money, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
            Money::try_from(v).map_err(|_| E::custom(format!("negative amount {}", v)))
        }

        fn visit_i128<E: de::Error>(self, v: i128) -> Result<Money, E> {
            Money::try_from(v).map_err(|_| E::custom(format!("negative amount {}", v)))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
            parse_amount(v).map_err(E::custom)
        }
    }
}
