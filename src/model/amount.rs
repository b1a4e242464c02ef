//! Amount type for handling monetary values.
//!
//! This module provides the `Amount` type which wraps `Decimal` and leniently parses values
//! that may include a dollar sign or thousands separators. Amounts are stored and serialized
//! as canonical decimal strings so no float arithmetic ever touches the money.

use rust_decimal::Decimal;
use schemars::{json_schema, JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use std::str::FromStr;

/// Represents a monetary amount.
///
/// Wraps `Decimal` and accepts input formatted with or without a dollar sign or commas:
/// `12.5`, `"12.50"`, `"$1,250.00"` and `"-$4.50"` all parse. The canonical form written to
/// the database, to JSON and to CSV is the plain decimal string, e.g. `1250.00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Returns the underlying `Decimal` value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    /// Rounds to `dp` decimal places using banker's rounding.
    pub fn round_dp(&self, dp: u32) -> Amount {
        Amount(self.0.round_dp(dp))
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount(value)
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        self.0 += rhs.0;
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0 - rhs.0)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, |acc, a| acc + a)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for Amount {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            anyhow::bail!("An empty string cannot be parsed as an amount");
        }

        // Accept both "-$50.00" and "$-50.00" and drop thousands separators.
        let mut cleaned = String::with_capacity(trimmed.len());
        for (ix, c) in trimmed.chars().enumerate() {
            match c {
                '$' if ix <= 1 => {}
                ',' => {}
                _ => cleaned.push(c),
            }
        }

        let value = Decimal::from_str(&cleaned)
            .map_err(|e| anyhow::anyhow!("Unable to parse '{s}' as an amount: {e}"))?;
        Ok(Amount(value))
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AmountVisitor;

        impl serde::de::Visitor<'_> for AmountVisitor {
            type Value = Amount;

            fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
                f.write_str("a decimal amount as a string or number")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Amount, E> {
                Amount::from_str(v).map_err(E::custom)
            }

            fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<Amount, E> {
                Decimal::try_from(v).map(Amount).map_err(E::custom)
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Amount, E> {
                Ok(Amount(Decimal::from(v)))
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Amount, E> {
                Ok(Amount(Decimal::from(v)))
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}

impl JsonSchema for Amount {
    fn schema_name() -> Cow<'static, str> {
        "Amount".into()
    }

    fn json_schema(_generator: &mut SchemaGenerator) -> Schema {
        json_schema!({
            "type": ["string", "number"],
            "description": "A decimal monetary amount, e.g. \"12.50\" or 12.5. \
                            A leading dollar sign and thousands separators are accepted."
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn parse_plain() {
        let a = Amount::from_str("12.50").unwrap();
        assert_eq!(a.value(), Decimal::new(1250, 2));
        assert_eq!(a.to_string(), "12.50");
    }

    #[test]
    fn parse_dollar_and_commas() {
        let a = Amount::from_str("$1,250.00").unwrap();
        assert_eq!(a.value(), Decimal::new(125000, 2));
        assert_eq!(a.to_string(), "1250.00");
    }

    #[test]
    fn parse_negative_forms() {
        let a = Amount::from_str("-$4.50").unwrap();
        let b = Amount::from_str("$-4.50").unwrap();
        assert_eq!(a.value(), b.value());
        assert!(!a.is_positive());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Amount::from_str("").is_err());
        assert!(Amount::from_str("abc").is_err());
        assert!(Amount::from_str("12.5.0").is_err());
    }

    #[test]
    fn deserialize_from_number_and_string() {
        let from_number: Amount = serde_json::from_str("12.5").unwrap();
        let from_string: Amount = serde_json::from_str("\"12.5\"").unwrap();
        assert_eq!(from_number.value(), from_string.value());

        let from_int: Amount = serde_json::from_str("45").unwrap();
        assert_eq!(from_int.value(), Decimal::from(45));
    }

    #[test]
    fn serialize_as_string() {
        let a = Amount::from_str("99.99").unwrap();
        assert_eq!(serde_json::to_string(&a).unwrap(), "\"99.99\"");
    }

    #[test]
    fn sum_is_exact() {
        let amounts = ["0.10", "0.20", "0.30"];
        let total: Amount = amounts
            .iter()
            .map(|s| Amount::from_str(s).unwrap())
            .sum();
        assert_eq!(total.value(), Decimal::new(60, 2));
    }
}
