//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are stored as `NUMERIC(12, 2)`, so a valid [`Price`] is a
//! non-negative decimal with at most two fractional digits that fits in ten
//! integer digits.

use core::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input is empty.
    #[error("price is required")]
    Empty,
    /// The input is not a decimal number.
    #[error("price must be a number")]
    NotANumber,
    /// The amount is below zero.
    #[error("price cannot be negative")]
    Negative,
    /// The amount has more than two fractional digits.
    #[error("price can have at most {max} decimal places")]
    TooPrecise {
        /// Maximum number of fractional digits.
        max: u32,
    },
    /// The amount does not fit the storage column.
    #[error("price must be less than 10000000000")]
    TooLarge,
}

/// A non-negative item price.
///
/// Equality is numeric, so `1.0` and `1.00` are the same price.
///
/// ## Examples
///
/// ```
/// use stockroom_core::Price;
///
/// let price = Price::parse("19.9").unwrap();
/// assert_eq!(price.to_string(), "19.90");
///
/// assert!(Price::parse("-1").is_err());
/// assert!(Price::parse("0.001").is_err());
/// assert!(Price::parse("abc").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Maximum number of fractional digits.
    pub const MAX_SCALE: u32 = 2;

    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Exclusive upper bound of a price (ten integer digits).
    const UPPER_BOUND: Decimal = Decimal::from_parts(1_410_065_408, 2, 0, false, 0);

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is negative, has more than two
    /// fractional digits, or is 10 000 000 000 or more.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount < Decimal::ZERO {
            return Err(PriceError::Negative);
        }

        if amount.normalize().scale() > Self::MAX_SCALE {
            return Err(PriceError::TooPrecise {
                max: Self::MAX_SCALE,
            });
        }

        if amount >= Self::UPPER_BOUND {
            return Err(PriceError::TooLarge);
        }

        Ok(Self(amount))
    }

    /// Parse a price from user input such as `"12"`, `"12.5"` or `" 0.99 "`.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Empty`] for blank input, [`PriceError::NotANumber`]
    /// if the input is not a plain decimal, and the errors of [`Price::new`]
    /// otherwise.
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PriceError::Empty);
        }

        let amount = Decimal::from_str(trimmed).map_err(|_| PriceError::NotANumber)?;
        Self::new(amount)
    }

    /// The decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_plain_decimals() {
        assert_eq!(Price::parse("0").unwrap(), Price::ZERO);
        assert_eq!(Price::parse("1").unwrap(), Price::parse("1.00").unwrap());
        assert_eq!(Price::parse(" 2.5 ").unwrap().amount(), Decimal::new(25, 1));
    }

    #[test]
    fn test_parse_allows_trailing_zeros_beyond_scale() {
        assert!(Price::parse("3.5000").is_ok());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Price::parse(""), Err(PriceError::Empty));
        assert_eq!(Price::parse("  "), Err(PriceError::Empty));
        assert_eq!(Price::parse("ten"), Err(PriceError::NotANumber));
        assert_eq!(Price::parse("-0.01"), Err(PriceError::Negative));
        assert_eq!(
            Price::parse("1.999"),
            Err(PriceError::TooPrecise { max: 2 })
        );
        assert_eq!(Price::parse("10000000000"), Err(PriceError::TooLarge));
    }

    #[test]
    fn test_upper_bound() {
        assert_eq!(Price::UPPER_BOUND, Decimal::from(10_000_000_000_i64));
        assert!(Price::parse("9999999999.99").is_ok());
    }

    #[test]
    fn test_display_uses_two_decimals() {
        assert_eq!(Price::parse("1").unwrap().to_string(), "1.00");
        assert_eq!(Price::parse("0.5").unwrap().to_string(), "0.50");
    }

    #[test]
    fn test_deserialize_validates() {
        let price: Price = serde_json::from_str("\"4.25\"").unwrap();
        assert_eq!(price, Price::parse("4.25").unwrap());
        assert!(serde_json::from_str::<Price>("\"-4\"").is_err());
    }
}
