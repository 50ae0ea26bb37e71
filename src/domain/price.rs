//! Fixed-point price values (10 significant digits, 5 fractional).

use crate::domain::error::LedgerError;
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

pub const MAX_DIGITS: u32 = 10;
pub const DECIMAL_PLACES: u32 = 5;

/// A strictly positive price with at most [`MAX_DIGITS`] significant digits,
/// [`DECIMAL_PLACES`] of them fractional. Out-of-range values are rejected, never rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(Decimal);

impl Price {
    pub fn new(value: Decimal) -> Result<Self, LedgerError> {
        let value = value.normalize();
        let invalid = |reason: String| LedgerError::InvalidPrice {
            value: value.to_string(),
            reason,
        };

        if value <= Decimal::ZERO {
            return Err(invalid("must be positive".into()));
        }
        if value.scale() > DECIMAL_PLACES {
            return Err(invalid(format!(
                "at most {DECIMAL_PLACES} decimal places allowed"
            )));
        }
        let integer_limit = Decimal::from(10_i64.pow(MAX_DIGITS - DECIMAL_PLACES));
        if value >= integer_limit {
            return Err(invalid(format!(
                "at most {} integer digits allowed",
                MAX_DIGITS - DECIMAL_PLACES
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Price {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str_exact(s.trim()).map_err(|e| LedgerError::InvalidPrice {
            value: s.to_string(),
            reason: e.to_string(),
        })?;
        Self::new(value)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = LedgerError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn accepts_five_decimal_places() {
        let p = Price::new(dec!(1.10505)).unwrap();
        assert_eq!(p.value(), dec!(1.10505));
    }

    #[test]
    fn trailing_zeros_are_normalized() {
        let p = Price::new(dec!(1.100000000)).unwrap();
        assert_eq!(p.to_string(), "1.1");
    }

    #[test]
    fn rejects_six_decimal_places() {
        let err = Price::new(dec!(1.105051)).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidPrice { .. }));
    }

    #[test]
    fn rejects_too_many_integer_digits() {
        assert!(Price::new(dec!(99999.99999)).is_ok());
        assert!(Price::new(dec!(100000)).is_err());
    }

    #[test]
    fn rejects_zero_and_negative() {
        assert!(Price::new(Decimal::ZERO).is_err());
        assert!(Price::new(dec!(-1.1)).is_err());
    }

    #[test]
    fn parses_from_text() {
        let p: Price = " 148.255 ".parse().unwrap();
        assert_eq!(p.value(), dec!(148.255));
        assert!("abc".parse::<Price>().is_err());
    }

    #[test]
    fn overlong_fraction_rejected_not_rounded() {
        let err = "1.000000000000000000000000000001"
            .parse::<Price>()
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidPrice { .. }));
        assert!("1.000001".parse::<Price>().is_err());
    }

    #[test]
    fn ordering_follows_value() {
        let low: Price = "1.0950".parse().unwrap();
        let high: Price = "1.1050".parse().unwrap();
        assert!(low < high);
    }
}
