//! Currencies and forex pairs.

use crate::domain::error::LedgerError;
use crate::domain::ids::{CurrencyId, PairId};
use std::fmt;

pub const MAX_CODE_LEN: usize = 5;
pub const MAX_NAME_LEN: usize = 50;
pub const MAX_SYMBOL_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Currency {
    pub id: CurrencyId,
    pub code: String,
    pub name: String,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.code, self.name)
    }
}

/// A tradable pair. Base and quote codes are copied from the referenced
/// currencies, which cannot change while the pair exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForexPair {
    pub id: PairId,
    pub base_currency: CurrencyId,
    pub quote_currency: CurrencyId,
    pub base_code: String,
    pub quote_code: String,
    pub symbol: String,
}

impl ForexPair {
    /// Smallest conventional price increment for this pair.
    pub fn pip_size(&self) -> rust_decimal::Decimal {
        if self.quote_code == "JPY" {
            rust_decimal::Decimal::new(1, 2)
        } else {
            rust_decimal::Decimal::new(1, 4)
        }
    }

    pub fn references(&self, currency: CurrencyId) -> bool {
        self.base_currency == currency || self.quote_currency == currency
    }
}

impl fmt::Display for ForexPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base_code, self.quote_code)
    }
}

fn normalize_key(field: &str, raw: &str, max_len: usize) -> Result<String, LedgerError> {
    let key = raw.trim().to_uppercase();
    if key.is_empty() {
        return Err(LedgerError::invalid_field(field, "must not be empty"));
    }
    if key.chars().count() > max_len {
        return Err(LedgerError::invalid_field(
            field,
            format!("at most {max_len} characters allowed"),
        ));
    }
    if !key.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(LedgerError::invalid_field(
            field,
            "only ASCII letters and digits allowed",
        ));
    }
    Ok(key)
}

/// Canonical (upper-case) form of a currency code.
pub fn normalize_code(code: &str) -> Result<String, LedgerError> {
    normalize_key("code", code, MAX_CODE_LEN)
}

/// Canonical (upper-case) form of a pair symbol.
pub fn normalize_symbol(symbol: &str) -> Result<String, LedgerError> {
    normalize_key("symbol", symbol, MAX_SYMBOL_LEN)
}

pub fn validate_name(name: &str) -> Result<String, LedgerError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LedgerError::invalid_field("name", "must not be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(LedgerError::invalid_field(
            "name",
            format!("at most {MAX_NAME_LEN} characters allowed"),
        ));
    }
    Ok(name.to_string())
}

pub fn validate_pair_legs(base: CurrencyId, quote: CurrencyId) -> Result<(), LedgerError> {
    if base == quote {
        return Err(LedgerError::InvalidPair {
            reason: format!("base and quote currency are the same ({base})"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(quote_code: &str) -> ForexPair {
        ForexPair {
            id: PairId::new(),
            base_currency: CurrencyId::new(),
            quote_currency: CurrencyId::new(),
            base_code: "EUR".into(),
            quote_code: quote_code.into(),
            symbol: format!("EUR{quote_code}"),
        }
    }

    #[test]
    fn currency_display() {
        let usd = Currency {
            id: CurrencyId::new(),
            code: "USD".into(),
            name: "US Dollar".into(),
        };
        assert_eq!(usd.to_string(), "USD - US Dollar");
    }

    #[test]
    fn pair_display_uses_codes() {
        assert_eq!(pair("USD").to_string(), "EUR/USD");
    }

    #[test]
    fn pip_size_depends_on_quote() {
        assert_eq!(pair("USD").pip_size(), rust_decimal::Decimal::new(1, 4));
        assert_eq!(pair("JPY").pip_size(), rust_decimal::Decimal::new(1, 2));
    }

    #[test]
    fn codes_are_uppercased() {
        assert_eq!(normalize_code(" usd ").unwrap(), "USD");
        assert_eq!(normalize_symbol("eurusd").unwrap(), "EURUSD");
    }

    #[test]
    fn code_length_enforced() {
        assert!(normalize_code("ABCDE").is_ok());
        assert!(normalize_code("ABCDEF").is_err());
        assert!(normalize_code("").is_err());
        assert!(normalize_symbol("EURUSDXXXXX").is_err());
    }

    #[test]
    fn code_charset_enforced() {
        assert!(normalize_code("US D").is_err());
        assert!(normalize_symbol("EUR/USD").is_err());
    }

    #[test]
    fn name_validation() {
        assert_eq!(validate_name(" Euro ").unwrap(), "Euro");
        assert!(validate_name("").is_err());
        assert!(validate_name(&"x".repeat(51)).is_err());
    }

    #[test]
    fn same_leg_rejected() {
        let id = CurrencyId::new();
        let err = validate_pair_legs(id, id).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidPair { .. }));
        assert!(validate_pair_legs(id, CurrencyId::new()).is_ok());
    }
}
