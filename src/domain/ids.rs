//! Opaque identifiers for stored entities.
//!
//! Entity ids are random UUIDs so callers cannot infer insertion order from
//! them. [`UserId`] comes from the external identity provider and is only
//! ever referenced, never issued, by the store.

use crate::domain::error::LedgerError;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = LedgerError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self).map_err(|e| {
                    LedgerError::invalid_field(stringify!($name), e.to_string())
                })
            }
        }
    };
}

opaque_id!(
    /// Identifies a registered currency.
    CurrencyId
);
opaque_id!(
    /// Identifies a registered forex pair.
    PairId
);
opaque_id!(
    /// Identifies a stored price bar.
    BarId
);
opaque_id!(
    /// Identifies a trade in the ledger.
    TradeId
);

/// Opaque, stable user reference supplied by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Result<Self, LedgerError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(LedgerError::invalid_field("user", "must not be empty"));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserId {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = PairId::new();
        let b = PairId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn id_display_parses_back() {
        let id = TradeId::new();
        let parsed: TradeId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn id_parse_rejects_garbage() {
        let err = "not-a-uuid".parse::<CurrencyId>().unwrap_err();
        assert!(matches!(err, LedgerError::InvalidField { field, .. } if field == "CurrencyId"));
    }

    #[test]
    fn user_id_rejects_blank() {
        assert!(UserId::new("  ").is_err());
        assert_eq!(UserId::new("alice").unwrap().as_str(), "alice");
    }
}
