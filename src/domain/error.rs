//! Domain error types.

use std::fmt;

/// Entity kinds named in lookup and uniqueness failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Currency,
    Pair,
    Trade,
    WatchlistEntry,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::Currency => "currency",
            Entity::Pair => "pair",
            Entity::Trade => "trade",
            Entity::WatchlistEntry => "watchlist entry",
        };
        f.write_str(name)
    }
}

/// Fieldless discriminant of [`LedgerError`], convenient for matching in callers and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    DuplicateKey,
    DuplicateTimestamp,
    InvalidRange,
    InvalidPair,
    InvalidTimestamp,
    AlreadyClosed,
    AlreadyExists,
    ReferencedByPair,
    InvalidPrice,
    InvalidLevels,
    InvalidField,
    Database,
    Config,
    Io,
}

/// Top-level error type for fxledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: Entity, key: String },

    #[error("duplicate {entity} key: {key}")]
    DuplicateKey { entity: Entity, key: String },

    #[error("a bar already exists for {pair} at {timestamp}")]
    DuplicateTimestamp { pair: String, timestamp: String },

    #[error("invalid bar range: {reason}")]
    InvalidRange { reason: String },

    #[error("invalid pair: {reason}")]
    InvalidPair { reason: String },

    #[error("invalid timestamp: {reason}")]
    InvalidTimestamp { reason: String },

    #[error("trade {trade} is already closed")]
    AlreadyClosed { trade: String },

    #[error("{entity} already exists: {key}")]
    AlreadyExists { entity: Entity, key: String },

    #[error("currency {currency} is referenced by {pairs} pair(s)")]
    ReferencedByPair { currency: String, pairs: usize },

    #[error("invalid price {value}: {reason}")]
    InvalidPrice { value: String, reason: String },

    #[error("inconsistent trade levels: {reason}")]
    InvalidLevels { reason: String },

    #[error("invalid {field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::NotFound { .. } => ErrorKind::NotFound,
            LedgerError::DuplicateKey { .. } => ErrorKind::DuplicateKey,
            LedgerError::DuplicateTimestamp { .. } => ErrorKind::DuplicateTimestamp,
            LedgerError::InvalidRange { .. } => ErrorKind::InvalidRange,
            LedgerError::InvalidPair { .. } => ErrorKind::InvalidPair,
            LedgerError::InvalidTimestamp { .. } => ErrorKind::InvalidTimestamp,
            LedgerError::AlreadyClosed { .. } => ErrorKind::AlreadyClosed,
            LedgerError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            LedgerError::ReferencedByPair { .. } => ErrorKind::ReferencedByPair,
            LedgerError::InvalidPrice { .. } => ErrorKind::InvalidPrice,
            LedgerError::InvalidLevels { .. } => ErrorKind::InvalidLevels,
            LedgerError::InvalidField { .. } => ErrorKind::InvalidField,
            LedgerError::Database { .. } | LedgerError::DatabaseQuery { .. } => {
                ErrorKind::Database
            }
            LedgerError::ConfigParse { .. }
            | LedgerError::ConfigMissing { .. }
            | LedgerError::ConfigInvalid { .. } => ErrorKind::Config,
            LedgerError::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn not_found(entity: Entity, key: impl fmt::Display) -> Self {
        LedgerError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub(crate) fn invalid_field(field: &str, reason: impl Into<String>) -> Self {
        LedgerError::InvalidField {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&LedgerError> for std::process::ExitCode {
    fn from(err: &LedgerError) -> Self {
        let code: u8 = match err.kind() {
            ErrorKind::Io => 1,
            ErrorKind::Config => 2,
            ErrorKind::Database => 3,
            ErrorKind::InvalidRange
            | ErrorKind::InvalidPair
            | ErrorKind::InvalidTimestamp
            | ErrorKind::InvalidPrice
            | ErrorKind::InvalidLevels
            | ErrorKind::InvalidField => 4,
            ErrorKind::NotFound => 5,
            ErrorKind::DuplicateKey
            | ErrorKind::DuplicateTimestamp
            | ErrorKind::AlreadyClosed
            | ErrorKind::AlreadyExists
            | ErrorKind::ReferencedByPair => 6,
        };
        std::process::ExitCode::from(code)
    }
}
