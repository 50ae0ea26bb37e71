//! Store configuration and its validation.
//!
//! Values are read through [`ConfigPort`] and checked before any store is opened.

use crate::domain::error::LedgerError;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_POOL_SIZE: u32 = 4;
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_LOG_LEVEL: &str = "info";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub path: String,
    pub pool_size: u32,
    pub busy_timeout_ms: u64,
}

impl StoreConfig {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, LedgerError> {
        validate_store_config(config)?;
        let path = config
            .get_string("sqlite", "path")
            .ok_or_else(|| LedgerError::ConfigMissing {
                section: "sqlite".into(),
                key: "path".into(),
            })?;
        Ok(Self {
            path,
            pool_size: config.get_int("sqlite", "pool_size", DEFAULT_POOL_SIZE as i64) as u32,
            busy_timeout_ms: config.get_int(
                "sqlite",
                "busy_timeout_ms",
                DEFAULT_BUSY_TIMEOUT_MS as i64,
            ) as u64,
        })
    }
}

pub fn validate_store_config(config: &dyn ConfigPort) -> Result<(), LedgerError> {
    validate_path(config)?;
    validate_pool_size(config)?;
    validate_busy_timeout(config)?;
    validate_log_level(config)?;
    Ok(())
}

fn validate_path(config: &dyn ConfigPort) -> Result<(), LedgerError> {
    match config.get_string("sqlite", "path") {
        None => Err(LedgerError::ConfigMissing {
            section: "sqlite".into(),
            key: "path".into(),
        }),
        Some(p) if p.trim().is_empty() => Err(LedgerError::ConfigInvalid {
            section: "sqlite".into(),
            key: "path".into(),
            reason: "path must not be empty".into(),
        }),
        Some(_) => Ok(()),
    }
}

/// Reads an integer from `[sqlite]`. Absent means `default`; present but unparsable is invalid.
fn sqlite_int(config: &dyn ConfigPort, key: &str, default: i64) -> Result<i64, LedgerError> {
    match config.get_string("sqlite", key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<i64>().map_err(|_| LedgerError::ConfigInvalid {
            section: "sqlite".into(),
            key: key.into(),
            reason: format!("{raw:?} is not an integer"),
        }),
    }
}

fn validate_pool_size(config: &dyn ConfigPort) -> Result<(), LedgerError> {
    let value = sqlite_int(config, "pool_size", DEFAULT_POOL_SIZE as i64)?;
    if !(1..=64).contains(&value) {
        return Err(LedgerError::ConfigInvalid {
            section: "sqlite".into(),
            key: "pool_size".into(),
            reason: "pool_size must be between 1 and 64".into(),
        });
    }
    Ok(())
}

fn validate_busy_timeout(config: &dyn ConfigPort) -> Result<(), LedgerError> {
    let value = sqlite_int(config, "busy_timeout_ms", DEFAULT_BUSY_TIMEOUT_MS as i64)?;
    if value < 0 {
        return Err(LedgerError::ConfigInvalid {
            section: "sqlite".into(),
            key: "busy_timeout_ms".into(),
            reason: "busy_timeout_ms must be non-negative".into(),
        });
    }
    Ok(())
}

fn validate_log_level(config: &dyn ConfigPort) -> Result<(), LedgerError> {
    if let Some(level) = config.get_string("log", "level") {
        if !LOG_LEVELS.contains(&level.trim().to_lowercase().as_str()) {
            return Err(LedgerError::ConfigInvalid {
                section: "log".into(),
                key: "level".into(),
                reason: format!("expected one of {}", LOG_LEVELS.join(", ")),
            });
        }
    }
    Ok(())
}
