//! Time source port trait.

use chrono::{DateTime, Utc};

/// Supplies `opened_at`, `closed_at` and `created_at` when callers omit them.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
