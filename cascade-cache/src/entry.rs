//! Cache entries as stored by a tier.

use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;

/// A value held by a tier together with its expiry deadline.
///
/// `expires_at == None` means the entry never expires on its own; the
/// tier's eviction policy may still drop it.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    value: Value,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    /// Create an entry that expires `ttl` from now.
    pub fn new(value: Value, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    /// Create an entry with an absolute deadline.
    pub fn with_deadline(value: Value, expires_at: Option<Instant>) -> Self {
        Self { value, expires_at }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    /// Whether the deadline has passed. Does not contact any store.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }

    /// Remaining time to live, `None` for entries without a deadline.
    pub fn ttl(&self) -> Option<Duration> {
        self.expires_at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Integer view of the value, accepting numeric strings.
    pub(crate) fn as_counter(&self) -> Option<i64> {
        match &self.value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}
