//! Error types for cache operations.

use std::fmt;
use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache-specific errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Redis-specific error
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The store does not implement an optional operation
    #[error("{store} does not support {operation}")]
    Unsupported {
        store: String,
        operation: TierOperation,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Invalid key pattern
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// Operation timeout
    #[error("Operation timeout")]
    Timeout,

    /// Generic error
    #[error("Cache error: {0}")]
    Other(String),
}

impl CacheError {
    /// Build an [`CacheError::Unsupported`] for the given store.
    pub fn unsupported(store: impl Into<String>, operation: TierOperation) -> Self {
        Self::Unsupported {
            store: store.into(),
            operation,
        }
    }

    /// Check if this error is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// The per-tier operation a [`TierFault`] was raised from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TierOperation {
    Get,
    GetMany,
    Set,
    Delete,
    DeleteMatching,
    Increment,
    Decrement,
    Clear,
}

impl TierOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            TierOperation::Get => "get",
            TierOperation::GetMany => "get_many",
            TierOperation::Set => "set",
            TierOperation::Delete => "delete",
            TierOperation::DeleteMatching => "delete_matching",
            TierOperation::Increment => "increment",
            TierOperation::Decrement => "decrement",
            TierOperation::Clear => "clear",
        }
    }
}

impl fmt::Display for TierOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure isolated to a single tier.
///
/// Faults are logged and metered by the engine and then folded into a miss
/// (reads) or a no-op (writes, deletes, counters). They never reach the
/// caller.
#[derive(Debug, Error)]
#[error("tier {tier} ({store}) failed on {operation}: {source}")]
pub struct TierFault {
    /// Position of the tier in the cascade
    pub tier: usize,
    /// Store name reported by the adapter
    pub store: String,
    /// Operation that failed
    pub operation: TierOperation,
    /// The adapter error
    #[source]
    pub source: CacheError,
}
