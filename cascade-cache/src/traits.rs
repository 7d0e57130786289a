//! Store adapter trait definition.

use crate::entry::CacheEntry;
use crate::error::{CacheError, CacheResult, TierOperation};
use crate::pattern::KeyPattern;
use async_trait::async_trait;
use std::collections::HashMap;

/// Optional operations a store implements.
///
/// Read once when a tier is built; the engine never probes a store per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Native multi-key read
    pub batch_get: bool,
    /// Pattern based deletion
    pub delete_matching: bool,
    /// Atomic increment / decrement
    pub counters: bool,
    /// Whole-store flush
    pub clear: bool,
}

impl Capabilities {
    /// Every optional operation supported.
    pub fn all() -> Self {
        Self {
            batch_get: true,
            delete_matching: true,
            counters: true,
            clear: true,
        }
    }

    /// Only the mandatory get/set/delete operations.
    pub fn none() -> Self {
        Self::default()
    }
}

/// Uniform interface every backing store exposes to the cascade.
///
/// Implementations own their storage, eviction and serialization and must be
/// safe for concurrent use. "Not found" is `Ok(None)`; `Err` is reserved for
/// adapter faults.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Short name used in tier labels, logs and metrics.
    fn name(&self) -> &str;

    /// Optional operations this store implements.
    fn capabilities(&self) -> Capabilities;

    /// Fetch the raw entry for a key.
    ///
    /// Stores may return entries whose deadline has passed; liveness is
    /// checked by the caller.
    async fn get_entry(&self, key: &str) -> CacheResult<Option<CacheEntry>>;

    /// Store an entry, replacing any previous one.
    async fn set_entry(&self, key: &str, entry: CacheEntry) -> CacheResult<()>;

    /// Remove a key. Removing a missing key is not an error.
    async fn delete_entry(&self, key: &str) -> CacheResult<()>;

    /// Remove every key matching a pattern.
    async fn delete_matching(&self, _pattern: &KeyPattern) -> CacheResult<()> {
        Err(CacheError::unsupported(self.name(), TierOperation::DeleteMatching))
    }

    /// Add `amount` to an integer value, returning the new value.
    ///
    /// `Ok(None)` when the store holds no usable integer for the key.
    async fn increment(&self, _key: &str, _amount: i64) -> CacheResult<Option<i64>> {
        Err(CacheError::unsupported(self.name(), TierOperation::Increment))
    }

    /// Subtract `amount` from an integer value, returning the new value.
    async fn decrement(&self, _key: &str, _amount: i64) -> CacheResult<Option<i64>> {
        Err(CacheError::unsupported(self.name(), TierOperation::Decrement))
    }

    /// Fetch several entries in one round trip.
    ///
    /// Only called when [`Capabilities::batch_get`] is set. The returned map
    /// holds present keys only.
    async fn get_many_entries(&self, _keys: &[String]) -> CacheResult<HashMap<String, CacheEntry>> {
        Err(CacheError::unsupported(self.name(), TierOperation::GetMany))
    }

    /// Remove every key held by the store.
    ///
    /// **Warning:** This operation may be destructive and affect all keys.
    async fn clear(&self) -> CacheResult<()> {
        Err(CacheError::unsupported(self.name(), TierOperation::Clear))
    }
}
