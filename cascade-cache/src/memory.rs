//! In-process store, typically tier 0.

use crate::entry::CacheEntry;
use crate::error::CacheResult;
use crate::pattern::KeyPattern;
use crate::traits::{Capabilities, CacheStore};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory store backed by a `HashMap`.
///
/// Entries are returned as stored, expired or not; the cascade decides
/// liveness. Expired entries linger until read, overwritten or pruned.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    data: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl InMemoryStore {
    /// Create new in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones.
    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }

    /// Drop every expired entry.
    pub async fn prune(&self) -> usize {
        let mut data = self.data.write().await;
        let before = data.len();
        data.retain(|_, entry| !entry.is_expired());
        before - data.len()
    }

    async fn add(&self, key: &str, amount: i64) -> CacheResult<Option<i64>> {
        let mut data = self.data.write().await;
        let Some(entry) = data.get_mut(key) else {
            return Ok(None);
        };
        if entry.is_expired() {
            return Ok(None);
        }
        let Some(current) = entry.as_counter() else {
            return Ok(None);
        };
        let updated = current.saturating_add(amount);
        *entry = CacheEntry::with_deadline(Value::from(updated), entry.expires_at());
        Ok(Some(updated))
    }
}

#[async_trait]
impl CacheStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
    }

    async fn get_entry(&self, key: &str) -> CacheResult<Option<CacheEntry>> {
        Ok(self.data.read().await.get(key).cloned())
    }

    async fn set_entry(&self, key: &str, entry: CacheEntry) -> CacheResult<()> {
        self.data.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete_entry(&self, key: &str) -> CacheResult<()> {
        self.data.write().await.remove(key);
        Ok(())
    }

    async fn delete_matching(&self, pattern: &KeyPattern) -> CacheResult<()> {
        self.data
            .write()
            .await
            .retain(|key, _| !pattern.is_match(key));
        Ok(())
    }

    async fn increment(&self, key: &str, amount: i64) -> CacheResult<Option<i64>> {
        self.add(key, amount).await
    }

    async fn decrement(&self, key: &str, amount: i64) -> CacheResult<Option<i64>> {
        self.add(key, amount.saturating_neg()).await
    }

    async fn get_many_entries(&self, keys: &[String]) -> CacheResult<HashMap<String, CacheEntry>> {
        let data = self.data.read().await;
        Ok(keys
            .iter()
            .filter_map(|key| data.get(key).map(|entry| (key.clone(), entry.clone())))
            .collect())
    }

    async fn clear(&self) -> CacheResult<()> {
        self.data.write().await.clear();
        Ok(())
    }
}
