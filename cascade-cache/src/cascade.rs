//! The cascade cache facade.

use crate::config::{CascadeConfig, StoreSource, race_condition_ttl_unsupported};
use crate::engine::CascadeEngine;
use crate::error::{CacheError, CacheResult};
use crate::key::{ToCacheKey, namespaced_key};
use crate::memory::InMemoryStore;
use crate::metrics::{MetricsSink, NoopMetrics};
use crate::pattern::KeyPattern;
use crate::tier::TierList;
use crate::traits::CacheStore;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "redis")]
use crate::redis_store::RedisStore;

/// Per-call options for writes and fetches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// TTL for this write, applied to every tier
    pub expires_in: Option<Duration>,

    /// `fetch` skips the read and always runs the factory
    pub force: bool,

    /// Stale-value regeneration window; always rejected
    pub race_condition_ttl: Option<Duration>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_expires_in(mut self, ttl: Duration) -> Self {
        self.expires_in = Some(ttl);
        self
    }

    pub fn with_force(mut self) -> Self {
        self.force = true;
        self
    }

    pub fn with_race_condition_ttl(mut self, window: Duration) -> Self {
        self.race_condition_ttl = Some(window);
        self
    }

    fn check(&self) -> CacheResult<()> {
        match self.race_condition_ttl {
            Some(_) => Err(race_condition_ttl_unsupported()),
            None => Ok(()),
        }
    }
}

/// A single cache interface over an ordered list of stores.
///
/// Cloning is cheap; clones share the same tiers.
///
/// Tier failures never surface as errors: a read for which every tier failed
/// returns `None`, exactly like a miss. The only errors are configuration
/// errors and (de)serialization of caller values.
///
/// # Examples
///
/// ```
/// use cascade_cache::*;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> CacheResult<()> {
/// let cache = CascadeCache::new(
///     CascadeConfig::new()
///         .tier(TierSpec::memory())
///         .tier(TierSpec::memory().with_options(
///             StoreOptions::new().with_expires_in(Duration::from_secs(60)),
///         )),
/// )
/// .await?;
///
/// cache.write("user:1", &"Alice").await?;
/// let name: Option<String> = cache.read("user:1").await?;
/// assert_eq!(name, Some("Alice".to_string()));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CascadeCache {
    engine: Arc<CascadeEngine>,
    namespace: Option<String>,
}

impl CascadeCache {
    /// Build the cascade without metrics.
    pub async fn new(config: CascadeConfig) -> CacheResult<Self> {
        Self::with_metrics(config, Arc::new(NoopMetrics)).await
    }

    /// Build the cascade, reporting tier events to `sink` when
    /// `config.metrics_enabled` is set.
    ///
    /// The configuration is validated before any store is built or
    /// contacted.
    pub async fn with_metrics(config: CascadeConfig, sink: Arc<dyn MetricsSink>) -> CacheResult<Self> {
        config.validate()?;

        let mut stores = Vec::with_capacity(config.tiers.len());
        for spec in &config.tiers {
            let options = spec.options.resolve(&config.defaults);
            let store: Arc<dyn CacheStore> = match &spec.source {
                StoreSource::Memory => Arc::new(InMemoryStore::new()),
                #[cfg(feature = "redis")]
                StoreSource::Redis(redis) => Arc::new(RedisStore::connect(redis.clone()).await?),
                StoreSource::Custom(store) => store.clone(),
            };
            stores.push((store, options.expires_in));
        }

        let metrics: Arc<dyn MetricsSink> = if config.metrics_enabled {
            sink
        } else {
            Arc::new(NoopMetrics)
        };
        let engine = CascadeEngine::new(TierList::new(stores), metrics, config.backfill);
        tracing::info!(
            tiers = ?engine.tiers().labels(),
            metrics = config.metrics_enabled,
            "cascade cache ready"
        );

        Ok(Self {
            engine: Arc::new(engine),
            namespace: config.namespace,
        })
    }

    /// Build directly from an engine.
    pub fn from_engine(engine: CascadeEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            namespace: None,
        }
    }

    pub fn engine(&self) -> &CascadeEngine {
        &self.engine
    }

    pub fn tiers(&self) -> &TierList {
        self.engine.tiers()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// A view of the same tiers with every key prefixed by `namespace:`.
    pub fn namespaced(&self, namespace: impl Into<String>) -> Self {
        Self {
            engine: self.engine.clone(),
            namespace: Some(namespace.into()),
        }
    }

    /// The key actually sent to the tiers.
    pub fn normalize_key<K: ToCacheKey + ?Sized>(&self, key: &K) -> String {
        namespaced_key(&key.to_cache_key(), self.namespace.as_deref())
    }

    /// Read a typed value.
    pub async fn read<T, K>(&self, key: &K) -> CacheResult<Option<T>>
    where
        T: DeserializeOwned,
        K: ToCacheKey + ?Sized,
    {
        let key = self.normalize_key(key);
        self.engine.read(&key).await.map(decode).transpose()
    }

    /// Read several typed values, keyed by canonical (un-namespaced) key.
    /// Absent keys are left out.
    pub async fn read_many<T, K>(&self, keys: &[K]) -> CacheResult<HashMap<String, T>>
    where
        T: DeserializeOwned,
        K: ToCacheKey,
    {
        let mut canonical = HashMap::with_capacity(keys.len());
        let mut normalized = Vec::with_capacity(keys.len());
        for key in keys {
            let plain = key.to_cache_key();
            let full = namespaced_key(&plain, self.namespace.as_deref());
            normalized.push(full.clone());
            canonical.insert(full, plain);
        }

        let mut found = HashMap::new();
        for (full, value) in self.engine.read_many(&normalized).await {
            if let Some(plain) = canonical.remove(&full) {
                found.insert(plain, decode(value)?);
            }
        }
        Ok(found)
    }

    /// Write a value to every tier, each with its default TTL.
    pub async fn write<T, K>(&self, key: &K, value: &T) -> CacheResult<bool>
    where
        T: Serialize + ?Sized,
        K: ToCacheKey + ?Sized,
    {
        self.write_with(key, value, &CallOptions::default()).await
    }

    /// Write a value with per-call options.
    pub async fn write_with<T, K>(&self, key: &K, value: &T, options: &CallOptions) -> CacheResult<bool>
    where
        T: Serialize + ?Sized,
        K: ToCacheKey + ?Sized,
    {
        options.check()?;
        let key = self.normalize_key(key);
        let value = encode(value)?;
        Ok(self.engine.write(&key, &value, options.expires_in).await)
    }

    /// Return the cached value, or compute it with `factory`, write it and
    /// return it.
    ///
    /// Concurrent callers that miss at the same time all run the factory.
    pub async fn fetch<T, K, F, Fut>(&self, key: &K, factory: F) -> CacheResult<T>
    where
        T: Serialize + DeserializeOwned,
        K: ToCacheKey + ?Sized,
        F: FnOnce() -> Fut,
        Fut: Future<Output = CacheResult<T>>,
    {
        self.fetch_with(key, &CallOptions::default(), factory).await
    }

    /// [`CascadeCache::fetch`] with per-call options.
    pub async fn fetch_with<T, K, F, Fut>(&self, key: &K, options: &CallOptions, factory: F) -> CacheResult<T>
    where
        T: Serialize + DeserializeOwned,
        K: ToCacheKey + ?Sized,
        F: FnOnce() -> Fut,
        Fut: Future<Output = CacheResult<T>>,
    {
        options.check()?;
        let key = self.normalize_key(key);

        if !options.force {
            if let Some(value) = self.engine.read(&key).await {
                return decode(value);
            }
        }

        let value = factory().await?;
        let encoded = encode(&value)?;
        self.engine.write(&key, &encoded, options.expires_in).await;
        Ok(value)
    }

    /// Whether any tier holds a live entry. A cached `null` exists.
    pub async fn exist<K: ToCacheKey + ?Sized>(&self, key: &K) -> CacheResult<bool> {
        let key = self.normalize_key(key);
        Ok(self.engine.lookup(&key).await.is_some())
    }

    /// Delete from every tier.
    pub async fn delete<K: ToCacheKey + ?Sized>(&self, key: &K) -> CacheResult<bool> {
        let key = self.normalize_key(key);
        Ok(self.engine.delete(&key).await)
    }

    /// Delete matching keys from every tier that supports it. Within a
    /// namespace only that namespace's keys are considered.
    pub async fn delete_matching(&self, pattern: &KeyPattern) -> CacheResult<()> {
        match self.namespace.as_deref() {
            Some(ns) if !ns.is_empty() => {
                self.engine.delete_matching(&pattern.within_namespace(ns)).await
            }
            _ => self.engine.delete_matching(pattern).await,
        }
        Ok(())
    }

    /// Increment on every tier; the first tier to answer wins.
    pub async fn increment<K: ToCacheKey + ?Sized>(&self, key: &K, amount: i64) -> CacheResult<Option<i64>> {
        let key = self.normalize_key(key);
        Ok(self.engine.increment(&key, amount).await)
    }

    /// Decrement on every tier; the first tier to answer wins.
    pub async fn decrement<K: ToCacheKey + ?Sized>(&self, key: &K, amount: i64) -> CacheResult<Option<i64>> {
        let key = self.normalize_key(key);
        Ok(self.engine.decrement(&key, amount).await)
    }

    /// Flush every tier that supports it, regardless of namespace.
    pub async fn clear(&self) -> CacheResult<()> {
        self.engine.clear().await;
        Ok(())
    }
}

fn encode<T: Serialize + ?Sized>(value: &T) -> CacheResult<Value> {
    serde_json::to_value(value).map_err(|e| CacheError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(value: Value) -> CacheResult<T> {
    serde_json::from_value(value).map_err(|e| CacheError::Deserialization(e.to_string()))
}
