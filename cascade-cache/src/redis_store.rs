//! Redis store implementation.

use crate::entry::CacheEntry;
use crate::error::{CacheError, CacheResult};
use crate::pattern::KeyPattern;
use crate::traits::{Capabilities, CacheStore};
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

const SCAN_BATCH: usize = 500;

/// `PTTL` reply for a key that does not exist.
const PTTL_MISSING: i64 = -2;

/// Redis connection settings.
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Connection URL
    pub url: String,

    /// Prefix for all keys, joined with `:`
    pub key_prefix: Option<String>,

    /// Connection timeout
    pub connection_timeout: Duration,
}

impl RedisStoreConfig {
    /// Create a new Redis store configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use cascade_cache::RedisStoreConfig;
    ///
    /// let config = RedisStoreConfig::new("redis://localhost:6379").with_key_prefix("app");
    /// assert_eq!(config.build_key("user:1"), "app:user:1");
    /// ```
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key_prefix: None,
            connection_timeout: Duration::from_secs(5),
        }
    }

    /// Set the key prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Set the connection timeout.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Build the final key with prefix if configured.
    pub fn build_key(&self, key: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }

    /// Remove the prefix from a server-side key.
    fn strip_key<'a>(&self, key: &'a str) -> Option<&'a str> {
        match &self.key_prefix {
            Some(prefix) => key.strip_prefix(prefix.as_str())?.strip_prefix(':'),
            None => Some(key),
        }
    }
}

/// Redis-backed store.
///
/// Values are stored as JSON text so integer values stay usable by
/// `INCRBY`/`DECRBY`. Expiry is enforced by the server with `PX`.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    config: RedisStoreConfig,
}

impl RedisStore {
    /// Connect to Redis.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use cascade_cache::*;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), CacheError> {
    ///     let store = RedisStore::connect(RedisStoreConfig::new("redis://localhost:6379")).await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn connect(config: RedisStoreConfig) -> CacheResult<Self> {
        let client =
            Client::open(config.url.as_str()).map_err(|e| CacheError::Connection(e.to_string()))?;

        let connection = tokio::time::timeout(
            config.connection_timeout,
            ConnectionManager::new(client),
        )
        .await
        .map_err(|_| CacheError::Timeout)?
        .map_err(|e| CacheError::Connection(e.to_string()))?;

        tracing::info!(url = %config.url, "connected redis store");
        Ok(Self { connection, config })
    }

    /// Get the underlying connection manager.
    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    fn encode(entry: &CacheEntry) -> CacheResult<String> {
        serde_json::to_string(entry.value()).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    fn decode(raw: &str, pttl: i64) -> CacheResult<CacheEntry> {
        let value =
            serde_json::from_str(raw).map_err(|e| CacheError::Deserialization(e.to_string()))?;
        Ok(CacheEntry::with_deadline(value, deadline_from_pttl(pttl)))
    }

    /// Turn one `GET`/`PTTL` reply pair into an entry.
    ///
    /// A value whose key is already gone by the time `PTTL` runs (-2) expired
    /// in between and is a miss.
    fn entry_from_reply(raw: Option<String>, pttl: i64) -> CacheResult<Option<CacheEntry>> {
        match raw {
            Some(_) if pttl == PTTL_MISSING => Ok(None),
            Some(raw) => Self::decode(&raw, pttl).map(Some),
            None => Ok(None),
        }
    }

    /// Pair batch replies with their keys, skipping values that fail to
    /// decode.
    fn collect_entries(
        keys: &[String],
        replies: Vec<(Option<String>, i64)>,
    ) -> HashMap<String, CacheEntry> {
        let mut found = HashMap::with_capacity(keys.len());
        for (key, (raw, pttl)) in keys.iter().zip(replies) {
            match Self::entry_from_reply(raw, pttl) {
                Ok(Some(entry)) => {
                    found.insert(key.clone(), entry);
                }
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(key = key.as_str(), error = %error, "skipping undecodable redis value");
                }
            }
        }
        found
    }

    async fn delete_keys(&self, keys: &[String]) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        for chunk in keys.chunks(SCAN_BATCH) {
            let _: () = conn.del(chunk).await?;
        }
        Ok(())
    }

    async fn scan(&self, hint: &str) -> CacheResult<Vec<String>> {
        let mut conn = self.connection.clone();
        let pattern = self.config.build_key(hint);
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(keys)
    }
}

/// `PTTL` replies: -2 missing, -1 no expiry, otherwise milliseconds left.
fn deadline_from_pttl(pttl: i64) -> Option<Instant> {
    if pttl >= 0 {
        Some(Instant::now() + Duration::from_millis(pttl as u64))
    } else {
        None
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    fn name(&self) -> &str {
        "redis"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
    }

    async fn get_entry(&self, key: &str) -> CacheResult<Option<CacheEntry>> {
        let key = self.config.build_key(key);
        let mut conn = self.connection.clone();

        let (raw, pttl): (Option<String>, i64) = redis::pipe()
            .get(&key)
            .pttl(&key)
            .query_async(&mut conn)
            .await?;

        Self::entry_from_reply(raw, pttl)
    }

    async fn set_entry(&self, key: &str, entry: CacheEntry) -> CacheResult<()> {
        let key = self.config.build_key(key);
        let mut conn = self.connection.clone();
        let value = Self::encode(&entry)?;

        match entry.ttl() {
            Some(ttl) => {
                // PX 0 is rejected by the server
                let millis = (ttl.as_millis() as u64).max(1);
                let _: () = conn.pset_ex(&key, value, millis).await?;
            }
            None => {
                let _: () = conn.set(&key, value).await?;
            }
        }

        Ok(())
    }

    async fn delete_entry(&self, key: &str) -> CacheResult<()> {
        let key = self.config.build_key(key);
        let mut conn = self.connection.clone();
        let _: () = conn.del(&key).await?;
        Ok(())
    }

    async fn delete_matching(&self, pattern: &KeyPattern) -> CacheResult<()> {
        let matched: Vec<String> = self
            .scan(pattern.scan_hint())
            .await?
            .into_iter()
            .filter(|full| {
                self.config
                    .strip_key(full)
                    .is_some_and(|key| pattern.is_match(key))
            })
            .collect();

        if matched.is_empty() {
            return Ok(());
        }

        self.delete_keys(&matched).await?;
        tracing::debug!(deleted = matched.len(), "redis delete_matching");
        Ok(())
    }

    async fn increment(&self, key: &str, amount: i64) -> CacheResult<Option<i64>> {
        let key = self.config.build_key(key);
        let mut conn = self.connection.clone();
        let new_value: i64 = conn.incr(&key, amount).await?;
        Ok(Some(new_value))
    }

    async fn decrement(&self, key: &str, amount: i64) -> CacheResult<Option<i64>> {
        let key = self.config.build_key(key);
        let mut conn = self.connection.clone();
        let new_value: i64 = conn.decr(&key, amount).await?;
        Ok(Some(new_value))
    }

    async fn get_many_entries(&self, keys: &[String]) -> CacheResult<HashMap<String, CacheEntry>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let mut conn = self.connection.clone();
        let mut pipe = redis::pipe();
        for key in keys {
            let key = self.config.build_key(key);
            pipe.get(&key).pttl(&key);
        }

        // Flat GET/PTTL replies, paired up by the tuple conversion
        let replies: Vec<(Option<String>, i64)> = pipe.query_async(&mut conn).await?;
        Ok(Self::collect_entries(keys, replies))
    }

    /// With a key prefix only `prefix:*` keys are deleted. Without one the
    /// whole database is flushed.
    async fn clear(&self) -> CacheResult<()> {
        if self.config.key_prefix.is_some() {
            let owned = self.scan("*").await?;
            self.delete_keys(&owned).await?;
            tracing::debug!(deleted = owned.len(), "redis clear");
            return Ok(());
        }

        let mut conn = self.connection.clone();
        let _: () = redis::cmd("FLUSHDB").query_async(&mut conn).await?;
        Ok(())
    }
}
