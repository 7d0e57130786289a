//! Multi-tier cache cascade.
//!
//! A [`CascadeCache`] presents an ordered list of cache stores as one cache.
//! Tier 0 is the fastest, later tiers are slower but larger or shared.
//!
//! - Reads walk the tiers in order and stop at the first live value. Earlier
//!   tiers that missed are backfilled with that value.
//! - Writes, deletes and counters fan out to every tier concurrently.
//! - A failing tier is logged, counted and treated as a miss. It never fails
//!   the whole operation.
//!
//! # Features
//!
//! - `redis` - Redis store (enabled by default)
//! - `prometheus` - Prometheus metrics sink
//!
//! # Examples
//!
//! ## Memory in front of Redis
//!
//! ```no_run
//! use cascade_cache::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), CacheError> {
//!     let cache = CascadeCache::new(
//!         CascadeConfig::new()
//!             .tier(TierSpec::memory().with_options(
//!                 StoreOptions::new().with_expires_in(Duration::from_secs(30)),
//!             ))
//!             .tier(TierSpec::redis(RedisStoreConfig::new("redis://localhost:6379")))
//!             .with_expires_in(Duration::from_secs(600)),
//!     )
//!     .await?;
//!
//!     cache.write("user:1", &"Alice").await?;
//!     let name: Option<String> = cache.read("user:1").await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Fetch with a factory
//!
//! ```
//! use cascade_cache::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), CacheError> {
//! let cache = CascadeCache::new(CascadeConfig::new().tier(TierSpec::memory())).await?;
//!
//! let value: u64 = cache.fetch("answer", || async { Ok(42) }).await?;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

pub mod cascade;
pub mod config;
pub mod engine;
pub mod entry;
pub mod error;
pub mod key;
pub mod memory;
pub mod metrics;
pub mod pattern;
pub mod tier;
pub mod traits;

#[cfg(feature = "redis")]
pub mod redis_store;

pub use cascade::{CallOptions, CascadeCache};
pub use config::{BackfillMode, CascadeConfig, StoreOptions, StoreSource, TierOptions, TierSpec};
pub use engine::{CascadeEngine, Lookup};
pub use entry::CacheEntry;
pub use error::{CacheError, CacheResult, TierFault, TierOperation};
pub use key::ToCacheKey;
pub use memory::InMemoryStore;
pub use metrics::{MetricsSink, NoopMetrics, RecordingMetrics, TierEvent};
pub use pattern::KeyPattern;
pub use tier::{Tier, TierList, TierOutcome};
pub use traits::{Capabilities, CacheStore};

#[cfg(feature = "redis")]
pub use redis_store::{RedisStore, RedisStoreConfig};

#[cfg(feature = "prometheus")]
pub use metrics::PrometheusMetrics;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cascade::{CallOptions, CascadeCache};
    pub use crate::config::{CascadeConfig, StoreOptions, TierSpec};
    pub use crate::error::{CacheError, CacheResult};
    pub use crate::key::ToCacheKey;
    pub use crate::memory::InMemoryStore;
    pub use crate::pattern::KeyPattern;
    pub use crate::traits::{Capabilities, CacheStore};

    #[cfg(feature = "redis")]
    pub use crate::redis_store::{RedisStore, RedisStoreConfig};
}
