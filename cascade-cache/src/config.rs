//! Cascade configuration types.

use crate::error::{CacheError, CacheResult};
use crate::traits::CacheStore;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "redis")]
use crate::redis_store::RedisStoreConfig;

/// Expiry options shared by the cascade and its tiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreOptions {
    /// Default TTL for entries written without an explicit one
    pub expires_in: Option<Duration>,

    /// Stale-value regeneration window. Not supported by the cascade; any
    /// value is rejected when the cascade is built.
    pub race_condition_ttl: Option<Duration>,
}

impl StoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default TTL.
    pub fn with_expires_in(mut self, ttl: Duration) -> Self {
        self.expires_in = Some(ttl);
        self
    }

    /// Request a stale-value regeneration window.
    pub fn with_race_condition_ttl(mut self, window: Duration) -> Self {
        self.race_condition_ttl = Some(window);
        self
    }

    /// Fill unset fields from `defaults`.
    pub fn merged_over(&self, defaults: &StoreOptions) -> StoreOptions {
        StoreOptions {
            expires_in: self.expires_in.or(defaults.expires_in),
            race_condition_ttl: self.race_condition_ttl.or(defaults.race_condition_ttl),
        }
    }
}

/// How a tier picks its options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TierOptions {
    /// Use the cascade's shared defaults
    #[default]
    Shared,
    /// Tier-specific options; unset fields fall back to the shared defaults
    Override(StoreOptions),
}

impl TierOptions {
    /// Resolve the effective options for a tier.
    pub fn resolve(&self, defaults: &StoreOptions) -> StoreOptions {
        match self {
            TierOptions::Shared => defaults.clone(),
            TierOptions::Override(options) => options.merged_over(defaults),
        }
    }
}

/// Where a tier's store comes from.
#[derive(Clone)]
pub enum StoreSource {
    /// A fresh in-process store
    Memory,
    /// A Redis store connected at build time
    #[cfg(feature = "redis")]
    Redis(RedisStoreConfig),
    /// An already constructed store
    Custom(Arc<dyn CacheStore>),
}

impl fmt::Debug for StoreSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreSource::Memory => f.write_str("Memory"),
            #[cfg(feature = "redis")]
            StoreSource::Redis(config) => f.debug_tuple("Redis").field(&config.url).finish(),
            StoreSource::Custom(store) => f.debug_tuple("Custom").field(&store.name()).finish(),
        }
    }
}

/// One entry of the ordered tier list.
#[derive(Debug, Clone)]
pub struct TierSpec {
    pub source: StoreSource,
    pub options: TierOptions,
}

impl TierSpec {
    /// An in-process tier using the shared options.
    pub fn memory() -> Self {
        Self {
            source: StoreSource::Memory,
            options: TierOptions::Shared,
        }
    }

    /// A Redis tier using the shared options.
    #[cfg(feature = "redis")]
    pub fn redis(config: RedisStoreConfig) -> Self {
        Self {
            source: StoreSource::Redis(config),
            options: TierOptions::Shared,
        }
    }

    /// Wrap an existing store.
    pub fn store(store: Arc<dyn CacheStore>) -> Self {
        Self {
            source: StoreSource::Custom(store),
            options: TierOptions::Shared,
        }
    }

    /// Override the shared options for this tier.
    pub fn with_options(mut self, options: StoreOptions) -> Self {
        self.options = TierOptions::Override(options);
        self
    }
}

/// When backfill writes happen relative to the read that triggered them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackfillMode {
    /// The read returns after backfill completes
    #[default]
    Inline,
    /// Backfill is spawned on the runtime and the read returns immediately
    Background,
}

/// Cascade configuration, resolved once when the cascade is built.
#[derive(Debug, Clone, Default)]
pub struct CascadeConfig {
    /// Tiers, fastest first
    pub tiers: Vec<TierSpec>,

    /// Options shared by every tier unless overridden
    pub defaults: StoreOptions,

    /// Prefix applied to every key as `namespace:key`
    pub namespace: Option<String>,

    /// Emit per-tier hit/miss/error metrics
    pub metrics_enabled: bool,

    /// Backfill scheduling
    pub backfill: BackfillMode,
}

impl CascadeConfig {
    /// An empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tier. Tiers are consulted in insertion order.
    pub fn tier(mut self, spec: TierSpec) -> Self {
        self.tiers.push(spec);
        self
    }

    /// Set the shared default TTL.
    pub fn with_expires_in(mut self, ttl: Duration) -> Self {
        self.defaults.expires_in = Some(ttl);
        self
    }

    /// Set the shared key namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Request a stale-value regeneration window (always rejected).
    pub fn with_race_condition_ttl(mut self, window: Duration) -> Self {
        self.defaults.race_condition_ttl = Some(window);
        self
    }

    /// Enable or disable metrics emission.
    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }

    /// Set backfill scheduling.
    pub fn with_backfill(mut self, mode: BackfillMode) -> Self {
        self.backfill = mode;
        self
    }

    /// Reject options the cascade cannot honor.
    ///
    /// Runs before any store is built or contacted.
    pub fn validate(&self) -> CacheResult<()> {
        if self.defaults.race_condition_ttl.is_some() {
            return Err(race_condition_ttl_unsupported());
        }
        for (index, spec) in self.tiers.iter().enumerate() {
            if let TierOptions::Override(options) = &spec.options {
                if options.race_condition_ttl.is_some() {
                    return Err(CacheError::Config(format!(
                        "tier {}: race_condition_ttl is not supported in a cascade store",
                        index
                    )));
                }
            }
        }
        Ok(())
    }
}

pub(crate) fn race_condition_ttl_unsupported() -> CacheError {
    CacheError::Config("race_condition_ttl is not supported in a cascade store".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = CascadeConfig::new()
            .tier(TierSpec::memory())
            .tier(TierSpec::memory().with_options(StoreOptions::new().with_expires_in(Duration::from_secs(60))))
            .with_expires_in(Duration::from_secs(300))
            .with_namespace("app")
            .with_metrics(true);

        assert_eq!(config.tiers.len(), 2);
        assert_eq!(config.defaults.expires_in, Some(Duration::from_secs(300)));
        assert_eq!(config.namespace, Some("app".to_string()));
        assert!(config.metrics_enabled);
        assert_eq!(config.backfill, BackfillMode::Inline);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tier_options_resolve() {
        let defaults = StoreOptions::new().with_expires_in(Duration::from_secs(300));

        assert_eq!(TierOptions::Shared.resolve(&defaults), defaults);

        let tier = TierOptions::Override(StoreOptions::new().with_expires_in(Duration::from_secs(5)));
        let resolved = tier.resolve(&defaults);
        assert_eq!(resolved.expires_in, Some(Duration::from_secs(5)));
        assert_eq!(resolved.race_condition_ttl, None);

        let tier = TierOptions::Override(StoreOptions::new());
        assert_eq!(tier.resolve(&defaults).expires_in, Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_validate_rejects_shared_race_condition_ttl() {
        let config = CascadeConfig::new()
            .tier(TierSpec::memory())
            .with_race_condition_ttl(Duration::from_secs(10));

        let err = config.validate().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("race_condition_ttl"));
    }

    #[test]
    fn test_validate_rejects_tier_race_condition_ttl() {
        let config = CascadeConfig::new().tier(TierSpec::memory()).tier(
            TierSpec::memory()
                .with_options(StoreOptions::new().with_race_condition_ttl(Duration::from_secs(10))),
        );

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("tier 1"));
    }
}
