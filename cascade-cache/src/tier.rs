//! Tiers and the per-tier invocation boundary.

use crate::error::{CacheError, CacheResult, TierFault, TierOperation};
use crate::traits::{Capabilities, CacheStore};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Per-tier outcome of one operation.
#[derive(Debug)]
pub enum TierOutcome<T> {
    /// The tier produced a value
    Value(T),
    /// The tier had nothing for the key
    Miss,
    /// The tier failed; the fault is kept for logging only
    Fault(TierFault),
}

impl<T> TierOutcome<T> {
    pub fn is_fault(&self) -> bool {
        matches!(self, TierOutcome::Fault(_))
    }

    /// The value, folding misses and faults into `None`.
    pub fn value(self) -> Option<T> {
        match self {
            TierOutcome::Value(value) => Some(value),
            TierOutcome::Miss | TierOutcome::Fault(_) => None,
        }
    }
}

/// One position in the cascade.
#[derive(Clone)]
pub struct Tier {
    index: usize,
    label: String,
    store: Arc<dyn CacheStore>,
    capabilities: Capabilities,
    default_ttl: Option<Duration>,
}

impl Tier {
    /// Build a tier, reading the store's capabilities once.
    pub fn new(index: usize, store: Arc<dyn CacheStore>, default_ttl: Option<Duration>) -> Self {
        let capabilities = store.capabilities();
        let label = format!("l{}_{}", index, store.name());
        Self {
            index,
            label,
            store,
            capabilities,
            default_ttl,
        }
    }

    /// Position in the cascade, 0 being the fastest.
    pub fn index(&self) -> usize {
        self.index
    }

    /// `l<index>_<store name>`, used in logs and metric names.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// TTL applied to writes and backfills that carry none of their own.
    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    /// Run one store call, turning an adapter error into a [`TierFault`].
    ///
    /// `Ok(None)` becomes [`TierOutcome::Miss`].
    pub async fn invoke<T, F>(&self, operation: TierOperation, call: F) -> TierOutcome<T>
    where
        F: Future<Output = CacheResult<Option<T>>>,
    {
        match call.await {
            Ok(Some(value)) => TierOutcome::Value(value),
            Ok(None) => TierOutcome::Miss,
            Err(source) => TierOutcome::Fault(self.fault(operation, source)),
        }
    }

    /// Like [`Tier::invoke`] for calls without a result value.
    pub async fn invoke_unit<F>(&self, operation: TierOperation, call: F) -> TierOutcome<()>
    where
        F: Future<Output = CacheResult<()>>,
    {
        self.invoke(operation, async { call.await.map(Some) }).await
    }

    fn fault(&self, operation: TierOperation, source: CacheError) -> TierFault {
        TierFault {
            tier: self.index,
            store: self.store.name().to_string(),
            operation,
            source,
        }
    }
}

impl fmt::Debug for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tier")
            .field("index", &self.index)
            .field("label", &self.label)
            .field("capabilities", &self.capabilities)
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

/// Ordered, immutable list of tiers. Cheap to clone.
#[derive(Debug, Clone)]
pub struct TierList {
    tiers: Arc<[Tier]>,
}

impl TierList {
    /// Build from stores in cascade order, pairing each with its default TTL.
    pub fn new(stores: Vec<(Arc<dyn CacheStore>, Option<Duration>)>) -> Self {
        let tiers: Vec<Tier> = stores
            .into_iter()
            .enumerate()
            .map(|(index, (store, ttl))| Tier::new(index, store, ttl))
            .collect();
        Self {
            tiers: tiers.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Tier> {
        self.tiers.get(index)
    }

    pub fn first(&self) -> Option<&Tier> {
        self.tiers.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tier> {
        self.tiers.iter()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.tiers.iter().map(Tier::label).collect()
    }
}

impl<'a> IntoIterator for &'a TierList {
    type Item = &'a Tier;
    type IntoIter = std::slice::Iter<'a, Tier>;

    fn into_iter(self) -> Self::IntoIter {
        self.tiers.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;

    #[test]
    fn test_tier_list_order_and_labels() {
        let tiers = TierList::new(vec![
            (Arc::new(InMemoryStore::new()) as Arc<dyn CacheStore>, None),
            (
                Arc::new(InMemoryStore::new()) as Arc<dyn CacheStore>,
                Some(Duration::from_secs(60)),
            ),
        ]);

        assert_eq!(tiers.len(), 2);
        assert_eq!(tiers.labels(), vec!["l0_memory", "l1_memory"]);
        assert_eq!(tiers.get(1).unwrap().default_ttl(), Some(Duration::from_secs(60)));
        assert_eq!(tiers.first().unwrap().capabilities(), Capabilities::all());
    }

    #[tokio::test]
    async fn test_invoke_maps_outcomes() {
        let tier = Tier::new(0, Arc::new(InMemoryStore::new()), None);

        let hit = tier.invoke(TierOperation::Get, async { Ok(Some(1)) }).await;
        assert!(matches!(hit, TierOutcome::Value(1)));

        let miss: TierOutcome<i32> = tier.invoke(TierOperation::Get, async { Ok(None) }).await;
        assert!(matches!(miss, TierOutcome::Miss));

        let fault: TierOutcome<i32> = tier
            .invoke(TierOperation::Set, async { Err(CacheError::Timeout) })
            .await;
        match fault {
            TierOutcome::Fault(fault) => {
                assert_eq!(fault.tier, 0);
                assert_eq!(fault.store, "memory");
                assert_eq!(fault.operation, TierOperation::Set);
            }
            other => panic!("expected fault, got {:?}", other),
        }

        let unit = tier.invoke_unit(TierOperation::Delete, async { Ok(()) }).await;
        assert!(matches!(unit, TierOutcome::Value(())));
    }
}
