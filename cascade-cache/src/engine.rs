//! The cascade engine.
//!
//! Single-key reads walk the tiers in order and stop at the first live hit;
//! every other operation fans out to all tiers concurrently. Each store call
//! goes through [`Tier::invoke`], so a failing tier is reported here once and
//! then treated as a miss (reads) or a no-op (writes, deletes, counters).

use crate::config::BackfillMode;
use crate::entry::CacheEntry;
use crate::error::{TierFault, TierOperation};
use crate::metrics::{MetricsSink, TierEvent, event_name};
use crate::pattern::KeyPattern;
use crate::tier::{Tier, TierList, TierOutcome};
use futures::future::join_all;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// A live entry and the tier that served it.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    pub entry: CacheEntry,
    pub tier: usize,
}

/// Orchestrates operations across an immutable [`TierList`].
///
/// Holds no mutable state of its own; all state lives in the stores.
#[derive(Clone)]
pub struct CascadeEngine {
    tiers: TierList,
    metrics: Arc<dyn MetricsSink>,
    backfill: BackfillMode,
}

impl CascadeEngine {
    pub fn new(tiers: TierList, metrics: Arc<dyn MetricsSink>, backfill: BackfillMode) -> Self {
        Self {
            tiers,
            metrics,
            backfill,
        }
    }

    pub fn tiers(&self) -> &TierList {
        &self.tiers
    }

    pub fn backfill_mode(&self) -> BackfillMode {
        self.backfill
    }

    /// Find the first live entry for `key`, backfilling the tiers that
    /// missed before it.
    ///
    /// Expired entries are deleted from their tier and count as a miss. A
    /// faulting tier also counts as a miss.
    pub async fn lookup(&self, key: &str) -> Option<Lookup> {
        let mut found = None;

        for tier in &self.tiers {
            let outcome = tier
                .invoke(TierOperation::Get, tier.store().get_entry(key))
                .await;

            match outcome {
                TierOutcome::Value(entry) if entry.is_expired() => {
                    tracing::debug!(tier = tier.label(), key, "expired entry");
                    self.evict(tier, key).await;
                    record(self.metrics.as_ref(), tier, TierEvent::Miss, 1);
                }
                TierOutcome::Value(entry) => {
                    tracing::debug!(tier = tier.label(), key, "cascade hit");
                    record(self.metrics.as_ref(), tier, TierEvent::Hit, 1);
                    found = Some(Lookup {
                        entry,
                        tier: tier.index(),
                    });
                    break;
                }
                TierOutcome::Miss => {
                    record(self.metrics.as_ref(), tier, TierEvent::Miss, 1);
                }
                TierOutcome::Fault(fault) => {
                    report_fault(self.metrics.as_ref(), tier, &fault);
                }
            }
        }

        let found = found?;
        if found.tier > 0 {
            let targets: Vec<usize> = (0..found.tier).collect();
            let writes = vec![(key.to_string(), found.entry.value().clone())];
            self.backfill(targets, writes).await;
        }
        Some(found)
    }

    /// Read a value. Total failure of every tier is indistinguishable from
    /// a genuine miss.
    pub async fn read(&self, key: &str) -> Option<Value> {
        self.lookup(key)
            .await
            .map(|found| found.entry.into_value())
    }

    /// Read several keys. Absent keys are left out of the result.
    ///
    /// Tier 0 is queried with every key; the remaining tiers are queried in
    /// order with the keys still missing. Keys served below tier 0 are
    /// written back to tier 0.
    pub async fn read_many(&self, keys: &[String]) -> HashMap<String, Value> {
        let mut seen = HashSet::with_capacity(keys.len());
        let keys: Vec<String> = keys
            .iter()
            .filter(|key| seen.insert(key.as_str()))
            .cloned()
            .collect();

        let mut found = HashMap::with_capacity(keys.len());
        let mut tiers = self.tiers.iter();
        let Some(first) = tiers.next() else {
            return found;
        };

        for (key, entry) in self.fetch_live(first, &keys).await {
            found.insert(key, entry.into_value());
        }

        let mut missing: Vec<String> = keys
            .into_iter()
            .filter(|key| !found.contains_key(key))
            .collect();
        if missing.is_empty() {
            return found;
        }

        let mut resolved = Vec::new();
        for tier in tiers {
            if missing.is_empty() {
                break;
            }
            for (key, entry) in self.fetch_live(tier, &missing).await {
                let value = entry.into_value();
                resolved.push((key.clone(), value.clone()));
                found.insert(key, value);
            }
            missing.retain(|key| !found.contains_key(key));
        }

        if !resolved.is_empty() {
            self.backfill(vec![0], resolved).await;
        }
        found
    }

    /// Write to every tier. Per-tier failures are logged and ignored.
    ///
    /// `expires_in` applies to every tier; without it each tier uses its own
    /// default TTL.
    pub async fn write(&self, key: &str, value: &Value, expires_in: Option<Duration>) -> bool {
        let writes = self.tiers.iter().map(|tier| async move {
            let entry = CacheEntry::new(value.clone(), expires_in.or(tier.default_ttl()));
            let outcome = tier
                .invoke_unit(TierOperation::Set, tier.store().set_entry(key, entry))
                .await;
            self.settle(tier, outcome)
        });
        join_all(writes).await;
        true
    }

    /// Delete from every tier. Per-tier failures are logged and ignored.
    pub async fn delete(&self, key: &str) -> bool {
        let deletes = self.tiers.iter().map(|tier| self.evict(tier, key));
        join_all(deletes).await;
        true
    }

    /// Delete matching keys from every tier that supports it.
    pub async fn delete_matching(&self, pattern: &KeyPattern) {
        let deletes = self.tiers.iter().map(|tier| async move {
            if !tier.capabilities().delete_matching {
                tracing::debug!(tier = tier.label(), "skipping delete_matching");
                return;
            }
            let outcome = tier
                .invoke_unit(
                    TierOperation::DeleteMatching,
                    tier.store().delete_matching(pattern),
                )
                .await;
            self.settle(tier, outcome);
        });
        join_all(deletes).await;
    }

    /// Increment on every tier, returning the first value in tier order.
    ///
    /// Tiers are not kept numerically consistent with each other.
    pub async fn increment(&self, key: &str, amount: i64) -> Option<i64> {
        self.count(key, amount, TierOperation::Increment).await
    }

    /// Decrement on every tier, returning the first value in tier order.
    pub async fn decrement(&self, key: &str, amount: i64) -> Option<i64> {
        self.count(key, amount, TierOperation::Decrement).await
    }

    /// Flush every tier that supports it.
    pub async fn clear(&self) {
        let clears = self.tiers.iter().map(|tier| async move {
            if !tier.capabilities().clear {
                tracing::debug!(tier = tier.label(), "skipping clear");
                return;
            }
            let outcome = tier
                .invoke_unit(TierOperation::Clear, tier.store().clear())
                .await;
            self.settle(tier, outcome);
        });
        join_all(clears).await;
    }

    async fn count(&self, key: &str, amount: i64, operation: TierOperation) -> Option<i64> {
        let counters = self.tiers.iter().map(|tier| async move {
            if !tier.capabilities().counters {
                return None;
            }
            let call = match operation {
                TierOperation::Decrement => tier.store().decrement(key, amount),
                _ => tier.store().increment(key, amount),
            };
            let outcome = tier.invoke(operation, call).await;
            self.settle(tier, outcome)
        });
        join_all(counters).await.into_iter().flatten().next()
    }

    /// Live entries a tier holds for `keys`, deleting expired ones.
    async fn fetch_live(&self, tier: &Tier, keys: &[String]) -> HashMap<String, CacheEntry> {
        let entries = if tier.capabilities().batch_get {
            let outcome = tier
                .invoke(TierOperation::GetMany, async {
                    tier.store().get_many_entries(keys).await.map(Some)
                })
                .await;
            self.settle(tier, outcome).unwrap_or_default()
        } else {
            let gets = keys.iter().map(|key| async move {
                let outcome = tier
                    .invoke(TierOperation::Get, tier.store().get_entry(key))
                    .await;
                self.settle(tier, outcome).map(|entry| (key.clone(), entry))
            });
            join_all(gets).await.into_iter().flatten().collect()
        };

        let (live, expired): (HashMap<_, _>, HashMap<_, _>) = entries
            .into_iter()
            .partition(|(_, entry)| !entry.is_expired());
        if !expired.is_empty() {
            join_all(expired.keys().map(|key| self.evict(tier, key))).await;
        }

        record(self.metrics.as_ref(), tier, TierEvent::Hit, live.len() as u64);
        record(
            self.metrics.as_ref(),
            tier,
            TierEvent::Miss,
            keys.len().saturating_sub(live.len()) as u64,
        );
        live
    }

    async fn evict(&self, tier: &Tier, key: &str) {
        let outcome = tier
            .invoke_unit(TierOperation::Delete, tier.store().delete_entry(key))
            .await;
        self.settle(tier, outcome);
    }

    async fn backfill(&self, targets: Vec<usize>, writes: Vec<(String, Value)>) {
        let job = apply_backfill(self.tiers.clone(), self.metrics.clone(), targets, writes);
        match self.backfill {
            BackfillMode::Inline => job.await,
            BackfillMode::Background => match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(job);
                }
                Err(_) => job.await,
            },
        }
    }

    /// Report a fault if there is one and return the value.
    fn settle<T>(&self, tier: &Tier, outcome: TierOutcome<T>) -> Option<T> {
        if let TierOutcome::Fault(fault) = &outcome {
            report_fault(self.metrics.as_ref(), tier, fault);
        }
        outcome.value()
    }
}

async fn apply_backfill(
    tiers: TierList,
    metrics: Arc<dyn MetricsSink>,
    targets: Vec<usize>,
    writes: Vec<(String, Value)>,
) {
    let mut pending = Vec::with_capacity(targets.len() * writes.len());
    for tier in targets.iter().filter_map(|&index| tiers.get(index)) {
        for (key, value) in &writes {
            let metrics = metrics.as_ref();
            pending.push(async move {
                let entry = CacheEntry::new(value.clone(), tier.default_ttl());
                let outcome = tier
                    .invoke_unit(TierOperation::Set, tier.store().set_entry(key, entry))
                    .await;
                match outcome {
                    TierOutcome::Fault(fault) => report_fault(metrics, tier, &fault),
                    _ => {
                        tracing::debug!(tier = tier.label(), key = key.as_str(), "backfilled");
                        record(metrics, tier, TierEvent::Backfill, 1);
                    }
                }
            });
        }
    }
    join_all(pending).await;
}

fn record(metrics: &dyn MetricsSink, tier: &Tier, event: TierEvent, count: u64) {
    if count > 0 {
        metrics.record(&event_name(tier.label(), event), count);
    }
}

fn report_fault(metrics: &dyn MetricsSink, tier: &Tier, fault: &TierFault) {
    tracing::warn!(
        tier = fault.tier,
        store = fault.store.as_str(),
        operation = fault.operation.as_str(),
        error = %fault.source,
        "cascade tier fault"
    );
    record(metrics, tier, TierEvent::Error, 1);
}
