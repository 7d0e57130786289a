//! Metrics sinks for per-tier cascade events.

use parking_lot::Mutex;
use std::collections::HashMap;

/// Fire-and-forget counter sink.
///
/// `record` must not block on I/O or panic; the cascade calls it inline on
/// every tier access.
pub trait MetricsSink: Send + Sync {
    fn record(&self, event: &str, count: u64);
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn record(&self, _event: &str, _count: u64) {}
}

/// Sink that keeps counters in memory.
#[derive(Debug, Default)]
pub struct RecordingMetrics {
    counters: Mutex<HashMap<String, u64>>,
}

impl RecordingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a counter, zero if never recorded.
    pub fn count(&self, event: &str) -> u64 {
        self.counters.lock().get(event).copied().unwrap_or(0)
    }

    /// Copy of every counter.
    pub fn snapshot(&self) -> HashMap<String, u64> {
        self.counters.lock().clone()
    }

    pub fn reset(&self) {
        self.counters.lock().clear();
    }
}

impl MetricsSink for RecordingMetrics {
    fn record(&self, event: &str, count: u64) {
        *self.counters.lock().entry(event.to_string()).or_insert(0) += count;
    }
}

/// Outcome of a tier access, as reported to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierEvent {
    Hit,
    Miss,
    Error,
    Backfill,
}

impl TierEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            TierEvent::Hit => "hit",
            TierEvent::Miss => "miss",
            TierEvent::Error => "error",
            TierEvent::Backfill => "backfill",
        }
    }
}

/// Metric name for an event on a tier: `cascade.<tier-label>.<event>`.
pub fn event_name(tier_label: &str, event: TierEvent) -> String {
    format!("cascade.{}.{}", tier_label, event.as_str())
}

#[cfg(feature = "prometheus")]
pub use self::prometheus_sink::PrometheusMetrics;

#[cfg(feature = "prometheus")]
mod prometheus_sink {
    use super::MetricsSink;
    use prometheus::{IntCounterVec, Opts, Registry};

    /// Sink backed by a Prometheus counter vector.
    ///
    /// Event names of the form `cascade.<tier>.<outcome>` are split into
    /// `tier` and `outcome` labels; anything else is counted under the
    /// `other` tier.
    pub struct PrometheusMetrics {
        events: IntCounterVec,
    }

    impl PrometheusMetrics {
        /// Create the counter and register it with `registry`.
        pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
            let events = IntCounterVec::new(
                Opts::new("cascade_tier_events_total", "Cascade tier accesses by outcome"),
                &["tier", "outcome"],
            )?;
            registry.register(Box::new(events.clone()))?;
            Ok(Self { events })
        }

        pub fn counter(&self) -> &IntCounterVec {
            &self.events
        }
    }

    impl MetricsSink for PrometheusMetrics {
        fn record(&self, event: &str, count: u64) {
            let mut parts = event.splitn(3, '.');
            let (tier, outcome) = match (parts.next(), parts.next(), parts.next()) {
                (Some("cascade"), Some(tier), Some(outcome)) => (tier, outcome),
                _ => ("other", event),
            };
            self.events.with_label_values(&[tier, outcome]).inc_by(count);
        }
    }

}
