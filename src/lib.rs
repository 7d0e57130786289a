// Cascade - a multi-tier cache for Rust
//
// This library presents an ordered list of cache stores as a single cache,
// with read-through backfill and per-tier fault isolation.

// Re-export the cache crate
pub use cascade_cache::*;

// Prelude for common imports
pub mod prelude {
    pub use cascade_cache::prelude::*;
    pub use cascade_cache::{BackfillMode, MetricsSink, RecordingMetrics};
}
