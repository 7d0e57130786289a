//! Integration tests for common cascade workflows.
//!
//! These tests drive the cache through the root crate the way an
//! application would.

use cascade::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Product {
    id: u64,
    name: String,
    price_cents: u64,
}

async fn load_product(id: u64) -> CacheResult<Product> {
    Ok(Product {
        id,
        name: format!("product-{}", id),
        price_cents: id * 100,
    })
}

// =============================================================================
// Read-through caching
// =============================================================================

#[tokio::test]
async fn test_read_through_product_lookup() {
    init_tracing();

    let local = Arc::new(InMemoryStore::new());
    let shared = Arc::new(InMemoryStore::new());
    let cache = CascadeCache::new(
        CascadeConfig::new()
            .tier(TierSpec::store(local.clone()).with_options(
                StoreOptions::new().with_expires_in(Duration::from_secs(30)),
            ))
            .tier(TierSpec::store(shared.clone()))
            .with_expires_in(Duration::from_secs(600)),
    )
    .await
    .unwrap();

    let key = ["products", "7"];
    let product: Product = cache.fetch(&key, || load_product(7)).await.unwrap();
    assert_eq!(product.price_cents, 700);

    // Another process warmed only the shared tier
    let other = CascadeCache::new(
        CascadeConfig::new()
            .tier(TierSpec::memory())
            .tier(TierSpec::store(shared.clone())),
    )
    .await
    .unwrap();
    let cached: Option<Product> = other.read(&key).await.unwrap();
    assert_eq!(cached, Some(product));
}

#[tokio::test]
async fn test_batch_lookup_with_partial_hits() {
    init_tracing();

    let cache = CascadeCache::new(
        CascadeConfig::new()
            .tier(TierSpec::memory())
            .tier(TierSpec::memory()),
    )
    .await
    .unwrap();

    for id in [1u64, 3] {
        let product = load_product(id).await.unwrap();
        cache.write(&vec!["products".to_string(), id.to_string()], &product).await.unwrap();
    }

    let keys: Vec<String> = (1..=3).map(|id| format!("products/{}", id)).collect();
    let found: HashMap<String, Product> = cache.read_many(&keys).await.unwrap();
    assert_eq!(found.len(), 2);
    assert!(found.contains_key("products/1"));
    assert!(!found.contains_key("products/2"));
}

// =============================================================================
// Invalidation and counters
// =============================================================================

#[tokio::test]
async fn test_session_namespace_invalidation() {
    init_tracing();

    let cache = CascadeCache::new(
        CascadeConfig::new()
            .tier(TierSpec::memory())
            .tier(TierSpec::memory()),
    )
    .await
    .unwrap();
    let sessions = cache.namespaced("sessions");

    sessions.write("user:1:abc", &"token-a").await.unwrap();
    sessions.write("user:2:def", &"token-b").await.unwrap();
    cache.write("user:1:profile", &"kept").await.unwrap();

    sessions
        .delete_matching(&KeyPattern::glob("user:1:*").unwrap())
        .await
        .unwrap();

    assert!(!sessions.exist("user:1:abc").await.unwrap());
    assert!(sessions.exist("user:2:def").await.unwrap());
    assert!(cache.exist("user:1:profile").await.unwrap());
}

#[tokio::test]
async fn test_page_view_counter() {
    init_tracing();

    let cache = CascadeCache::new(CascadeConfig::new().tier(TierSpec::memory())).await.unwrap();

    assert_eq!(cache.increment("views", 1).await.unwrap(), None);

    cache.write("views", &0).await.unwrap();
    for _ in 0..5 {
        cache.increment("views", 1).await.unwrap();
    }
    assert_eq!(cache.read::<i64, _>("views").await.unwrap(), Some(5));
    assert_eq!(cache.decrement("views", 2).await.unwrap(), Some(3));
}

// =============================================================================
// Metrics and configuration
// =============================================================================

#[tokio::test]
async fn test_tier_metrics() {
    init_tracing();

    let metrics = Arc::new(RecordingMetrics::new());
    let cache = CascadeCache::with_metrics(
        CascadeConfig::new()
            .tier(TierSpec::memory())
            .tier(TierSpec::memory())
            .with_metrics(true),
        metrics.clone(),
    )
    .await
    .unwrap();

    cache.read::<String, _>("missing").await.unwrap();
    assert_eq!(metrics.count("cascade.l0_memory.miss"), 1);
    assert_eq!(metrics.count("cascade.l1_memory.miss"), 1);

    cache.write("foo", &"bar").await.unwrap();
    cache.read::<String, _>("foo").await.unwrap();
    assert_eq!(metrics.count("cascade.l0_memory.hit"), 1);
    assert_eq!(metrics.count("cascade.l1_memory.hit"), 0);
}

#[tokio::test]
async fn test_metrics_disabled_records_nothing() {
    let metrics = Arc::new(RecordingMetrics::new());
    let cache = CascadeCache::with_metrics(
        CascadeConfig::new().tier(TierSpec::memory()),
        metrics.clone(),
    )
    .await
    .unwrap();

    cache.read::<String, _>("missing").await.unwrap();
    assert!(metrics.snapshot().is_empty());
}

#[tokio::test]
async fn test_stale_window_is_a_configuration_error() {
    let result = CascadeCache::new(
        CascadeConfig::new()
            .tier(TierSpec::memory())
            .with_race_condition_ttl(Duration::from_secs(1)),
    )
    .await;

    match result {
        Err(CacheError::Config(message)) => assert!(message.contains("race_condition_ttl")),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("configuration should be rejected"),
    }
}
