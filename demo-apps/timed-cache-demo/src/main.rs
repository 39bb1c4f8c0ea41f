use anyhow::{ensure, Context, Result};
use chrono::TimeDelta;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use timed_cache_core::{CacheConfig, TimedCache, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const WORKERS_ENV: &str = "TIMED_CACHE_DEMO_WORKERS";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "timed_cache_demo=info,timed_cache_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Configuration from environment variables
    let config = CacheConfig::from_env().context("invalid cache configuration")?;
    let workers: usize = std::env::var(WORKERS_ENV)
        .unwrap_or_else(|_| "50".to_string())
        .parse::<usize>()
        .unwrap_or(50)
        .max(1);

    tracing::info!("🧪 Timed Cache Demo");
    tracing::info!("   Shards: {:?}", config.shard_amount);
    tracing::info!("   Workers: {}", workers);

    let cache: TimedCache = TimedCache::with_config(config)?;

    test_basic_operations(&cache)?;
    test_typed_accessors(&cache)?;
    test_parallel_set_get(&cache, workers).await?;
    test_data_isolation(&cache, workers).await?;
    test_expiration(&cache).await?;
    test_concurrent_eviction(&cache, workers).await?;

    tracing::info!("✅ All checks passed ({} entries left in cache)", cache.len());

    Ok(())
}

/// SET/GET/DELETE round trip
fn test_basic_operations(cache: &TimedCache) -> Result<()> {
    tracing::info!("Test: Basic Operations");

    let key = format!("basic-test-{}", uuid::Uuid::new_v4());
    cache.set(key.clone(), "hello world", TimeDelta::seconds(60));

    ensure!(
        cache.get_string(&key).as_deref() == Some("hello world"),
        "value should round-trip"
    );

    cache.set(key.clone(), "replaced", TimeDelta::seconds(120));
    ensure!(
        cache.get_string(&key).as_deref() == Some("replaced"),
        "overwrite should win"
    );
    let ttl = cache.ttl(&key).context("ttl should be present")?;
    ensure!(ttl > TimeDelta::seconds(60), "ttl should follow the overwrite, got {ttl}");

    ensure!(cache.delete(&key), "key should be deleted");
    ensure!(cache.get(&key).is_none(), "key should not be found after delete");
    ensure!(!cache.delete(&key), "second delete should be a no-op");

    tracing::info!("   ✓ Basic operations work correctly");
    Ok(())
}

/// Typed reads decode matching kinds and miss on the rest
fn test_typed_accessors(cache: &TimedCache) -> Result<()> {
    tracing::info!("Test: Typed Accessors");

    let prefix = uuid::Uuid::new_v4();
    let int_key = format!("{prefix}-int");
    let text_key = format!("{prefix}-text");

    cache.set(int_key.clone(), 42i32, TimeDelta::seconds(60));
    cache.set(text_key.clone(), "forty-two", TimeDelta::seconds(60));

    ensure!(cache.get_i64(&int_key) == Some(42), "i32 should widen to i64");
    ensure!(cache.get_i64(&text_key).is_none(), "string should not decode as i64");
    ensure!(cache.get_string(&int_key).is_none(), "i32 should not decode as string");

    match cache.try_get::<i64>(&text_key) {
        Err(err) if err.is_type_mismatch() => tracing::info!("   try_get reported: {}", err),
        other => anyhow::bail!("expected a type mismatch, got {:?}", other),
    }

    let _ = cache.delete(&int_key);
    let _ = cache.delete(&text_key);

    tracing::info!("   ✓ Typed accessors fail closed on mismatched types");
    Ok(())
}

/// Parallel SET and GET from many tasks, verifying no data mixing
async fn test_parallel_set_get(cache: &TimedCache, workers: usize) -> Result<()> {
    let num_operations = workers * 100;
    tracing::info!("Test: Parallel SET/GET ({} operations)", num_operations);

    let start = Instant::now();

    let test_data: Vec<(String, String)> = (0..num_operations)
        .map(|i| {
            let key = format!("parallel-test-{}-{}", i, uuid::Uuid::new_v4());
            let value = format!("value-{}-{}", i, uuid::Uuid::new_v4());
            (key, value)
        })
        .collect();
    let test_data = Arc::new(test_data);

    let set_futures: Vec<_> = (0..workers)
        .map(|worker| {
            let cache = cache.clone();
            let test_data = Arc::clone(&test_data);
            tokio::spawn(async move {
                for (key, value) in test_data.iter().skip(worker).step_by(workers) {
                    cache.set(key.clone(), value.as_str(), TimeDelta::seconds(300));
                }
            })
        })
        .collect();

    for joined in join_all(set_futures).await {
        joined?;
    }
    let set_elapsed = start.elapsed();
    tracing::info!("   SET {} keys in {:?}", num_operations, set_elapsed);

    let get_start = Instant::now();
    let errors = Arc::new(AtomicUsize::new(0));

    let get_futures: Vec<_> = (0..workers)
        .map(|worker| {
            let cache = cache.clone();
            let test_data = Arc::clone(&test_data);
            let errors = Arc::clone(&errors);
            tokio::spawn(async move {
                for (key, expected) in test_data.iter().skip(worker).step_by(workers) {
                    match cache.get_string(key) {
                        Some(value) if &value == expected => {}
                        other => {
                            tracing::error!(
                                "Value mismatch for key {}: expected '{}', got '{:?}'",
                                key,
                                expected,
                                other
                            );
                            errors.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                }
            })
        })
        .collect();

    for joined in join_all(get_futures).await {
        joined?;
    }
    let get_elapsed = get_start.elapsed();

    tracing::info!("   GET {} keys in {:?}", num_operations, get_elapsed);
    tracing::info!(
        "   Throughput: {:.0} ops/sec (SET), {:.0} ops/sec (GET)",
        num_operations as f64 / set_elapsed.as_secs_f64(),
        num_operations as f64 / get_elapsed.as_secs_f64()
    );

    let error_count = errors.load(Ordering::SeqCst);
    ensure!(error_count == 0, "{} values did not round-trip", error_count);

    for (key, _) in test_data.iter() {
        let _ = cache.delete(key);
    }

    tracing::info!("   ✓ All {} values verified correctly", num_operations);
    Ok(())
}

/// Concurrent writers on disjoint keys never see each other's values
async fn test_data_isolation(cache: &TimedCache, workers: usize) -> Result<()> {
    tracing::info!("Test: Data Isolation (concurrent writes to different keys)");

    let ops_per_worker = 20;

    let worker_futures: Vec<_> = (0..workers)
        .map(|worker_id| {
            let cache = cache.clone();
            tokio::spawn(async move {
                let mut written = HashMap::new();
                for op in 0..ops_per_worker {
                    let key = format!("isolation-worker{}-op{}", worker_id, op);
                    let value = Value::from((worker_id * ops_per_worker + op) as u64);
                    cache.set(key.clone(), value.clone(), TimeDelta::seconds(300));
                    written.insert(key, value);
                }
                written
            })
        })
        .collect();

    let mut expected = HashMap::new();
    for joined in join_all(worker_futures).await {
        expected.extend(joined?);
    }

    let mut errors = 0;
    for (key, expected_value) in &expected {
        let got = cache.get(key);
        if got.as_ref() != Some(expected_value) {
            tracing::error!(
                "Isolation failure: key={}, expected={:?}, got={:?}",
                key,
                expected_value,
                got
            );
            errors += 1;
        }
        let _ = cache.delete(key);
    }

    ensure!(errors == 0, "{} isolation failures", errors);
    tracing::info!("   ✓ {} keys verified, no cross-contamination", expected.len());

    Ok(())
}

/// Entries vanish after their TTL and the read that notices evicts them
async fn test_expiration(cache: &TimedCache) -> Result<()> {
    tracing::info!("Test: TTL Expiration");

    let key = format!("expire-test-{}", uuid::Uuid::new_v4());
    cache.set(key.clone(), "hello", TimeDelta::milliseconds(50));

    ensure!(
        cache.get_string(&key).as_deref() == Some("hello"),
        "key should exist immediately"
    );

    tracing::info!("   Waiting 60ms for expiration...");
    tokio::time::sleep(Duration::from_millis(60)).await;

    ensure!(
        cache.expires_at(&key).is_some(),
        "expiry metadata should survive until a read evicts the entry"
    );
    ensure!(
        cache.ttl(&key).is_some_and(|ttl| ttl < TimeDelta::zero()),
        "remaining ttl should be negative once expired"
    );
    ensure!(cache.get(&key).is_none(), "key should be expired after TTL");
    ensure!(
        cache.expires_at(&key).is_none(),
        "expired key should have been evicted by the read"
    );

    tracing::info!("   ✓ TTL expiration works correctly");
    Ok(())
}

/// Many readers racing to evict the same expired keys
async fn test_concurrent_eviction(cache: &TimedCache, workers: usize) -> Result<()> {
    tracing::info!("Test: Concurrent Lazy Eviction");

    let keys: Arc<Vec<String>> = Arc::new(
        (0..1000)
            .map(|i| format!("evict-test-{}-{}", i, uuid::Uuid::new_v4()))
            .collect(),
    );
    for key in keys.iter() {
        cache.set(key.clone(), true, TimeDelta::milliseconds(-1));
    }

    let hits = Arc::new(AtomicUsize::new(0));
    let reader_futures: Vec<_> = (0..workers)
        .map(|_| {
            let cache = cache.clone();
            let keys = Arc::clone(&keys);
            let hits = Arc::clone(&hits);
            tokio::spawn(async move {
                for key in keys.iter() {
                    if cache.get_bool(key).is_some() {
                        hits.fetch_add(1, Ordering::SeqCst);
                    }
                }
            })
        })
        .collect();

    for joined in join_all(reader_futures).await {
        joined?;
    }

    ensure!(
        hits.load(Ordering::SeqCst) == 0,
        "expired entries must never be returned"
    );
    let leftover = keys.iter().filter(|k| cache.expires_at(k).is_some()).count();
    ensure!(leftover == 0, "{} expired keys were not evicted", leftover);

    tracing::info!("   ✓ {} expired keys evicted without a hit", keys.len());
    Ok(())
}
