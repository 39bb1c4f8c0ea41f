use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use std::sync::{Arc, OnceLock};

use crate::clock::Clock;
use crate::config::CacheConfig;
use crate::entry::Entry;
use crate::error::{CacheError, ConfigError, TypeMismatch};
use crate::value::Value;

/// Internal shared state for the cache
struct CacheInner<V> {
    data: DashMap<String, Entry<V>>,
    clock: Arc<dyn Clock>,
}

/// Thread-safe in-memory key-value cache with per-entry TTL
///
/// Uses `DashMap` for sharded concurrent access. Reads never block other
/// reads, and writes only block the shard holding the key being written.
///
/// Expiry is lazy: nothing runs in the background. An expired entry stays in
/// the map until a [`get`](Self::get) (or [`contains_key`](Self::contains_key))
/// observes it and removes it, or until [`purge_expired`](Self::purge_expired)
/// is called.
///
/// Values default to the dynamically typed [`Value`], which comes with typed
/// accessors such as [`get_string`](Self::get_string) and
/// [`get_i64`](Self::get_i64). Any `Clone` type can be used instead.
///
/// # Example
///
/// ```rust
/// use chrono::TimeDelta;
/// use timed_cache_core::TimedCache;
///
/// let cache = TimedCache::new();
/// cache.set("greeting", "hello", TimeDelta::seconds(60));
/// cache.set("answer", 42i32, TimeDelta::seconds(60));
///
/// assert_eq!(cache.get_string("greeting").as_deref(), Some("hello"));
/// assert_eq!(cache.get_i64("answer"), Some(42));
/// // Wrong type is a miss, not a panic
/// assert_eq!(cache.get_i64("greeting"), None);
/// ```
pub struct TimedCache<V = Value> {
    inner: Arc<CacheInner<V>>,
}

impl<V> Clone for TimedCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> std::fmt::Debug for TimedCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimedCache")
            .field("len", &self.inner.data.len())
            .field("clock", &self.inner.clock)
            .finish()
    }
}

impl TimedCache<Value> {
    /// Creates a new cache of [`Value`]s with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide cache, creating it on first use.
    ///
    /// The global cache uses the default configuration and lives until the
    /// process exits.
    pub fn global() -> &'static TimedCache<Value> {
        static GLOBAL: OnceLock<TimedCache<Value>> = OnceLock::new();
        GLOBAL.get_or_init(TimedCache::new)
    }

    /// Retrieves a value and decodes it into `T`.
    ///
    /// Unlike the `get_*` accessors this tells a miss apart from a value of
    /// the wrong type.
    pub fn try_get<T>(&self, key: &str) -> Result<T, CacheError>
    where
        T: TryFrom<Value, Error = TypeMismatch>,
    {
        let value = self.get(key).ok_or_else(|| CacheError::Miss {
            key: key.to_string(),
        })?;
        T::try_from(value).map_err(|source| CacheError::TypeMismatch {
            key: key.to_string(),
            source,
        })
    }

    /// Retrieves a string value.
    ///
    /// Returns `None` if the key is absent, expired, or holds something other
    /// than a string.
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.try_get(key).ok()
    }

    /// Retrieves an integer value as `i64`.
    ///
    /// Any stored integer kind (`i8` to `i64`, `u8` to `u64`) is accepted.
    /// Returns `None` for other kinds and for `u64` values above `i64::MAX`.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.try_get(key).ok()
    }

    /// Retrieves a non-negative integer value as `u64`
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.try_get(key).ok()
    }

    /// Retrieves an `f32` or `f64` value as `f64`
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.try_get(key).ok()
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.try_get(key).ok()
    }

    pub fn get_bytes(&self, key: &str) -> Option<Vec<u8>> {
        self.try_get(key).ok()
    }
}

impl<V> Default for TimedCache<V> {
    fn default() -> Self {
        Self::build(CacheConfig::default())
    }
}

impl<V> TimedCache<V> {
    /// Creates a new cache with custom configuration
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidShardAmount`] if the shard amount is not
    /// a power of two greater than one.
    pub fn with_config(config: CacheConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: CacheConfig) -> Self {
        let data = match config.shard_amount {
            Some(shards) => DashMap::with_capacity_and_shard_amount(config.initial_capacity, shards),
            None => DashMap::with_capacity(config.initial_capacity),
        };
        tracing::debug!(
            initial_capacity = config.initial_capacity,
            shard_amount = ?config.shard_amount,
            "timed cache created"
        );

        Self {
            inner: Arc::new(CacheInner {
                data,
                clock: config.clock,
            }),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    /// Stores a value under `key`, expiring `ttl` from now.
    ///
    /// If the key already exists, its value and expiry are replaced together.
    ///
    /// # TTL Semantics
    ///
    /// - The expiry is fixed when the value is set. Reads never extend it.
    /// - A zero or negative `ttl` is accepted; the entry is treated as
    ///   expired by the first read after its expiry instant.
    /// - A `ttl` large enough to overflow the calendar saturates to the
    ///   furthest representable instant in that direction.
    pub fn set(&self, key: impl Into<String>, value: impl Into<V>, ttl: TimeDelta) {
        let now = self.now();
        let expires_at = now.checked_add_signed(ttl).unwrap_or(if ttl < TimeDelta::zero() {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        });

        self.inner
            .data
            .insert(key.into(), Entry::new(value.into(), expires_at));
    }

    /// Returns the raw expiry instant of `key`.
    ///
    /// This does not check whether the instant has passed and never removes
    /// anything, so it can report entries that [`get`](Self::get) would
    /// already treat as gone. `None` means only that the key is not in the map.
    pub fn expires_at(&self, key: &str) -> Option<DateTime<Utc>> {
        self.inner.data.get(key).map(|entry| entry.expires_at())
    }

    /// Returns the time left before `key` expires.
    ///
    /// Reads the raw entry like [`expires_at`](Self::expires_at), so the result is negative
    /// for an entry that has expired but not yet been evicted.
    pub fn ttl(&self, key: &str) -> Option<TimeDelta> {
        let now = self.now();
        self.inner.data.get(key).map(|entry| entry.remaining_at(now))
    }

    /// Deletes a key from the cache
    ///
    /// Returns `true` if the key existed (regardless of expiration), `false` otherwise.
    /// Deleting an absent key is a no-op.
    pub fn delete(&self, key: &str) -> bool {
        self.inner.data.remove(key).is_some()
    }

    /// Deletes all entries and returns the approximate number removed.
    ///
    /// The count may be off by a few under concurrent writes; entries added
    /// between the count and the clear are removed but not counted.
    pub fn clear(&self) -> usize {
        let count = self.inner.data.len();
        self.inner.data.clear();
        count
    }

    /// Removes every expired entry and returns how many were removed.
    ///
    /// Nothing calls this automatically; expired entries otherwise stay in
    /// the map until read.
    pub fn purge_expired(&self) -> usize {
        let now = self.now();
        let mut removed = 0;

        self.inner.data.retain(|_, entry| {
            if entry.is_expired_at(now) {
                removed += 1;
                false
            } else {
                true
            }
        });

        if removed > 0 {
            tracing::trace!(removed, "purged expired entries");
        }
        removed
    }

    /// Checks if a key exists and is not expired.
    ///
    /// Expired entries are lazily removed when checked.
    pub fn contains_key(&self, key: &str) -> bool {
        self.live(key, |_| ()).is_some()
    }

    /// Returns all keys that are not expired.
    ///
    /// Does not evict anything it skips.
    pub fn keys(&self) -> Vec<String> {
        let now = self.now();
        self.inner
            .data
            .iter()
            .filter(|entry| !entry.value().is_expired_at(now))
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Returns the number of entries in the map (including expired ones
    /// that have not been evicted yet)
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.data.len()
    }

    /// Returns `true` if the map holds no entries at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.data.is_empty()
    }

    /// Looks up a live entry and maps it while the shard read lock is held.
    ///
    /// An expired entry is removed and reported as `None`.
    fn live<R>(&self, key: &str, f: impl FnOnce(&Entry<V>) -> R) -> Option<R> {
        let now = self.now();
        let entry = self.inner.data.get(key)?;

        if entry.is_expired_at(now) {
            // Drop the read guard before taking the write lock on the same shard
            drop(entry);
            // Re-check under the write lock: another caller may have
            // replaced the entry since we looked, and that value must stay.
            if self
                .inner
                .data
                .remove_if(key, |_, e| e.is_expired_at(now))
                .is_some()
            {
                tracing::trace!(key, "evicted expired entry");
            }
            return None;
        }

        Some(f(entry.value()))
    }
}

impl<V: Clone> TimedCache<V> {
    /// Retrieves a value by key
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    /// Expired entries are removed as a side effect.
    pub fn get(&self, key: &str) -> Option<V> {
        self.live(key, |entry| entry.value().clone())
    }
}
