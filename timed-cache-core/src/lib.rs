//! # Timed Cache Core
//!
//! A concurrent in-memory key-value cache with per-entry TTL (time-to-live).
//!
//! ## Features
//!
//! - Thread-safe storage using `DashMap` (sharded locks, no global lock)
//! - Expiration checked on read (lazy cleanup), no background task
//! - Dynamically typed [`Value`] payloads with typed accessors that treat a
//!   type mismatch as a miss
//! - Pluggable [`Clock`] for deterministic tests
//!
//! ## Example
//!
//! ```rust
//! use chrono::TimeDelta;
//! use timed_cache_core::TimedCache;
//!
//! let cache = TimedCache::new();
//!
//! // Store a value with a 60 second TTL
//! cache.set("user:123", "John Doe", TimeDelta::seconds(60));
//! cache.set("visits:123", 17u32, TimeDelta::seconds(60));
//!
//! // Retrieve the values
//! if let Some(name) = cache.get_string("user:123") {
//!     println!("User: {}", name);
//! }
//! assert_eq!(cache.get_i64("visits:123"), Some(17));
//!
//! // Inspect expiry metadata
//! let remaining = cache.ttl("user:123").unwrap();
//! assert!(remaining <= TimeDelta::seconds(60));
//!
//! // Delete a key
//! cache.delete("user:123");
//!
//! // Expired entries are dropped when read, or on demand
//! let removed_count = cache.purge_expired();
//! # let _ = removed_count;
//! ```

mod cache;
mod clock;
mod config;
mod entry;
mod error;
mod value;

pub use cache::TimedCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, ENV_INITIAL_CAPACITY, ENV_SHARDS};
pub use entry::Entry;
pub use error::{CacheError, ConfigError, TypeMismatch};
pub use value::{Value, ValueKind};
