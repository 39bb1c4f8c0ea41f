use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::error::ConfigError;

/// Environment variable holding the initial map capacity
pub const ENV_INITIAL_CAPACITY: &str = "TIMED_CACHE_INITIAL_CAPACITY";

/// Environment variable holding the number of map shards
pub const ENV_SHARDS: &str = "TIMED_CACHE_SHARDS";

/// Configuration for a [`TimedCache`](crate::TimedCache)
///
/// # Example
///
/// ```rust
/// use timed_cache_core::{CacheConfig, TimedCache};
///
/// let config = CacheConfig::default()
///     .with_initial_capacity(1024)
///     .with_shard_amount(64);
/// let cache: TimedCache = TimedCache::with_config(config).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Number of entries to pre-allocate room for (default: 0)
    pub initial_capacity: usize,
    /// Number of lock shards in the map. `None` lets DashMap pick one based
    /// on the number of CPUs.
    pub shard_amount: Option<usize>,
    /// Time source used for expiry (default: the system clock)
    pub clock: Arc<dyn Clock>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 0,
            shard_amount: None,
            clock: Arc::new(SystemClock),
        }
    }
}

impl CacheConfig {
    /// Creates a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a configuration from `TIMED_CACHE_INITIAL_CAPACITY` and
    /// `TIMED_CACHE_SHARDS`. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_INITIAL_CAPACITY) {
            config.initial_capacity = parse_env(ENV_INITIAL_CAPACITY, &raw)?;
        }
        if let Some(raw) = lookup(ENV_SHARDS) {
            config.shard_amount = Some(parse_env(ENV_SHARDS, &raw)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Sets the number of entries to pre-allocate room for
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Sets the number of lock shards.
    ///
    /// More shards mean less contention between writers to different keys.
    /// Must be a power of two greater than 1; checked by [`validate`](Self::validate).
    pub fn with_shard_amount(mut self, shards: usize) -> Self {
        self.shard_amount = Some(shards);
        self
    }

    /// Sets the time source used to stamp and check expiry
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Checks the configuration for values the map would reject
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.shard_amount {
            Some(n) if n < 2 || !n.is_power_of_two() => Err(ConfigError::InvalidShardAmount(n)),
            _ => Ok(()),
        }
    }
}

fn parse_env(var: &'static str, raw: &str) -> Result<usize, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::DateTime;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.initial_capacity, 0);
        assert_eq!(config.shard_amount, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern_chaining() {
        let start = DateTime::from_timestamp(1_000, 0).unwrap();
        let config = CacheConfig::new()
            .with_initial_capacity(128)
            .with_shard_amount(16)
            .with_clock(ManualClock::new(start));

        assert_eq!(config.initial_capacity, 128);
        assert_eq!(config.shard_amount, Some(16));
        assert_eq!(config.clock.now(), start);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_shard_amounts_rejected() {
        for shards in [0, 1, 3, 12] {
            let config = CacheConfig::default().with_shard_amount(shards);
            assert_eq!(
                config.validate(),
                Err(ConfigError::InvalidShardAmount(shards))
            );
        }
    }

    #[test]
    fn test_from_env_defaults_when_unset() {
        let config = CacheConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.initial_capacity, 0);
        assert_eq!(config.shard_amount, None);
    }

    #[test]
    fn test_from_env_reads_values() {
        let config = CacheConfig::from_lookup(lookup_from(&[
            (ENV_INITIAL_CAPACITY, "4096"),
            (ENV_SHARDS, " 32 "),
        ]))
        .unwrap();
        assert_eq!(config.initial_capacity, 4096);
        assert_eq!(config.shard_amount, Some(32));
    }

    #[test]
    fn test_from_env_rejects_garbage() {
        let err = CacheConfig::from_lookup(lookup_from(&[(ENV_INITIAL_CAPACITY, "big")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidEnv {
                var: ENV_INITIAL_CAPACITY,
                value: "big".into()
            }
        );

        let err = CacheConfig::from_lookup(lookup_from(&[(ENV_SHARDS, "6")])).unwrap_err();
        assert_eq!(err, ConfigError::InvalidShardAmount(6));
    }
}
