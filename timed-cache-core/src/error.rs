//! Error types for the cache.
//!
//! Plain lookups never fail: a miss is `None`. These types are only returned
//! by the fallible accessors and by configuration.

use thiserror::Error;

use crate::value::ValueKind;

/// A stored value could not be decoded into the requested type
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("expected {expected}, found {found}")]
pub struct TypeMismatch {
    /// Name of the type the caller asked for
    pub expected: &'static str,
    /// Kind of the value actually stored
    pub found: ValueKind,
}

/// Errors returned by [`TimedCache::try_get`](crate::TimedCache::try_get).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Key is absent or its entry has expired
    #[error("cache miss for key {key:?}")]
    Miss { key: String },

    /// Key is live but holds a value of another type
    #[error("type mismatch for key {key:?}: {source}")]
    TypeMismatch {
        key: String,
        #[source]
        source: TypeMismatch,
    },
}

impl CacheError {
    /// Returns `true` if the key was absent or expired.
    pub fn is_miss(&self) -> bool {
        matches!(self, CacheError::Miss { .. })
    }

    /// Returns `true` if the key held a value of an unexpected type.
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, CacheError::TypeMismatch { .. })
    }
}

/// Invalid cache configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// DashMap requires a power of two greater than one
    #[error("shard amount must be a power of two greater than 1, got {0}")]
    InvalidShardAmount(usize),

    /// An environment variable held an unparsable value
    #[error("invalid value {value:?} for environment variable {var}")]
    InvalidEnv { var: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let miss = CacheError::Miss { key: "a".into() };
        assert_eq!(miss.to_string(), "cache miss for key \"a\"");
        assert!(miss.is_miss());
        assert!(!miss.is_type_mismatch());

        let mismatch = CacheError::TypeMismatch {
            key: "n".into(),
            source: TypeMismatch {
                expected: "i64",
                found: ValueKind::String,
            },
        };
        assert_eq!(
            mismatch.to_string(),
            "type mismatch for key \"n\": expected i64, found string"
        );
        assert!(mismatch.is_type_mismatch());
    }

    #[test]
    fn test_config_error_messages() {
        assert_eq!(
            ConfigError::InvalidShardAmount(3).to_string(),
            "shard amount must be a power of two greater than 1, got 3"
        );
        let env = ConfigError::InvalidEnv {
            var: "TIMED_CACHE_SHARDS",
            value: "lots".into(),
        };
        assert_eq!(
            env.to_string(),
            "invalid value \"lots\" for environment variable TIMED_CACHE_SHARDS"
        );
    }
}
