//! Time sources used to stamp and check entry expiry.

use chrono::{DateTime, TimeDelta, Utc};
use std::fmt::Debug;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Source of the current wall-clock time.
///
/// The cache asks the clock for the time on every `set`, `get` and `ttl`,
/// so implementations must be cheap and safe to call from many threads.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle and give
/// another to a cache:
///
/// ```rust
/// use chrono::TimeDelta;
/// use timed_cache_core::{CacheConfig, ManualClock, TimedCache};
///
/// let clock = ManualClock::default();
/// let config = CacheConfig::default().with_clock(clock.clone());
/// let cache: TimedCache = TimedCache::with_config(config).unwrap();
///
/// cache.set("session", "abc", TimeDelta::seconds(30));
/// clock.advance(TimeDelta::seconds(31));
/// assert_eq!(cache.get_string("session"), None);
/// ```
#[derive(Debug, Clone)]
pub struct ManualClock {
    nanos: Arc<AtomicI64>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    ///
    /// Times outside the range representable in nanoseconds since the epoch
    /// (roughly years 1677 to 2262) are clamped to that range.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            nanos: Arc::new(AtomicI64::new(to_nanos(start))),
        }
    }

    /// Moves the clock by `delta`, which may be negative
    pub fn advance(&self, delta: TimeDelta) {
        let step = delta.num_nanoseconds().unwrap_or(if delta < TimeDelta::zero() {
            i64::MIN
        } else {
            i64::MAX
        });
        // fetch_update only fails when the closure returns None
        let _ = self
            .nanos
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                Some(n.saturating_add(step))
            });
    }

    /// Jumps the clock to `now`
    pub fn set(&self, now: DateTime<Utc>) {
        self.nanos.store(to_nanos(now), Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

fn to_nanos(t: DateTime<Utc>) -> i64 {
    t.timestamp_nanos_opt().unwrap_or(if t.timestamp() < 0 {
        i64::MIN
    } else {
        i64::MAX
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_is_frozen() {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let clock = ManualClock::new(start);

        assert_eq!(clock.now(), start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn test_manual_clock_advance_and_rewind() {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let clock = ManualClock::new(start);

        clock.advance(TimeDelta::milliseconds(1_500));
        assert_eq!(clock.now(), start + TimeDelta::milliseconds(1_500));

        clock.advance(TimeDelta::seconds(-2));
        assert_eq!(clock.now(), start - TimeDelta::milliseconds(500));
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::default();
        let handle = clock.clone();
        let before = clock.now();

        handle.advance(TimeDelta::minutes(5));
        assert_eq!(clock.now(), before + TimeDelta::minutes(5));

        let later = DateTime::from_timestamp(2_000_000_000, 0).unwrap();
        handle.set(later);
        assert_eq!(clock.now(), later);
    }

    #[test]
    fn test_manual_clock_advance_saturates() {
        let clock = ManualClock::default();
        clock.advance(TimeDelta::MAX);
        assert_eq!(clock.now(), DateTime::from_timestamp_nanos(i64::MAX));
    }

    #[test]
    fn test_system_clock_moves_forward() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
