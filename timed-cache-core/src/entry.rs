use chrono::{DateTime, TimeDelta, Utc};

/// A stored value together with the instant it stops being visible
#[derive(Debug, Clone, PartialEq)]
pub struct Entry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

impl<V> Entry<V> {
    /// Creates a new entry with the given value and expiration time
    pub fn new(value: V, expires_at: DateTime<Utc>) -> Self {
        Self { value, expires_at }
    }

    /// Returns a reference to the stored value
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Consumes the entry, returning the stored value
    pub fn into_value(self) -> V {
        self.value
    }

    /// Returns the expiration time
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Checks whether the entry is expired as of `now`.
    ///
    /// An entry is still live at the exact instant it expires; it only
    /// becomes expired once `now` is strictly after `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Time left until expiry as of `now`. Negative once the entry has expired.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> TimeDelta {
        self.expires_at.signed_duration_since(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_entry_not_expired() {
        let entry = Entry::new("test_value", at(1_000));

        assert_eq!(*entry.value(), "test_value");
        assert!(!entry.is_expired_at(at(999)));
    }

    #[test]
    fn test_entry_live_at_exact_deadline() {
        let entry = Entry::new(1u8, at(1_000));
        assert!(!entry.is_expired_at(at(1_000)));
        assert!(entry.is_expired_at(at(1_000) + TimeDelta::nanoseconds(1)));
    }

    #[test]
    fn test_remaining_goes_negative() {
        let entry = Entry::new((), at(1_000));

        assert_eq!(entry.remaining_at(at(990)), TimeDelta::seconds(10));
        assert_eq!(entry.remaining_at(at(1_005)), TimeDelta::seconds(-5));
    }

    #[test]
    fn test_into_value() {
        let entry = Entry::new(String::from("owned"), at(0));
        assert_eq!(entry.into_value(), "owned");
    }
}
