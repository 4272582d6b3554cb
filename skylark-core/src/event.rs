//! Feed events.
//!
//! An event is an (opaque value, timestamp) pair. Identity is by value
//! alone: two events with the same value are the same event no matter
//! when they were stamped.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use crate::time;

/// A single feed entry: an opaque value scored by a Unix timestamp.
///
/// Immutable once constructed. Equality and hashing consider only the
/// value; the timestamp is a score, not part of identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    value: String,
    at: f64,
}

impl Event {
    /// Create an event stamped with the current wall time.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            at: time::unix_now(),
        }
    }

    /// Create an event with an explicit timestamp (Unix epoch seconds).
    pub fn with_at(value: impl Into<String>, at: f64) -> Self {
        Self {
            value: value.into(),
            at,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Unix epoch seconds, sub-second resolution.
    pub fn at(&self) -> f64 {
        self.at
    }

    pub fn into_value(self) -> String {
        self.value
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Event {}

impl Hash for Event {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

/// Display order of a feed: newest first.
///
/// Ties on the timestamp are broken by value, descending, so that reads
/// are deterministic and both providers rank identically. The trim
/// victim for an over-full feed is always the maximum under this order
/// (lowest timestamp, smallest value among ties).
pub fn feed_order(a: &Event, b: &Event) -> Ordering {
    b.at.total_cmp(&a.at).then_with(|| b.value.cmp(&a.value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_by_value_only() {
        let a = Event::with_at("hello", 1000.0);
        let b = Event::with_at("hello", 2000.0);
        assert_eq!(a, b);

        let c = Event::with_at("world", 1000.0);
        assert_ne!(a, c);
    }

    #[test]
    fn test_new_stamps_current_time() {
        let before = time::unix_now();
        let e = Event::new("x");
        let after = time::unix_now();
        assert!(e.at() >= before && e.at() <= after);
    }

    #[test]
    fn test_feed_order_newest_first() {
        let old = Event::with_at("a", 1.0);
        let new = Event::with_at("b", 2.0);
        assert_eq!(feed_order(&new, &old), Ordering::Less);
        assert_eq!(feed_order(&old, &new), Ordering::Greater);
    }

    #[test]
    fn test_feed_order_tie_break_by_value_desc() {
        let small = Event::with_at("a", 5.0);
        let big = Event::with_at("b", 5.0);
        // Equal timestamps: larger value ranks first.
        assert_eq!(feed_order(&big, &small), Ordering::Less);
    }

    #[test]
    fn test_serde_shape() {
        let e = Event::with_at("hi", 12.5);
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json, serde_json::json!({"value": "hi", "at": 12.5}));
    }
}
