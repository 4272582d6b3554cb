//! Wall-clock helpers.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as fractional Unix epoch seconds.
pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
