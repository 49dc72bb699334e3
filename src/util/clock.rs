//! Wall-clock helpers expressed in milliseconds since the Unix epoch.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current time in milliseconds since the Unix epoch.
///
/// A clock set before the epoch reads as `0` rather than failing.
#[must_use]
pub fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis()
}

/// Milliseconds elapsed between two timestamps, saturating at zero.
#[must_use]
pub const fn elapsed_ms(from_ms: u128, to_ms: u128) -> u128 {
    to_ms.saturating_sub(from_ms)
}
