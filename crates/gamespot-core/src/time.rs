//! Wall-clock helpers.
//!
//! Session end times are stored as Unix epoch milliseconds; API timestamps
//! are RFC 3339 strings.

use chrono::{SecondsFormat, Utc};

/// Milliseconds in one minute.
pub const MS_PER_MINUTE: i64 = 60 * 1000;

/// Current time as Unix epoch milliseconds.
pub fn unix_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Current time as an RFC 3339 string with millisecond precision (`Z` suffix).
pub fn rfc3339_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Time left until `end_ms`, clamped at zero.
pub const fn remaining_millis(end_ms: i64, now_ms: i64) -> i64 {
    let left = end_ms.saturating_sub(now_ms);
    if left < 0 { 0 } else { left }
}

/// End of a session of `minutes` starting at `start_ms`.
pub const fn session_end(start_ms: i64, minutes: u32) -> i64 {
    start_ms.saturating_add((minutes as i64).saturating_mul(MS_PER_MINUTE))
}
