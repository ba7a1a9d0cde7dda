//! Time window helpers.
//!
//! Windows come from configuration, so arithmetic saturates at the earliest
//! representable instant instead of panicking on absurd values.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// Start of a trailing window of length `window` ending at `now`.
pub fn window_start(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(window)
        .ok()
        .and_then(|w| now.checked_sub_signed(w))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// `now` minus `days` whole days. Negative values are treated as zero.
pub fn days_before(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    TimeDelta::try_days(days.max(0))
        .and_then(|d| now.checked_sub_signed(d))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Renders a window length for descriptions, e.g. "the last hour".
pub fn describe_window(window: Duration) -> String {
    let secs = window.as_secs();
    match secs {
        3600 => "the last hour".to_string(),
        s if s >= 3600 && s % 3600 == 0 => format!("the last {} hours", s / 3600),
        s if s >= 60 && s % 60 == 0 => format!("the last {} minutes", s / 60),
        s => format!("the last {} seconds", s),
    }
}
