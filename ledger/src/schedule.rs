use std::time::Duration;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};

/// Next instant strictly after `now` that falls on a multiple of `cadence`
/// in local wall-clock time (`offset`). With an hourly cadence this is the
/// top of the next local hour, so half-hour offsets still land on :00.
///
/// Sub-second cadences count as one second. Returns `None` when the boundary
/// is outside the representable date range.
pub fn next_window_boundary(now: DateTime<Utc>, cadence: Duration, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let cadence_secs = i64::try_from(cadence.as_secs()).unwrap_or(i64::MAX).max(1);
    let offset_secs = i64::from(offset.local_minus_utc());
    let local_secs = now.timestamp().checked_add(offset_secs)?;
    let next_local = local_secs
        .div_euclid(cadence_secs)
        .checked_add(1)?
        .checked_mul(cadence_secs)?;
    let next_utc = next_local.checked_sub(offset_secs)?;
    Utc.timestamp_opt(next_utc, 0).single().filter(|next| *next > now)
}
