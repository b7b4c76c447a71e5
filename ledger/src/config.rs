use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};

use crate::error::{BonusError, Result};

const DEFAULT_SIGNUP_INTERVAL_SECS: u64 = 60 * 60;
/// Asia/Kolkata, where the roster's hourly cadence is anchored.
const DEFAULT_UTC_OFFSET_MINUTES: i32 = 5 * 60 + 30;

/// Sign-up cadence settings. The module host has no environment to read, so
/// these are fixed at build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub signup_interval: Duration,
    pub utc_offset: FixedOffset,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            signup_interval: Duration::from_secs(DEFAULT_SIGNUP_INTERVAL_SECS),
            utc_offset: offset_from_minutes(DEFAULT_UTC_OFFSET_MINUTES).unwrap_or_else(|_| Utc.fix()),
        }
    }
}

fn offset_from_minutes(minutes: i32) -> Result<FixedOffset> {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| BonusError::InvalidInput(format!("UTC offset {} minutes is out of range", minutes)))
}
