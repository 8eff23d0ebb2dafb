//! Time utilities for oche
//!
//! All timestamps are wall-clock `DateTime<Local>` values: session dates,
//! roster creation times, and match completion stamps.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `OCHE_MOCK_TIME` environment variable can be set
//! to override the system time for every timestamp the service records.
//! This is useful for replaying a training evening at a fixed date.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-12-25 19:30:00`)
//!
//! Example:
//! ```bash
//! OCHE_MOCK_TIME="2025-12-25 19:30:00" oched
//! ```

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use std::sync::OnceLock;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "OCHE_MOCK_TIME";

/// Format accepted for mock time and for naive local timestamps
pub const LOCAL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Cached mock time offset from the real time when the process started.
/// This allows mock time to advance naturally.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

#[allow(clippy::disallowed_methods)] // Wraps Local::now() for mock support
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                match parse_local_datetime(&mock_time_str) {
                    Some(mock_dt) => {
                        let offset = mock_dt.signed_duration_since(chrono::Local::now());
                        tracing::info!(
                            mock_time = %mock_time_str,
                            offset_secs = offset.num_seconds(),
                            "Mock time enabled"
                        );
                        return Some(offset);
                    }
                    None => {
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            expected_format = LOCAL_DATETIME_FORMAT,
                            "Invalid mock time format"
                        );
                    }
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    get_mock_time_offset().is_some()
}

/// Get the current local time, respecting mock time settings in debug builds.
#[allow(clippy::disallowed_methods)] // This is the wrapper that provides mock time support
pub fn now() -> DateTime<Local> {
    let real_now = chrono::Local::now();

    if let Some(offset) = get_mock_time_offset() {
        real_now + offset
    } else {
        real_now
    }
}

/// Parse a naive `YYYY-MM-DD HH:MM:SS` string in the local timezone.
pub fn parse_local_datetime(s: &str) -> Option<DateTime<Local>> {
    let naive = NaiveDateTime::parse_from_str(s.trim(), LOCAL_DATETIME_FORMAT).ok()?;
    Local.from_local_datetime(&naive).single()
}

/// Parse a stored timestamp: RFC 3339 first, then the naive local format.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Local>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Local))
        .ok()
        .or_else(|| parse_local_datetime(s))
}

/// Format a DateTime for display with full date and time.
pub fn format_datetime_full(dt: &DateTime<Local>) -> String {
    dt.format(LOCAL_DATETIME_FORMAT).to_string()
}
