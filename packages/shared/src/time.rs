//! Time-related utilities with clock abstraction for testability.

use chrono::{DateTime, FixedOffset, TimeZone, Utc};

/// Chat timestamps look like "Monday 3:04PM".
const CHAT_TIME_FORMAT: &str = "%A %-I:%M%p";

/// Clock trait for dependency injection and testing
pub trait Clock: Send + Sync {
    /// Get current Unix timestamp in JST (milliseconds)
    fn now_jst_millis(&self) -> i64;
}

/// System clock implementation (uses actual system time)
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_jst_millis(&self) -> i64 {
        get_jst_timestamp()
    }
}

/// Fixed clock implementation for testing (returns a fixed time)
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    fixed_time: i64,
}

impl FixedClock {
    /// Create a new fixed clock with the given timestamp
    pub fn new(fixed_time_millis: i64) -> Self {
        Self {
            fixed_time: fixed_time_millis,
        }
    }
}

impl Clock for FixedClock {
    fn now_jst_millis(&self) -> i64 {
        self.fixed_time
    }
}

fn jst_offset() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).unwrap() // JST is UTC+9
}

fn to_jst(timestamp_millis: i64) -> DateTime<FixedOffset> {
    let offset = jst_offset();
    offset
        .timestamp_millis_opt(timestamp_millis)
        .single()
        .unwrap_or_else(|| Utc::now().with_timezone(&offset))
}

/// Get current Unix timestamp in JST (milliseconds)
pub fn get_jst_timestamp() -> i64 {
    Utc::now().with_timezone(&jst_offset()).timestamp_millis()
}

/// Convert Unix timestamp (milliseconds) to the chat display format, e.g. "Sunday 12:00AM"
pub fn timestamp_to_jst_chat_time(timestamp_millis: i64) -> String {
    to_jst(timestamp_millis)
        .format(CHAT_TIME_FORMAT)
        .to_string()
}
