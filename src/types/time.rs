//! Wall-clock helpers
//!
//! Request timelines use nanoseconds so interleavings of concurrent requests
//! stay distinguishable; telemetry and history use epoch milliseconds.

use chrono::Utc;

/// Current time as nanoseconds since the Unix epoch
pub fn epoch_nanos() -> i64 {
    // Only fails past the year 2262.
    Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}

/// Current time as milliseconds since the Unix epoch
pub fn epoch_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clocks_agree() {
        let nanos = epoch_nanos();
        let millis = epoch_millis();

        assert!((millis - nanos / 1_000_000).abs() < 1_000);
    }

    #[test]
    fn test_epoch_nanos_is_monotonic_enough() {
        let first = epoch_nanos();
        let second = epoch_nanos();

        assert!(second >= first);
    }
}
