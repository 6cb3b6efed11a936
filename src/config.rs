//! Runtime configuration for the balance lab
//!
//! Every knob has a default that reproduces the lost update reliably on a
//! typical multi-core machine. Zero values that would make a component
//! meaningless (an empty ledger, a zero-length history, a zero tick) fall
//! back to the default with a warning instead of failing.

use std::time::Duration;

use tracing::{info, warn};

use crate::telemetry::DEFAULT_SUBSCRIBER_BUFFER;

/// Default artificial delay between the read and the write of a deduction
pub const DEFAULT_PROCESSING_DELAY: Duration = Duration::from_millis(10);

/// Default number of request traces kept for conflict detection
pub const DEFAULT_LEDGER_CAPACITY: usize = 10;

/// Default number of balance samples kept in the history
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Default monitoring sampler period
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(500);

/// Configuration for the balance service and its background sampler
#[derive(Clone, Debug, PartialEq)]
pub struct LabConfig {
    /// Delay inserted between read and write; widens the race window
    pub processing_delay: Duration,
    /// Maximum number of request traces held by the ledger
    pub ledger_capacity: usize,
    /// Maximum number of samples held by the balance history
    pub history_capacity: usize,
    /// Period of the monitoring sampler
    pub sample_interval: Duration,
    /// Messages buffered per telemetry subscriber before it is dropped
    pub subscriber_buffer: usize,
    /// Simulated round-trip added to every store call
    pub store_latency: Duration,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            processing_delay: DEFAULT_PROCESSING_DELAY,
            ledger_capacity: DEFAULT_LEDGER_CAPACITY,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
            store_latency: Duration::ZERO,
        }
    }
}

impl LabConfig {
    /// Create a new LabConfig with custom values
    ///
    /// Zero capacities, a zero sample interval and a zero subscriber buffer
    /// are replaced by their defaults. A zero processing delay is accepted:
    /// it narrows the race window but is still a valid experiment.
    pub fn new(
        processing_delay: Duration,
        ledger_capacity: usize,
        history_capacity: usize,
        sample_interval: Duration,
        subscriber_buffer: usize,
        store_latency: Duration,
    ) -> Self {
        let default = Self::default();

        if processing_delay.is_zero() {
            info!("processing delay is zero, lost updates will be rare");
        }

        let ledger_capacity = if ledger_capacity == 0 {
            warn!(
                ledger_capacity,
                default = default.ledger_capacity,
                "invalid ledger capacity, using default"
            );
            default.ledger_capacity
        } else {
            ledger_capacity
        };

        let history_capacity = if history_capacity == 0 {
            warn!(
                history_capacity,
                default = default.history_capacity,
                "invalid history capacity, using default"
            );
            default.history_capacity
        } else {
            history_capacity
        };

        let sample_interval = if sample_interval.is_zero() {
            warn!(
                default_ms = default.sample_interval.as_millis() as u64,
                "invalid sample interval, using default"
            );
            default.sample_interval
        } else {
            sample_interval
        };

        let subscriber_buffer = if subscriber_buffer == 0 {
            warn!(
                subscriber_buffer,
                default = default.subscriber_buffer,
                "invalid subscriber buffer, using default"
            );
            default.subscriber_buffer
        } else {
            subscriber_buffer
        };

        Self {
            processing_delay,
            ledger_capacity,
            history_capacity,
            sample_interval,
            subscriber_buffer,
            store_latency,
        }
    }

    /// Copy of this configuration with zero values replaced by defaults
    ///
    /// The fields are public, so a struct literal can bypass `new`; anything
    /// consuming a `LabConfig` goes through this first.
    pub fn validated(&self) -> Self {
        Self::new(
            self.processing_delay,
            self.ledger_capacity,
            self.history_capacity,
            self.sample_interval,
            self.subscriber_buffer,
            self.store_latency,
        )
    }

    /// Same configuration with a different processing delay
    pub fn with_processing_delay(mut self, processing_delay: Duration) -> Self {
        self.processing_delay = processing_delay;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let config = LabConfig::default();

        assert_eq!(config.processing_delay, Duration::from_millis(10));
        assert_eq!(config.ledger_capacity, 10);
        assert_eq!(config.history_capacity, 1000);
        assert_eq!(config.sample_interval, Duration::from_millis(500));
        assert_eq!(config.subscriber_buffer, 256);
        assert_eq!(config.store_latency, Duration::ZERO);
    }

    #[test]
    fn test_custom_values_are_kept() {
        let config = LabConfig::new(
            Duration::from_millis(50),
            4,
            20,
            Duration::from_millis(100),
            8,
            Duration::from_millis(1),
        );

        assert_eq!(config.processing_delay, Duration::from_millis(50));
        assert_eq!(config.ledger_capacity, 4);
        assert_eq!(config.history_capacity, 20);
        assert_eq!(config.sample_interval, Duration::from_millis(100));
        assert_eq!(config.subscriber_buffer, 8);
        assert_eq!(config.store_latency, Duration::from_millis(1));
    }

    #[rstest]
    #[case::zero_ledger(0, 20, 100, 8, "ledger")]
    #[case::zero_history(4, 0, 100, 8, "history")]
    #[case::zero_interval(4, 20, 0, 8, "interval")]
    #[case::zero_buffer(4, 20, 100, 0, "buffer")]
    fn test_zero_values_fall_back_to_defaults(
        #[case] ledger: usize,
        #[case] history: usize,
        #[case] interval_ms: u64,
        #[case] buffer: usize,
        #[case] field: &str,
    ) {
        let config = LabConfig::new(
            Duration::from_millis(10),
            ledger,
            history,
            Duration::from_millis(interval_ms),
            buffer,
            Duration::ZERO,
        );
        let default = LabConfig::default();

        match field {
            "ledger" => assert_eq!(config.ledger_capacity, default.ledger_capacity),
            "history" => assert_eq!(config.history_capacity, default.history_capacity),
            "interval" => assert_eq!(config.sample_interval, default.sample_interval),
            "buffer" => assert_eq!(config.subscriber_buffer, default.subscriber_buffer),
            _ => panic!("Unknown field: {}", field),
        }
    }

    #[test]
    fn test_validated_repairs_struct_literal() {
        let config = LabConfig {
            ledger_capacity: 0,
            history_capacity: 0,
            sample_interval: Duration::ZERO,
            subscriber_buffer: 0,
            processing_delay: Duration::from_millis(3),
            store_latency: Duration::ZERO,
        };

        let validated = config.validated();

        assert_eq!(validated.ledger_capacity, 10);
        assert_eq!(validated.history_capacity, 1000);
        assert_eq!(validated.sample_interval, Duration::from_millis(500));
        assert_eq!(validated.subscriber_buffer, 256);
        assert_eq!(validated.processing_delay, Duration::from_millis(3));
    }

    #[test]
    fn test_zero_processing_delay_is_allowed() {
        let config = LabConfig::default().with_processing_delay(Duration::ZERO);

        assert!(config.processing_delay.is_zero());
    }
}
