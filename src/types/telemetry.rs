//! Telemetry and statistics types
//!
//! Everything pushed to subscribers, plus the aggregate counters and history
//! samples those messages carry. All outbound messages serialize as
//! `{"type": ..., "data": ..., "timestamp": <epoch ms>}`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::account::{AccountId, MinorUnits};
use super::time::epoch_millis;
use super::trace::RequestId;

/// Aggregate request counters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub total_requests: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub start_time: DateTime<Utc>,

    /// Balance the account would hold if no update had been lost
    ///
    /// Re-based on every reset and reduced by each successful deduction.
    /// `None` until the first reset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_balance: Option<MinorUnits>,
}

impl Stats {
    pub fn new() -> Self {
        Stats {
            total_requests: 0,
            success_count: 0,
            failure_count: 0,
            start_time: Utc::now(),
            expected_balance: None,
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

/// One point of the balance history series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BalanceSample {
    /// Epoch milliseconds
    pub timestamp: i64,
    pub actual_balance: MinorUnits,
    pub expected_balance: MinorUnits,
}

impl BalanceSample {
    /// Create a sample stamped with the current time
    pub fn now(actual_balance: MinorUnits, expected_balance: MinorUnits) -> Self {
        BalanceSample {
            timestamp: epoch_millis(),
            actual_balance,
            expected_balance,
        }
    }
}

/// Whether the background sampler is currently publishing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitoringStatus {
    Running,
    Paused,
}

/// Step of the deduction protocol a trace event reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceStep {
    /// Balance has been read
    Read,
    /// Deduction rejected or write failed
    Failed,
    /// New balance has been written
    WriteComplete,
}

impl TraceStep {
    pub fn number(self) -> u8 {
        match self {
            TraceStep::Read => 1,
            TraceStep::Failed => 2,
            TraceStep::WriteComplete => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TraceStep::Read => "read",
            TraceStep::Failed => "failed",
            TraceStep::WriteComplete => "write_complete",
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(TraceStep::Read),
            2 => Some(TraceStep::Failed),
            3 => Some(TraceStep::WriteComplete),
            _ => None,
        }
    }
}

/// Step-level event emitted inline while a deduction runs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEvent {
    pub request_id: RequestId,
    pub step: u8,
    pub step_name: &'static str,
    /// Balance observed by the read step
    pub balance: MinorUnits,
    pub amount: MinorUnits,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_balance: Option<MinorUnits>,
    /// Epoch milliseconds
    pub timestamp: i64,
}

impl TraceEvent {
    pub fn new(
        request_id: RequestId,
        step: TraceStep,
        balance: MinorUnits,
        amount: MinorUnits,
        new_balance: Option<MinorUnits>,
    ) -> Self {
        TraceEvent {
            request_id,
            step: step.number(),
            step_name: step.name(),
            balance,
            amount,
            new_balance,
            timestamp: epoch_millis(),
        }
    }

    pub fn step_kind(&self) -> Option<TraceStep> {
        TraceStep::from_number(self.step)
    }
}

/// Payload of a telemetry message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum TelemetryEvent {
    /// Sent once to a new subscriber
    Init { balance: MinorUnits, stats: Stats },
    /// Step-level deduction trace
    Trace(TraceEvent),
    /// Periodic sample from the monitoring sampler
    BalanceUpdate { balance: MinorUnits, stats: Stats },
    /// Balance was reset
    Reset {
        #[serde(rename = "user_id")]
        account: AccountId,
        balance: MinorUnits,
    },
    /// Execution mode was switched
    ModeChanged {
        mode: &'static str,
        use_lock: bool,
    },
    /// Monitoring was paused or resumed
    MonitoringStatus { status: MonitoringStatus },
}

/// Timestamped envelope delivered to subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryMessage {
    #[serde(flatten)]
    pub event: TelemetryEvent,
    /// Epoch milliseconds
    pub timestamp: i64,
}

impl TelemetryMessage {
    /// Wrap an event, stamping it with the current time
    pub fn now(event: TelemetryEvent) -> Self {
        TelemetryMessage {
            event,
            timestamp: epoch_millis(),
        }
    }
}
