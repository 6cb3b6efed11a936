//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account record and money representation
//! - `trace`: Deduction requests, responses, timelines and conflict snapshots
//! - `telemetry`: Subscriber messages, statistics and history samples
//! - `time`: Clock helpers shared by the timeline and telemetry
//! - `error`: Error types for the lab

pub mod account;
pub mod error;
pub mod telemetry;
pub mod time;
pub mod trace;

pub use account::{to_major_units, Account, AccountId, MinorUnits};
pub use error::LabError;
pub use telemetry::{
    BalanceSample, MonitoringStatus, Stats, TelemetryEvent, TelemetryMessage, TraceEvent,
    TraceStep,
};
pub use trace::{
    ConflictSnapshot, DeductionRequest, DeductionResponse, ExecutionMode, RequestId, RequestTrace,
};
