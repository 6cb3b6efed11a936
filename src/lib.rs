//! Balance Race Lab Library
//! # Overview
//!
//! This library reproduces, detects and fixes the classic lost-update race on
//! a shared account balance. Many concurrent callers deduct from one account
//! through a read → compute → write protocol; without coordination, two
//! callers that read the same balance both write a value derived from it and
//! one deduction silently disappears.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Account, DeductionRequest, RequestTrace, etc.)
//! - [`core`] - Deduction machinery:
//!   - [`core::balance_store`] - Keyed balance storage with atomic get/set
//!   - [`core::engine`] - The read-compute-write protocol, with or without a lock
//!   - [`core::ledger`] - Bounded window of recent request timelines
//!   - [`core::detector`] - Lost-update detection and the conflict snapshot
//!   - [`core::history`] - Request statistics and the balance time series
//! - [`telemetry`] - Subscriber fan-out and the periodic balance sampler
//! - [`service`] - The inbound facade tying everything together
//! - [`simulation`] - Concurrent attack driver and its report
//! - [`config`] / [`cli`] - Configuration and command-line parsing
//! - [`io`] - History export
//!
//! # Execution Modes
//!
//! - **Unprotected**: no ordering between concurrent deductions; lost updates
//!   appear as soon as two reads land before either write
//! - **Protected**: the whole protocol runs under a per-account mutex and the
//!   final balance is always exact
//!
//! The mode can be switched at any time; each deduction uses the mode current
//! when it starts.

// Module declarations
pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod service;
pub mod simulation;
pub mod telemetry;
pub mod types;

pub use config::LabConfig;
pub use core::{BalanceStore, DeductionEngine, MemoryBalanceStore};
pub use io::write_history_csv;
pub use service::BalanceService;
pub use simulation::{run_attack, AttackConfig, AttackReport};
pub use telemetry::{MonitoringSampler, Subscription, TelemetryBroadcaster};
pub use types::{
    AccountId, BalanceSample, ConflictSnapshot, DeductionResponse, ExecutionMode, LabError,
    MinorUnits, RequestTrace, Stats, TelemetryEvent, TelemetryMessage,
};
