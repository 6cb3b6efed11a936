//! Core deduction machinery
//!
//! This module contains the components a deduction passes through:
//! - `traits` - The `BalanceStore` seam the engine reads and writes through
//! - `balance_store` - In-memory store with versioned accounts
//! - `mode` - Process-wide execution mode flag
//! - `engine` - The read-compute-write protocol in both modes
//! - `ledger` - Bounded window of recent request timelines
//! - `detector` - Lost-update pair detection and the snapshot slot
//! - `history` - Request counters and the balance time series

pub mod balance_store;
pub mod detector;
pub mod engine;
pub mod history;
pub mod ledger;
pub mod mode;
pub mod traits;

pub use balance_store::MemoryBalanceStore;
pub use detector::{find_conflict_pair, ConflictSlot};
pub use engine::{AccountLocks, DeductionEngine, EngineParts};
pub use history::{BalanceHistory, StatsRecorder};
pub use ledger::RequestTraceLedger;
pub use mode::ModeSwitch;
pub use traits::BalanceStore;
