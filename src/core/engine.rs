//! Deduction engine
//!
//! This module provides the `DeductionEngine`, which runs the three-step
//! read → compute → write protocol against a [`BalanceStore`] in one of two
//! modes:
//!
//! - **Unprotected**: no ordering between concurrent calls. Two calls that
//!   read the same balance both compute from it, and the later write silently
//!   discards the earlier deduction (a lost update).
//! - **Protected**: the whole protocol, read included, runs inside a mutex
//!   scoped to the account, fully serializing deductions against it.
//!
//! The arithmetic is identical in both modes. An artificial processing delay
//! between the read and the write widens the race window so the lost update
//! is reproducible; it is part of the behavior under study and is applied in
//! both modes.
//!
//! # Architecture
//!
//! ```text
//! DeductionEngine
//!     ├── Arc<dyn BalanceStore>          (backing store, no caching)
//!     ├── Arc<ModeSwitch>                (process-wide mode flag)
//!     ├── AccountLocks                   (per-account async mutexes)
//!     ├── Arc<RequestTraceLedger>        (recent timelines)
//!     ├── Arc<ConflictSlot>              (latest lost-update snapshot)
//!     └── Arc<TelemetryBroadcaster>      (step-level trace events)
//! ```
//!
//! # Thread Safety
//!
//! `deduct` takes `&self` and is meant to be called from many tasks at once
//! on a multi-threaded runtime; the race only shows under real parallelism.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::detector::ConflictSlot;
use super::ledger::RequestTraceLedger;
use super::mode::ModeSwitch;
use super::traits::BalanceStore;
use crate::telemetry::TelemetryBroadcaster;
use crate::types::time::epoch_nanos;
use crate::types::{
    AccountId, ConflictSnapshot, DeductionRequest, DeductionResponse, ExecutionMode, LabError,
    MinorUnits, RequestTrace, TelemetryEvent, TraceEvent, TraceStep,
};

/// Registry of per-account mutual-exclusion locks
///
/// The locks are async because the protected critical section spans the
/// store calls and the processing delay, all of which await.
#[derive(Debug, Default)]
pub struct AccountLocks {
    locks: DashMap<AccountId, Arc<Mutex<()>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock guarding `account`, created on first use
    pub fn handle(&self, account: AccountId) -> Arc<Mutex<()>> {
        self.locks
            .entry(account)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Shared components the engine reads from and reports into
///
/// Grouped so the service facade can keep its own handles to the same
/// instances.
#[derive(Debug, Clone)]
pub struct EngineParts {
    pub mode: Arc<ModeSwitch>,
    pub ledger: Arc<RequestTraceLedger>,
    pub conflicts: Arc<ConflictSlot>,
    pub telemetry: Arc<TelemetryBroadcaster>,
}

/// Read-compute-write executor for balance deductions
pub struct DeductionEngine {
    store: Arc<dyn BalanceStore>,
    parts: EngineParts,
    locks: AccountLocks,
    processing_delay: Duration,
}

impl DeductionEngine {
    /// Create a new DeductionEngine
    ///
    /// # Arguments
    ///
    /// * `store` - Backing balance store
    /// * `parts` - Mode switch, ledger, conflict slot and broadcaster
    /// * `processing_delay` - Artificial delay between read and write
    pub fn new(
        store: Arc<dyn BalanceStore>,
        parts: EngineParts,
        processing_delay: Duration,
    ) -> Self {
        Self {
            store,
            parts,
            locks: AccountLocks::new(),
            processing_delay,
        }
    }

    /// Apply one deduction under the mode current at call time
    ///
    /// On success the call's timeline is registered with the ledger, which
    /// may capture a conflict snapshot.
    ///
    /// # Returns
    ///
    /// * `Ok(DeductionResponse)` - Old and new balance, and the mode used
    /// * `Err(LabError::AccountNotFound)` - Propagated from the store read
    /// * `Err(LabError::InsufficientBalance)` - Amount exceeds the balance read
    /// * `Err(LabError::StoreWriteFailure)` - Propagated from the store write
    pub async fn deduct(&self, request: &DeductionRequest) -> Result<DeductionResponse, LabError> {
        let mode = self.parts.mode.current();

        let (response, trace) = match mode {
            ExecutionMode::Unprotected => self.read_compute_write(request, mode).await?,
            ExecutionMode::Protected => {
                let lock = self.locks.handle(request.account());
                let _guard = lock.lock().await;
                self.read_compute_write(request, mode).await?
            }
        };

        self.register(trace);
        Ok(response)
    }

    async fn read_compute_write(
        &self,
        request: &DeductionRequest,
        mode: ExecutionMode,
    ) -> Result<(DeductionResponse, RequestTrace), LabError> {
        let account = request.account();
        let amount = request.amount();
        let request_id = request.request_id();

        // Step 1: read
        let read_time = epoch_nanos();
        let balance = self.store.get(account).await?;
        debug!(request_id = %request_id, account, balance, ?mode, "read balance");
        self.emit(request, TraceStep::Read, balance, None);

        // Step 2: validate against the (possibly stale) read
        if amount > balance {
            self.emit(request, TraceStep::Failed, balance, None);
            return Err(LabError::insufficient_balance(account, balance, amount));
        }

        // Step 3: processing delay, the race window
        let compute_start = epoch_nanos();
        if !self.processing_delay.is_zero() {
            tokio::time::sleep(self.processing_delay).await;
        }

        // Step 4: compute
        let new_balance = balance - amount;
        let compute_end = epoch_nanos();
        debug!(request_id = %request_id, new_balance, "computed new balance");

        // Step 5: unconditional write, last writer wins
        let write_time = epoch_nanos();
        if let Err(error) = self.store.set(account, new_balance).await {
            warn!(request_id = %request_id, account, %error, "balance write failed");
            self.emit(request, TraceStep::Failed, balance, None);
            return Err(error);
        }
        self.emit(request, TraceStep::WriteComplete, balance, Some(new_balance));
        debug!(request_id = %request_id, old_balance = balance, new_balance, "write complete");

        let response = DeductionResponse {
            account,
            old_balance: balance,
            new_balance,
            request_id: request_id.clone(),
            mode,
        };
        let trace = RequestTrace {
            request_id: request_id.clone(),
            read_time,
            read_value: balance,
            compute_start,
            compute_end,
            write_time,
            write_value: new_balance,
            amount,
        };

        Ok((response, trace))
    }

    /// Ledger the trace and keep any conflict the ledger reports
    fn register(&self, trace: RequestTrace) {
        let Some((a, b)) = self.parts.ledger.record(trace) else {
            return;
        };

        // Mode at capture time, which may differ from the mode the pair ran under.
        let use_lock = self.parts.mode.current().uses_lock();
        let snapshot = ConflictSnapshot::from_pair(a, b, use_lock);
        warn!(
            request_a = %snapshot.request_a.request_id,
            request_b = %snapshot.request_b.request_id,
            read_value = snapshot.initial_value,
            after_a = snapshot.after_a,
            after_b = snapshot.after_b,
            lost_amount = snapshot.lost_amount,
            use_lock,
            "captured conflict snapshot"
        );
        self.parts.conflicts.store(snapshot);
    }

    fn emit(
        &self,
        request: &DeductionRequest,
        step: TraceStep,
        balance: MinorUnits,
        new_balance: Option<MinorUnits>,
    ) {
        let event = TraceEvent::new(
            request.request_id().clone(),
            step,
            balance,
            request.amount(),
            new_balance,
        );
        self.parts.telemetry.publish(TelemetryEvent::Trace(event));
    }
}
