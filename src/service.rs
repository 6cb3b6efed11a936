//! Balance service facade
//!
//! `BalanceService` is the inbound contract of the lab. It wires a
//! [`BalanceStore`] to the deduction engine, owns the statistics and the
//! balance history, and exposes every administrative operation: mode
//! switching, monitoring pause/resume, history queries and the conflict
//! snapshot.
//!
//! # Architecture
//!
//! ```text
//! BalanceService
//!     ├── Arc<dyn BalanceStore>
//!     ├── DeductionEngine ──┬── Arc<ModeSwitch>
//!     │                     ├── Arc<RequestTraceLedger>
//!     │                     ├── Arc<ConflictSlot>
//!     │                     └── Arc<TelemetryBroadcaster>
//!     ├── StatsRecorder
//!     ├── BalanceHistory     (appended by MonitoringSampler)
//!     └── MonitoringSwitch
//! ```
//!
//! Each piece of shared state is guarded on its own; no operation here
//! takes two of those locks at once.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::LabConfig;
use crate::core::{
    BalanceHistory, BalanceStore, ConflictSlot, DeductionEngine, EngineParts, ModeSwitch,
    RequestTraceLedger, StatsRecorder,
};
use crate::telemetry::{MonitoringSwitch, Subscription, TelemetryBroadcaster};
use crate::types::{
    AccountId, BalanceSample, ConflictSnapshot, DeductionRequest, DeductionResponse,
    ExecutionMode, LabError, MinorUnits, MonitoringStatus, Stats, TelemetryEvent,
};

/// Thread-safe entry point for deductions and administration
pub struct BalanceService {
    store: Arc<dyn BalanceStore>,
    engine: DeductionEngine,
    parts: EngineParts,
    stats: StatsRecorder,
    history: BalanceHistory,
    monitoring: MonitoringSwitch,
    config: LabConfig,
}

impl BalanceService {
    /// Create a new BalanceService
    ///
    /// Starts in unprotected mode with monitoring running and empty
    /// statistics. The expected balance stays unknown until the first
    /// `reset_balance`.
    ///
    /// # Arguments
    ///
    /// * `store` - Backing balance store
    /// * `config` - Delay, capacities and subscriber buffer size; zero
    ///   capacities fall back to the defaults
    pub fn new(store: Arc<dyn BalanceStore>, config: &LabConfig) -> Self {
        let config = config.validated();
        let parts = EngineParts {
            mode: Arc::new(ModeSwitch::default()),
            ledger: Arc::new(RequestTraceLedger::new(config.ledger_capacity)),
            conflicts: Arc::new(ConflictSlot::new()),
            telemetry: Arc::new(TelemetryBroadcaster::new(config.subscriber_buffer)),
        };
        let engine = DeductionEngine::new(
            Arc::clone(&store),
            parts.clone(),
            config.processing_delay,
        );

        Self {
            store,
            engine,
            parts,
            stats: StatsRecorder::new(),
            history: BalanceHistory::new(config.history_capacity),
            monitoring: MonitoringSwitch::new(),
            config,
        }
    }

    /// Deduct `amount` minor units from `account`
    ///
    /// Requests with a non-positive amount are rejected before they are
    /// counted. Every other call counts towards `total_requests` and then
    /// towards exactly one of `success_count` / `failure_count`.
    ///
    /// # Errors
    ///
    /// * `LabError::InvalidInput` - If `amount` is not positive
    /// * `LabError::AccountNotFound` - If the account does not exist
    /// * `LabError::InsufficientBalance` - If the balance read is too low
    /// * `LabError::StoreWriteFailure` - If the store rejects the write
    pub async fn deduct(
        &self,
        account: AccountId,
        amount: MinorUnits,
    ) -> Result<DeductionResponse, LabError> {
        let request = DeductionRequest::new(account, amount)?;
        self.execute(&request).await
    }

    /// Deduct using a request built by the caller (and its request ID)
    pub async fn execute(&self, request: &DeductionRequest) -> Result<DeductionResponse, LabError> {
        self.stats.record_request();

        match self.engine.deduct(request).await {
            Ok(response) => {
                self.stats.record_success(request.amount());
                debug!(
                    request_id = %response.request_id,
                    account = response.account,
                    old_balance = response.old_balance,
                    new_balance = response.new_balance,
                    mode = response.mode.label(),
                    "deduction complete"
                );
                Ok(response)
            }
            Err(error) => {
                self.stats.record_failure();
                if error.is_business_rejection() {
                    info!(request_id = %request.request_id(), %error, "deduction rejected");
                } else {
                    warn!(request_id = %request.request_id(), %error, "deduction failed");
                }
                Err(error)
            }
        }
    }

    /// Current balance straight from the store
    pub async fn get_balance(&self, account: AccountId) -> Result<MinorUnits, LabError> {
        self.store.get(account).await
    }

    /// Overwrite the balance of `account` and start a fresh experiment
    ///
    /// Statistics are zeroed and the expected balance is re-based on
    /// `balance`. The ledger and any captured snapshot are left alone.
    ///
    /// # Errors
    ///
    /// * `LabError::InvalidInput` - If `balance` is negative
    /// * Any error from the store's `set`
    pub async fn reset_balance(
        &self,
        account: AccountId,
        balance: MinorUnits,
    ) -> Result<(), LabError> {
        if balance < 0 {
            return Err(LabError::invalid_input(
                "balance",
                &format!("must not be negative, got {}", balance),
            ));
        }

        self.store.set(account, balance).await?;
        self.stats.reset(balance);
        self.parts
            .telemetry
            .publish(TelemetryEvent::Reset { account, balance });
        info!(account, balance, "balance reset");
        Ok(())
    }

    /// Switch between the protected and unprotected protocols
    ///
    /// Takes effect for deductions that start after the call; in-flight
    /// deductions finish under the mode they observed.
    pub fn set_mode(&self, use_lock: bool) {
        self.set_execution_mode(ExecutionMode::from_use_lock(use_lock));
    }

    /// Whether deductions currently run under the per-account lock
    pub fn get_mode(&self) -> bool {
        self.execution_mode().uses_lock()
    }

    pub fn set_execution_mode(&self, mode: ExecutionMode) {
        let previous = self.parts.mode.set(mode);
        self.parts.telemetry.publish(TelemetryEvent::ModeChanged {
            mode: mode.label(),
            use_lock: mode.uses_lock(),
        });
        info!(from = previous.label(), to = mode.label(), "execution mode switched");
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        self.parts.mode.current()
    }

    /// Stop periodic sampling; returns the resulting status
    pub fn pause_monitoring(&self) -> MonitoringStatus {
        if self.monitoring.pause() {
            info!("monitoring paused");
            self.publish_monitoring_status(MonitoringStatus::Paused);
        }
        self.monitoring.status()
    }

    /// Restart periodic sampling; returns the resulting status
    pub fn resume_monitoring(&self) -> MonitoringStatus {
        if self.monitoring.resume() {
            info!("monitoring resumed");
            self.publish_monitoring_status(MonitoringStatus::Running);
        }
        self.monitoring.status()
    }

    pub fn get_monitoring_status(&self) -> MonitoringStatus {
        self.monitoring.status()
    }

    /// Copy of the aggregate counters
    pub fn get_stats(&self) -> Stats {
        self.stats.snapshot()
    }

    /// Balance samples with `start <= timestamp <= end`, oldest first
    ///
    /// Bounds are epoch milliseconds; `None` leaves that side open.
    pub fn get_history(&self, start: Option<i64>, end: Option<i64>) -> Vec<BalanceSample> {
        self.history.range(start, end)
    }

    /// Most recently captured conflict, if any
    pub fn get_conflict_snapshot(&self) -> Option<ConflictSnapshot> {
        self.parts.conflicts.get()
    }

    /// Forget the captured conflict and every ledgered trace
    pub fn clear_conflict_snapshot(&self) {
        self.parts.conflicts.clear();
        self.parts.ledger.clear();
        debug!("conflict snapshot and trace ledger cleared");
    }

    /// Register a telemetry subscriber for `account`
    ///
    /// The first message the subscriber receives is an `init` event with
    /// the current balance and statistics.
    ///
    /// # Errors
    ///
    /// * `LabError::AccountNotFound` - If the account does not exist
    pub async fn subscribe(&self, account: AccountId) -> Result<Subscription, LabError> {
        let balance = self.store.get(account).await?;
        let initial = TelemetryEvent::Init {
            balance,
            stats: self.stats.snapshot(),
        };
        Ok(self.parts.telemetry.subscribe_with(initial))
    }

    pub fn telemetry(&self) -> &Arc<TelemetryBroadcaster> {
        &self.parts.telemetry
    }

    pub fn history(&self) -> &BalanceHistory {
        &self.history
    }

    pub fn monitoring(&self) -> &MonitoringSwitch {
        &self.monitoring
    }

    pub fn config(&self) -> &LabConfig {
        &self.config
    }

    fn publish_monitoring_status(&self, status: MonitoringStatus) {
        self.parts
            .telemetry
            .publish(TelemetryEvent::MonitoringStatus { status });
    }
}
