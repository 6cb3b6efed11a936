//! Periodic balance sampler
//!
//! A background task wakes on a fixed interval, reads the balance of the
//! monitored account, appends `(timestamp, actual, expected)` to the history
//! and publishes a `balance_update` event. The pause flag is checked on
//! every tick; a paused sampler keeps ticking but does nothing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::config::DEFAULT_SAMPLE_INTERVAL;
use crate::service::BalanceService;
use crate::types::{AccountId, BalanceSample, MonitoringStatus, TelemetryEvent};

/// Administrative pause flag for the sampler
#[derive(Debug, Default)]
pub struct MonitoringSwitch {
    paused: AtomicBool,
}

impl MonitoringSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pause sampling; returns `true` if it was running
    pub fn pause(&self) -> bool {
        !self.paused.swap(true, Ordering::SeqCst)
    }

    /// Resume sampling; returns `true` if it was paused
    pub fn resume(&self) -> bool {
        self.paused.swap(false, Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> MonitoringStatus {
        if self.is_paused() {
            MonitoringStatus::Paused
        } else {
            MonitoringStatus::Running
        }
    }
}

/// Background sampler for one account
#[derive(Clone)]
pub struct MonitoringSampler {
    service: Arc<BalanceService>,
    account: AccountId,
    interval: Duration,
}

impl MonitoringSampler {
    /// Sampler for `account` using the service's configured interval
    pub fn new(service: Arc<BalanceService>, account: AccountId) -> Self {
        let interval = service.config().sample_interval;
        Self::with_interval(service, account, interval)
    }

    /// Sampler with an explicit period; a zero period uses the default
    pub fn with_interval(
        service: Arc<BalanceService>,
        account: AccountId,
        interval: Duration,
    ) -> Self {
        let interval = if interval.is_zero() {
            DEFAULT_SAMPLE_INTERVAL
        } else {
            interval
        };
        Self {
            service,
            account,
            interval,
        }
    }

    /// Start the sampling loop on the current runtime
    ///
    /// The loop runs until the returned handle is aborted or the runtime
    /// shuts down.
    pub fn spawn(&self) -> JoinHandle<()> {
        let sampler = self.clone();
        tokio::spawn(async move { sampler.run().await })
    }

    async fn run(self) {
        info!(
            account = self.account,
            interval_ms = self.interval.as_millis() as u64,
            "monitoring sampler started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.sample_once().await;
        }
    }

    /// Take one sample unless monitoring is paused
    ///
    /// # Returns
    ///
    /// The recorded sample, or `None` if paused or the balance read failed.
    pub async fn sample_once(&self) -> Option<BalanceSample> {
        if self.service.monitoring().is_paused() {
            return None;
        }

        let actual = match self.service.get_balance(self.account).await {
            Ok(balance) => balance,
            Err(error) => {
                warn!(account = self.account, %error, "sampler could not read balance");
                return None;
            }
        };

        let stats = self.service.get_stats();
        let expected = stats.expected_balance.unwrap_or(actual);
        let sample = BalanceSample::now(actual, expected);
        self.service.history().push(sample);
        self.service.telemetry().publish(TelemetryEvent::BalanceUpdate {
            balance: actual,
            stats,
        });

        Some(sample)
    }
}
