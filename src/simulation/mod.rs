//! Concurrent attack simulation
//!
//! Drives a `BalanceService` the way a burst of clients would: `workers`
//! tasks each issue `requests_per_worker` deductions of a fixed amount, with
//! a short pause between requests. The report compares the final balance to
//! what the successful deductions should have left behind; the difference
//! is the money erased by lost updates.
//!
//! # Example
//!
//! ```text
//! workers=100 requests=10 amount=1000
//! initial 1000000, 1000 successes  => expected 0
//! final   870000                   => lost 870000 (87.00%)
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::service::BalanceService;
use crate::types::{to_major_units, AccountId, ExecutionMode, LabError, MinorUnits};

/// Shape of one attack run
#[derive(Clone, Debug, PartialEq)]
pub struct AttackConfig {
    /// Number of concurrent worker tasks
    pub workers: usize,
    /// Deductions issued by each worker
    pub requests_per_worker: usize,
    /// Amount of every deduction, in minor units
    pub amount: MinorUnits,
    /// Pause after each deduction of a worker
    pub pause_between: Duration,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            workers: 100,
            requests_per_worker: 10,
            amount: 1000,
            pause_between: Duration::from_millis(5),
        }
    }
}

impl AttackConfig {
    /// Number of deductions the attack will issue
    pub fn total_requests(&self) -> u64 {
        (self.workers * self.requests_per_worker) as u64
    }
}

/// Outcome of an attack run
#[derive(Clone, Debug, PartialEq)]
pub struct AttackReport {
    pub mode: ExecutionMode,
    pub initial_balance: MinorUnits,
    pub final_balance: MinorUnits,
    pub success_count: u64,
    pub failure_count: u64,
    pub amount: MinorUnits,
    pub elapsed: Duration,
}

impl AttackReport {
    /// Balance the account should hold given the successful deductions
    pub fn expected_balance(&self) -> MinorUnits {
        self.initial_balance - self.success_count as MinorUnits * self.amount
    }

    /// Money that vanished through overwritten updates
    pub fn lost_amount(&self) -> MinorUnits {
        self.final_balance - self.expected_balance()
    }

    /// Lost amount as a percentage of the successfully deducted total
    pub fn loss_ratio(&self) -> Decimal {
        let deducted = self.success_count as MinorUnits * self.amount;
        if deducted == 0 {
            return Decimal::ZERO;
        }
        (Decimal::from(self.lost_amount()) * Decimal::ONE_HUNDRED / Decimal::from(deducted))
            .round_dp(2)
    }

    /// Completed requests per second
    pub fn throughput(&self) -> f64 {
        let seconds = self.elapsed.as_secs_f64();
        if seconds == 0.0 {
            return 0.0;
        }
        (self.success_count + self.failure_count) as f64 / seconds
    }

    pub fn has_lost_updates(&self) -> bool {
        self.lost_amount() != 0
    }
}

impl fmt::Display for AttackReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "mode:             {}", self.mode.label())?;
        writeln!(f, "elapsed:          {:.3}s", self.elapsed.as_secs_f64())?;
        writeln!(f, "successes:        {}", self.success_count)?;
        writeln!(f, "failures:         {}", self.failure_count)?;
        writeln!(f, "throughput:       {:.2} req/s", self.throughput())?;
        writeln!(f, "initial balance:  {}", to_major_units(self.initial_balance))?;
        writeln!(f, "final balance:    {}", to_major_units(self.final_balance))?;
        writeln!(f, "expected balance: {}", to_major_units(self.expected_balance()))?;
        writeln!(f, "lost amount:      {}", to_major_units(self.lost_amount()))?;
        write!(f, "loss ratio:       {:.2}%", self.loss_ratio())
    }
}

/// Run an attack against `account` and report the damage
///
/// Uses the mode the service is currently in. Individual deduction failures
/// are counted, not propagated.
///
/// # Errors
///
/// * `LabError::InvalidInput` - If the attack amount is not positive
/// * `LabError::AccountNotFound` - If the account cannot be read before or after
/// * `LabError::Runtime` - If a worker task panicked
pub async fn run_attack(
    service: Arc<BalanceService>,
    account: AccountId,
    config: &AttackConfig,
) -> Result<AttackReport, LabError> {
    if config.amount <= 0 {
        return Err(LabError::invalid_input(
            "amount",
            &format!("must be a positive number of minor units, got {}", config.amount),
        ));
    }

    let mode = service.execution_mode();
    let initial_balance = service.get_balance(account).await?;
    info!(
        account,
        workers = config.workers,
        requests_per_worker = config.requests_per_worker,
        total_requests = config.total_requests(),
        amount = config.amount,
        mode = mode.label(),
        initial_balance,
        "starting attack"
    );

    let successes = Arc::new(AtomicU64::new(0));
    let failures = Arc::new(AtomicU64::new(0));
    let started = Instant::now();

    let tasks = (0..config.workers).map(|_| {
        let service = Arc::clone(&service);
        let successes = Arc::clone(&successes);
        let failures = Arc::clone(&failures);
        let config = config.clone();
        tokio::spawn(async move {
            for _ in 0..config.requests_per_worker {
                match service.deduct(account, config.amount).await {
                    Ok(_) => successes.fetch_add(1, Ordering::Relaxed),
                    Err(_) => failures.fetch_add(1, Ordering::Relaxed),
                };
                if !config.pause_between.is_zero() {
                    tokio::time::sleep(config.pause_between).await;
                }
            }
        })
    });

    let panicked = join_all(tasks)
        .await
        .into_iter()
        .filter(Result::is_err)
        .count();
    if panicked > 0 {
        warn!(panicked, "attack workers panicked");
        return Err(LabError::runtime(&format!("{} attack workers panicked", panicked)));
    }

    let elapsed = started.elapsed();
    let final_balance = service.get_balance(account).await?;
    let report = AttackReport {
        mode,
        initial_balance,
        final_balance,
        success_count: successes.load(Ordering::Relaxed),
        failure_count: failures.load(Ordering::Relaxed),
        amount: config.amount,
        elapsed,
    };

    info!(
        final_balance,
        expected_balance = report.expected_balance(),
        lost_amount = report.lost_amount(),
        "attack finished"
    );
    Ok(report)
}
