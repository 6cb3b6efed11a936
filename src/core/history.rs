//! Request statistics and the balance history series
//!
//! Both are guarded independently of the engine's own state: the counters sit
//! behind a plain mutex (hot path, tiny critical sections) and the history
//! behind a reader/writer lock (appended by the sampler, read by queries).

use std::collections::VecDeque;

use parking_lot::{Mutex, RwLock};

use crate::types::{BalanceSample, MinorUnits, Stats};

/// Aggregate request counters
#[derive(Debug, Default)]
pub struct StatsRecorder {
    stats: Mutex<Stats>,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.stats.lock().total_requests += 1;
    }

    /// Count a successful deduction and move the expected balance with it
    pub fn record_success(&self, amount: MinorUnits) {
        let mut stats = self.stats.lock();
        stats.success_count += 1;
        if let Some(expected) = stats.expected_balance.as_mut() {
            *expected -= amount;
        }
    }

    pub fn record_failure(&self) {
        self.stats.lock().failure_count += 1;
    }

    /// Zero all counters and re-base the expected balance
    pub fn reset(&self, balance: MinorUnits) {
        let mut stats = self.stats.lock();
        *stats = Stats::new();
        stats.expected_balance = Some(balance);
    }

    pub fn snapshot(&self) -> Stats {
        self.stats.lock().clone()
    }
}

/// Bounded time series of balance samples
///
/// Appending beyond capacity drops the oldest sample.
#[derive(Debug)]
pub struct BalanceHistory {
    samples: RwLock<VecDeque<BalanceSample>>,
    capacity: usize,
}

impl BalanceHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn push(&self, sample: BalanceSample) {
        let mut samples = self.samples.write();
        samples.push_back(sample);
        while samples.len() > self.capacity {
            samples.pop_front();
        }
    }

    /// Samples whose timestamp falls in `[start, end]`, oldest first
    ///
    /// A missing bound leaves that side open.
    pub fn range(&self, start: Option<i64>, end: Option<i64>) -> Vec<BalanceSample> {
        self.samples
            .read()
            .iter()
            .filter(|sample| start.map_or(true, |start| sample.timestamp >= start))
            .filter(|sample| end.map_or(true, |end| sample.timestamp <= end))
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.samples.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
