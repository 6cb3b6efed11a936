use crate::config::LabConfig;
use crate::simulation::AttackConfig;
use crate::types::{AccountId, ExecutionMode, MinorUnits};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Reproduce and inspect lost updates on a shared balance
#[derive(Parser, Debug)]
#[command(name = "race-lab")]
#[command(about = "Reproduce lost updates on a shared balance under concurrent deductions", long_about = None)]
pub struct CliArgs {
    /// Deduction protocol used for the attack
    #[arg(
        long = "mode",
        value_name = "MODE",
        default_value = "unprotected",
        help = "Deduction protocol: 'unprotected' (racy) or 'protected' (per-account lock)"
    )]
    pub mode: ModeArg,

    /// Account to attack
    #[arg(long = "account", value_name = "ID", default_value_t = 1)]
    pub account: AccountId,

    /// Balance the account is reset to before the attack, in minor units
    #[arg(long = "initial-balance", value_name = "MINOR_UNITS", default_value_t = 1_000_000)]
    pub initial_balance: MinorUnits,

    /// Number of concurrent workers
    #[arg(
        long = "workers",
        value_name = "COUNT",
        help = "Number of concurrent workers (default: 100)"
    )]
    pub workers: Option<usize>,

    /// Deductions per worker
    #[arg(
        long = "requests",
        value_name = "COUNT",
        help = "Deductions issued by each worker (default: 10)"
    )]
    pub requests_per_worker: Option<usize>,

    /// Amount of each deduction, in minor units
    #[arg(
        long = "amount",
        value_name = "MINOR_UNITS",
        help = "Amount of each deduction in minor units (default: 1000)"
    )]
    pub amount: Option<MinorUnits>,

    /// Pause between two deductions of one worker
    #[arg(long = "pause-ms", value_name = "MS", help = "Pause between deductions of a worker (default: 5)")]
    pub pause_ms: Option<u64>,

    /// Artificial delay between read and write
    #[arg(long = "delay-ms", value_name = "MS", help = "Delay between read and write (default: 10)")]
    pub delay_ms: Option<u64>,

    /// Request traces kept for conflict detection
    #[arg(long = "ledger-capacity", value_name = "COUNT")]
    pub ledger_capacity: Option<usize>,

    /// Balance samples kept in the history
    #[arg(long = "history-capacity", value_name = "COUNT")]
    pub history_capacity: Option<usize>,

    /// Monitoring sampler period
    #[arg(long = "sample-interval-ms", value_name = "MS")]
    pub sample_interval_ms: Option<u64>,

    /// Simulated store round-trip
    #[arg(long = "store-latency-ms", value_name = "MS")]
    pub store_latency_ms: Option<u64>,

    /// Worker threads of the runtime
    #[arg(
        long = "worker-threads",
        value_name = "COUNT",
        help = "Runtime worker threads (default: CPU cores)"
    )]
    pub worker_threads: Option<usize>,

    /// Write the balance history to this CSV file after the attack
    #[arg(long = "history-out", value_name = "PATH")]
    pub history_out: Option<PathBuf>,

    /// Print every telemetry message as JSON on stderr while attacking
    #[arg(long = "watch")]
    pub watch: bool,

    /// Default log filter when RUST_LOG is not set
    #[arg(long = "log-level", value_name = "FILTER", default_value = "info")]
    pub log_level: String,
}

/// Protocol selection on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Unprotected,
    Protected,
}

impl From<ModeArg> for ExecutionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Unprotected => ExecutionMode::Unprotected,
            ModeArg::Protected => ExecutionMode::Protected,
        }
    }
}

impl CliArgs {
    /// Create a LabConfig from CLI arguments
    ///
    /// Options that were not given keep their defaults; invalid values
    /// fall back to defaults with a warning.
    pub fn to_lab_config(&self) -> LabConfig {
        let default = LabConfig::default();
        LabConfig::new(
            self.delay_ms
                .map(Duration::from_millis)
                .unwrap_or(default.processing_delay),
            self.ledger_capacity.unwrap_or(default.ledger_capacity),
            self.history_capacity.unwrap_or(default.history_capacity),
            self.sample_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(default.sample_interval),
            default.subscriber_buffer,
            self.store_latency_ms
                .map(Duration::from_millis)
                .unwrap_or(default.store_latency),
        )
    }

    /// Create an AttackConfig from CLI arguments
    pub fn to_attack_config(&self) -> AttackConfig {
        let default = AttackConfig::default();
        AttackConfig {
            workers: self.workers.unwrap_or(default.workers),
            requests_per_worker: self.requests_per_worker.unwrap_or(default.requests_per_worker),
            amount: self.amount.unwrap_or(default.amount),
            pause_between: self
                .pause_ms
                .map(Duration::from_millis)
                .unwrap_or(default.pause_between),
        }
    }

    /// Runtime worker threads, never zero
    pub fn worker_threads(&self) -> usize {
        match self.worker_threads {
            Some(0) | None => num_cpus::get(),
            Some(threads) => threads,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    // Mode parsing tests
    #[rstest]
    #[case::default_mode(&["race-lab"], ModeArg::Unprotected)]
    #[case::explicit_unprotected(&["race-lab", "--mode", "unprotected"], ModeArg::Unprotected)]
    #[case::explicit_protected(&["race-lab", "--mode", "protected"], ModeArg::Protected)]
    fn test_mode_parsing(#[case] args: &[&str], #[case] expected: ModeArg) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.mode, expected);
    }

    #[rstest]
    #[case::unprotected(ModeArg::Unprotected, ExecutionMode::Unprotected)]
    #[case::protected(ModeArg::Protected, ExecutionMode::Protected)]
    fn test_mode_conversion(#[case] arg: ModeArg, #[case] expected: ExecutionMode) {
        assert_eq!(ExecutionMode::from(arg), expected);
    }

    // AttackConfig conversion tests
    #[rstest]
    #[case::all_defaults(&["race-lab"], 100, 10, 1000, 5)]
    #[case::custom_workers(&["race-lab", "--workers", "8"], 8, 10, 1000, 5)]
    #[case::all_custom(
        &["race-lab", "--workers", "4", "--requests", "3", "--amount", "250", "--pause-ms", "0"],
        4,
        3,
        250,
        0
    )]
    fn test_attack_config_conversion(
        #[case] args: &[&str],
        #[case] workers: usize,
        #[case] requests: usize,
        #[case] amount: MinorUnits,
        #[case] pause_ms: u64,
    ) {
        let config = CliArgs::try_parse_from(args).unwrap().to_attack_config();

        assert_eq!(config.workers, workers);
        assert_eq!(config.requests_per_worker, requests);
        assert_eq!(config.amount, amount);
        assert_eq!(config.pause_between, Duration::from_millis(pause_ms));
    }

    // LabConfig conversion tests
    #[rstest]
    #[case::all_defaults(&["race-lab"], 10, 10, 1000, 500)]
    #[case::custom_delay(&["race-lab", "--delay-ms", "50"], 50, 10, 1000, 500)]
    #[case::all_custom(
        &["race-lab", "--delay-ms", "1", "--ledger-capacity", "4", "--history-capacity", "20", "--sample-interval-ms", "100"],
        1,
        4,
        20,
        100
    )]
    #[case::zero_capacities_fall_back(
        &["race-lab", "--ledger-capacity", "0", "--history-capacity", "0"],
        10,
        10,
        1000,
        500
    )]
    fn test_lab_config_conversion(
        #[case] args: &[&str],
        #[case] delay_ms: u64,
        #[case] ledger: usize,
        #[case] history: usize,
        #[case] interval_ms: u64,
    ) {
        let config = CliArgs::try_parse_from(args).unwrap().to_lab_config();

        assert_eq!(config.processing_delay, Duration::from_millis(delay_ms));
        assert_eq!(config.ledger_capacity, ledger);
        assert_eq!(config.history_capacity, history);
        assert_eq!(config.sample_interval, Duration::from_millis(interval_ms));
    }

    #[rstest]
    #[case::default(&["race-lab"], num_cpus::get())]
    #[case::explicit(&["race-lab", "--worker-threads", "3"], 3)]
    #[case::zero_falls_back(&["race-lab", "--worker-threads", "0"], num_cpus::get())]
    fn test_worker_threads(#[case] args: &[&str], #[case] expected: usize) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.worker_threads(), expected);
    }

    #[test]
    fn test_output_options() {
        let parsed =
            CliArgs::try_parse_from(["race-lab", "--history-out", "h.csv", "--watch"]).unwrap();

        assert_eq!(parsed.history_out, Some(PathBuf::from("h.csv")));
        assert!(parsed.watch);
        assert_eq!(parsed.log_level, "info");
    }

    // Error handling tests
    #[rstest]
    #[case::invalid_mode(&["race-lab", "--mode", "optimistic"])]
    #[case::negative_workers(&["race-lab", "--workers", "-1"])]
    #[case::non_numeric_amount(&["race-lab", "--amount", "ten"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        let result = CliArgs::try_parse_from(args);
        assert!(result.is_err());
    }
}
