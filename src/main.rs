//! Balance Race Lab CLI
//!
//! Command-line driver that reproduces the lost-update race on a shared
//! balance and reports how much money vanished.
//!
//! # Usage
//!
//! ```bash
//! cargo run
//! cargo run -- --mode protected
//! cargo run -- --workers 50 --requests 20 --amount 500 --delay-ms 20
//! cargo run -- --history-out history.csv --watch
//! ```
//!
//! The report and the captured conflict snapshot go to stdout; logs (and the
//! telemetry stream with `--watch`) go to stderr.
//!
//! # Modes
//!
//! - **unprotected**: read, compute and write race freely (default)
//! - **protected**: each deduction holds a per-account lock end to end
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (runtime setup, unknown account, export failure, etc.)

use balance_race_lab::cli;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    // Parse command-line arguments using clap
    let args = cli::parse_args();

    // RUST_LOG wins over --log-level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut output = std::io::stdout();
    if let Err(e) = cli::execute(&args, &mut output) {
        tracing::error!(error = %e, "race lab failed");
        process::exit(1);
    }
}
