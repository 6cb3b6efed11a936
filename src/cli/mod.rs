// CLI module
// Command-line interface, argument parsing and the attack runner

mod args;

pub use args::{CliArgs, ModeArg};

use std::fs::File;
use std::io::Write;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use crate::core::MemoryBalanceStore;
use crate::io::write_history_csv;
use crate::service::BalanceService;
use crate::simulation::run_attack;
use crate::telemetry::MonitoringSampler;
use crate::types::LabError;

/// Parse command-line arguments using clap
///
/// This function parses the command-line arguments and returns a `CliArgs` struct
/// containing the parsed values. If parsing fails (e.g., invalid arguments or
/// --help flag), clap will automatically display an error message or help text
/// and exit the process.
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}

/// Run one attack experiment end to end and write the results
///
/// This function:
/// 1. Creates a tokio multi-threaded runtime with the configured worker threads
/// 2. Seeds an in-memory store and builds the service around it
/// 3. Resets the account and selects the requested mode
/// 4. Starts the monitoring sampler (and the telemetry watcher if asked)
/// 5. Runs the attack and takes one last sample
/// 6. Writes the report and the captured conflict snapshot to `output`
/// 7. Exports the balance history to CSV if a path was given
///
/// # Errors
///
/// Runtime construction, unknown accounts, output and export failures are
/// returned. Individual deduction failures only show up in the report.
pub fn execute(args: &CliArgs, output: &mut dyn Write) -> Result<(), LabError> {
    let lab_config = args.to_lab_config();
    let attack = args.to_attack_config();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(args.worker_threads())
        .enable_time()
        .build()
        .map_err(|e| LabError::runtime(&format!("Failed to create tokio runtime: {}", e)))?;

    let (report, snapshot, history) = runtime.block_on(async {
        let store = Arc::new(MemoryBalanceStore::with_latency(lab_config.store_latency));
        store.open_account(args.account, args.initial_balance);
        let service = Arc::new(BalanceService::new(store, &lab_config));

        service
            .reset_balance(args.account, args.initial_balance)
            .await?;
        service.set_execution_mode(args.mode.into());

        let watcher = if args.watch {
            let mut subscription = service.subscribe(args.account).await?;
            Some(tokio::spawn(async move {
                while let Some(message) = subscription.recv().await {
                    match serde_json::to_string(&message) {
                        Ok(line) => eprintln!("{}", line),
                        Err(error) => warn!(%error, "could not encode telemetry message"),
                    }
                }
            }))
        } else {
            None
        };

        let sampler = MonitoringSampler::new(Arc::clone(&service), args.account);
        let sampling = sampler.spawn();

        let report = run_attack(Arc::clone(&service), args.account, &attack).await;
        sampler.sample_once().await;
        sampling.abort();
        if let Some(watcher) = watcher {
            watcher.abort();
        }

        Ok::<_, LabError>((
            report?,
            service.get_conflict_snapshot(),
            service.get_history(None, None),
        ))
    })?;

    writeln!(output, "{}", report)?;
    writeln!(output)?;
    match snapshot {
        Some(snapshot) => {
            writeln!(output, "conflict snapshot:")?;
            serde_json::to_writer_pretty(&mut *output, &snapshot)?;
            writeln!(output)?;
        }
        None => writeln!(output, "no conflict captured")?,
    }

    if let Some(path) = &args.history_out {
        let mut file = File::create(path)?;
        write_history_csv(&history, &mut file)?;
        info!(path = %path.display(), samples = history.len(), "history exported");
    }

    Ok(())
}
