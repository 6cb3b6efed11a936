//! CSV export of the balance history
//!
//! One row per sample, oldest first, with columns
//! `timestamp,actual_balance,expected_balance`. Balances stay in minor units
//! so the file round-trips without rounding.

use std::io::Write;

use csv::Writer;

use crate::types::{BalanceSample, LabError};

/// Column names of the history export
pub const HISTORY_HEADER: [&str; 3] = ["timestamp", "actual_balance", "expected_balance"];

/// Write balance samples in CSV format
///
/// The header is always written, even for an empty history.
///
/// # Arguments
///
/// * `samples` - Samples in the order they should appear
/// * `output` - Mutable reference to a writer for outputting CSV
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(LabError::Runtime)` if a write error occurred
pub fn write_history_csv(samples: &[BalanceSample], output: &mut dyn Write) -> Result<(), LabError> {
    let mut writer = Writer::from_writer(output);

    writer.write_record(HISTORY_HEADER)?;
    for sample in samples {
        writer.write_record(&[
            sample.timestamp.to_string(),
            sample.actual_balance.to_string(),
            sample.expected_balance.to_string(),
        ])?;
    }
    writer.flush()?;

    Ok(())
}
