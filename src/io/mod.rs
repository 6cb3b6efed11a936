//! I/O module for exporting lab results
//!
//! - `csv_format` - Balance history export

pub mod csv_format;

pub use csv_format::write_history_csv;
