//! I/O module
//!
//! Handles report output.
//!
//! # Components
//!
//! - `report` - Account and simulation report serialization (JSON, CSV)

pub mod report;

pub use report::{write_accounts_csv, write_report, write_report_json};
