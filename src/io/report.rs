//! Report output for accounts and simulation runs
//!
//! This module centralizes output format concerns:
//! - JSON: the whole simulation report (accounts plus transfer counts)
//! - CSV: one row per account, ordered by id
//!
//! All functions write to a caller-provided writer so they are easy to test.

use crate::cli::OutputFormat;
use crate::simulation::SimulationReport;
use crate::types::Account;
use std::io::Write;

/// Write a simulation report in the requested format
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(String)` if serialization or a write failed
pub fn write_report(
    report: &SimulationReport,
    format: &OutputFormat,
    output: &mut dyn Write,
) -> Result<(), String> {
    match format {
        OutputFormat::Json => write_report_json(report, output),
        OutputFormat::Csv => write_accounts_csv(&report.accounts, output),
    }
}

/// Write the full report as pretty-printed JSON followed by a newline
pub fn write_report_json(report: &SimulationReport, output: &mut dyn Write) -> Result<(), String> {
    serde_json::to_writer_pretty(&mut *output, report)
        .map_err(|e| format!("Failed to serialize report: {}", e))?;
    writeln!(output).map_err(|e| format!("Failed to write output: {}", e))
}

/// Write account states to CSV format
///
/// Columns: id, owner, balance, currency, created_at. Accounts are sorted
/// by id for deterministic output.
pub fn write_accounts_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), String> {
    let mut sorted: Vec<&Account> = accounts.iter().collect();
    sorted.sort_by_key(|account| account.id);

    let mut writer = csv::Writer::from_writer(output);
    for account in sorted {
        writer
            .serialize(account)
            .map_err(|e| format!("Failed to write account {}: {}", account.id, e))?;
    }
    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))
}
