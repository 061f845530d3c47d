//! Rust Transfer Engine CLI
//!
//! Command-line driver that provisions accounts in an in-memory ledger and
//! runs concurrent random transfers between them.
//!
//! # Usage
//!
//! ```bash
//! cargo run
//! cargo run -- --accounts 10 --transfers 5000 --concurrency 32
//! cargo run -- --format csv > balances.csv
//! RUST_LOG=debug cargo run -- --transfers 10
//! ```
//!
//! The report (final balances and conservation check) goes to stdout,
//! diagnostics go to stderr.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (runtime setup, provisioning, output) or money was not conserved

use rust_transfer_engine::cli;
use rust_transfer_engine::io::write_report;
use rust_transfer_engine::logging::init_logging;
use rust_transfer_engine::simulation::Simulation;
use std::process;

fn main() {
    let args = cli::parse_args();
    init_logging(&args.log_level);

    let engine_config = args.to_engine_config();
    let simulation_config = args.to_simulation_config();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(simulation_config.concurrency)
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: Failed to create tokio runtime: {}", e);
            process::exit(1);
        }
    };

    let simulation = Simulation::new(&engine_config, simulation_config);
    let report = match runtime.block_on(simulation.run()) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let mut output = std::io::stdout();
    if let Err(e) = write_report(&report, &args.format, &mut output) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    if !report.is_conserved() {
        eprintln!(
            "Error: balances not conserved ({} before, {} after)",
            report.total_before, report.total_after
        );
        process::exit(1);
    }
}
