use crate::config::EngineConfig;
use crate::simulation::SimulationConfig;
use clap::{Parser, ValueEnum};
use std::time::Duration;

/// Run concurrent money transfers against an in-memory ledger
#[derive(Parser, Debug)]
#[command(name = "transfer-engine")]
#[command(
    about = "Run concurrent money transfers against an in-memory ledger",
    long_about = None
)]
pub struct CliArgs {
    /// Number of accounts to provision
    #[arg(long, value_name = "COUNT", default_value_t = 4)]
    pub accounts: usize,

    /// Number of transfers to execute
    #[arg(long, value_name = "COUNT", default_value_t = 100)]
    pub transfers: usize,

    /// Starting balance of every account, in minor units
    #[arg(long = "initial-balance", value_name = "AMOUNT", default_value_t = 1000)]
    pub initial_balance: i64,

    /// Largest single transfer amount, in minor units
    #[arg(long = "max-amount", value_name = "AMOUNT", default_value_t = 100)]
    pub max_amount: i64,

    /// Maximum number of transfers in flight
    #[arg(
        long,
        value_name = "COUNT",
        help = "Maximum number of transfers in flight (default: CPU cores)"
    )]
    pub concurrency: Option<usize>,

    /// Row lock wait limit in milliseconds
    #[arg(long = "lock-timeout-ms", value_name = "MS", default_value_t = 5000)]
    pub lock_timeout_ms: u64,

    /// Per-transaction deadline in milliseconds
    #[arg(long = "tx-timeout-ms", value_name = "MS")]
    pub tx_timeout_ms: Option<u64>,

    /// Report format written to stdout
    #[arg(long, value_name = "FORMAT", default_value = "json")]
    pub format: OutputFormat,

    /// Log filter used when RUST_LOG is not set
    #[arg(long = "log-level", value_name = "FILTER", default_value = "info")]
    pub log_level: String,
}

/// Available report formats
#[derive(Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Csv,
}

impl CliArgs {
    /// Create an EngineConfig from CLI arguments
    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig::new(
            Duration::from_millis(self.lock_timeout_ms),
            self.tx_timeout_ms.map(Duration::from_millis),
        )
    }

    /// Create a SimulationConfig from CLI arguments
    ///
    /// Falls back to the default concurrency when none was given.
    pub fn to_simulation_config(&self) -> SimulationConfig {
        let default = SimulationConfig::default();
        SimulationConfig::new(
            self.accounts,
            self.transfers,
            self.initial_balance,
            self.max_amount,
            self.concurrency.unwrap_or(default.concurrency),
        )
    }
}
