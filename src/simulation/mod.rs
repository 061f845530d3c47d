//! Concurrent transfer simulation
//!
//! This module drives the transfer engine the way a busy front end would:
//! it provisions a small set of accounts, then fires many transfers in
//! random directions between them with bounded concurrency. Afterwards it
//! reports the final balances and whether money was conserved.
//!
//! # Architecture
//!
//! ```text
//! Simulation
//!     ├── SimulationConfig (accounts, transfers, amounts, concurrency)
//!     ├── random           (owners, currencies, amounts)
//!     └── TransferEngine<InMemoryLedgerStore>
//!             └── one tokio task per transfer, at most `concurrency` in flight
//! ```
//!
//! Transfers that fail are counted, not fatal: a failed transfer is rolled
//! back and leaves balances untouched.

pub mod random;

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use rand::Rng;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::core::{InMemoryLedgerStore, TransferEngine};
use crate::types::{Account, CreateAccountParams, ListAccountsParams, TransferParams};

/// Workload parameters for a simulation run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulationConfig {
    /// Number of accounts to provision (at least 2)
    pub accounts: usize,
    /// Number of transfers to execute
    pub transfers: usize,
    /// Starting balance of every account
    pub initial_balance: i64,
    /// Upper bound of a single transfer amount
    pub max_amount: i64,
    /// Maximum number of transfers in flight
    pub concurrency: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            accounts: 4,
            transfers: 100,
            initial_balance: 1000,
            max_amount: 100,
            concurrency: num_cpus::get(),
        }
    }
}

impl SimulationConfig {
    /// Create a new SimulationConfig with custom values
    ///
    /// Out-of-range values are replaced by the defaults with a warning.
    pub fn new(
        accounts: usize,
        transfers: usize,
        initial_balance: i64,
        max_amount: i64,
        concurrency: usize,
    ) -> Self {
        let default = Self::default();

        let accounts = if accounts < 2 {
            warn!(
                "Invalid accounts ({}), using default ({})",
                accounts, default.accounts
            );
            default.accounts
        } else {
            accounts
        };

        let initial_balance = if initial_balance < 0 {
            warn!(
                "Invalid initial_balance ({}), using default ({})",
                initial_balance, default.initial_balance
            );
            default.initial_balance
        } else {
            initial_balance
        };

        let max_amount = if max_amount <= 0 {
            warn!(
                "Invalid max_amount ({}), using default ({})",
                max_amount, default.max_amount
            );
            default.max_amount
        } else {
            max_amount
        };

        let concurrency = if concurrency == 0 {
            warn!(
                "Invalid concurrency ({}), using default ({})",
                concurrency, default.concurrency
            );
            default.concurrency
        } else {
            concurrency
        };

        Self {
            accounts,
            transfers,
            initial_balance,
            max_amount,
            concurrency,
        }
    }
}

/// Outcome of a simulation run
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Final state of every account, ordered by id
    pub accounts: Vec<Account>,
    pub transfers_committed: usize,
    pub transfers_failed: usize,
    pub total_before: i128,
    pub total_after: i128,
}

impl SimulationReport {
    /// Whether the sum of all balances is unchanged
    pub fn is_conserved(&self) -> bool {
        self.total_before == self.total_after
    }
}

/// Counts of finished transfers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    pub committed: usize,
    pub failed: usize,
}

/// Simulated workload over an in-memory ledger
#[derive(Debug, Clone)]
pub struct Simulation {
    engine: TransferEngine<InMemoryLedgerStore>,
    config: SimulationConfig,
}

impl Simulation {
    /// Create a simulation over a fresh in-memory store
    pub fn new(engine_config: &EngineConfig, config: SimulationConfig) -> Self {
        let store = Arc::new(InMemoryLedgerStore::new(engine_config));
        Self {
            engine: TransferEngine::new(store, engine_config),
            config,
        }
    }

    pub fn engine(&self) -> &TransferEngine<InMemoryLedgerStore> {
        &self.engine
    }

    /// Open `config.accounts` accounts with random owners and currencies
    pub async fn provision_accounts(&self) -> Result<Vec<Account>, String> {
        let requests: Vec<CreateAccountParams> = {
            let mut rng = rand::thread_rng();
            (0..self.config.accounts)
                .map(|_| CreateAccountParams {
                    owner: random::random_owner(&mut rng),
                    balance: self.config.initial_balance,
                    currency: random::random_currency(&mut rng).to_string(),
                })
                .collect()
        };

        let mut accounts = Vec::with_capacity(requests.len());
        for request in requests {
            let account = self
                .engine
                .create_account(request)
                .await
                .map_err(|e| format!("Failed to provision account: {}", e))?;
            accounts.push(account);
        }
        Ok(accounts)
    }

    /// Pick `config.transfers` random transfers between distinct accounts
    pub fn plan_transfers<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        accounts: &[Account],
    ) -> Vec<TransferParams> {
        if accounts.len() < 2 {
            return Vec::new();
        }

        (0..self.config.transfers)
            .map(|_| {
                let from = rng.gen_range(0..accounts.len());
                // Offset in 1..len never lands back on `from`
                let to = (from + rng.gen_range(1..accounts.len())) % accounts.len();
                TransferParams::new(
                    accounts[from].id,
                    accounts[to].id,
                    random::random_int(rng, 1, self.config.max_amount),
                )
            })
            .collect()
    }

    /// Run every planned transfer, at most `config.concurrency` at a time
    pub async fn execute(&self, plan: Vec<TransferParams>) -> TransferStats {
        let handles = plan.into_iter().map(|params| {
            let engine = self.engine.clone();
            tokio::spawn(async move { engine.transfer_funds(params).await })
        });

        let mut outcomes = stream::iter(handles).buffer_unordered(self.config.concurrency);
        let mut stats = TransferStats::default();
        while let Some(outcome) = outcomes.next().await {
            match outcome {
                Ok(Ok(_)) => stats.committed += 1,
                Ok(Err(e)) => {
                    warn!(error = %e, retryable = e.is_retryable(), "transfer failed");
                    stats.failed += 1;
                }
                Err(e) => {
                    warn!("Transfer task panicked: {:?}", e);
                    stats.failed += 1;
                }
            }
        }
        stats
    }

    /// Provision, plan, execute and report
    pub async fn run(&self) -> Result<SimulationReport, String> {
        let accounts = self.provision_accounts().await?;
        let total_before = total_balance(&accounts);

        let plan = self.plan_transfers(&mut rand::thread_rng(), &accounts);
        info!(
            accounts = accounts.len(),
            transfers = plan.len(),
            concurrency = self.config.concurrency,
            "starting simulation"
        );

        let stats = self.execute(plan).await;

        let limit = i64::try_from(accounts.len()).unwrap_or(i64::MAX);
        let final_accounts = self
            .engine
            .list_accounts(ListAccountsParams { limit, offset: 0 })
            .await
            .map_err(|e| format!("Failed to read final balances: {}", e))?;

        let report = SimulationReport {
            total_after: total_balance(&final_accounts),
            accounts: final_accounts,
            transfers_committed: stats.committed,
            transfers_failed: stats.failed,
            total_before,
        };

        info!(
            committed = report.transfers_committed,
            failed = report.transfers_failed,
            conserved = report.is_conserved(),
            "simulation finished"
        );
        Ok(report)
    }
}

fn total_balance(accounts: &[Account]) -> i128 {
    accounts.iter().map(|account| i128::from(account.balance)).sum()
}
