//! Rust Transfer Engine Library
//! # Overview
//!
//! This library moves money between ledger accounts. Every transfer is a
//! single all-or-nothing transaction that records one transfer row, a debit
//! entry, a credit entry and both balance updates.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Account, Entry, Transfer, errors)
//! - [`config`] - Engine tunables (lock wait, transaction deadline)
//! - [`core`] - Business logic components:
//!   - [`core::ledger_store`] - In-memory transactional store with row locks
//!   - [`core::coordinator`] - Begin/commit/rollback around a unit of work
//!   - [`core::orchestrator`] - The transfer algorithm and ledger reads
//! - [`simulation`] - Concurrent random workload over a fresh store
//! - [`io`] - Report output (JSON or CSV)
//! - [`cli`] - CLI arguments parsing
//!
//! # Guarantees
//!
//! - **Atomicity**: a failed transfer leaves no trace in the ledger
//! - **Conservation**: the sum of all balances never changes
//! - **Deadlock freedom**: balance updates lock the lower account id first
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use rust_transfer_engine::{EngineConfig, InMemoryLedgerStore, TransferEngine, TransferParams};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::default();
//! let engine = TransferEngine::new(Arc::new(InMemoryLedgerStore::new(&config)), &config);
//! let result = engine.transfer_funds(TransferParams::new(1, 2, 30)).await?;
//! println!("transfer {} committed", result.transfer.id);
//! # Ok(())
//! # }
//! ```

// Module declarations
pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod logging;
pub mod simulation;
pub mod types;

pub use crate::config::EngineConfig;
pub use crate::core::{InMemoryLedgerStore, RunContext, TransactionCoordinator, TransferEngine};
pub use io::{write_accounts_csv, write_report};
pub use types::{
    Account, AccountId, EngineError, Entry, EntryId, StoreError, Transfer, TransferId,
    TransferParams, TransferResult, TxError,
};
