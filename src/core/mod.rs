//! Core transfer engine components
//!
//! This module contains the transactional machinery, leaf first:
//! - `traits` - Collaborator contracts (query executor, transaction, store)
//! - `lock_manager` - Row-level exclusive locks keyed by account id
//! - `ledger_store` - In-memory transactional store built on the lock manager
//! - `coordinator` - Begin/commit/rollback envelope around a unit of work
//! - `orchestrator` - The money transfer algorithm and read accessors

pub mod coordinator;
pub mod ledger_store;
pub mod lock_manager;
pub mod orchestrator;
pub mod traits;

pub use coordinator::{RunContext, TransactionCoordinator};
pub use ledger_store::{InMemoryLedgerStore, LedgerTx};
pub use lock_manager::{RowLockGuard, RowLockManager};
pub use orchestrator::TransferEngine;
pub use traits::{LedgerQueries, LedgerReader, Transaction, TransactionalStore};
