//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account rows and account identifiers
//! - `ledger`: Entry and Transfer rows, the append-only audit trail
//! - `params`: Query parameters accepted by the ledger store
//! - `error`: Error types for the store, the coordinator and the orchestrator

pub mod account;
pub mod error;
pub mod ledger;
pub mod params;

pub use account::{Account, AccountId};
pub use error::{Abort, EngineError, Operation, OperationError, StoreError, TxError};
pub use ledger::{Entry, EntryId, Transfer, TransferId, TransferResult};
pub use params::{
    AddAccountBalanceParams, CreateAccountParams, CreateEntryParams, CreateTransferParams,
    ListAccountsParams, ListEntriesParams, ListTransfersParams, TransferParams,
};
