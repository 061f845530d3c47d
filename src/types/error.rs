//! Error types for the transfer engine
//!
//! Errors are layered the same way the engine is:
//!
//! - [`StoreError`]: raised by the ledger store (missing rows, broken
//!   referential integrity, lock wait timeouts, unavailable store)
//! - [`TxError`]: raised by the transaction coordinator, wrapping whatever
//!   the unit of work failed with and recording whether the rollback
//!   succeeded
//! - [`EngineError`]: what callers of the transfer engine see, with the
//!   failing operation attached and helpers for retry classification
//!
//! # Retry Classification
//!
//! - `TransactionAborted`, `Cancelled`, `DeadlineExceeded`: rolled back
//!   cleanly, nothing was written. Retryable when the underlying cause is
//!   transient (lock timeout, store unavailable, cancellation, deadline).
//! - `CommitFailed`, `BeginFailed`: nothing was written, safe to retry.
//! - `TransactionIndeterminate`: the rollback itself failed. Partial effects
//!   cannot be ruled out; never retry automatically.

use super::account::AccountId;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the ledger store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Referenced row does not exist
    #[error("{entity} {id} not found")]
    NotFound {
        /// Table name (`account`, `entry`, `transfer`)
        entity: &'static str,
        /// Missing identifier
        id: i64,
    },

    /// A data integrity rule was broken (foreign key, balance range)
    #[error("constraint '{constraint}' violated: {message}")]
    ConstraintViolation {
        /// Name of the violated constraint
        constraint: String,
        /// Description of the offending value
        message: String,
    },

    /// Waiting for an account's row lock took longer than allowed
    #[error("timed out after {waited:?} waiting for row lock on account {account_id}")]
    LockTimeout {
        account_id: AccountId,
        waited: Duration,
    },

    /// Pagination arguments out of range
    #[error("invalid pagination: limit {limit}, offset {offset}")]
    InvalidPagination { limit: i64, offset: i64 },

    /// The store could not serve the request
    #[error("store unavailable: {message}")]
    Unavailable { message: String },
}

impl StoreError {
    /// Create a NotFound error
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        StoreError::NotFound { entity, id }
    }

    /// Create a ConstraintViolation error
    pub fn constraint_violation(constraint: &str, message: impl Into<String>) -> Self {
        StoreError::ConstraintViolation {
            constraint: constraint.to_string(),
            message: message.into(),
        }
    }

    /// Create a LockTimeout error
    pub fn lock_timeout(account_id: AccountId, waited: Duration) -> Self {
        StoreError::LockTimeout { account_id, waited }
    }

    /// Create an Unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        StoreError::Unavailable {
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, StoreError::ConstraintViolation { .. })
    }

    /// Whether repeating the whole unit of work may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::LockTimeout { .. } | StoreError::Unavailable { .. }
        )
    }
}

/// Why a unit of work was abandoned
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Abort<E> {
    /// The work itself returned an error
    #[error("{0}")]
    Work(E),

    /// The caller's cancellation token fired
    #[error("transaction cancelled")]
    Cancelled,

    /// The transaction outlived its deadline
    #[error("transaction deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

/// Errors raised by the transaction coordinator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxError<E> {
    /// No transaction could be started, nothing ran
    #[error("failed to begin transaction: {0}")]
    Begin(StoreError),

    /// The work failed and the rollback succeeded
    #[error("transaction rolled back: {0}")]
    Aborted(Abort<E>),

    /// The work failed and the rollback failed too
    #[error("transaction state indeterminate: {cause}; rollback failed: {rollback}")]
    Indeterminate { cause: Abort<E>, rollback: StoreError },

    /// The work succeeded but the commit did not
    #[error("commit failed: {0}")]
    Commit(StoreError),
}

/// Store operation performed by the engine inside a unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateAccount,
    CreateTransfer,
    CreateDebitEntry,
    CreateCreditEntry,
    AddBalance { account_id: AccountId },
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::CreateAccount => write!(f, "create account"),
            Operation::CreateTransfer => write!(f, "create transfer"),
            Operation::CreateDebitEntry => write!(f, "create debit entry"),
            Operation::CreateCreditEntry => write!(f, "create credit entry"),
            Operation::AddBalance { account_id } => {
                write!(f, "add balance to account {}", account_id)
            }
        }
    }
}

/// A store error tagged with the operation that raised it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{op} failed: {source}")]
pub struct OperationError {
    pub op: Operation,
    pub source: StoreError,
}

impl OperationError {
    pub fn new(op: Operation, source: StoreError) -> Self {
        OperationError { op, source }
    }
}

/// Errors returned by the transfer engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Transfer amount was zero or negative
    #[error("transfer amount must be positive, got {amount}")]
    InvalidAmount { amount: i64 },

    /// Source and destination are the same account
    #[error("cannot transfer from account {account_id} to itself")]
    SameAccount { account_id: AccountId },

    /// An operation failed and everything was rolled back
    #[error("transaction aborted during {op}: {source}")]
    TransactionAborted { op: Operation, source: StoreError },

    /// The caller cancelled; everything was rolled back
    #[error("transaction cancelled and rolled back")]
    Cancelled,

    /// The deadline passed; everything was rolled back
    #[error("transaction exceeded its {timeout:?} deadline and was rolled back")]
    DeadlineExceeded { timeout: Duration },

    /// The rollback after a failure failed as well
    #[error("transaction state indeterminate: {cause}; rollback failed: {rollback}")]
    TransactionIndeterminate {
        cause: Box<EngineError>,
        rollback: StoreError,
    },

    /// The work succeeded but was not committed
    #[error("commit failed: {source}")]
    CommitFailed { source: StoreError },

    /// No transaction could be started
    #[error("failed to begin transaction: {source}")]
    BeginFailed { source: StoreError },
}

impl EngineError {
    /// Create an InvalidAmount error
    pub fn invalid_amount(amount: i64) -> Self {
        EngineError::InvalidAmount { amount }
    }

    /// Create a SameAccount error
    pub fn same_account(account_id: AccountId) -> Self {
        EngineError::SameAccount { account_id }
    }

    /// Whether running the same request again may succeed
    ///
    /// Never true for an indeterminate transaction.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::TransactionAborted { source, .. } => source.is_transient(),
            EngineError::Cancelled
            | EngineError::DeadlineExceeded { .. }
            | EngineError::CommitFailed { .. }
            | EngineError::BeginFailed { .. } => true,
            EngineError::InvalidAmount { .. }
            | EngineError::SameAccount { .. }
            | EngineError::TransactionIndeterminate { .. } => false,
        }
    }

    /// Whether partial effects may have survived
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, EngineError::TransactionIndeterminate { .. })
    }

    /// The store error behind this failure, if any
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            EngineError::TransactionAborted { source, .. }
            | EngineError::CommitFailed { source }
            | EngineError::BeginFailed { source } => Some(source),
            EngineError::TransactionIndeterminate { cause, .. } => cause.store_error(),
            _ => None,
        }
    }

    /// The operation that failed, if the failure came from one
    pub fn failed_operation(&self) -> Option<Operation> {
        match self {
            EngineError::TransactionAborted { op, .. } => Some(*op),
            EngineError::TransactionIndeterminate { cause, .. } => cause.failed_operation(),
            _ => None,
        }
    }
}

impl From<Abort<OperationError>> for EngineError {
    fn from(abort: Abort<OperationError>) -> Self {
        match abort {
            Abort::Work(OperationError { op, source }) => {
                EngineError::TransactionAborted { op, source }
            }
            Abort::Cancelled => EngineError::Cancelled,
            Abort::DeadlineExceeded(timeout) => EngineError::DeadlineExceeded { timeout },
        }
    }
}

impl From<TxError<OperationError>> for EngineError {
    fn from(error: TxError<OperationError>) -> Self {
        match error {
            TxError::Begin(source) => EngineError::BeginFailed { source },
            TxError::Aborted(abort) => abort.into(),
            TxError::Indeterminate { cause, rollback } => EngineError::TransactionIndeterminate {
                cause: Box::new(cause.into()),
                rollback,
            },
            TxError::Commit(source) => EngineError::CommitFailed { source },
        }
    }
}
