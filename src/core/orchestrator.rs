//! Transfer orchestration
//!
//! This module provides the `TransferEngine`, which moves money between two
//! accounts inside a single coordinator-managed transaction.
//!
//! # Algorithm
//!
//! 1. Create the transfer row `{from, to, amount}`
//! 2. Create the debit entry `{from, -amount}`
//! 3. Create the credit entry `{to, +amount}`
//! 4. Apply both balance deltas, lower account id first
//! 5. Return the transfer, both entries and both updated accounts
//!
//! # Deadlock Avoidance
//!
//! Step 4 is where row locks are taken. Ordering the two updates by account
//! id, regardless of which side is the source, gives every transaction the
//! same global lock order. Two transfers between the same pair of accounts
//! in opposite directions therefore queue on the same first lock instead of
//! each holding one lock and waiting for the other:
//!
//! ```text
//! T1: 1 -> 2   lock(1) ─▶ lock(2) ─▶ commit
//! T2: 2 -> 1   lock(1) ·· waits ···········▶ lock(2) ─▶ commit
//! ```
//!
//! The engine holds no mutable state of its own. All coordination happens
//! through the store's row locks.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use super::coordinator::{RunContext, TransactionCoordinator};
use super::traits::{LedgerQueries, LedgerReader, TransactionalStore};
use crate::config::EngineConfig;
use crate::types::{
    Account, AccountId, AddAccountBalanceParams, CreateAccountParams, CreateEntryParams,
    CreateTransferParams, EngineError, Entry, EntryId, ListAccountsParams, ListEntriesParams,
    ListTransfersParams, Operation, OperationError, StoreError, Transfer, TransferId,
    TransferParams, TransferResult,
};

/// Entry point for money transfers and ledger reads
///
/// Cloning is cheap; clones share the same store.
#[derive(Debug)]
pub struct TransferEngine<S> {
    coordinator: TransactionCoordinator<S>,
}

impl<S> Clone for TransferEngine<S> {
    fn clone(&self) -> Self {
        Self {
            coordinator: self.coordinator.clone(),
        }
    }
}

impl<S: TransactionalStore> TransferEngine<S> {
    /// Create a new TransferEngine over an injected store
    ///
    /// # Arguments
    ///
    /// * `store` - Shared store that transactions are opened on
    /// * `config` - Supplies the default transaction deadline
    ///
    /// # Returns
    ///
    /// An engine with no state of its own. Several engines may share one store.
    pub fn new(store: Arc<S>, config: &EngineConfig) -> Self {
        Self {
            coordinator: TransactionCoordinator::new(store, config),
        }
    }

    /// The underlying store
    pub fn store(&self) -> &S {
        self.coordinator.store()
    }

    /// Move `amount` from one account to another
    ///
    /// # Errors
    ///
    /// * `EngineError::InvalidAmount` - amount is zero or negative
    /// * `EngineError::SameAccount` - source and destination are equal
    /// * `EngineError::TransactionAborted` - a store operation failed, nothing was written
    /// * `EngineError::TransactionIndeterminate` - the rollback after a failure failed
    /// * `EngineError::CommitFailed` / `BeginFailed` - nothing was written
    pub async fn transfer_funds(&self, params: TransferParams) -> Result<TransferResult, EngineError> {
        self.transfer_funds_with(&RunContext::default(), params)
            .await
    }

    /// Move money, honouring the deadline and cancellation in `ctx`
    ///
    /// Behaves like [`transfer_funds`](Self::transfer_funds), except that the
    /// transaction is abandoned and rolled back when `ctx`'s deadline passes or
    /// its cancellation token fires. This includes a transfer parked on another
    /// transaction's row lock. Rows already buffered are discarded and locks
    /// already taken are released.
    ///
    /// # Arguments
    ///
    /// * `ctx` - Deadline and cancellation for this transfer. Without a
    ///   deadline the engine's configured transaction timeout applies.
    /// * `params` - Source, destination and amount
    ///
    /// # Returns
    ///
    /// * `Ok(TransferResult)` with the committed rows
    /// * `Err(EngineError::DeadlineExceeded)` if the deadline passed first
    /// * `Err(EngineError::Cancelled)` if the token fired first
    /// * Any error listed on `transfer_funds`
    #[instrument(
        skip(self, ctx),
        fields(
            from = params.from_account_id,
            to = params.to_account_id,
            amount = params.amount
        )
    )]
    pub async fn transfer_funds_with(
        &self,
        ctx: &RunContext,
        params: TransferParams,
    ) -> Result<TransferResult, EngineError> {
        if params.amount <= 0 {
            return Err(EngineError::invalid_amount(params.amount));
        }
        if params.from_account_id == params.to_account_id {
            return Err(EngineError::same_account(params.from_account_id));
        }

        let result = self
            .coordinator
            .run_in_transaction_with(ctx, |tx| Box::pin(transfer_tx(tx, params)))
            .await?;

        info!(
            transfer_id = result.transfer.id,
            from_balance = result.from_account.balance,
            to_balance = result.to_account.balance,
            "transfer committed"
        );
        Ok(result)
    }

    /// Provision a new account
    ///
    /// Runs as its own single-statement transaction.
    ///
    /// # Arguments
    ///
    /// * `params` - Owner, opening balance and currency
    ///
    /// # Returns
    ///
    /// * `Ok(Account)` with the id assigned by the store
    /// * `Err(EngineError)` if the transaction could not begin or commit
    pub async fn create_account(&self, params: CreateAccountParams) -> Result<Account, EngineError> {
        let account = self
            .coordinator
            .run_in_transaction(|tx| {
                Box::pin(async move {
                    tx.create_account(params)
                        .await
                        .map_err(|e| OperationError::new(Operation::CreateAccount, e))
                })
            })
            .await?;

        debug!(account_id = account.id, owner = %account.owner, "account provisioned");
        Ok(account)
    }

    /// Get a committed account by id
    ///
    /// # Returns
    ///
    /// * `Ok(Account)` as of the latest commit
    /// * `Err(StoreError::NotFound)` if no such account exists
    pub async fn get_account(&self, id: AccountId) -> Result<Account, StoreError> {
        self.store().get_account(id).await
    }

    /// List committed accounts ordered by id
    ///
    /// # Errors
    ///
    /// * `StoreError::InvalidPagination` if `limit <= 0` or `offset < 0`
    pub async fn list_accounts(&self, params: ListAccountsParams) -> Result<Vec<Account>, StoreError> {
        self.store().list_accounts(params).await
    }

    /// Get a committed entry by id
    pub async fn get_entry(&self, id: EntryId) -> Result<Entry, StoreError> {
        self.store().get_entry(id).await
    }

    /// List the committed entries of one account ordered by id
    ///
    /// # Errors
    ///
    /// * `StoreError::InvalidPagination` if `limit <= 0` or `offset < 0`
    pub async fn list_entries(&self, params: ListEntriesParams) -> Result<Vec<Entry>, StoreError> {
        self.store().list_entries(params).await
    }

    /// Get a committed transfer by id
    ///
    /// Reads never change state, so repeating the call returns the same row.
    pub async fn get_transfer(&self, id: TransferId) -> Result<Transfer, StoreError> {
        self.store().get_transfer(id).await
    }

    /// List committed transfers ordered by id
    ///
    /// A transfer matches when it leaves `params.from_account_id` or arrives
    /// at `params.to_account_id`.
    ///
    /// # Errors
    ///
    /// * `StoreError::InvalidPagination` if `limit <= 0` or `offset < 0`
    pub async fn list_transfers(
        &self,
        params: ListTransfersParams,
    ) -> Result<Vec<Transfer>, StoreError> {
        self.store().list_transfers(params).await
    }
}

/// Body of the transfer transaction
async fn transfer_tx<Q: LedgerQueries>(
    tx: &mut Q,
    params: TransferParams,
) -> Result<TransferResult, OperationError> {
    let TransferParams {
        from_account_id,
        to_account_id,
        amount,
    } = params;

    let transfer = tx
        .create_transfer(CreateTransferParams::from(params))
        .await
        .map_err(|e| OperationError::new(Operation::CreateTransfer, e))?;

    let from_entry = tx
        .create_entry(CreateEntryParams {
            account_id: from_account_id,
            amount: -amount,
        })
        .await
        .map_err(|e| OperationError::new(Operation::CreateDebitEntry, e))?;

    let to_entry = tx
        .create_entry(CreateEntryParams {
            account_id: to_account_id,
            amount,
        })
        .await
        .map_err(|e| OperationError::new(Operation::CreateCreditEntry, e))?;

    let (from_account, to_account) = if from_account_id < to_account_id {
        add_money(tx, (from_account_id, -amount), (to_account_id, amount)).await?
    } else {
        let (to_account, from_account) =
            add_money(tx, (to_account_id, amount), (from_account_id, -amount)).await?;
        (from_account, to_account)
    };

    Ok(TransferResult {
        transfer,
        from_account,
        to_account,
        from_entry,
        to_entry,
    })
}

/// Apply two balance deltas in the given order
///
/// Callers pass the lower account id first.
async fn add_money<Q: LedgerQueries>(
    tx: &mut Q,
    (first_id, first_amount): (AccountId, i64),
    (second_id, second_amount): (AccountId, i64),
) -> Result<(Account, Account), OperationError> {
    let first = add_balance(tx, first_id, first_amount).await?;
    let second = add_balance(tx, second_id, second_amount).await?;
    Ok((first, second))
}

async fn add_balance<Q: LedgerQueries>(
    tx: &mut Q,
    account_id: AccountId,
    amount: i64,
) -> Result<Account, OperationError> {
    tx.add_account_balance(AddAccountBalanceParams {
        id: account_id,
        amount,
    })
    .await
    .map_err(|e| OperationError::new(Operation::AddBalance { account_id }, e))
}
