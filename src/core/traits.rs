//! Collaborator traits for the ledger store
//!
//! The engine never talks to a concrete store. It consumes three
//! capabilities, so any storage backend that provides them can be injected:
//!
//! - [`LedgerQueries`]: the query executor bound to one open transaction
//! - [`Transaction`]: commit/rollback of that transaction
//! - [`TransactionalStore`]: begins transactions and serves snapshot reads
//!   of committed data through [`LedgerReader`]

use async_trait::async_trait;

use crate::types::{
    Account, AccountId, AddAccountBalanceParams, CreateAccountParams, CreateEntryParams,
    CreateTransferParams, Entry, EntryId, ListAccountsParams, ListEntriesParams,
    ListTransfersParams, StoreError, Transfer, TransferId,
};

/// Queries executed inside an open transaction
///
/// Writes are visible to later queries on the same transaction and to
/// nobody else until commit.
#[async_trait]
pub trait LedgerQueries: Send {
    /// Insert a new account with a store-assigned id
    async fn create_account(&mut self, params: CreateAccountParams) -> Result<Account, StoreError>;

    /// Get an account, including rows written by this transaction
    async fn get_account(&mut self, id: AccountId) -> Result<Account, StoreError>;

    /// Read an account and take its exclusive row lock until the transaction ends
    async fn get_account_for_update(&mut self, id: AccountId) -> Result<Account, StoreError>;

    /// List accounts ordered by id
    async fn list_accounts(&mut self, params: ListAccountsParams)
        -> Result<Vec<Account>, StoreError>;

    /// Atomically apply `balance += amount` and return the updated row
    ///
    /// Takes the account's exclusive row lock for the remainder of the
    /// transaction, so concurrent increments on the same account serialize
    /// instead of losing updates.
    async fn add_account_balance(
        &mut self,
        params: AddAccountBalanceParams,
    ) -> Result<Account, StoreError>;

    /// Insert an entry; the account must exist
    async fn create_entry(&mut self, params: CreateEntryParams) -> Result<Entry, StoreError>;

    /// Get an entry by id
    async fn get_entry(&mut self, id: EntryId) -> Result<Entry, StoreError>;

    /// List the entries of one account ordered by id
    async fn list_entries(&mut self, params: ListEntriesParams) -> Result<Vec<Entry>, StoreError>;

    /// Insert a transfer; both accounts must exist
    async fn create_transfer(&mut self, params: CreateTransferParams)
        -> Result<Transfer, StoreError>;

    /// Get a transfer by id
    async fn get_transfer(&mut self, id: TransferId) -> Result<Transfer, StoreError>;

    /// List transfers leaving `from_account_id` or arriving at `to_account_id`
    async fn list_transfers(
        &mut self,
        params: ListTransfersParams,
    ) -> Result<Vec<Transfer>, StoreError>;
}

/// An open unit of work against the store
#[async_trait]
pub trait Transaction: LedgerQueries + Sized {
    /// Publish every write atomically and release all row locks
    async fn commit(self) -> Result<(), StoreError>;

    /// Discard every write and release all row locks
    async fn rollback(self) -> Result<(), StoreError>;
}

/// Snapshot reads of committed data
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Get a committed account by id
    async fn get_account(&self, id: AccountId) -> Result<Account, StoreError>;

    /// List committed accounts ordered by id
    async fn list_accounts(&self, params: ListAccountsParams) -> Result<Vec<Account>, StoreError>;

    /// Get a committed entry by id
    async fn get_entry(&self, id: EntryId) -> Result<Entry, StoreError>;

    /// List the committed entries of one account
    async fn list_entries(&self, params: ListEntriesParams) -> Result<Vec<Entry>, StoreError>;

    /// Get a committed transfer by id
    async fn get_transfer(&self, id: TransferId) -> Result<Transfer, StoreError>;

    /// List committed transfers matching an account pair
    async fn list_transfers(&self, params: ListTransfersParams)
        -> Result<Vec<Transfer>, StoreError>;
}

/// A store able to open transactions
#[async_trait]
pub trait TransactionalStore: LedgerReader {
    type Tx: Transaction + 'static;

    /// Open a new transaction
    async fn begin(&self) -> Result<Self::Tx, StoreError>;
}
