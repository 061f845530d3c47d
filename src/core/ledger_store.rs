//! In-memory transactional ledger store
//!
//! This module provides `InMemoryLedgerStore`, a ledger store that keeps
//! accounts, entries and transfers in concurrent maps and offers
//! transactions with row-level locking on accounts.
//!
//! # Design
//!
//! - Committed rows live in one `DashMap` per table.
//! - A [`LedgerTx`] buffers its writes privately. Reads inside the
//!   transaction see the buffer first, then committed rows.
//! - Writes to an account's balance take that account's row lock through
//!   the [`RowLockManager`] and keep it until the transaction finishes.
//! - Commit publishes the whole buffer under the write side of a
//!   store-wide gate. Snapshot readers take the read side, so they observe
//!   either none or all of a transaction's writes.
//! - Identifiers come from per-table sequences. Like database sequences,
//!   ids consumed by rolled-back transactions are not reused.
//!
//! # Referential Integrity
//!
//! Transfers and entries may only reference accounts that exist (committed,
//! or created earlier in the same transaction). Accounts are never deleted,
//! so a reference that was valid at creation stays valid.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::lock_manager::{RowLockGuard, RowLockManager};
use super::traits::{LedgerQueries, LedgerReader, Transaction, TransactionalStore};
use crate::config::EngineConfig;
use crate::types::{
    Account, AccountId, AddAccountBalanceParams, CreateAccountParams, CreateEntryParams,
    CreateTransferParams, Entry, EntryId, ListAccountsParams, ListEntriesParams,
    ListTransfersParams, StoreError, Transfer, TransferId,
};

/// Shared state behind every handle to one store
#[derive(Debug)]
struct StoreState {
    accounts: DashMap<AccountId, Account>,
    entries: DashMap<EntryId, Entry>,
    transfers: DashMap<TransferId, Transfer>,

    account_seq: AtomicI64,
    entry_seq: AtomicI64,
    transfer_seq: AtomicI64,
    tx_seq: AtomicU64,

    locks: RowLockManager,

    /// Held for writing while a commit publishes, for reading by snapshots
    publish_gate: RwLock<()>,

    closed: AtomicBool,
}

impl StoreState {
    fn account_exists(&self, id: AccountId) -> bool {
        self.accounts.contains_key(&id)
    }
}

/// Thread-safe in-memory ledger store
///
/// Cloning is cheap and every clone refers to the same data.
#[derive(Debug, Clone)]
pub struct InMemoryLedgerStore {
    state: Arc<StoreState>,
}

impl InMemoryLedgerStore {
    /// Create a new empty InMemoryLedgerStore
    ///
    /// # Arguments
    ///
    /// * `config` - Supplies the lock timeout used by every row lock wait
    ///
    /// # Returns
    ///
    /// A store with no accounts, entries or transfers. All id sequences
    /// start at 1.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            state: Arc::new(StoreState {
                accounts: DashMap::new(),
                entries: DashMap::new(),
                transfers: DashMap::new(),
                account_seq: AtomicI64::new(0),
                entry_seq: AtomicI64::new(0),
                transfer_seq: AtomicI64::new(0),
                tx_seq: AtomicU64::new(0),
                locks: RowLockManager::new(config.lock_timeout),
                publish_gate: RwLock::new(()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Lock table used by this store's transactions
    ///
    /// Exposed so callers can observe which account rows are currently held.
    pub fn lock_manager(&self) -> &RowLockManager {
        &self.state.locks
    }

    /// Refuse new transactions from now on
    ///
    /// After this call `begin` fails with `StoreError::Unavailable`.
    /// Transactions already open may still commit or roll back, and snapshot
    /// reads keep working.
    ///
    /// # Thread Safety
    ///
    /// Safe to call concurrently with `begin`. A `begin` racing with `close`
    /// either observes the flag and fails, or opens a transaction that
    /// behaves normally.
    pub fn close(&self) {
        self.state.closed.store(true, Ordering::SeqCst);
    }

    /// Check whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }

    /// Number of committed accounts
    ///
    /// Rows buffered by open transactions are not counted.
    pub fn account_count(&self) -> usize {
        self.state.accounts.len()
    }

    /// Number of committed entries
    pub fn entry_count(&self) -> usize {
        self.state.entries.len()
    }

    /// Number of committed transfers
    pub fn transfer_count(&self) -> usize {
        self.state.transfers.len()
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

fn validate_page(limit: i64, offset: i64) -> Result<(usize, usize), StoreError> {
    if limit <= 0 || offset < 0 {
        return Err(StoreError::InvalidPagination { limit, offset });
    }
    Ok((
        usize::try_from(limit).unwrap_or(usize::MAX),
        usize::try_from(offset).unwrap_or(usize::MAX),
    ))
}

/// Sort rows by id and cut out one page
fn paginate<T, F>(mut rows: Vec<T>, limit: usize, offset: usize, id: F) -> Vec<T>
where
    F: Fn(&T) -> i64,
{
    rows.sort_by_key(|row| id(row));
    rows.into_iter().skip(offset).take(limit).collect()
}

fn transfer_matches(transfer: &Transfer, params: &ListTransfersParams) -> bool {
    transfer.from_account_id == params.from_account_id
        || transfer.to_account_id == params.to_account_id
}

#[async_trait]
impl LedgerReader for InMemoryLedgerStore {
    async fn get_account(&self, id: AccountId) -> Result<Account, StoreError> {
        let _snapshot = self.state.publish_gate.read().await;
        self.state
            .accounts
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::not_found("account", id))
    }

    async fn list_accounts(&self, params: ListAccountsParams) -> Result<Vec<Account>, StoreError> {
        let (limit, offset) = validate_page(params.limit, params.offset)?;
        let _snapshot = self.state.publish_gate.read().await;
        let rows = self
            .state
            .accounts
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        Ok(paginate(rows, limit, offset, |account: &Account| account.id))
    }

    async fn get_entry(&self, id: EntryId) -> Result<Entry, StoreError> {
        let _snapshot = self.state.publish_gate.read().await;
        self.state
            .entries
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::not_found("entry", id))
    }

    async fn list_entries(&self, params: ListEntriesParams) -> Result<Vec<Entry>, StoreError> {
        let (limit, offset) = validate_page(params.limit, params.offset)?;
        let _snapshot = self.state.publish_gate.read().await;
        let rows = self
            .state
            .entries
            .iter()
            .filter(|entry| entry.value().account_id == params.account_id)
            .map(|entry| entry.value().clone())
            .collect();
        Ok(paginate(rows, limit, offset, |entry: &Entry| entry.id))
    }

    async fn get_transfer(&self, id: TransferId) -> Result<Transfer, StoreError> {
        let _snapshot = self.state.publish_gate.read().await;
        self.state
            .transfers
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::not_found("transfer", id))
    }

    async fn list_transfers(
        &self,
        params: ListTransfersParams,
    ) -> Result<Vec<Transfer>, StoreError> {
        let (limit, offset) = validate_page(params.limit, params.offset)?;
        let _snapshot = self.state.publish_gate.read().await;
        let rows = self
            .state
            .transfers
            .iter()
            .filter(|entry| transfer_matches(entry.value(), &params))
            .map(|entry| entry.value().clone())
            .collect();
        Ok(paginate(rows, limit, offset, |transfer: &Transfer| {
            transfer.id
        }))
    }
}

#[async_trait]
impl TransactionalStore for InMemoryLedgerStore {
    type Tx = LedgerTx;

    async fn begin(&self) -> Result<LedgerTx, StoreError> {
        if self.is_closed() {
            return Err(StoreError::unavailable("store is closed"));
        }

        let id = self.state.tx_seq.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(tx = id, "transaction started");

        Ok(LedgerTx {
            id,
            state: Arc::clone(&self.state),
            writes: TxWrites::default(),
            locks: Vec::new(),
            finished: false,
        })
    }
}

/// Rows written by one transaction and not yet published
#[derive(Debug, Default)]
struct TxWrites {
    /// New accounts and new balances of existing accounts
    accounts: BTreeMap<AccountId, Account>,
    entries: Vec<Entry>,
    transfers: Vec<Transfer>,
}

impl TxWrites {
    fn is_empty(&self) -> bool {
        self.accounts.is_empty() && self.entries.is_empty() && self.transfers.is_empty()
    }
}

/// An open transaction on an [`InMemoryLedgerStore`]
///
/// Dropping it without calling `commit` or `rollback` discards its writes
/// and releases its row locks, like a rollback.
#[derive(Debug)]
pub struct LedgerTx {
    id: u64,
    state: Arc<StoreState>,
    writes: TxWrites,

    /// Row locks in acquisition order
    locks: Vec<RowLockGuard>,

    finished: bool,
}

impl LedgerTx {
    /// Accounts whose row locks this transaction holds
    ///
    /// # Returns
    ///
    /// Account ids in the order their locks were acquired. An account locked
    /// twice by this transaction appears once.
    pub fn locked_accounts(&self) -> Vec<AccountId> {
        self.locks.iter().map(RowLockGuard::account_id).collect()
    }

    fn holds_lock(&self, account_id: AccountId) -> bool {
        self.locks.iter().any(|guard| guard.account_id() == account_id)
    }

    async fn lock_row(&mut self, account_id: AccountId) -> Result<(), StoreError> {
        if self.holds_lock(account_id) {
            return Ok(());
        }
        let guard = self.state.locks.acquire(account_id).await?;
        debug!(tx = self.id, account_id, "row lock acquired");
        self.locks.push(guard);
        Ok(())
    }

    fn account_visible(&self, id: AccountId) -> bool {
        self.writes.accounts.contains_key(&id) || self.state.account_exists(id)
    }

    /// Latest version of an account as seen by this transaction
    async fn read_account(&self, id: AccountId) -> Result<Account, StoreError> {
        if let Some(account) = self.writes.accounts.get(&id) {
            return Ok(account.clone());
        }
        let _snapshot = self.state.publish_gate.read().await;
        self.state
            .accounts
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::not_found("account", id))
    }

    fn require_account(&self, id: AccountId, constraint: &str) -> Result<(), StoreError> {
        if self.account_visible(id) {
            Ok(())
        } else {
            Err(StoreError::constraint_violation(
                constraint,
                format!("account {} does not exist", id),
            ))
        }
    }

    fn finish(&mut self) -> usize {
        self.finished = true;
        let released = self.locks.len();
        self.locks.clear();
        released
    }
}

#[async_trait]
impl LedgerQueries for LedgerTx {
    async fn create_account(&mut self, params: CreateAccountParams) -> Result<Account, StoreError> {
        let id = self.state.account_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let account = Account::new(id, params.owner, params.balance, params.currency);
        self.writes.accounts.insert(id, account.clone());
        debug!(tx = self.id, account_id = id, "account created");
        Ok(account)
    }

    async fn get_account(&mut self, id: AccountId) -> Result<Account, StoreError> {
        self.read_account(id).await
    }

    async fn get_account_for_update(&mut self, id: AccountId) -> Result<Account, StoreError> {
        if !self.account_visible(id) {
            return Err(StoreError::not_found("account", id));
        }
        self.lock_row(id).await?;
        self.read_account(id).await
    }

    async fn list_accounts(
        &mut self,
        params: ListAccountsParams,
    ) -> Result<Vec<Account>, StoreError> {
        let (limit, offset) = validate_page(params.limit, params.offset)?;
        let mut rows: BTreeMap<AccountId, Account> = {
            let _snapshot = self.state.publish_gate.read().await;
            self.state
                .accounts
                .iter()
                .map(|entry| (*entry.key(), entry.value().clone()))
                .collect()
        };
        for (id, account) in &self.writes.accounts {
            rows.insert(*id, account.clone());
        }
        Ok(rows.into_values().skip(offset).take(limit).collect())
    }

    async fn add_account_balance(
        &mut self,
        params: AddAccountBalanceParams,
    ) -> Result<Account, StoreError> {
        if !self.account_visible(params.id) {
            return Err(StoreError::not_found("account", params.id));
        }
        self.lock_row(params.id).await?;

        let mut account = self.read_account(params.id).await?;
        account.balance = account.balance.checked_add(params.amount).ok_or_else(|| {
            StoreError::constraint_violation(
                "accounts_balance_range",
                format!(
                    "balance {} of account {} cannot absorb {}",
                    account.balance, params.id, params.amount
                ),
            )
        })?;

        self.writes.accounts.insert(params.id, account.clone());
        debug!(
            tx = self.id,
            account_id = params.id,
            delta = params.amount,
            balance = account.balance,
            "balance updated"
        );
        Ok(account)
    }

    async fn create_entry(&mut self, params: CreateEntryParams) -> Result<Entry, StoreError> {
        self.require_account(params.account_id, "entries_account_id_fkey")?;

        let id = self.state.entry_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let entry = Entry::new(id, params.account_id, params.amount);
        self.writes.entries.push(entry.clone());
        Ok(entry)
    }

    async fn get_entry(&mut self, id: EntryId) -> Result<Entry, StoreError> {
        if let Some(entry) = self.writes.entries.iter().find(|entry| entry.id == id) {
            return Ok(entry.clone());
        }
        let _snapshot = self.state.publish_gate.read().await;
        self.state
            .entries
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::not_found("entry", id))
    }

    async fn list_entries(&mut self, params: ListEntriesParams) -> Result<Vec<Entry>, StoreError> {
        let (limit, offset) = validate_page(params.limit, params.offset)?;
        let mut rows: Vec<Entry> = {
            let _snapshot = self.state.publish_gate.read().await;
            self.state
                .entries
                .iter()
                .filter(|entry| entry.value().account_id == params.account_id)
                .map(|entry| entry.value().clone())
                .collect()
        };
        rows.extend(
            self.writes
                .entries
                .iter()
                .filter(|entry| entry.account_id == params.account_id)
                .cloned(),
        );
        Ok(paginate(rows, limit, offset, |entry: &Entry| entry.id))
    }

    async fn create_transfer(
        &mut self,
        params: CreateTransferParams,
    ) -> Result<Transfer, StoreError> {
        self.require_account(params.from_account_id, "transfers_from_account_id_fkey")?;
        self.require_account(params.to_account_id, "transfers_to_account_id_fkey")?;

        let id = self.state.transfer_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let transfer = Transfer::new(
            id,
            params.from_account_id,
            params.to_account_id,
            params.amount,
        );
        self.writes.transfers.push(transfer.clone());
        Ok(transfer)
    }

    async fn get_transfer(&mut self, id: TransferId) -> Result<Transfer, StoreError> {
        if let Some(transfer) = self.writes.transfers.iter().find(|t| t.id == id) {
            return Ok(transfer.clone());
        }
        let _snapshot = self.state.publish_gate.read().await;
        self.state
            .transfers
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::not_found("transfer", id))
    }

    async fn list_transfers(
        &mut self,
        params: ListTransfersParams,
    ) -> Result<Vec<Transfer>, StoreError> {
        let (limit, offset) = validate_page(params.limit, params.offset)?;
        let mut rows: Vec<Transfer> = {
            let _snapshot = self.state.publish_gate.read().await;
            self.state
                .transfers
                .iter()
                .filter(|entry| transfer_matches(entry.value(), &params))
                .map(|entry| entry.value().clone())
                .collect()
        };
        rows.extend(
            self.writes
                .transfers
                .iter()
                .filter(|transfer| transfer_matches(transfer, &params))
                .cloned(),
        );
        Ok(paginate(rows, limit, offset, |transfer: &Transfer| {
            transfer.id
        }))
    }
}

#[async_trait]
impl Transaction for LedgerTx {
    async fn commit(mut self) -> Result<(), StoreError> {
        let writes = std::mem::take(&mut self.writes);
        let (accounts, entries, transfers) = (
            writes.accounts.len(),
            writes.entries.len(),
            writes.transfers.len(),
        );

        {
            let _publish = self.state.publish_gate.write().await;
            for (id, account) in writes.accounts {
                self.state.accounts.insert(id, account);
            }
            for entry in writes.entries {
                self.state.entries.insert(entry.id, entry);
            }
            for transfer in writes.transfers {
                self.state.transfers.insert(transfer.id, transfer);
            }
        }

        // Locks go only after the new rows are visible
        let released = self.finish();
        debug!(
            tx = self.id,
            accounts, entries, transfers, released, "transaction committed"
        );
        Ok(())
    }

    async fn rollback(mut self) -> Result<(), StoreError> {
        self.writes = TxWrites::default();
        let released = self.finish();
        debug!(tx = self.id, released, "transaction rolled back");
        Ok(())
    }
}

impl Drop for LedgerTx {
    fn drop(&mut self) {
        if !self.finished && (!self.writes.is_empty() || !self.locks.is_empty()) {
            warn!(
                tx = self.id,
                held_locks = self.locks.len(),
                "transaction dropped without commit or rollback, discarding writes"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn account_params(owner: &str, balance: i64) -> CreateAccountParams {
        CreateAccountParams {
            owner: owner.to_string(),
            balance,
            currency: "USD".to_string(),
        }
    }

    async fn seed_account(store: &InMemoryLedgerStore, owner: &str, balance: i64) -> Account {
        let mut tx = store.begin().await.unwrap();
        let account = tx.create_account(account_params(owner, balance)).await.unwrap();
        tx.commit().await.unwrap();
        account
    }

    fn short_lock_store() -> InMemoryLedgerStore {
        InMemoryLedgerStore::new(&EngineConfig::new(Duration::from_millis(50), None))
    }

    #[tokio::test]
    async fn test_create_account_assigns_sequential_ids() {
        let store = InMemoryLedgerStore::default();

        let first = seed_account(&store, "alice", 100).await;
        let second = seed_account(&store, "bob", 50).await;

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(store.account_count(), 2);

        let fetched = store.get_account(1).await.unwrap();
        assert_eq!(fetched, first);
    }

    #[tokio::test]
    async fn test_uncommitted_writes_are_private() {
        let store = InMemoryLedgerStore::default();
        let account = seed_account(&store, "alice", 100).await;

        let mut tx = store.begin().await.unwrap();
        let updated = tx
            .add_account_balance(AddAccountBalanceParams {
                id: account.id,
                amount: 25,
            })
            .await
            .unwrap();
        assert_eq!(updated.balance, 125);
        assert_eq!(tx.get_account(account.id).await.unwrap().balance, 125);

        // Outside the transaction nothing changed yet
        assert_eq!(store.get_account(account.id).await.unwrap().balance, 100);

        tx.commit().await.unwrap();
        assert_eq!(store.get_account(account.id).await.unwrap().balance, 125);
    }

    #[tokio::test]
    async fn test_rollback_discards_writes_and_releases_locks() {
        let store = InMemoryLedgerStore::default();
        let from = seed_account(&store, "alice", 100).await;
        let to = seed_account(&store, "bob", 0).await;

        let mut tx = store.begin().await.unwrap();
        tx.create_transfer(CreateTransferParams {
            from_account_id: from.id,
            to_account_id: to.id,
            amount: 10,
        })
        .await
        .unwrap();
        tx.create_entry(CreateEntryParams {
            account_id: from.id,
            amount: -10,
        })
        .await
        .unwrap();
        tx.add_account_balance(AddAccountBalanceParams {
            id: from.id,
            amount: -10,
        })
        .await
        .unwrap();
        assert!(store.lock_manager().is_locked(from.id));

        tx.rollback().await.unwrap();

        assert!(!store.lock_manager().is_locked(from.id));
        assert_eq!(store.transfer_count(), 0);
        assert_eq!(store.entry_count(), 0);
        assert_eq!(store.get_account(from.id).await.unwrap().balance, 100);
    }

    #[tokio::test]
    async fn test_dropped_transaction_releases_locks() {
        let store = InMemoryLedgerStore::default();
        let account = seed_account(&store, "alice", 100).await;

        {
            let mut tx = store.begin().await.unwrap();
            tx.get_account_for_update(account.id).await.unwrap();
            assert!(store.lock_manager().is_locked(account.id));
        }

        assert!(!store.lock_manager().is_locked(account.id));
        assert_eq!(store.get_account(account.id).await.unwrap().balance, 100);
    }

    #[tokio::test]
    async fn test_add_balance_on_missing_account() {
        let store = InMemoryLedgerStore::default();

        let mut tx = store.begin().await.unwrap();
        let result = tx
            .add_account_balance(AddAccountBalanceParams { id: 42, amount: 1 })
            .await;

        assert_eq!(result, Err(StoreError::not_found("account", 42)));
        assert!(!store.lock_manager().is_locked(42));
    }

    #[tokio::test]
    async fn test_add_balance_rejects_overflow() {
        let store = InMemoryLedgerStore::default();
        let account = seed_account(&store, "whale", i64::MAX - 1).await;

        let mut tx = store.begin().await.unwrap();
        let result = tx
            .add_account_balance(AddAccountBalanceParams {
                id: account.id,
                amount: 2,
            })
            .await;

        assert!(matches!(
            result,
            Err(StoreError::ConstraintViolation { ref constraint, .. }) if constraint == "accounts_balance_range"
        ));
    }

    #[tokio::test]
    async fn test_transfer_requires_existing_accounts() {
        let store = InMemoryLedgerStore::default();
        let from = seed_account(&store, "alice", 100).await;

        let mut tx = store.begin().await.unwrap();
        let result = tx
            .create_transfer(CreateTransferParams {
                from_account_id: from.id,
                to_account_id: 99,
                amount: 10,
            })
            .await;

        match result {
            Err(StoreError::ConstraintViolation { constraint, message }) => {
                assert_eq!(constraint, "transfers_to_account_id_fkey");
                assert_eq!(message, "account 99 does not exist");
            }
            other => panic!("Expected ConstraintViolation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_entry_requires_existing_account() {
        let store = InMemoryLedgerStore::default();

        let mut tx = store.begin().await.unwrap();
        let result = tx
            .create_entry(CreateEntryParams {
                account_id: 5,
                amount: 10,
            })
            .await;

        assert!(result.unwrap_err().is_constraint_violation());
    }

    #[tokio::test]
    async fn test_account_created_in_same_transaction_can_be_referenced() {
        let store = InMemoryLedgerStore::default();
        let existing = seed_account(&store, "alice", 100).await;

        let mut tx = store.begin().await.unwrap();
        let fresh = tx.create_account(account_params("carol", 0)).await.unwrap();
        let transfer = tx
            .create_transfer(CreateTransferParams {
                from_account_id: existing.id,
                to_account_id: fresh.id,
                amount: 5,
            })
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.get_transfer(transfer.id).await.unwrap(), transfer);
    }

    #[tokio::test]
    async fn test_second_writer_times_out_while_lock_held() {
        let store = short_lock_store();
        let account = seed_account(&store, "alice", 100).await;

        let mut first = store.begin().await.unwrap();
        first
            .add_account_balance(AddAccountBalanceParams {
                id: account.id,
                amount: 1,
            })
            .await
            .unwrap();

        let mut second = store.begin().await.unwrap();
        let result = second
            .add_account_balance(AddAccountBalanceParams {
                id: account.id,
                amount: 1,
            })
            .await;

        assert!(matches!(result, Err(StoreError::LockTimeout { account_id, .. }) if account_id == account.id));
        first.commit().await.unwrap();
        second.rollback().await.unwrap();

        assert_eq!(store.get_account(account.id).await.unwrap().balance, 101);
    }

    #[tokio::test]
    async fn test_lock_is_reentrant_within_transaction() {
        let store = short_lock_store();
        let account = seed_account(&store, "alice", 100).await;

        let mut tx = store.begin().await.unwrap();
        tx.get_account_for_update(account.id).await.unwrap();
        tx.add_account_balance(AddAccountBalanceParams {
            id: account.id,
            amount: 5,
        })
        .await
        .unwrap();
        let updated = tx
            .add_account_balance(AddAccountBalanceParams {
                id: account.id,
                amount: -3,
            })
            .await
            .unwrap();

        assert_eq!(updated.balance, 102);
        assert_eq!(tx.locked_accounts(), vec![account.id]);
        tx.commit().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_increments_are_not_lost() {
        let store = InMemoryLedgerStore::default();
        let account = seed_account(&store, "alice", 0).await;

        let mut handles = vec![];
        for _ in 0..100 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let mut tx = store.begin().await.unwrap();
                tx.add_account_balance(AddAccountBalanceParams {
                    id: account.id,
                    amount: 10,
                })
                .await
                .unwrap();
                tx.commit().await.unwrap();
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.get_account(account.id).await.unwrap().balance, 1000);
    }

    #[tokio::test]
    async fn test_list_transfers_filters_and_paginates() {
        let store = InMemoryLedgerStore::default();
        let a = seed_account(&store, "alice", 1000).await;
        let b = seed_account(&store, "bob", 1000).await;
        let c = seed_account(&store, "carol", 1000).await;

        let mut tx = store.begin().await.unwrap();
        for _ in 0..5 {
            for (from, to) in [(a.id, b.id), (b.id, a.id), (c.id, c.id)] {
                tx.create_transfer(CreateTransferParams {
                    from_account_id: from,
                    to_account_id: to,
                    amount: 1,
                })
                .await
                .unwrap();
            }
        }
        tx.commit().await.unwrap();

        let params = ListTransfersParams {
            from_account_id: a.id,
            to_account_id: b.id,
            limit: 3,
            offset: 2,
        };
        let page = store.list_transfers(params).await.unwrap();

        assert_eq!(page.len(), 3);
        assert!(page.windows(2).all(|pair| pair[0].id < pair[1].id));
        for transfer in &page {
            assert!(transfer.from_account_id == a.id || transfer.to_account_id == b.id);
        }
    }

    #[tokio::test]
    async fn test_list_entries_sees_own_writes() {
        let store = InMemoryLedgerStore::default();
        let account = seed_account(&store, "alice", 0).await;

        let mut tx = store.begin().await.unwrap();
        for amount in [5, -2, 7] {
            tx.create_entry(CreateEntryParams {
                account_id: account.id,
                amount,
            })
            .await
            .unwrap();
        }

        let inside = tx
            .list_entries(ListEntriesParams {
                account_id: account.id,
                limit: 10,
                offset: 0,
            })
            .await
            .unwrap();
        let outside = store
            .list_entries(ListEntriesParams {
                account_id: account.id,
                limit: 10,
                offset: 0,
            })
            .await
            .unwrap();

        assert_eq!(inside.iter().map(|e| e.amount).collect::<Vec<_>>(), vec![5, -2, 7]);
        assert!(outside.is_empty());
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_pagination() {
        let store = InMemoryLedgerStore::default();

        let result = store
            .list_accounts(ListAccountsParams {
                limit: 0,
                offset: 0,
            })
            .await;

        assert_eq!(
            result,
            Err(StoreError::InvalidPagination {
                limit: 0,
                offset: 0
            })
        );
    }

    #[tokio::test]
    async fn test_closed_store_refuses_begin() {
        let store = InMemoryLedgerStore::default();
        store.close();

        let result = store.begin().await;

        assert!(matches!(result, Err(StoreError::Unavailable { .. })));
    }
}
