//! Shared fixtures for integration tests
//!
//! `FaultyStore` wraps the in-memory store and can be armed to fail one step
//! of the next transactions it opens. It also records, for every committed
//! transaction, the order in which account balances were updated.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_transfer_engine::core::{
    InMemoryLedgerStore, LedgerQueries, LedgerReader, LedgerTx, Transaction, TransactionalStore,
};
use rust_transfer_engine::types::{
    Account, AccountId, AddAccountBalanceParams, CreateAccountParams, CreateEntryParams,
    CreateTransferParams, Entry, EntryId, ListAccountsParams, ListEntriesParams,
    ListTransfersParams, StoreError, Transfer, TransferId,
};
use rust_transfer_engine::{EngineConfig, TransferEngine};

/// The step of a transfer transaction that should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    CreateTransfer,
    /// First `create_entry` call
    DebitEntry,
    /// Second `create_entry` call
    CreditEntry,
    /// First `add_account_balance` call
    FirstBalance,
    /// Second `add_account_balance` call
    SecondBalance,
    Commit,
}

/// What the next transactions should do wrong
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultPlan {
    pub fault: Option<Fault>,
    pub fail_rollback: bool,
}

impl FaultPlan {
    pub fn fail_at(fault: Fault) -> Self {
        Self {
            fault: Some(fault),
            fail_rollback: false,
        }
    }

    pub fn with_failing_rollback(mut self) -> Self {
        self.fail_rollback = true;
        self
    }
}

pub fn injected(what: &str) -> StoreError {
    StoreError::unavailable(format!("injected {} failure", what))
}

#[derive(Debug)]
pub struct FaultyStore {
    inner: InMemoryLedgerStore,
    plan: Mutex<FaultPlan>,
    balance_orders: Arc<Mutex<Vec<Vec<AccountId>>>>,
}

impl FaultyStore {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            inner: InMemoryLedgerStore::new(config),
            plan: Mutex::new(FaultPlan::default()),
            balance_orders: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn inner(&self) -> &InMemoryLedgerStore {
        &self.inner
    }

    /// Apply `plan` to every transaction opened from now on
    pub fn arm(&self, plan: FaultPlan) {
        *self.plan.lock().unwrap() = plan;
    }

    pub fn disarm(&self) {
        self.arm(FaultPlan::default());
    }

    /// Balance update order of each committed transaction, in commit order
    pub fn balance_orders(&self) -> Vec<Vec<AccountId>> {
        self.balance_orders.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerReader for FaultyStore {
    async fn get_account(&self, id: AccountId) -> Result<Account, StoreError> {
        self.inner.get_account(id).await
    }

    async fn list_accounts(&self, params: ListAccountsParams) -> Result<Vec<Account>, StoreError> {
        self.inner.list_accounts(params).await
    }

    async fn get_entry(&self, id: EntryId) -> Result<Entry, StoreError> {
        self.inner.get_entry(id).await
    }

    async fn list_entries(&self, params: ListEntriesParams) -> Result<Vec<Entry>, StoreError> {
        self.inner.list_entries(params).await
    }

    async fn get_transfer(&self, id: TransferId) -> Result<Transfer, StoreError> {
        self.inner.get_transfer(id).await
    }

    async fn list_transfers(
        &self,
        params: ListTransfersParams,
    ) -> Result<Vec<Transfer>, StoreError> {
        self.inner.list_transfers(params).await
    }
}

#[async_trait]
impl TransactionalStore for FaultyStore {
    type Tx = FaultyTx;

    async fn begin(&self) -> Result<FaultyTx, StoreError> {
        let plan = *self.plan.lock().unwrap();
        Ok(FaultyTx {
            inner: self.inner.begin().await?,
            plan,
            entries_created: 0,
            balance_order: Vec::new(),
            balance_orders: Arc::clone(&self.balance_orders),
        })
    }
}

#[derive(Debug)]
pub struct FaultyTx {
    inner: LedgerTx,
    plan: FaultPlan,
    entries_created: usize,
    balance_order: Vec<AccountId>,
    balance_orders: Arc<Mutex<Vec<Vec<AccountId>>>>,
}

impl FaultyTx {
    fn fails_at(&self, fault: Fault) -> bool {
        self.plan.fault == Some(fault)
    }
}

#[async_trait]
impl LedgerQueries for FaultyTx {
    async fn create_account(&mut self, params: CreateAccountParams) -> Result<Account, StoreError> {
        self.inner.create_account(params).await
    }

    async fn get_account(&mut self, id: AccountId) -> Result<Account, StoreError> {
        self.inner.get_account(id).await
    }

    async fn get_account_for_update(&mut self, id: AccountId) -> Result<Account, StoreError> {
        self.inner.get_account_for_update(id).await
    }

    async fn list_accounts(
        &mut self,
        params: ListAccountsParams,
    ) -> Result<Vec<Account>, StoreError> {
        self.inner.list_accounts(params).await
    }

    async fn add_account_balance(
        &mut self,
        params: AddAccountBalanceParams,
    ) -> Result<Account, StoreError> {
        self.balance_order.push(params.id);
        let fault = match self.balance_order.len() {
            1 => Fault::FirstBalance,
            _ => Fault::SecondBalance,
        };
        if self.fails_at(fault) {
            return Err(injected("balance update"));
        }
        self.inner.add_account_balance(params).await
    }

    async fn create_entry(&mut self, params: CreateEntryParams) -> Result<Entry, StoreError> {
        self.entries_created += 1;
        let fault = match self.entries_created {
            1 => Fault::DebitEntry,
            _ => Fault::CreditEntry,
        };
        if self.fails_at(fault) {
            return Err(injected("entry insert"));
        }
        self.inner.create_entry(params).await
    }

    async fn get_entry(&mut self, id: EntryId) -> Result<Entry, StoreError> {
        self.inner.get_entry(id).await
    }

    async fn list_entries(&mut self, params: ListEntriesParams) -> Result<Vec<Entry>, StoreError> {
        self.inner.list_entries(params).await
    }

    async fn create_transfer(
        &mut self,
        params: CreateTransferParams,
    ) -> Result<Transfer, StoreError> {
        if self.fails_at(Fault::CreateTransfer) {
            return Err(injected("transfer insert"));
        }
        self.inner.create_transfer(params).await
    }

    async fn get_transfer(&mut self, id: TransferId) -> Result<Transfer, StoreError> {
        self.inner.get_transfer(id).await
    }

    async fn list_transfers(
        &mut self,
        params: ListTransfersParams,
    ) -> Result<Vec<Transfer>, StoreError> {
        self.inner.list_transfers(params).await
    }
}

#[async_trait]
impl Transaction for FaultyTx {
    async fn commit(self) -> Result<(), StoreError> {
        if self.fails_at(Fault::Commit) {
            self.inner.rollback().await?;
            return Err(injected("commit"));
        }
        self.inner.commit().await?;
        self.balance_orders.lock().unwrap().push(self.balance_order);
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        if self.plan.fail_rollback {
            // The inner transaction is dropped, which still discards its writes
            return Err(injected("rollback"));
        }
        self.inner.rollback().await
    }
}

pub fn faulty_engine(config: &EngineConfig) -> (TransferEngine<FaultyStore>, Arc<FaultyStore>) {
    let store = Arc::new(FaultyStore::new(config));
    (TransferEngine::new(Arc::clone(&store), config), store)
}

pub fn memory_engine(config: &EngineConfig) -> TransferEngine<InMemoryLedgerStore> {
    TransferEngine::new(Arc::new(InMemoryLedgerStore::new(config)), config)
}

pub async fn open_account<S: TransactionalStore>(engine: &TransferEngine<S>, balance: i64) -> Account {
    engine
        .create_account(CreateAccountParams {
            owner: "owner".to_string(),
            balance,
            currency: "USD".to_string(),
        })
        .await
        .unwrap()
}
