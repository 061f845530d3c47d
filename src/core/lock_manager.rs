//! Row-level exclusive locks keyed by account id
//!
//! This module provides the `RowLockManager`, the in-process equivalent of
//! `SELECT ... FOR UPDATE`. A transaction acquires an account's lock the
//! first time it writes (or reads for update) that account and keeps the
//! returned [`RowLockGuard`] until it commits or rolls back.
//!
//! # Design
//!
//! Lock handles live in a `DashMap<AccountId, Arc<Mutex<()>>>`. The map is
//! only touched long enough to clone the handle out; waiting happens on the
//! tokio mutex itself, never while a DashMap shard is held. Waits are bounded
//! by the configured lock timeout so a stuck holder cannot park other
//! transactions forever.

use crate::types::{AccountId, StoreError};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::{debug, warn};

/// Exclusive lock on one account row
///
/// Dropping the guard releases the lock.
#[derive(Debug)]
pub struct RowLockGuard {
    account_id: AccountId,
    _guard: OwnedMutexGuard<()>,
}

impl RowLockGuard {
    pub fn account_id(&self) -> AccountId {
        self.account_id
    }
}

/// Lock table for account rows
#[derive(Debug)]
pub struct RowLockManager {
    locks: DashMap<AccountId, Arc<Mutex<()>>>,
    timeout: Duration,
}

impl RowLockManager {
    /// Create a lock manager whose waits give up after `timeout`
    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: DashMap::new(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Acquire the exclusive lock on `account_id`
    ///
    /// Returns immediately when the lock is free, otherwise waits up to the
    /// configured timeout.
    ///
    /// # Errors
    ///
    /// * `StoreError::LockTimeout` if the lock was not granted in time
    pub async fn acquire(&self, account_id: AccountId) -> Result<RowLockGuard, StoreError> {
        let mutex = Arc::clone(
            self.locks
                .entry(account_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );

        if let Ok(guard) = Arc::clone(&mutex).try_lock_owned() {
            return Ok(RowLockGuard {
                account_id,
                _guard: guard,
            });
        }

        debug!(account_id, "waiting for row lock");
        let started = Instant::now();
        match tokio::time::timeout(self.timeout, mutex.lock_owned()).await {
            Ok(guard) => {
                debug!(account_id, waited = ?started.elapsed(), "row lock granted");
                Ok(RowLockGuard {
                    account_id,
                    _guard: guard,
                })
            }
            Err(_) => {
                warn!(account_id, timeout = ?self.timeout, "row lock wait timed out");
                Err(StoreError::lock_timeout(account_id, started.elapsed()))
            }
        }
    }

    /// Whether some transaction currently holds the lock on `account_id`
    pub fn is_locked(&self, account_id: AccountId) -> bool {
        self.locks
            .get(&account_id)
            .map(|mutex| mutex.try_lock().is_err())
            .unwrap_or(false)
    }
}
