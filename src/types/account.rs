//! Account-related types for the transfer engine
//!
//! This module defines the Account row as stored by the ledger store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account identifier
///
/// Assigned by the store from a monotonically increasing sequence, so the
/// set of valid identifiers is totally ordered. The transfer orchestrator
/// relies on this ordering to decide the lock acquisition sequence.
pub type AccountId = i64;

/// Account row
///
/// Holds a balance in minor currency units. The balance is only ever changed
/// through the store's atomic `add_account_balance` operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique, stable identifier
    pub id: AccountId,

    /// Name of the account owner
    pub owner: String,

    /// Balance in minor currency units
    ///
    /// Signed: the engine does not enforce a non-negative balance.
    pub balance: i64,

    /// Currency code (for example `USD`)
    pub currency: String,

    /// Creation timestamp assigned by the store
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create an account row with the store-assigned id and timestamp
    pub fn new(id: AccountId, owner: String, balance: i64, currency: String) -> Self {
        Account {
            id,
            owner,
            balance,
            currency,
            created_at: Utc::now(),
        }
    }
}
