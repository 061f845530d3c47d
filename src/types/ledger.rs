//! Ledger rows: entries and transfers
//!
//! Both row types are immutable once created. The store never updates or
//! deletes them, they form the audit trail of every money movement.

use super::account::{Account, AccountId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entry identifier
pub type EntryId = i64;

/// Transfer identifier
pub type TransferId = i64;

/// Signed balance change recorded against one account
///
/// Negative amounts are debits, positive amounts are credits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub account_id: AccountId,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

impl Entry {
    pub fn new(id: EntryId, account_id: AccountId, amount: i64) -> Self {
        Entry {
            id,
            account_id,
            amount,
            created_at: Utc::now(),
        }
    }
}

/// Record of a single money movement between two accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,

    /// Always positive
    pub amount: i64,

    pub created_at: DateTime<Utc>,
}

impl Transfer {
    pub fn new(
        id: TransferId,
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: i64,
    ) -> Self {
        Transfer {
            id,
            from_account_id,
            to_account_id,
            amount,
            created_at: Utc::now(),
        }
    }
}

/// Everything a committed transfer produced
///
/// Holds the transfer row, both entries and both accounts with their
/// post-transfer balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    pub transfer: Transfer,
    pub from_account: Account,
    pub to_account: Account,
    pub from_entry: Entry,
    pub to_entry: Entry,
}
