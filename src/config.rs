//! Engine configuration
//!
//! Controls how long a transaction may wait for a row lock and how long a
//! whole transfer transaction may run before it is rolled back.

use std::time::Duration;
use tracing::warn;

/// Default bound on a single row lock wait
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the ledger store and the transfer engine
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum time a transaction waits for another transaction's row lock
    pub lock_timeout: Duration,

    /// Deadline applied to every transaction that does not bring its own
    ///
    /// `None` leaves transactions unbounded (row lock waits are still bounded
    /// by `lock_timeout`).
    pub transaction_timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            transaction_timeout: None,
        }
    }
}

impl EngineConfig {
    /// Create a new EngineConfig with custom values
    ///
    /// Zero durations are rejected with a warning and replaced by the
    /// defaults.
    pub fn new(lock_timeout: Duration, transaction_timeout: Option<Duration>) -> Self {
        let default = Self::default();

        let lock_timeout = if lock_timeout.is_zero() {
            warn!(
                "Invalid lock_timeout ({:?}), using default ({:?})",
                lock_timeout, default.lock_timeout
            );
            default.lock_timeout
        } else {
            lock_timeout
        };

        let transaction_timeout = match transaction_timeout {
            Some(timeout) if timeout.is_zero() => {
                warn!("Invalid transaction_timeout ({:?}), disabling it", timeout);
                default.transaction_timeout
            }
            other => other,
        };

        Self {
            lock_timeout,
            transaction_timeout,
        }
    }
}
