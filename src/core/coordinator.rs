//! Transaction coordination
//!
//! This module provides the `TransactionCoordinator`, which runs a unit of
//! work inside one store transaction and guarantees all-or-nothing
//! visibility of its writes.
//!
//! # Outcomes
//!
//! ```text
//! begin ── fails ──────────────────────────────▶ TxError::Begin
//!   │
//!  work ── ok ──▶ commit ── ok ────────────────▶ Ok(value)
//!   │                 └──── fails ─────────────▶ TxError::Commit
//!   │
//!   └── error / cancelled / deadline ──▶ rollback ── ok ──▶ TxError::Aborted
//!                                               └── fails ─▶ TxError::Indeterminate
//! ```
//!
//! Cancellation and deadlines are observed while the work is in flight,
//! including while it is parked on a row lock. The pending work is dropped
//! and the transaction rolled back, which releases every lock it held.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{self, BoxFuture};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use super::traits::{Transaction, TransactionalStore};
use crate::config::EngineConfig;
use crate::types::{Abort, TxError};

/// Caller-supplied limits for one transaction
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    timeout: Option<Duration>,
    cancellation: Option<CancellationToken>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Roll back if the work has not finished after `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Roll back as soon as `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// Runs units of work inside store transactions
#[derive(Debug)]
pub struct TransactionCoordinator<S> {
    store: Arc<S>,
    default_timeout: Option<Duration>,
}

impl<S> Clone for TransactionCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            default_timeout: self.default_timeout,
        }
    }
}

impl<S: TransactionalStore> TransactionCoordinator<S> {
    /// Create a coordinator over `store`
    ///
    /// `config.transaction_timeout` applies to every run whose context does
    /// not set its own timeout.
    pub fn new(store: Arc<S>, config: &EngineConfig) -> Self {
        Self {
            store,
            default_timeout: config.transaction_timeout,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run `work` in a new transaction with the default context
    pub async fn run_in_transaction<T, E, F>(&self, work: F) -> Result<T, TxError<E>>
    where
        F: for<'a> FnOnce(&'a mut S::Tx) -> BoxFuture<'a, Result<T, E>> + Send,
        T: Send,
        E: Display + Send,
    {
        self.run_in_transaction_with(&RunContext::default(), work)
            .await
    }

    /// Run `work` in a new transaction, honouring the limits in `ctx`
    ///
    /// Commits when `work` succeeds and returns its value. Otherwise rolls
    /// back and returns the original failure, or a composite
    /// `TxError::Indeterminate` when the rollback fails too.
    pub async fn run_in_transaction_with<T, E, F>(
        &self,
        ctx: &RunContext,
        work: F,
    ) -> Result<T, TxError<E>>
    where
        F: for<'a> FnOnce(&'a mut S::Tx) -> BoxFuture<'a, Result<T, E>> + Send,
        T: Send,
        E: Display + Send,
    {
        let mut tx = self.store.begin().await.map_err(TxError::Begin)?;
        let timeout = ctx.timeout.or(self.default_timeout);

        let outcome = drive(work(&mut tx), timeout, ctx.cancellation.as_ref()).await;

        match outcome {
            Ok(value) => match tx.commit().await {
                Ok(()) => Ok(value),
                Err(commit_error) => {
                    warn!(error = %commit_error, "commit failed");
                    Err(TxError::Commit(commit_error))
                }
            },
            Err(cause) => match tx.rollback().await {
                Ok(()) => {
                    warn!(cause = %cause, "transaction rolled back");
                    Err(TxError::Aborted(cause))
                }
                Err(rollback) => {
                    error!(
                        cause = %cause,
                        rollback_error = %rollback,
                        "rollback failed, transaction state indeterminate"
                    );
                    Err(TxError::Indeterminate { cause, rollback })
                }
            },
        }
    }
}

/// Poll the work until it finishes, the deadline passes or the token fires
async fn drive<T, E>(
    work: BoxFuture<'_, Result<T, E>>,
    timeout: Option<Duration>,
    cancellation: Option<&CancellationToken>,
) -> Result<T, Abort<E>> {
    let cancelled = async {
        match cancellation {
            Some(token) => token.cancelled().await,
            None => future::pending::<()>().await,
        }
    };
    let deadline = async {
        match timeout {
            Some(timeout) => tokio::time::sleep(timeout).await,
            None => future::pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        _ = cancelled => Err(Abort::Cancelled),
        _ = deadline => Err(Abort::DeadlineExceeded(timeout.unwrap_or_default())),
        result = work => result.map_err(Abort::Work),
    }
}
