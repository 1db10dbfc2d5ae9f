//! Session transactions.
//!
//! A session is either Idle or Active. `begin` moves it to Active; `commit`
//! and `rollback` always leave it Idle, even when the database reports an
//! error.

use std::panic::AssertUnwindSafe;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{error, info};

use super::Session;
use crate::error::{Error, Result};

impl Session {
    /// Returns whether a transaction is open.
    #[must_use]
    pub const fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }

    /// Opens a transaction. Fails with [`Error::TransactionActive`] if one is
    /// already open.
    pub async fn begin(&mut self) -> Result<()> {
        if self.tx.is_some() {
            return Err(Error::TransactionActive);
        }
        match self.pool.begin().await {
            Ok(tx) => {
                self.tx = Some(tx);
                info!("transaction begin");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "failed to begin transaction");
                Err(e.into())
            }
        }
    }

    /// Commits the open transaction.
    pub async fn commit(&mut self) -> Result<()> {
        let tx = self.tx.take().ok_or(Error::NoTransaction)?;
        match tx.commit().await {
            Ok(()) => {
                info!("transaction commit");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "failed to commit transaction");
                Err(e.into())
            }
        }
    }

    /// Rolls back the open transaction.
    pub async fn rollback(&mut self) -> Result<()> {
        let tx = self.tx.take().ok_or(Error::NoTransaction)?;
        match tx.rollback().await {
            Ok(()) => {
                info!("transaction rollback");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "failed to roll back transaction");
                Err(e.into())
            }
        }
    }

    /// Runs `f` inside a transaction.
    ///
    /// The transaction is committed when `f` returns `Ok`, and rolled back
    /// when it returns `Err` or panics, including a panic raised before `f`
    /// returns its future. An error from `f` is returned as is;
    /// a panic resumes after the rollback. A failed commit is returned in
    /// place of `f`'s value.
    ///
    /// ```rust,ignore
    /// session
    ///     .transaction(|s| {
    ///         Box::pin(async move {
    ///             s.insert(vec![tom, sam]).await?;
    ///             s.where_("name = ?", ["Amy"]).delete().await
    ///         })
    ///     })
    ///     .await?;
    /// ```
    pub async fn transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        F: for<'s> FnOnce(&'s mut Session) -> BoxFuture<'s, Result<T>>,
    {
        self.begin().await?;

        // `f` is called inside the guard to catch panics raised before it
        // returns its future.
        let outcome = AssertUnwindSafe(async { f(&mut *self).await })
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(value)) => {
                self.commit().await?;
                Ok(value)
            }
            Ok(Err(e)) => {
                self.clear();
                // The callback's error wins over a rollback failure.
                let _ = self.rollback().await;
                Err(e)
            }
            Err(panic) => {
                self.clear();
                let _ = self.rollback().await;
                std::panic::resume_unwind(panic)
            }
        }
    }
}
