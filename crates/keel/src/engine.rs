//! The engine: one database, one dialect, and a pool shared by its sessions.

use std::sync::Arc;

use futures::future::BoxFuture;
use keel_core::dialect::{get_dialect, Dialect};
use keel_core::schema::Record;
use sqlx::{Connection, SqlitePool};
use tracing::{error, info};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::migrate::MigrationPlan;
use crate::session::{Hooks, Session};

/// Entry point to a database.
///
/// Cloning an engine is cheap; clones share the pool.
#[derive(Clone)]
pub struct Engine {
    pool: SqlitePool,
    dialect: Arc<dyn Dialect>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("dialect", &self.dialect.name())
            .field("pool_size", &self.pool.size())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Connects to `source` with the dialect registered as `driver`.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let engine = Engine::connect("sqlite3", "gee.db").await?;
    /// let mut session = engine.new_session();
    /// ```
    pub async fn connect(driver: &str, source: &str) -> Result<Self> {
        Self::from_config(&EngineConfig::new(driver, source)).await
    }

    /// Connects using `config`.
    ///
    /// Fails with [`Error::UnknownDialect`] when no dialect is registered for
    /// the driver, and with [`Error::Database`] when the database cannot be
    /// opened or does not answer a ping.
    pub async fn from_config(config: &EngineConfig) -> Result<Self> {
        let Some(dialect) = get_dialect(&config.driver) else {
            error!(driver = %config.driver, "dialect not found");
            return Err(Error::UnknownDialect(config.driver.clone()));
        };

        let pool = match config.pool_options().connect_with(config.connect_options()?).await {
            Ok(pool) => pool,
            Err(e) => {
                error!(source = %config.source, error = %e, "failed to open database");
                return Err(e.into());
            }
        };

        let mut conn = pool.acquire().await?;
        if let Err(e) = conn.ping().await {
            error!(source = %config.source, error = %e, "database did not answer ping");
            return Err(e.into());
        }
        drop(conn);

        info!(driver = %config.driver, source = %config.source, "connected to database");
        Ok(Self { pool, dialect })
    }

    /// Returns a fresh session with no model, clauses, or transaction.
    ///
    /// Sessions share the engine's pool. An in-memory database has a pool of
    /// one connection, so while one session holds a transaction, a statement
    /// from any other session waits until that transaction ends or the
    /// pool's acquire timeout expires. Do not interleave two sessions of an
    /// in-memory engine inside one task while either is in a transaction.
    #[must_use]
    pub fn new_session(&self) -> Session {
        Session::new(self.pool.clone(), Arc::clone(&self.dialect))
    }

    /// Runs `f` in a transaction on a fresh session.
    ///
    /// The transaction holds a pooled connection until it ends; with an
    /// in-memory database that is the only connection, so other sessions
    /// must not run statements from inside `f`. Use the session `f`
    /// receives instead. See [`Session::transaction`].
    pub async fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: for<'s> FnOnce(&'s mut Session) -> BoxFuture<'s, Result<T>>,
    {
        let mut session = self.new_session();
        session.transaction(f).await
    }

    /// Migrates `R`'s table on a fresh session.
    ///
    /// See [`Session::migrate`]. Columns missing from `R` are dropped
    /// together with their data.
    pub async fn migrate<R: Record + Hooks>(&self) -> Result<MigrationPlan> {
        self.new_session().migrate::<R>().await
    }

    /// Returns the engine's dialect.
    #[must_use]
    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// Returns the connection pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("database closed");
    }
}
