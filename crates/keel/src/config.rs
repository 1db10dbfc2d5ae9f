//! Engine configuration.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

/// Default database when `DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "sqlite:db.sqlite3";

/// Default driver when `KEEL_DRIVER` is not set.
pub const DEFAULT_DRIVER: &str = "sqlite";

/// How an [`Engine`](crate::Engine) connects to its database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Driver name, also used to look up the dialect.
    pub driver: String,
    /// Connection string or database path.
    pub source: String,
    /// Upper bound on pooled connections. In-memory databases always use one,
    /// so only one session at a time can hold a transaction on them.
    pub max_connections: u32,
    /// Create the database file when it does not exist.
    pub create_if_missing: bool,
}

impl EngineConfig {
    /// Creates a configuration for `driver` and `source`.
    #[must_use]
    pub fn new(driver: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            source: source.into(),
            max_connections: 5,
            create_if_missing: true,
        }
    }

    /// Reads `KEEL_DRIVER` and `DATABASE_URL`, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let driver = std::env::var("KEEL_DRIVER").unwrap_or_else(|_| DEFAULT_DRIVER.to_string());
        let source =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
        Self::new(driver, source)
    }

    /// Sets the connection cap.
    #[must_use]
    pub const fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets whether a missing database file is created.
    #[must_use]
    pub const fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    /// Returns whether the source names an in-memory database.
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.source.contains(":memory:") || self.source.contains("mode=memory")
    }

    pub(crate) fn connect_options(&self) -> Result<SqliteConnectOptions, sqlx::Error> {
        Ok(SqliteConnectOptions::from_str(&self.source)?.create_if_missing(self.create_if_missing))
    }

    // An in-memory database lives only as long as its connection, so it gets
    // exactly one that is never recycled.
    pub(crate) fn pool_options(&self) -> SqlitePoolOptions {
        if self.is_in_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(self.max_connections.max(1))
        }
    }
}
