//! Sessions: the execution context for one chain of statements.
//!
//! A [`Session`] binds one dialect, one pending clause set, the currently
//! modelled table, and a handle to the database. Statements run on the open
//! transaction when there is one and on the connection pool otherwise.
//!
//! Chain calls (`model`, `where_`, `order_by`, `limit`) only record state.
//! Terminal calls (`exec`, `query_rows`, `query_row`, and every CRUD verb)
//! run a statement and clear all pending state whether they succeed or not,
//! so the session is immediately reusable.

mod hooks;
mod record;
mod table;
mod transaction;

pub use hooks::{Hook, HookResult, Hooks};

use std::sync::Arc;

use keel_core::clause::Clause;
use keel_core::dialect::Dialect;
use keel_core::schema::TableSchema;
use keel_core::value::SqlValue;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction, TypeInfo, ValueRef};
use tracing::{debug, error};

use crate::error::Result;
use hooks::HookFn;

/// The schema currently held by a session together with the hook dispatcher
/// of the record type it was derived from.
#[derive(Clone)]
pub(crate) struct RefTable {
    pub(crate) schema: Arc<TableSchema>,
    pub(crate) hooks: HookFn,
}

/// Pending statement state, set aside while a hook runs.
pub(crate) struct Stash {
    ref_table: Option<RefTable>,
    clause: Clause,
    sql: String,
    sql_vars: Vec<SqlValue>,
}

/// Execution context for one chain of statements.
pub struct Session {
    pool: SqlitePool,
    dialect: Arc<dyn Dialect>,
    tx: Option<Transaction<'static, Sqlite>>,
    ref_table: Option<RefTable>,
    clause: Clause,
    sql: String,
    sql_vars: Vec<SqlValue>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("dialect", &self.dialect.name())
            .field("in_transaction", &self.tx.is_some())
            .field(
                "model",
                &self.ref_table.as_ref().map(|t| t.schema.name.as_str()),
            )
            .field("sql", &self.sql)
            .field("sql_vars", &self.sql_vars)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a session over `pool` using `dialect`.
    #[must_use]
    pub fn new(pool: SqlitePool, dialect: Arc<dyn Dialect>) -> Self {
        Self {
            pool,
            dialect,
            tx: None,
            ref_table: None,
            clause: Clause::new(),
            sql: String::new(),
            sql_vars: Vec::new(),
        }
    }

    /// Returns the session's dialect.
    #[must_use]
    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// Returns the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the pending statement text and parameters.
    #[must_use]
    pub fn pending(&self) -> (&str, &[SqlValue]) {
        (self.sql.trim_end(), &self.sql_vars)
    }

    /// Returns the pending clause set.
    #[must_use]
    pub const fn clause(&self) -> &Clause {
        &self.clause
    }

    /// Drops all pending SQL, parameters, and clause fragments.
    pub fn clear(&mut self) {
        self.sql.clear();
        self.sql_vars.clear();
        self.clause.clear();
    }

    /// Appends SQL text and its parameters to the pending statement.
    pub fn raw<I, V>(&mut self, sql: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: keel_core::value::ToSqlValue,
    {
        self.sql.push_str(sql);
        self.sql.push(' ');
        self.sql_vars
            .extend(values.into_iter().map(keel_core::value::ToSqlValue::to_sql_value));
        self
    }

    /// Executes the pending statement for its effect and returns the number
    /// of affected rows.
    pub async fn exec(&mut self) -> Result<u64> {
        let (sql, vars) = self.take_pending();
        debug!(sql = %sql, params = ?vars, "exec");
        let query = bind_all(sqlx::query(&sql), vars);
        let result = match self.tx.as_mut() {
            Some(tx) => query.execute(&mut **tx).await,
            None => query.execute(&self.pool).await,
        };
        match result {
            Ok(done) => Ok(done.rows_affected()),
            Err(e) => {
                error!(sql = %sql, error = %e, "statement failed");
                Err(e.into())
            }
        }
    }

    /// Runs the pending statement and returns every row.
    ///
    /// The cursor is drained and released before this returns, on success
    /// and on the first row error alike.
    pub async fn query_rows(&mut self) -> Result<Vec<SqliteRow>> {
        let (sql, vars) = self.take_pending();
        debug!(sql = %sql, params = ?vars, "query");
        let query = bind_all(sqlx::query(&sql), vars);
        let result = match self.tx.as_mut() {
            Some(tx) => query.fetch_all(&mut **tx).await,
            None => query.fetch_all(&self.pool).await,
        };
        result.map_err(|e| {
            error!(sql = %sql, error = %e, "query failed");
            e.into()
        })
    }

    /// Runs the pending statement and returns its first row, if any.
    pub async fn query_row(&mut self) -> Result<Option<SqliteRow>> {
        let (sql, vars) = self.take_pending();
        debug!(sql = %sql, params = ?vars, "query row");
        let query = bind_all(sqlx::query(&sql), vars);
        let result = match self.tx.as_mut() {
            Some(tx) => query.fetch_optional(&mut **tx).await,
            None => query.fetch_optional(&self.pool).await,
        };
        result.map_err(|e| {
            error!(sql = %sql, error = %e, "query failed");
            e.into()
        })
    }

    fn take_pending(&mut self) -> (String, Vec<SqlValue>) {
        let sql = std::mem::take(&mut self.sql);
        let vars = std::mem::take(&mut self.sql_vars);
        self.clause.clear();
        (sql.trim_end().to_string(), vars)
    }

    pub(crate) fn stash(&mut self) -> Stash {
        Stash {
            ref_table: self.ref_table.clone(),
            clause: std::mem::take(&mut self.clause),
            sql: std::mem::take(&mut self.sql),
            sql_vars: std::mem::take(&mut self.sql_vars),
        }
    }

    pub(crate) fn restore(&mut self, stash: Stash) {
        self.ref_table = stash.ref_table;
        self.clause = stash.clause;
        self.sql = stash.sql;
        self.sql_vars = stash.sql_vars;
    }
}

/// Binds positional parameters in order.
fn bind_all<'q>(
    mut query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    values: Vec<SqlValue>,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in values {
        query = match value {
            SqlValue::Null => query.bind(Option::<i64>::None),
            SqlValue::Bool(b) => query.bind(b),
            SqlValue::Int(i) => query.bind(i),
            SqlValue::Float(f) => query.bind(f),
            SqlValue::Text(s) => query.bind(s),
            SqlValue::Blob(b) => query.bind(b),
        };
    }
    query
}

/// Reads one column of a row by name, keyed on the value's storage class.
pub(crate) fn decode_column(
    row: &SqliteRow,
    column: &str,
) -> std::result::Result<SqlValue, sqlx::Error> {
    let storage = {
        let raw = row.try_get_raw(column)?;
        if raw.is_null() {
            return Ok(SqlValue::Null);
        }
        raw.type_info().name().to_string()
    };
    match storage.as_str() {
        "INTEGER" | "BOOLEAN" => row.try_get::<i64, _>(column).map(SqlValue::Int),
        "REAL" | "NUMERIC" => row.try_get::<f64, _>(column).map(SqlValue::Float),
        "BLOB" => row.try_get::<Vec<u8>, _>(column).map(SqlValue::Blob),
        _ => row.try_get::<String, _>(column).map(SqlValue::Text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::dialect::SqliteDialect;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_session() -> Session {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .expect("Failed to create in-memory SQLite pool");
        Session::new(pool, Arc::new(SqliteDialect::new()))
    }

    #[tokio::test]
    async fn test_raw_accumulates_until_exec() {
        let mut s = create_test_session().await;
        s.raw("CREATE TABLE t (a integer, b text)", Vec::<SqlValue>::new());
        assert_eq!(s.pending().0, "CREATE TABLE t (a integer, b text)");
        s.exec().await.unwrap();
        assert_eq!(s.pending().0, "");

        let affected = s
            .raw(
                "INSERT INTO t (a, b) VALUES (?, ?)",
                [SqlValue::Int(1), SqlValue::Text("x".into())],
            )
            .exec()
            .await
            .unwrap();
        assert_eq!(affected, 1);
        assert!(s.pending().1.is_empty());
    }

    #[tokio::test]
    async fn test_failed_exec_still_clears() {
        let mut s = create_test_session().await;
        let err = s
            .raw("INSERT INTO missing VALUES (?)", [1_i64])
            .exec()
            .await;
        assert!(err.is_err());
        assert_eq!(s.pending(), ("", &[][..]));
    }

    #[tokio::test]
    async fn test_query_rows_and_decode() {
        let mut s = create_test_session().await;
        s.raw(
            "CREATE TABLE t (i integer, r real, x text, b blob, n text)",
            Vec::<SqlValue>::new(),
        )
        .exec()
        .await
        .unwrap();
        s.raw(
            "INSERT INTO t VALUES (?, ?, ?, ?, ?)",
            [
                SqlValue::Int(7),
                SqlValue::Float(1.5),
                SqlValue::Text("hi".into()),
                SqlValue::Blob(vec![1, 2]),
                SqlValue::Null,
            ],
        )
        .exec()
        .await
        .unwrap();

        let rows = s
            .raw("SELECT i, r, x, b, n FROM t", Vec::<SqlValue>::new())
            .query_rows()
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(decode_column(row, "i").unwrap(), SqlValue::Int(7));
        assert_eq!(decode_column(row, "r").unwrap(), SqlValue::Float(1.5));
        assert_eq!(decode_column(row, "x").unwrap(), SqlValue::Text("hi".into()));
        assert_eq!(decode_column(row, "b").unwrap(), SqlValue::Blob(vec![1, 2]));
        assert_eq!(decode_column(row, "n").unwrap(), SqlValue::Null);
        assert!(decode_column(row, "missing").is_err());
    }

    #[tokio::test]
    async fn test_query_row_none() {
        let mut s = create_test_session().await;
        let row = s
            .raw("SELECT 1 WHERE 1 = ?", [0_i64])
            .query_row()
            .await
            .unwrap();
        assert!(row.is_none());
    }
}
