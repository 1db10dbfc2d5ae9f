//! SQL Dialect support.
//!
//! A dialect translates a field's [`FieldKind`] into a column type and knows
//! how to ask the backend whether a table exists. Dialects are looked up by
//! driver name through a process-wide registry.

mod sqlite;

pub use sqlite::SqliteDialect;

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::value::{FieldKind, SqlValue};

/// Trait for SQL dialect-specific behavior.
pub trait Dialect: Send + Sync {
    /// Returns the name of the dialect.
    fn name(&self) -> &'static str;

    /// Returns the column type for a field kind, or `None` if the dialect
    /// cannot store it.
    fn data_type_of(&self, kind: FieldKind) -> Option<String>;

    /// Returns a statement (and its parameters) that yields the table's name
    /// when the table exists and no row otherwise.
    fn table_exist_sql(&self, table: &str) -> (String, Vec<SqlValue>);

    /// Returns a statement (and its parameters) that yields one row per
    /// column of the table, in table order, with the column name in a column
    /// called `name`.
    fn table_columns_sql(&self, table: &str) -> (String, Vec<SqlValue>);
}

type Registry = RwLock<HashMap<String, Arc<dyn Dialect>>>;

fn registry() -> &'static Registry {
    static DIALECTS: OnceLock<Registry> = OnceLock::new();
    DIALECTS.get_or_init(|| {
        let sqlite: Arc<dyn Dialect> = Arc::new(SqliteDialect::new());
        let mut map = HashMap::new();
        map.insert(String::from("sqlite"), Arc::clone(&sqlite));
        map.insert(String::from("sqlite3"), sqlite);
        RwLock::new(map)
    })
}

/// Registers a dialect under a driver name, replacing any previous entry.
pub fn register_dialect(name: impl Into<String>, dialect: Arc<dyn Dialect>) {
    registry()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(name.into(), dialect);
}

/// Looks up the dialect registered for a driver name.
#[must_use]
pub fn get_dialect(name: &str) -> Option<Arc<dyn Dialect>> {
    registry()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(name)
        .cloned()
}
