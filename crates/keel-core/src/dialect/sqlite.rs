//! SQLite dialect implementation.
//!
//! SQLite uses type affinity, so the declared names below mostly matter for
//! readability of the stored schema. `bool` columns hold 0/1 integers and
//! datetimes are kept as RFC 3339 text.

use super::Dialect;
use crate::value::{FieldKind, SqlValue};

/// SQLite dialect.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn data_type_of(&self, kind: FieldKind) -> Option<String> {
        let name = match kind {
            FieldKind::Bool => "bool",
            FieldKind::Int => "integer",
            FieldKind::BigInt => "bigint",
            FieldKind::Float => "real",
            FieldKind::Text => "text",
            FieldKind::Blob => "blob",
            FieldKind::DateTime => "datetime",
        };
        Some(name.to_string())
    }

    fn table_exist_sql(&self, table: &str) -> (String, Vec<SqlValue>) {
        (
            String::from("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?"),
            vec![SqlValue::Text(table.to_string())],
        )
    }

    fn table_columns_sql(&self, table: &str) -> (String, Vec<SqlValue>) {
        (
            String::from("SELECT name FROM pragma_table_info(?) ORDER BY cid"),
            vec![SqlValue::Text(table.to_string())],
        )
    }
}
