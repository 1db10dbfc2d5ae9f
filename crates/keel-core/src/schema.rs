//! Record descriptors and the table schemas derived from them.
//!
//! A record type describes its mapped fields once, statically, through the
//! [`Record`] trait (usually generated by `#[derive(Record)]`). A
//! [`TableSchema`] is the dialect-specific view of that descriptor: column
//! names, SQL types, and constraint tags in declaration order.

use std::any::TypeId;
use std::collections::HashMap;

use thiserror::Error;

use crate::dialect::Dialect;
use crate::value::{FieldKind, SqlValue, ValueError};

/// Static description of one mapped field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Column name (the field's name).
    pub name: &'static str,
    /// Kind used to pick the column type.
    pub kind: FieldKind,
    /// Raw dialect constraint text, e.g. `PRIMARY KEY`. Empty if absent.
    pub tag: &'static str,
}

/// A structured value whose mapped fields correspond one-to-one to columns.
///
/// `Default` provides the zero-valued record that rows are scanned into.
pub trait Record: Default + Send + Sync + 'static {
    /// Bare type name, used as the table name.
    const NAME: &'static str;

    /// Mapped fields in declaration order.
    const FIELDS: &'static [FieldDescriptor];

    /// Returns the current value of the field mapped to `column`.
    fn value(&self, column: &str) -> Option<SqlValue>;

    /// Stores `value` into the field mapped to `column`.
    fn assign(&mut self, column: &str, value: SqlValue) -> Result<(), ValueError>;
}

/// Errors raised while deriving a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The dialect has no column type for a field's kind.
    #[error("dialect {dialect} cannot store field {table}.{field} of kind {kind}")]
    UnsupportedType {
        /// Table being derived.
        table: &'static str,
        /// Offending field.
        field: &'static str,
        /// The field's kind.
        kind: FieldKind,
        /// Dialect name.
        dialect: &'static str,
    },
}

/// A column of a derived table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Dialect-specific SQL type.
    pub sql_type: String,
    /// Constraint text copied verbatim from the field annotation.
    pub tag: String,
}

impl Column {
    /// Returns the column definition used in `CREATE TABLE`.
    #[must_use]
    pub fn definition(&self) -> String {
        if self.tag.is_empty() {
            format!("{} {}", self.name, self.sql_type)
        } else {
            format!("{} {} {}", self.name, self.sql_type, self.tag)
        }
    }
}

/// The table a record type maps to.
#[derive(Debug, Clone)]
pub struct TableSchema {
    source_type: TypeId,
    type_name: &'static str,
    /// Table name (the record type's bare name).
    pub name: String,
    /// Columns in declaration order.
    pub columns: Vec<Column>,
    /// Column names, pairwise matching `columns`.
    pub column_names: Vec<String>,
    by_name: HashMap<String, usize>,
}

impl TableSchema {
    /// Derives the schema of `R` for `dialect`.
    ///
    /// Parsing is deterministic: the same record type always yields the same
    /// names, types, tags, and order.
    pub fn parse<R: Record>(dialect: &dyn Dialect) -> Result<Self, SchemaError> {
        let mut columns = Vec::with_capacity(R::FIELDS.len());
        let mut column_names = Vec::with_capacity(R::FIELDS.len());
        let mut by_name = HashMap::with_capacity(R::FIELDS.len());

        for field in R::FIELDS {
            let sql_type = dialect
                .data_type_of(field.kind)
                .ok_or(SchemaError::UnsupportedType {
                    table: R::NAME,
                    field: field.name,
                    kind: field.kind,
                    dialect: dialect.name(),
                })?;
            by_name.insert(field.name.to_string(), columns.len());
            column_names.push(field.name.to_string());
            columns.push(Column {
                name: field.name.to_string(),
                sql_type,
                tag: field.tag.to_string(),
            });
        }

        Ok(Self {
            source_type: TypeId::of::<R>(),
            type_name: std::any::type_name::<R>(),
            name: R::NAME.to_string(),
            columns,
            column_names,
            by_name,
        })
    }

    /// Returns the column with the given name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.by_name.get(name).map(|&idx| &self.columns[idx])
    }

    /// Type identity of the record this schema was derived from.
    #[must_use]
    pub const fn source_type(&self) -> TypeId {
        self.source_type
    }

    /// Rust path of the record type, for diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns whether this schema was derived from `R`.
    #[must_use]
    pub fn is_for<R: 'static>(&self) -> bool {
        self.source_type == TypeId::of::<R>()
    }

    /// Returns the record's values in `column_names` order.
    ///
    /// This alignment is what keeps a `VALUES` row in step with the
    /// `INSERT` column list.
    #[must_use]
    pub fn record_values<R: Record>(&self, record: &R) -> Vec<SqlValue> {
        self.column_names
            .iter()
            .map(|name| record.value(name).unwrap_or(SqlValue::Null))
            .collect()
    }
}
