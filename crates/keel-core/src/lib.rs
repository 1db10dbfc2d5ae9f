//! # keel-core
//!
//! The database-independent half of keel: how a record type describes its
//! columns, how a dialect turns those descriptions into a table schema, and
//! how SQL statements are assembled from independently set clause fragments.
//!
//! This crate provides:
//! - [`SqlValue`] and the conversions between host types and bound parameters
//! - the [`Dialect`] trait, the SQLite dialect, and a registry keyed by
//!   driver name
//! - the [`Record`] descriptor trait and [`TableSchema`] derivation
//! - the [`Clause`] builder
//!
//! ## Building a statement
//!
//! ```rust
//! use keel_core::clause::{Clause, ClauseKind, Fragment};
//! use keel_core::value::SqlValue;
//!
//! let mut clause = Clause::new();
//! clause.set(Fragment::Select {
//!     table: "Student".into(),
//!     columns: vec!["name".into(), "age".into()],
//! });
//! clause.set(Fragment::Where {
//!     predicate: "age >= ?".into(),
//!     args: vec![SqlValue::Int(18)],
//! });
//!
//! let (sql, params) = clause.build(&[ClauseKind::Select, ClauseKind::Where]);
//! assert_eq!(sql, "SELECT name, age FROM Student WHERE age >= ?");
//! assert_eq!(params, vec![SqlValue::Int(18)]);
//! ```

pub mod clause;
pub mod dialect;
pub mod schema;
pub mod value;

pub use clause::{Clause, ClauseKind, Fragment};
pub use dialect::{get_dialect, register_dialect, Dialect, SqliteDialect};
pub use schema::{Column, FieldDescriptor, Record, SchemaError, TableSchema};
pub use value::{FieldKind, FromSqlValue, SqlField, SqlValue, ToSqlValue, ValueError};
