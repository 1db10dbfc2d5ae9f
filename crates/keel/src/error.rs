//! Error types for keel.

use keel_core::schema::SchemaError;
use keel_core::value::ValueError;
use thiserror::Error;

/// Errors surfaced by engines and sessions.
#[derive(Debug, Error)]
pub enum Error {
    /// Database error from sqlx (connection, statement execution, commit).
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// No dialect is registered for the driver name.
    #[error("dialect {0} not found")]
    UnknownDialect(String),

    /// The record type cannot be mapped with the session's dialect.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// A column value could not be stored into its record field.
    #[error("cannot scan column {column}: {source}")]
    Scan {
        /// Column being scanned.
        column: String,
        /// Conversion failure.
        #[source]
        source: ValueError,
    },

    /// `first` matched no row.
    #[error("record not found")]
    NotFound,

    /// An operation needed a model but none was set on the session.
    #[error("model is not set")]
    NoModel,

    /// `begin` was called while a transaction is already open.
    #[error("a transaction is already active on this session")]
    TransactionActive,

    /// `commit` or `rollback` was called with no open transaction.
    #[error("no active transaction")]
    NoTransaction,
}

/// Result type alias for keel operations.
pub type Result<T> = std::result::Result<T, Error>;
