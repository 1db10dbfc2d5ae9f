//! # keel
//!
//! A small record-to-table ORM over SQLite.
//!
//! This crate provides:
//! - [`Engine`] for connecting to a database and handing out sessions
//! - [`Session`] for raw SQL, table operations, and chainable record CRUD
//! - [`Hooks`] for lifecycle callbacks around inserts, queries, updates, and
//!   deletes
//! - transactions, both manual (`begin`/`commit`/`rollback`) and scoped
//!   (`transaction`)
//! - schema-diff migrations via [`Session::migrate`]
//!
//! ## Quick Start
//!
//! ```ignore
//! use keel::{Engine, Record};
//!
//! #[derive(Debug, Default, Record)]
//! struct Student {
//!     #[column(tag = "PRIMARY KEY")]
//!     name: String,
//!     age: i32,
//!     school: String,
//! }
//!
//! async fn example() -> keel::Result<()> {
//!     let engine = Engine::connect("sqlite3", "gee.db").await?;
//!     let mut s = engine.new_session();
//!
//!     s.model::<Student>()?.create_table().await?;
//!     s.insert(vec![
//!         Student { name: "Tom".into(), age: 18, school: "CAU".into() },
//!         Student { name: "Sam".into(), age: 25, school: "GU".into() },
//!     ])
//!     .await?;
//!
//!     let mut adults: Vec<Student> = Vec::new();
//!     s.where_("age >= ?", [18]).order_by("age DESC").find(&mut adults).await?;
//!
//!     let n = s.model::<Student>()?.where_("school = ?", ["CAU"]).count().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Transactions
//!
//! ```ignore
//! engine
//!     .transaction(|s| {
//!         Box::pin(async move {
//!             s.model::<Student>()?;
//!             s.where_("name = ?", ["Tom"]).delete().await
//!         })
//!     })
//!     .await?;
//! ```

extern crate self as keel;

pub mod config;
pub mod engine;
pub mod error;
pub mod migrate;
pub mod session;

pub use keel_core::{clause, dialect, schema, value};

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{Error, Result};
pub use migrate::{plan, MigrationPlan};
pub use session::{Hook, HookResult, Hooks, Session};

pub use keel_core::schema::Record;
pub use keel_core::value::SqlValue;
pub use keel_derive::Record;

pub use async_trait::async_trait;
pub use futures::future::BoxFuture;
