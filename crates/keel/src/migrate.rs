//! Schema-diff migration.
//!
//! A migration brings one table in line with its record type: missing tables
//! are created, new fields become `ALTER TABLE ... ADD COLUMN`, and columns
//! the record no longer has are removed by rebuilding the table.
//!
//! Removing a column discards its data. This is logged at `warn` with the
//! dropped column names.

use keel_core::schema::Record;
use keel_core::value::SqlValue;
use tracing::{info, warn};

use crate::error::Result;
use crate::session::{Hooks, Session};

/// What a migration changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationPlan {
    /// The table did not exist and was created.
    pub created: bool,
    /// Columns added, in record order.
    pub added: Vec<String>,
    /// Columns removed, in table order.
    pub dropped: Vec<String>,
}

impl MigrationPlan {
    /// Returns whether the migration changed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.created && self.added.is_empty() && self.dropped.is_empty()
    }
}

/// Compares a record's columns with a table's live columns.
///
/// `added` keeps the order of `schema`, `dropped` the order of `live`.
#[must_use]
pub fn plan(schema: &[String], live: &[String]) -> MigrationPlan {
    MigrationPlan {
        created: false,
        added: difference(schema, live),
        dropped: difference(live, schema),
    }
}

fn difference(a: &[String], b: &[String]) -> Vec<String> {
    a.iter().filter(|name| !b.contains(name)).cloned().collect()
}

impl Session {
    /// Migrates `R`'s table inside its own transaction.
    ///
    /// Fails with [`Error::TransactionActive`](crate::Error::TransactionActive)
    /// when the session already has a transaction open. Columns missing from
    /// `R` are dropped together with their data.
    pub async fn migrate<R: Record + Hooks>(&mut self) -> Result<MigrationPlan> {
        self.transaction(|s| Box::pin(s.migrate_in_transaction::<R>()))
            .await
    }

    async fn migrate_in_transaction<R: Record + Hooks>(&mut self) -> Result<MigrationPlan> {
        self.model::<R>()?;
        let table = self.held_schema()?;

        if !self.has_table().await? {
            self.create_table().await?;
            info!(table = %table.name, "table created");
            return Ok(MigrationPlan {
                created: true,
                ..MigrationPlan::default()
            });
        }

        let live = self.live_columns().await?;
        let plan = plan(&table.column_names, &live);

        for name in &plan.added {
            let Some(column) = table.column(name) else {
                continue;
            };
            let sql = format!(
                "ALTER TABLE {} ADD COLUMN {} {}",
                table.name, column.name, column.sql_type
            );
            self.raw(&sql, Vec::<SqlValue>::new()).exec().await?;
            info!(table = %table.name, column = %name, "column added");
        }

        if !plan.dropped.is_empty() {
            warn!(
                table = %table.name,
                columns = ?plan.dropped,
                "dropping columns, their data is discarded"
            );
            let tmp = format!("tmp_{}", table.name);
            let columns = table.column_names.join(", ");
            let statements = [
                format!("CREATE TABLE {tmp} AS SELECT {columns} FROM {}", table.name),
                format!("DROP TABLE {}", table.name),
                format!("ALTER TABLE {tmp} RENAME TO {}", table.name),
            ];
            for sql in &statements {
                self.raw(sql, Vec::<SqlValue>::new()).exec().await?;
            }
        }

        if plan.is_empty() {
            info!(table = %table.name, "table up to date");
        }
        Ok(plan)
    }
}
