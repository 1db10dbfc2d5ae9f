//! Model selection and table-level operations.

use std::sync::Arc;

use keel_core::schema::{Column, Record, TableSchema};
use keel_core::value::SqlValue;
use tracing::debug;

use super::hooks::{dispatch, Hooks};
use super::{decode_column, RefTable, Session};
use crate::error::{Error, Result};

impl Session {
    /// Makes `R` the session's current table.
    ///
    /// The schema is derived only when the held one belongs to another type.
    pub fn model<R: Record + Hooks>(&mut self) -> Result<&mut Self> {
        let held = self
            .ref_table
            .as_ref()
            .is_some_and(|t| t.schema.is_for::<R>());
        if !held {
            let schema = TableSchema::parse::<R>(self.dialect.as_ref())?;
            debug!(table = %schema.name, record = schema.type_name(), "model");
            self.ref_table = Some(RefTable {
                schema: Arc::new(schema),
                hooks: dispatch::<R>,
            });
        }
        Ok(self)
    }

    /// Returns the schema of the current table.
    pub fn ref_table(&self) -> Result<&TableSchema> {
        self.ref_table
            .as_ref()
            .map(|t| t.schema.as_ref())
            .ok_or(Error::NoModel)
    }

    pub(crate) fn held_schema(&self) -> Result<Arc<TableSchema>> {
        self.ref_table
            .as_ref()
            .map(|t| Arc::clone(&t.schema))
            .ok_or(Error::NoModel)
    }

    /// Creates the current table.
    pub async fn create_table(&mut self) -> Result<()> {
        let result = self.create_table_inner().await;
        self.clear();
        result
    }

    async fn create_table_inner(&mut self) -> Result<()> {
        let table = self.held_schema()?;
        let definitions: Vec<String> = table.columns.iter().map(Column::definition).collect();
        let sql = format!("CREATE TABLE {} ({})", table.name, definitions.join(", "));
        self.raw(&sql, Vec::<SqlValue>::new()).exec().await?;
        Ok(())
    }

    /// Drops the current table if it exists.
    pub async fn drop_table(&mut self) -> Result<()> {
        let result = self.drop_table_inner().await;
        self.clear();
        result
    }

    async fn drop_table_inner(&mut self) -> Result<()> {
        let table = self.held_schema()?;
        let sql = format!("DROP TABLE IF EXISTS {}", table.name);
        self.raw(&sql, Vec::<SqlValue>::new()).exec().await?;
        Ok(())
    }

    /// Returns whether the current table exists.
    pub async fn has_table(&mut self) -> Result<bool> {
        let result = self.has_table_inner().await;
        self.clear();
        result
    }

    async fn has_table_inner(&mut self) -> Result<bool> {
        let table = self.held_schema()?;
        let (sql, args) = self.dialect.table_exist_sql(&table.name);
        let Some(row) = self.raw(&sql, args).query_row().await? else {
            return Ok(false);
        };
        Ok(matches!(
            decode_column(&row, "name")?,
            SqlValue::Text(name) if name == table.name
        ))
    }

    /// Returns the column names the current table has in the database, in
    /// table order.
    pub async fn live_columns(&mut self) -> Result<Vec<String>> {
        let result = self.live_columns_inner().await;
        self.clear();
        result
    }

    async fn live_columns_inner(&mut self) -> Result<Vec<String>> {
        let table = self.held_schema()?;
        let (sql, args) = self.dialect.table_columns_sql(&table.name);
        let rows = self.raw(&sql, args).query_rows().await?;
        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            if let SqlValue::Text(name) = decode_column(row, "name")? {
                columns.push(name);
            }
        }
        Ok(columns)
    }
}
