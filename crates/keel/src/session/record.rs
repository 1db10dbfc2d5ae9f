//! Record CRUD.
//!
//! Every verb here is terminal: it builds one statement from the pending
//! clauses, runs it, and clears the pending state on every exit path.

use std::collections::BTreeMap;
use std::future::Future;

use keel_core::clause::{ClauseKind, Fragment};
use keel_core::schema::Record;
use keel_core::value::{SqlValue, ToSqlValue};
use sqlx::Row;

use super::hooks::{dispatch, Hook, Hooks};
use super::{decode_column, Session};
use crate::error::{Error, Result};

impl Session {
    /// Sets the `WHERE` clause.
    pub fn where_<I, V>(&mut self, predicate: &str, args: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: ToSqlValue,
    {
        self.clause.set(Fragment::Where {
            predicate: predicate.to_string(),
            args: args.into_iter().map(ToSqlValue::to_sql_value).collect(),
        });
        self
    }

    /// Sets the `ORDER BY` clause.
    pub fn order_by(&mut self, order: &str) -> &mut Self {
        self.clause.set(Fragment::OrderBy(order.to_string()));
        self
    }

    /// Sets the `LIMIT` clause.
    pub fn limit(&mut self, n: i64) -> &mut Self {
        self.clause.set(Fragment::Limit(n));
        self
    }

    /// Inserts `records` in one statement and returns the affected row count.
    ///
    /// `before_insert` runs on each record first and may change it. An empty
    /// batch is a no-op.
    pub async fn insert<R: Record + Hooks>(&mut self, records: Vec<R>) -> Result<u64> {
        let result = self.insert_inner(records).await;
        self.clear();
        result
    }

    async fn insert_inner<R: Record + Hooks>(&mut self, records: Vec<R>) -> Result<u64> {
        let mut rows = Vec::with_capacity(records.len());
        for mut record in records {
            self.run_record_hook(Hook::BeforeInsert, &mut record).await;
            self.model::<R>()?;
            rows.push(self.ref_table()?.record_values(&record));
        }
        if rows.is_empty() {
            return Ok(0);
        }

        let table = self.held_schema()?;
        self.clause.set(Fragment::Insert {
            table: table.name.clone(),
            columns: table.column_names.clone(),
        });
        self.clause.set(Fragment::Values(rows));
        let (sql, vars) = self.clause.build(&[ClauseKind::Insert, ClauseKind::Values]);
        let affected = self.raw(&sql, vars).exec().await?;

        self.run_hook(dispatch::<R>, Hook::AfterInsert, R::NAME).await;
        Ok(affected)
    }

    /// Appends every row matching the pending clauses to `dest`.
    ///
    /// Columns are matched to fields by name. Every row is scanned before
    /// any `after_query` hook runs, so the append is all or nothing: when a
    /// row fails to scan, the error is returned and `dest` is left exactly
    /// as it was, including the rows scanned before the failing one.
    pub async fn find<R: Record + Hooks>(&mut self, dest: &mut Vec<R>) -> Result<()> {
        let result = self.find_inner(dest).await;
        self.clear();
        result
    }

    async fn find_inner<R: Record + Hooks>(&mut self, dest: &mut Vec<R>) -> Result<()> {
        self.run_hook(dispatch::<R>, Hook::BeforeQuery, R::NAME)
            .await;
        self.model::<R>()?;
        let table = self.held_schema()?;

        self.clause.set(Fragment::Select {
            table: table.name.clone(),
            columns: table.column_names.clone(),
        });
        let (sql, vars) = self.clause.build(&[
            ClauseKind::Select,
            ClauseKind::Where,
            ClauseKind::OrderBy,
            ClauseKind::Limit,
        ]);
        let rows = self.raw(&sql, vars).query_rows().await?;

        let mut found = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut record = R::default();
            for column in &table.column_names {
                let value = decode_column(row, column)?;
                record
                    .assign(column, value)
                    .map_err(|source| Error::Scan {
                        column: column.clone(),
                        source,
                    })?;
            }
            found.push(record);
        }
        drop(rows);

        for mut record in found {
            self.run_record_hook(Hook::AfterQuery, &mut record).await;
            dest.push(record);
        }
        Ok(())
    }

    /// Returns the first row matching the pending clauses.
    ///
    /// Fails with [`Error::NotFound`] when nothing matches.
    pub async fn first<R: Record + Hooks>(&mut self) -> Result<R> {
        let mut found = Vec::with_capacity(1);
        self.limit(1).find(&mut found).await?;
        found.into_iter().next().ok_or(Error::NotFound)
    }

    /// Updates the rows matching the pending `WHERE` clause and returns the
    /// affected row count.
    ///
    /// Columns are set in key order.
    pub async fn update(&mut self, changes: BTreeMap<String, SqlValue>) -> Result<u64> {
        let result = self.update_inner(changes).await;
        self.clear();
        result
    }

    /// Same as [`Session::update`], taking alternating column/value pairs.
    pub fn update_pairs<I, K, V>(&mut self, pairs: I) -> impl Future<Output = Result<u64>> + '_
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToSqlValue,
    {
        let changes = pairs
            .into_iter()
            .map(|(column, value)| (column.into(), value.to_sql_value()))
            .collect();
        self.update(changes)
    }

    async fn update_inner(&mut self, changes: BTreeMap<String, SqlValue>) -> Result<u64> {
        let table = self.held_schema()?;
        self.run_held_hook(Hook::BeforeUpdate).await;

        self.clause.set(Fragment::Update {
            table: table.name.clone(),
            changes,
        });
        let (sql, vars) = self.clause.build(&[ClauseKind::Update, ClauseKind::Where]);
        let affected = self.raw(&sql, vars).exec().await?;

        self.run_held_hook(Hook::AfterUpdate).await;
        Ok(affected)
    }

    /// Deletes the rows matching the pending `WHERE` clause and returns the
    /// affected row count.
    pub async fn delete(&mut self) -> Result<u64> {
        let result = self.delete_inner().await;
        self.clear();
        result
    }

    async fn delete_inner(&mut self) -> Result<u64> {
        let table = self.held_schema()?;
        self.run_held_hook(Hook::BeforeDelete).await;

        self.clause.set(Fragment::Delete {
            table: table.name.clone(),
        });
        let (sql, vars) = self.clause.build(&[ClauseKind::Delete, ClauseKind::Where]);
        let affected = self.raw(&sql, vars).exec().await?;

        self.run_held_hook(Hook::AfterDelete).await;
        Ok(affected)
    }

    /// Counts the rows matching the pending `WHERE` clause.
    pub async fn count(&mut self) -> Result<i64> {
        let result = self.count_inner().await;
        self.clear();
        result
    }

    async fn count_inner(&mut self) -> Result<i64> {
        let table = self.held_schema()?;
        self.clause.set(Fragment::Count {
            table: table.name.clone(),
        });
        let (sql, vars) = self.clause.build(&[ClauseKind::Count, ClauseKind::Where]);
        let row = self.raw(&sql, vars).query_row().await?;
        match row {
            Some(row) => Ok(row.try_get::<i64, _>(0)?),
            None => Ok(0),
        }
    }
}
