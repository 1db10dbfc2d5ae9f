//! Clause builder.
//!
//! A [`Clause`] holds at most one generated fragment per [`ClauseKind`],
//! each with its own bound parameters. Fragments are set independently, in any
//! order, and [`Clause::build`] stitches the requested kinds together in the
//! order the caller asks for. The builder assembles text; it does not
//! validate SQL.

use std::collections::{BTreeMap, HashMap};

use crate::value::SqlValue;

/// The nine fragment categories a statement is assembled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClauseKind {
    /// `INSERT INTO t (cols)`
    Insert,
    /// `VALUES (?, ?), (?, ?)`
    Values,
    /// `SELECT cols FROM t`
    Select,
    /// `LIMIT ?`
    Limit,
    /// `WHERE predicate`
    Where,
    /// `ORDER BY order`
    OrderBy,
    /// `UPDATE t SET c = ?`
    Update,
    /// `DELETE FROM t`
    Delete,
    /// `SELECT COUNT(*) FROM t`
    Count,
}

/// Arguments for one clause kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// Target table and column list of an insert.
    Insert {
        /// Table name.
        table: String,
        /// Column names.
        columns: Vec<String>,
    },
    /// One value sequence per inserted row.
    Values(Vec<Vec<SqlValue>>),
    /// Table and column list to read.
    Select {
        /// Table name.
        table: String,
        /// Column names.
        columns: Vec<String>,
    },
    /// Maximum row count.
    Limit(i64),
    /// Predicate text with its positional arguments.
    Where {
        /// Predicate with `?` placeholders.
        predicate: String,
        /// Arguments bound to the placeholders.
        args: Vec<SqlValue>,
    },
    /// Ordering text.
    OrderBy(String),
    /// Table and the columns to set.
    Update {
        /// Table name.
        table: String,
        /// Column to new value.
        changes: BTreeMap<String, SqlValue>,
    },
    /// Table to delete from.
    Delete {
        /// Table name.
        table: String,
    },
    /// Table to count rows of.
    Count {
        /// Table name.
        table: String,
    },
}

impl Fragment {
    /// Returns the clause kind this fragment fills.
    #[must_use]
    pub const fn kind(&self) -> ClauseKind {
        match self {
            Self::Insert { .. } => ClauseKind::Insert,
            Self::Values(_) => ClauseKind::Values,
            Self::Select { .. } => ClauseKind::Select,
            Self::Limit(_) => ClauseKind::Limit,
            Self::Where { .. } => ClauseKind::Where,
            Self::OrderBy(_) => ClauseKind::OrderBy,
            Self::Update { .. } => ClauseKind::Update,
            Self::Delete { .. } => ClauseKind::Delete,
            Self::Count { .. } => ClauseKind::Count,
        }
    }

    /// Generates the SQL text and bound parameters of this fragment.
    #[must_use]
    pub fn generate(self) -> (String, Vec<SqlValue>) {
        match self {
            Self::Insert { table, columns } => (
                format!("INSERT INTO {table} ({})", columns.join(", ")),
                Vec::new(),
            ),
            Self::Values(rows) => {
                let mut groups = Vec::with_capacity(rows.len());
                let mut params = Vec::new();
                for row in rows {
                    let placeholders = vec!["?"; row.len()].join(", ");
                    groups.push(format!("({placeholders})"));
                    params.extend(row);
                }
                (format!("VALUES {}", groups.join(", ")), params)
            }
            Self::Select { table, columns } => (
                format!("SELECT {} FROM {table}", columns.join(", ")),
                Vec::new(),
            ),
            Self::Limit(n) => (String::from("LIMIT ?"), vec![SqlValue::Int(n)]),
            Self::Where { predicate, args } => (format!("WHERE {predicate}"), args),
            Self::OrderBy(order) => (format!("ORDER BY {order}"), Vec::new()),
            Self::Update { table, changes } => {
                let mut assignments = Vec::with_capacity(changes.len());
                let mut params = Vec::with_capacity(changes.len());
                for (column, value) in changes {
                    assignments.push(format!("{column} = ?"));
                    params.push(value);
                }
                (
                    format!("UPDATE {table} SET {}", assignments.join(", ")),
                    params,
                )
            }
            Self::Delete { table } => (format!("DELETE FROM {table}"), Vec::new()),
            Self::Count { table } => (format!("SELECT COUNT(*) FROM {table}"), Vec::new()),
        }
    }
}

/// Accumulated clause fragments of one pending statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clause {
    fragments: HashMap<ClauseKind, (String, Vec<SqlValue>)>,
}

impl Clause {
    /// Creates an empty clause set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generates and stores a fragment, replacing any fragment of the same kind.
    pub fn set(&mut self, fragment: Fragment) {
        let kind = fragment.kind();
        self.fragments.insert(kind, fragment.generate());
    }

    /// Returns the stored fragment of a kind.
    #[must_use]
    pub fn get(&self, kind: ClauseKind) -> Option<(&str, &[SqlValue])> {
        self.fragments
            .get(&kind)
            .map(|(sql, params)| (sql.as_str(), params.as_slice()))
    }

    /// Returns whether no fragment is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Removes every fragment.
    pub fn clear(&mut self) {
        self.fragments.clear();
    }

    /// Joins the fragments of `order` that are set, separated by one space,
    /// and concatenates their parameters in the same order.
    #[must_use]
    pub fn build(&self, order: &[ClauseKind]) -> (String, Vec<SqlValue>) {
        let mut parts = Vec::with_capacity(order.len());
        let mut params = Vec::new();
        for kind in order {
            if let Some((sql, vars)) = self.fragments.get(kind) {
                parts.push(sql.as_str());
                params.extend(vars.iter().cloned());
            }
        }
        (parts.join(" "), params)
    }
}
