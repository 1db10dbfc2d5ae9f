//! Lifecycle hooks.
//!
//! A record type opts into hooks by implementing [`Hooks`]; every method has
//! a no-op default, so `#[derive(Record)]` emits an empty impl unless the
//! struct is marked `#[record(hooks)]`.
//!
//! Hook failures are logged at `warn` and never abort the surrounding
//! operation. The session's pending statement and held schema are set aside
//! while a hook runs, so a hook may use the session for its own queries.

use std::fmt;

use async_trait::async_trait;
use futures::future::BoxFuture;
use keel_core::schema::Record;
use tracing::warn;

use super::Session;

/// Outcome of a hook.
pub type HookResult = anyhow::Result<()>;

/// The lifecycle points at which hooks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    /// Before a record is inserted; may mutate the record.
    BeforeInsert,
    /// After an insert statement succeeded.
    AfterInsert,
    /// Before a select statement is built.
    BeforeQuery,
    /// After a record was scanned from a row.
    AfterQuery,
    /// Before an update statement is built.
    BeforeUpdate,
    /// After an update statement succeeded.
    AfterUpdate,
    /// Before a delete statement is built.
    BeforeDelete,
    /// After a delete statement succeeded.
    AfterDelete,
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BeforeInsert => "BeforeInsert",
            Self::AfterInsert => "AfterInsert",
            Self::BeforeQuery => "BeforeQuery",
            Self::AfterQuery => "AfterQuery",
            Self::BeforeUpdate => "BeforeUpdate",
            Self::AfterUpdate => "AfterUpdate",
            Self::BeforeDelete => "BeforeDelete",
            Self::AfterDelete => "AfterDelete",
        };
        f.write_str(name)
    }
}

/// Lifecycle callbacks of a record type.
///
/// `before_insert` and `after_query` receive the record itself. The other
/// hooks are type-level: they run once per statement and see only the
/// session.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Debug, Default, Record)]
/// #[record(hooks)]
/// struct Account {
///     id: i64,
///     password: String,
/// }
///
/// #[async_trait::async_trait]
/// impl Hooks for Account {
///     async fn after_query(&mut self, _session: &mut Session) -> HookResult {
///         self.password = String::from("******");
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Hooks: Send + Sync {
    /// Runs for each record before it is inserted.
    async fn before_insert(&mut self, _session: &mut Session) -> HookResult {
        Ok(())
    }

    /// Runs for each record after it was scanned by `find`.
    async fn after_query(&mut self, _session: &mut Session) -> HookResult {
        Ok(())
    }

    /// Runs once before a select.
    async fn before_query(_session: &mut Session) -> HookResult {
        Ok(())
    }

    /// Runs once after a successful insert.
    async fn after_insert(_session: &mut Session) -> HookResult {
        Ok(())
    }

    /// Runs once before an update.
    async fn before_update(_session: &mut Session) -> HookResult {
        Ok(())
    }

    /// Runs once after a successful update.
    async fn after_update(_session: &mut Session) -> HookResult {
        Ok(())
    }

    /// Runs once before a delete.
    async fn before_delete(_session: &mut Session) -> HookResult {
        Ok(())
    }

    /// Runs once after a successful delete.
    async fn after_delete(_session: &mut Session) -> HookResult {
        Ok(())
    }
}

/// Type-erased dispatcher for the type-level hooks of one record type.
pub(crate) type HookFn = for<'a> fn(Hook, &'a mut Session) -> BoxFuture<'a, HookResult>;

/// Routes a type-level hook to `R`'s implementation.
pub(crate) fn dispatch<R: Hooks + 'static>(
    hook: Hook,
    session: &mut Session,
) -> BoxFuture<'_, HookResult> {
    match hook {
        Hook::BeforeQuery => R::before_query(session),
        Hook::AfterInsert => R::after_insert(session),
        Hook::BeforeUpdate => R::before_update(session),
        Hook::AfterUpdate => R::after_update(session),
        Hook::BeforeDelete => R::before_delete(session),
        Hook::AfterDelete => R::after_delete(session),
        // Instance hooks need a record; see `Session::run_record_hook`.
        Hook::BeforeInsert | Hook::AfterQuery => Box::pin(futures::future::ready(Ok(()))),
    }
}

impl Session {
    /// Runs a type-level hook through `hooks`.
    pub(crate) async fn run_hook(&mut self, hooks: HookFn, hook: Hook, record: &str) {
        let stash = self.stash();
        let result = hooks(hook, &mut *self).await;
        self.restore(stash);
        if let Err(e) = result {
            warn!(hook = %hook, record = record, error = %e, "hook failed");
        }
    }

    /// Runs a type-level hook of whatever record type the session holds.
    pub(crate) async fn run_held_hook(&mut self, hook: Hook) {
        let Some(table) = self.ref_table.clone() else {
            return;
        };
        self.run_hook(table.hooks, hook, &table.schema.name).await;
    }

    /// Runs an instance hook against one record.
    pub(crate) async fn run_record_hook<R: Record + Hooks>(&mut self, hook: Hook, record: &mut R) {
        let stash = self.stash();
        let result = match hook {
            Hook::BeforeInsert => record.before_insert(self).await,
            Hook::AfterQuery => record.after_query(self).await,
            _ => Ok(()),
        };
        self.restore(stash);
        if let Err(e) = result {
            warn!(hook = %hook, record = R::NAME, error = %e, "hook failed");
        }
    }
}
