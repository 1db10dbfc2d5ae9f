//! Lifecycle hooks: record mutation, error isolation, and hooks that query.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};

use common::memory_engine;
use keel::{async_trait, HookResult, Hooks, Record, Session};

// =============================================================================
// Instance hooks may change the record
// =============================================================================

#[derive(Debug, Default, Clone, PartialEq, Eq, Record)]
#[record(hooks)]
pub struct Account {
    #[column(tag = "PRIMARY KEY")]
    pub id: i64,
    pub email: String,
    pub password: String,
}

static ACCOUNT_AFTER_INSERT: AtomicUsize = AtomicUsize::new(0);

#[async_trait]
impl Hooks for Account {
    async fn before_insert(&mut self, _session: &mut Session) -> HookResult {
        self.email = self.email.to_lowercase();
        Ok(())
    }

    async fn after_query(&mut self, _session: &mut Session) -> HookResult {
        self.password = String::from("******");
        Ok(())
    }

    async fn after_insert(_session: &mut Session) -> HookResult {
        ACCOUNT_AFTER_INSERT.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_instance_hooks_mutate_records() {
    let engine = memory_engine().await;
    let mut s = engine.new_session();
    s.model::<Account>().unwrap().create_table().await.unwrap();

    s.insert(vec![
        Account {
            id: 1,
            email: String::from("Tom@Example.COM"),
            password: String::from("hunter2"),
        },
        Account {
            id: 2,
            email: String::from("SAM@example.com"),
            password: String::from("secret"),
        },
    ])
    .await
    .unwrap();
    // One statement, one after_insert.
    assert_eq!(ACCOUNT_AFTER_INSERT.load(Ordering::SeqCst), 1);

    let mut accounts: Vec<Account> = Vec::new();
    s.order_by("id").find(&mut accounts).await.unwrap();
    assert_eq!(accounts.len(), 2);
    assert_eq!(accounts[0].email, "tom@example.com");
    assert_eq!(accounts[1].email, "sam@example.com");
    assert!(accounts.iter().all(|a| a.password == "******"));

    // The stored password is untouched.
    let n = s
        .where_("password = ?", ["hunter2"])
        .count()
        .await
        .unwrap();
    assert_eq!(n, 1);
}

// =============================================================================
// A failing hook never fails the operation
// =============================================================================

#[derive(Debug, Default, Record)]
#[record(hooks)]
pub struct Fragile {
    pub id: i64,
}

static FRAGILE_AFTER_DELETE: AtomicUsize = AtomicUsize::new(0);

#[async_trait]
impl Hooks for Fragile {
    async fn before_insert(&mut self, _session: &mut Session) -> HookResult {
        anyhow::bail!("before_insert always fails")
    }

    async fn before_delete(_session: &mut Session) -> HookResult {
        Err(anyhow::anyhow!("before_delete always fails"))
    }

    async fn before_update(_session: &mut Session) -> HookResult {
        anyhow::bail!("before_update always fails")
    }

    async fn after_delete(_session: &mut Session) -> HookResult {
        FRAGILE_AFTER_DELETE.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_hook_errors_are_not_propagated() {
    let engine = memory_engine().await;
    let mut s = engine.new_session();
    s.model::<Fragile>().unwrap().create_table().await.unwrap();

    let n = s
        .insert(vec![Fragile { id: 1 }, Fragile { id: 2 }])
        .await
        .unwrap();
    assert_eq!(n, 2);

    let n = s
        .where_("id = ?", [1])
        .update_pairs([("id", 10)])
        .await
        .unwrap();
    assert_eq!(n, 1);

    let n = s.where_("id = ?", [2]).delete().await.unwrap();
    assert_eq!(n, 1);
    assert_eq!(FRAGILE_AFTER_DELETE.load(Ordering::SeqCst), 1);
    assert_eq!(s.count().await.unwrap(), 1);
}

// =============================================================================
// Hooks may run their own statements
// =============================================================================

#[derive(Debug, Default, Record)]
pub struct AuditLog {
    pub event: String,
}

#[derive(Debug, Default, Record)]
#[record(hooks)]
pub struct Watched {
    pub id: i64,
}

#[async_trait]
impl Hooks for Watched {
    async fn before_query(session: &mut Session) -> HookResult {
        session
            .model::<AuditLog>()?
            .insert(vec![AuditLog {
                event: String::from("query"),
            }])
            .await?;
        Ok(())
    }

    async fn before_delete(session: &mut Session) -> HookResult {
        let watched = session.model::<Watched>()?.count().await?;
        session
            .insert(vec![AuditLog {
                event: format!("delete from {watched}"),
            }])
            .await?;
        Ok(())
    }
}

#[tokio::test]
async fn test_hooks_do_not_disturb_pending_statement() {
    let engine = memory_engine().await;
    let mut s = engine.new_session();
    s.model::<AuditLog>().unwrap().create_table().await.unwrap();
    s.model::<Watched>().unwrap().create_table().await.unwrap();
    s.insert(vec![Watched { id: 1 }, Watched { id: 2 }, Watched { id: 3 }])
        .await
        .unwrap();

    let mut found: Vec<Watched> = Vec::new();
    s.where_("id = ?", [2]).find(&mut found).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, 2);
    assert_eq!(s.ref_table().unwrap().name, "Watched");

    let n = s.where_("id > ?", [1]).delete().await.unwrap();
    assert_eq!(n, 2);
    assert_eq!(s.ref_table().unwrap().name, "Watched");
    assert_eq!(s.count().await.unwrap(), 1);

    let mut log: Vec<AuditLog> = Vec::new();
    s.order_by("rowid").find(&mut log).await.unwrap();
    let events: Vec<&str> = log.iter().map(|e| e.event.as_str()).collect();
    assert_eq!(events, vec!["query", "delete from 3"]);
}

#[tokio::test]
async fn test_hooks_share_the_transaction() {
    let engine = memory_engine().await;
    let mut s = engine.new_session();
    s.model::<AuditLog>().unwrap().create_table().await.unwrap();
    s.model::<Watched>().unwrap().create_table().await.unwrap();

    s.begin().await.unwrap();
    let mut found: Vec<Watched> = Vec::new();
    s.find(&mut found).await.unwrap();
    s.rollback().await.unwrap();

    // The audit row written by before_query was rolled back with the rest.
    assert_eq!(s.model::<AuditLog>().unwrap().count().await.unwrap(), 0);
}
