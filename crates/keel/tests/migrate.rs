//! Schema-diff migrations against a database file.

mod common;

use common::init_tracing;
use keel::{Engine, EngineConfig, Error, MigrationPlan, SqlValue};

mod v1 {
    use keel::Record;

    #[derive(Debug, Default, Clone, PartialEq, Eq, Record)]
    pub struct User {
        #[column(tag = "PRIMARY KEY")]
        pub name: String,
        pub age: i32,
    }
}

mod v2 {
    use keel::Record;

    #[derive(Debug, Default, Clone, PartialEq, Eq, Record)]
    pub struct User {
        #[column(tag = "PRIMARY KEY")]
        pub name: String,
        pub email: String,
    }
}

async fn file_engine(dir: &tempfile::TempDir) -> Engine {
    init_tracing();
    let path = dir.path().join("keel.db");
    let config = EngineConfig::new("sqlite", path.to_string_lossy()).max_connections(2);
    Engine::from_config(&config)
        .await
        .expect("Failed to open database file")
}

#[tokio::test]
async fn test_migrate_creates_missing_table() {
    let dir = tempfile::tempdir().unwrap();
    let engine = file_engine(&dir).await;

    let plan = engine.migrate::<v1::User>().await.unwrap();
    assert!(plan.created);
    assert!(plan.added.is_empty());

    let mut s = engine.new_session();
    s.model::<v1::User>().unwrap();
    assert!(s.has_table().await.unwrap());
    assert_eq!(s.live_columns().await.unwrap(), vec!["name", "age"]);

    // A second run finds nothing to do.
    let plan = engine.migrate::<v1::User>().await.unwrap();
    assert_eq!(plan, MigrationPlan::default());
    assert!(plan.is_empty());
    engine.close().await;
}

#[tokio::test]
async fn test_migrate_adds_and_drops_columns() {
    let dir = tempfile::tempdir().unwrap();
    let engine = file_engine(&dir).await;
    engine.migrate::<v1::User>().await.unwrap();

    let mut s = engine.new_session();
    s.insert(vec![
        v1::User {
            name: String::from("Tom"),
            age: 18,
        },
        v1::User {
            name: String::from("Sam"),
            age: 25,
        },
    ])
    .await
    .unwrap();

    let plan = engine.migrate::<v2::User>().await.unwrap();
    assert!(!plan.created);
    assert_eq!(plan.added, vec!["email"]);
    assert_eq!(plan.dropped, vec!["age"]);

    let mut s = engine.new_session();
    s.model::<v2::User>().unwrap();
    assert_eq!(s.live_columns().await.unwrap(), vec!["name", "email"]);
    assert!(!s.in_transaction());

    let mut users: Vec<v2::User> = Vec::new();
    s.order_by("name").find(&mut users).await.unwrap();
    let names: Vec<&str> = users.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["Sam", "Tom"]);
    assert!(users.iter().all(|u| u.email.is_empty()));

    let n = s
        .where_("name = ?", ["Tom"])
        .update_pairs([("email", "tom@example.com")])
        .await
        .unwrap();
    assert_eq!(n, 1);
    engine.close().await;
}

#[tokio::test]
async fn test_failed_migration_rolls_back_added_columns() {
    let dir = tempfile::tempdir().unwrap();
    let engine = file_engine(&dir).await;
    engine.migrate::<v1::User>().await.unwrap();

    let mut s = engine.new_session();
    s.insert(vec![v1::User {
        name: String::from("Tom"),
        age: 18,
    }])
    .await
    .unwrap();
    // Occupies the name the column rebuild copies into.
    s.raw("CREATE TABLE tmp_User (name TEXT)", Vec::<SqlValue>::new())
        .exec()
        .await
        .unwrap();

    // v2 adds email before the rebuild that drops age fails.
    let result = engine.migrate::<v2::User>().await;
    assert!(result.is_err());

    let mut s = engine.new_session();
    s.model::<v1::User>().unwrap();
    assert_eq!(s.live_columns().await.unwrap(), vec!["name", "age"]);
    assert_eq!(s.count().await.unwrap(), 1);
    engine.close().await;
}

#[tokio::test]
async fn test_migrate_survives_reconnect() {
    let dir = tempfile::tempdir().unwrap();
    {
        let engine = file_engine(&dir).await;
        engine.migrate::<v1::User>().await.unwrap();
        engine.close().await;
    }

    let engine = file_engine(&dir).await;
    let plan = engine.migrate::<v1::User>().await.unwrap();
    assert!(plan.is_empty());
    engine.close().await;
}

#[tokio::test]
async fn test_migrate_inside_transaction_fails() {
    let dir = tempfile::tempdir().unwrap();
    let engine = file_engine(&dir).await;
    let mut s = engine.new_session();

    s.begin().await.unwrap();
    let err = s.migrate::<v1::User>().await;
    assert!(matches!(err, Err(Error::TransactionActive)));
    s.rollback().await.unwrap();
    engine.close().await;
}
