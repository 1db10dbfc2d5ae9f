//! Transaction state machine and the scoped transaction wrapper.

mod common;

use std::panic::AssertUnwindSafe;

use common::{memory_engine, student, Student};
use futures::FutureExt;
use keel::{Engine, Error};

async fn student_count(engine: &Engine) -> i64 {
    let mut s = engine.new_session();
    s.model::<Student>().unwrap();
    s.count().await.unwrap()
}

async fn engine_with_table() -> Engine {
    let engine = memory_engine().await;
    let mut s = engine.new_session();
    s.model::<Student>().unwrap().create_table().await.unwrap();
    engine
}

#[tokio::test]
async fn test_manual_commit() {
    let engine = engine_with_table().await;
    let mut s = engine.new_session();

    s.begin().await.unwrap();
    s.insert(vec![student("Tom", 18, "CAU")]).await.unwrap();
    s.commit().await.unwrap();
    assert!(!s.in_transaction());
    assert_eq!(student_count(&engine).await, 1);
}

#[tokio::test]
async fn test_manual_rollback() {
    let engine = engine_with_table().await;
    let mut s = engine.new_session();

    s.begin().await.unwrap();
    s.insert(vec![student("Tom", 18, "CAU")]).await.unwrap();
    assert_eq!(s.count().await.unwrap(), 1);
    s.rollback().await.unwrap();
    assert!(!s.in_transaction());
    assert_eq!(student_count(&engine).await, 0);
}

#[tokio::test]
async fn test_begin_twice_fails() {
    let engine = engine_with_table().await;
    let mut s = engine.new_session();

    s.begin().await.unwrap();
    assert!(matches!(s.begin().await, Err(Error::TransactionActive)));
    assert!(s.in_transaction());
    s.rollback().await.unwrap();
    assert!(matches!(s.rollback().await, Err(Error::NoTransaction)));
}

#[tokio::test]
async fn test_wrapper_error_rolls_back() {
    let engine = engine_with_table().await;

    let result = engine
        .transaction(|tx| {
            Box::pin(async move {
                tx.insert(vec![student("Tom", 18, "CAU")]).await?;
                tx.first::<Student>().await?;
                tx.insert(vec![student("Tom", 19, "GU")]).await?;
                Ok(())
            })
        })
        .await;

    assert!(matches!(result, Err(Error::Database(_))));
    assert_eq!(student_count(&engine).await, 0);
}

#[tokio::test]
async fn test_wrapper_returns_value() {
    let engine = engine_with_table().await;

    let inserted = engine
        .transaction(|tx| {
            Box::pin(async move {
                tx.insert(vec![student("Tom", 18, "CAU"), student("Sam", 25, "GU")])
                    .await
            })
        })
        .await
        .unwrap();

    assert_eq!(inserted, 2);
    assert_eq!(student_count(&engine).await, 2);
}

#[tokio::test]
async fn test_panic_rolls_back_and_resumes() {
    let engine = engine_with_table().await;
    let mut s = engine.new_session();

    let outcome = AssertUnwindSafe(s.transaction::<(), _>(|tx| {
        Box::pin(async move {
            tx.insert(vec![student("Tom", 18, "CAU")]).await?;
            panic!("boom")
        })
    }))
    .catch_unwind()
    .await;

    let payload = outcome.expect_err("panic should propagate");
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"boom"));
    assert!(!s.in_transaction());
    assert_eq!(student_count(&engine).await, 0);
}

#[tokio::test]
async fn test_panic_before_future_rolls_back() {
    let engine = engine_with_table().await;
    let mut s = engine.new_session();

    let outcome = AssertUnwindSafe(s.transaction::<(), _>(|tx| {
        if tx.in_transaction() {
            panic!("early boom");
        }
        Box::pin(async { Ok(()) })
    }))
    .catch_unwind()
    .await;

    let payload = outcome.expect_err("panic should propagate");
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"early boom"));
    assert!(!s.in_transaction());

    // The connection was released, so the session is usable again.
    s.model::<Student>().unwrap();
    s.insert(vec![student("Tom", 18, "CAU")]).await.unwrap();
    assert_eq!(student_count(&engine).await, 1);
}

#[tokio::test]
async fn test_memory_transaction_holds_the_only_connection() {
    let engine = engine_with_table().await;
    let mut a = engine.new_session();
    a.model::<Student>().unwrap();
    a.begin().await.unwrap();
    a.insert(vec![student("Tom", 18, "CAU")]).await.unwrap();

    let mut b = engine.new_session();
    b.model::<Student>().unwrap();
    let waited = tokio::time::timeout(std::time::Duration::from_millis(200), b.count()).await;
    assert!(waited.is_err());

    a.commit().await.unwrap();
    assert_eq!(student_count(&engine).await, 1);
}
