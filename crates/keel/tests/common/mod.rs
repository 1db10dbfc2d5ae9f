//! Shared helpers for keel integration tests.

#![allow(dead_code)]

use keel::{Engine, Record};

/// Routes `tracing` output to the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Opens a fresh in-memory database.
pub async fn memory_engine() -> Engine {
    init_tracing();
    Engine::connect("sqlite3", ":memory:")
        .await
        .expect("Failed to open in-memory database")
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Record)]
pub struct Student {
    #[column(tag = "PRIMARY KEY")]
    pub name: String,
    pub age: i32,
    pub school: String,
}

pub fn student(name: &str, age: i32, school: &str) -> Student {
    Student {
        name: name.to_string(),
        age,
        school: school.to_string(),
    }
}
