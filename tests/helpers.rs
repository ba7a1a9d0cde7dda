// Shared test helpers for database setup and test data creation.
//
// This module provides common utilities used across multiple test files to reduce duplication.

use std::path::Path;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use ip_sentinel::{append_request_log, init_db_pool_with_path, run_migrations};

/// Creates a test database pool with migrations applied.
/// Uses an in-memory database for fast test execution.
#[allow(dead_code)] // Used by other test files
pub async fn create_test_pool() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create test database pool");
    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

/// Creates a file-backed pool. Use this when several tasks write at once;
/// shared-cache in-memory databases fail concurrent writers with SQLITE_LOCKED.
#[allow(dead_code)]
pub async fn create_test_pool_with_path(db_path: &Path) -> SqlitePool {
    let pool = init_db_pool_with_path(db_path)
        .await
        .expect("Failed to create test database");
    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    (*pool).clone()
}

/// Appends `count` requests from `ip` for `path` at `timestamp`.
#[allow(dead_code)]
pub async fn log_requests(
    pool: &SqlitePool,
    ip: &str,
    path: &str,
    count: usize,
    timestamp: DateTime<Utc>,
) {
    for _ in 0..count {
        append_request_log(pool, ip, path, timestamp)
            .await
            .expect("Failed to append request log");
    }
}
