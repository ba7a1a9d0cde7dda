//! Shared test helpers for storage and pipeline tests.
//!
//! This module provides common utilities for database setup and test data creation.

#[cfg(test)]
use chrono::{DateTime, Utc};
#[cfg(test)]
use sqlx::{Row, SqlitePool};

#[cfg(test)]
use crate::storage::run_migrations;
#[cfg(test)]
use crate::storage::ReasonCode;

/// Creates a test database pool with migrations applied.
/// Uses an in-memory database for fast test execution.
#[cfg(test)]
pub async fn create_test_pool() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create test database pool");
    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

/// Inserts `count` identical request log rows in one statement batch.
#[cfg(test)]
pub async fn insert_requests(
    pool: &SqlitePool,
    ip: &str,
    path: &str,
    count: usize,
    timestamp: DateTime<Utc>,
) {
    let mut tx = pool.begin().await.expect("begin");
    for _ in 0..count {
        sqlx::query("INSERT INTO request_logs (ip_address, timestamp_ms, path) VALUES (?, ?, ?)")
            .bind(ip)
            .bind(timestamp.timestamp_millis())
            .bind(path)
            .execute(&mut *tx)
            .await
            .expect("Failed to insert test request log");
    }
    tx.commit().await.expect("commit");
}

/// Inserts a suspicion record directly, bypassing duplicate suppression
/// for resolved rows.
#[cfg(test)]
pub async fn insert_suspicion_at(
    pool: &SqlitePool,
    ip: &str,
    reason: ReasonCode,
    detected_at: DateTime<Utc>,
    is_resolved: bool,
) -> i64 {
    sqlx::query(
        "INSERT INTO suspicious_ips (ip_address, reason, description, request_count, detected_at_ms, is_resolved)
         VALUES (?, ?, ?, ?, ?, ?)
         RETURNING id",
    )
    .bind(ip)
    .bind(reason.as_str())
    .bind(format!("test record for {ip}"))
    .bind(1i64)
    .bind(detected_at.timestamp_millis())
    .bind(is_resolved)
    .fetch_one(pool)
    .await
    .expect("Failed to insert test suspicion record")
    .get::<i64, _>(0)
}

#[cfg(test)]
pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .expect("Failed to count rows")
}
