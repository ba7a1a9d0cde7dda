//! Block list store.
//!
//! `ip_address` is unique; inserting an IP that is already blocked is a no-op.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use super::models::{from_millis, BlockEntry};
use crate::error_handling::DatabaseError;

/// Blocks `ip_address` unless it is already blocked.
///
/// Returns true if a new entry was created.
pub async fn insert_block_if_absent(
    pool: &SqlitePool,
    ip_address: &str,
    reason: Option<&str>,
    created_at: DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO blocked_ips (ip_address, created_at_ms, reason) VALUES (?, ?, ?)",
    )
    .bind(ip_address)
    .bind(created_at.timestamp_millis())
    .bind(reason)
    .execute(pool)
    .await
    .map_err(DatabaseError::SqlError)?;

    Ok(result.rows_affected() == 1)
}

pub async fn is_blocked(pool: &SqlitePool, ip_address: &str) -> Result<bool, DatabaseError> {
    let exists: i64 =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM blocked_ips WHERE ip_address = ?)")
            .bind(ip_address)
            .fetch_one(pool)
            .await
            .map_err(DatabaseError::SqlError)?;
    Ok(exists != 0)
}

/// Removes `ip_address` from the block list. Returns false if it was not blocked.
pub async fn delete_block(pool: &SqlitePool, ip_address: &str) -> Result<bool, DatabaseError> {
    let result = sqlx::query("DELETE FROM blocked_ips WHERE ip_address = ?")
        .bind(ip_address)
        .execute(pool)
        .await
        .map_err(DatabaseError::SqlError)?;
    Ok(result.rows_affected() > 0)
}

/// Lists all block entries, oldest first.
pub async fn list_blocked_ips(pool: &SqlitePool) -> Result<Vec<BlockEntry>, DatabaseError> {
    let rows = sqlx::query(
        "SELECT ip_address, created_at_ms, reason FROM blocked_ips ORDER BY created_at_ms, id",
    )
    .fetch_all(pool)
    .await
    .map_err(DatabaseError::SqlError)?;

    rows.iter()
        .map(|row| {
            Ok(BlockEntry {
                ip_address: row.get("ip_address"),
                created_at: from_millis("blocked_ips.created_at_ms", row.get("created_at_ms"))?,
                reason: row.get("reason"),
            })
        })
        .collect()
}
