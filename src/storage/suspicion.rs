//! Suspicion record store.
//!
//! The partial unique index on `(ip_address, reason) WHERE is_resolved = 0`
//! enforces at most one unresolved record per IP and reason. Creation goes
//! through `INSERT OR IGNORE`, so two racing detection cycles end with one row
//! and the loser sees `None`.

use chrono::{DateTime, Utc};
use log::debug;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::models::{from_millis, ReasonCode, SuspicionRecord};
use crate::error_handling::DatabaseError;

/// Separator placed between an existing description and appended context.
pub const DESCRIPTION_MERGE_SEPARATOR: &str = " | Also: ";

/// Fields for a new suspicion record.
#[derive(Debug, Clone)]
pub struct NewSuspicion<'a> {
    pub ip_address: &'a str,
    pub reason: ReasonCode,
    pub description: &'a str,
    pub request_count: i64,
    pub detected_at: DateTime<Utc>,
}

/// Result of escalating a record after both rules matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationOutcome {
    /// Reason changed to `suspicious_pattern` and the description was appended.
    Escalated,
    /// The IP already has an unresolved `suspicious_pattern` record; only the
    /// description was appended.
    AppendedOnly,
    /// The record no longer exists.
    Missing,
}

fn record_from_row(row: &SqliteRow) -> Result<SuspicionRecord, DatabaseError> {
    let reason: String = row.get("reason");
    Ok(SuspicionRecord {
        id: row.get("id"),
        ip_address: row.get("ip_address"),
        reason: reason.parse()?,
        description: row.get("description"),
        request_count: row.get("request_count"),
        detected_at: from_millis("suspicious_ips.detected_at_ms", row.get("detected_at_ms"))?,
        is_resolved: row.get("is_resolved"),
    })
}

/// Creates an unresolved record unless one already exists for the same IP
/// and reason. Returns the new id, or `None` if the IP was already flagged.
pub async fn insert_suspicion_if_absent(
    pool: &SqlitePool,
    new: &NewSuspicion<'_>,
) -> Result<Option<i64>, DatabaseError> {
    let row = sqlx::query(
        "INSERT OR IGNORE INTO suspicious_ips
             (ip_address, reason, description, request_count, detected_at_ms, is_resolved)
         VALUES (?, ?, ?, ?, ?, 0)
         RETURNING id",
    )
    .bind(new.ip_address)
    .bind(new.reason.as_str())
    .bind(new.description)
    .bind(new.request_count)
    .bind(new.detected_at.timestamp_millis())
    .fetch_optional(pool)
    .await
    .map_err(DatabaseError::SqlError)?;

    Ok(row.map(|r| r.get::<i64, _>("id")))
}

pub async fn get_suspicion(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<SuspicionRecord>, DatabaseError> {
    let row = sqlx::query(
        "SELECT id, ip_address, reason, description, request_count, detected_at_ms, is_resolved
         FROM suspicious_ips WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(DatabaseError::SqlError)?;

    row.as_ref().map(record_from_row).transpose()
}

/// Escalates record `id` to `suspicious_pattern`, appending `extra` to its
/// description.
///
/// Runs in a single transaction so a failed escalation leaves the record as
/// the detector created it.
pub async fn escalate_to_pattern(
    pool: &SqlitePool,
    id: i64,
    extra: &str,
) -> Result<EscalationOutcome, DatabaseError> {
    let mut tx = pool.begin().await.map_err(DatabaseError::SqlError)?;

    let Some(row) = sqlx::query("SELECT ip_address, description FROM suspicious_ips WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(DatabaseError::SqlError)?
    else {
        return Ok(EscalationOutcome::Missing);
    };
    let ip_address: String = row.get("ip_address");
    let description: String = row.get("description");
    let merged = format!("{description}{DESCRIPTION_MERGE_SEPARATOR}{extra}");

    // The partial unique index rejects the reason change when the IP already
    // has an open suspicious_pattern record, including one committed by
    // another process after this transaction started.
    let promoted = sqlx::query("UPDATE suspicious_ips SET reason = ?, description = ? WHERE id = ?")
        .bind(ReasonCode::SuspiciousPattern.as_str())
        .bind(&merged)
        .bind(id)
        .execute(&mut *tx)
        .await;

    let outcome = match promoted {
        Ok(_) => EscalationOutcome::Escalated,
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            debug!("{ip_address} already has an open suspicious_pattern record, appending only");
            sqlx::query("UPDATE suspicious_ips SET description = ? WHERE id = ?")
                .bind(&merged)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(DatabaseError::SqlError)?;
            EscalationOutcome::AppendedOnly
        }
        Err(e) => return Err(DatabaseError::SqlError(e)),
    };

    tx.commit().await.map_err(DatabaseError::SqlError)?;
    Ok(outcome)
}

/// Counts unresolved records per IP detected at or after `since`, keeping
/// IPs with at least `min_count` records.
pub async fn count_unresolved_by_ip_since(
    pool: &SqlitePool,
    since: DateTime<Utc>,
    min_count: i64,
) -> Result<Vec<(String, i64)>, DatabaseError> {
    let rows = sqlx::query(
        "SELECT ip_address, COUNT(*) AS suspicious_count
         FROM suspicious_ips
         WHERE detected_at_ms >= ? AND is_resolved = 0
         GROUP BY ip_address
         HAVING COUNT(*) >= ?
         ORDER BY suspicious_count DESC, ip_address",
    )
    .bind(since.timestamp_millis())
    .bind(min_count)
    .fetch_all(pool)
    .await
    .map_err(DatabaseError::SqlError)?;

    Ok(rows
        .iter()
        .map(|row| (row.get("ip_address"), row.get("suspicious_count")))
        .collect())
}

/// Deletes resolved records detected before `cutoff`.
pub async fn delete_resolved_before(
    pool: &SqlitePool,
    cutoff: DateTime<Utc>,
) -> Result<u64, DatabaseError> {
    let result =
        sqlx::query("DELETE FROM suspicious_ips WHERE is_resolved = 1 AND detected_at_ms < ?")
            .bind(cutoff.timestamp_millis())
            .execute(pool)
            .await
            .map_err(DatabaseError::SqlError)?;
    Ok(result.rows_affected())
}

/// Marks a record resolved. Returns false if no such record exists.
pub async fn resolve_suspicious_ip(pool: &SqlitePool, id: i64) -> Result<bool, DatabaseError> {
    let result = sqlx::query("UPDATE suspicious_ips SET is_resolved = 1 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .map_err(DatabaseError::SqlError)?;
    Ok(result.rows_affected() > 0)
}

/// Lists records, newest first. Resolved records are included only when asked.
pub async fn list_suspicious_ips(
    pool: &SqlitePool,
    include_resolved: bool,
) -> Result<Vec<SuspicionRecord>, DatabaseError> {
    let rows = sqlx::query(
        "SELECT id, ip_address, reason, description, request_count, detected_at_ms, is_resolved
         FROM suspicious_ips
         WHERE ? OR is_resolved = 0
         ORDER BY detected_at_ms DESC, id DESC",
    )
    .bind(include_resolved)
    .fetch_all(pool)
    .await
    .map_err(DatabaseError::SqlError)?;

    rows.iter().map(record_from_row).collect()
}
