//! Request log store.
//!
//! The host application appends one row per request; the detectors only read.
//! Aggregations are pushed down to SQLite so a detection cycle never loads the
//! whole window into memory.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use super::models::{from_millis, RequestLogEntry};
use crate::error_handling::DatabaseError;

/// Per-IP request count inside a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpRequestCount {
    pub ip_address: String,
    pub request_count: i64,
}

/// Per-(IP, path) access count for sensitive paths inside a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathAccessCount {
    pub ip_address: String,
    pub path: String,
    pub access_count: i64,
}

/// Appends one request to the log.
pub async fn append_request_log(
    pool: &SqlitePool,
    ip_address: &str,
    path: &str,
    timestamp: DateTime<Utc>,
) -> Result<i64, DatabaseError> {
    let row = sqlx::query(
        "INSERT INTO request_logs (ip_address, timestamp_ms, path) VALUES (?, ?, ?) RETURNING id",
    )
    .bind(ip_address)
    .bind(timestamp.timestamp_millis())
    .bind(path)
    .fetch_one(pool)
    .await
    .map_err(DatabaseError::SqlError)?;

    Ok(row.get::<i64, _>("id"))
}

/// Pushes `substr(path, 1, length(p)) = p OR ...` for each prefix.
///
/// `LIKE` is case-insensitive for ASCII in SQLite, so prefixes are compared
/// with `substr` instead.
fn push_prefix_filter(builder: &mut QueryBuilder<'_, Sqlite>, prefixes: &[String]) {
    builder.push(" AND (");
    for (i, prefix) in prefixes.iter().enumerate() {
        if i > 0 {
            builder.push(" OR ");
        }
        builder
            .push("substr(path, 1, length(")
            .push_bind(prefix.clone())
            .push(")) = ")
            .push_bind(prefix.clone());
    }
    builder.push(")");
}

/// Returns log entries with `timestamp >= since`, newest first, optionally
/// restricted to paths starting with one of `path_prefixes`.
///
/// An empty prefix slice matches nothing.
pub async fn query_request_logs(
    pool: &SqlitePool,
    since: DateTime<Utc>,
    path_prefixes: Option<&[String]>,
    limit: Option<i64>,
) -> Result<Vec<RequestLogEntry>, DatabaseError> {
    if matches!(path_prefixes, Some(p) if p.is_empty()) {
        return Ok(Vec::new());
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT ip_address, timestamp_ms, path FROM request_logs WHERE timestamp_ms >= ",
    );
    builder.push_bind(since.timestamp_millis());
    if let Some(prefixes) = path_prefixes {
        push_prefix_filter(&mut builder, prefixes);
    }
    builder.push(" ORDER BY timestamp_ms DESC, id DESC");
    if let Some(limit) = limit {
        builder.push(" LIMIT ").push_bind(limit);
    }

    let rows = builder
        .build()
        .fetch_all(pool)
        .await
        .map_err(DatabaseError::SqlError)?;

    rows.iter()
        .map(|row| {
            Ok(RequestLogEntry {
                ip_address: row.get("ip_address"),
                timestamp: from_millis("request_logs.timestamp_ms", row.get("timestamp_ms"))?,
                path: row.get("path"),
            })
        })
        .collect()
}

/// Counts requests per IP since `since`, keeping IPs with strictly more than
/// `threshold` requests, highest count first.
pub async fn count_requests_by_ip(
    pool: &SqlitePool,
    since: DateTime<Utc>,
    threshold: i64,
) -> Result<Vec<IpRequestCount>, DatabaseError> {
    let rows = sqlx::query(
        "SELECT ip_address, COUNT(*) AS request_count
         FROM request_logs
         WHERE timestamp_ms >= ?
         GROUP BY ip_address
         HAVING COUNT(*) > ?
         ORDER BY request_count DESC, ip_address",
    )
    .bind(since.timestamp_millis())
    .bind(threshold)
    .fetch_all(pool)
    .await
    .map_err(DatabaseError::SqlError)?;

    Ok(rows
        .iter()
        .map(|row| IpRequestCount {
            ip_address: row.get("ip_address"),
            request_count: row.get("request_count"),
        })
        .collect())
}

/// Counts accesses per (IP, path) since `since` for paths under any of
/// `prefixes`, highest count first.
pub async fn count_sensitive_accesses(
    pool: &SqlitePool,
    since: DateTime<Utc>,
    prefixes: &[String],
) -> Result<Vec<PathAccessCount>, DatabaseError> {
    if prefixes.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT ip_address, path, COUNT(*) AS access_count FROM request_logs WHERE timestamp_ms >= ",
    );
    builder.push_bind(since.timestamp_millis());
    push_prefix_filter(&mut builder, prefixes);
    builder.push(" GROUP BY ip_address, path ORDER BY access_count DESC, ip_address, path");

    let rows = builder
        .build()
        .fetch_all(pool)
        .await
        .map_err(DatabaseError::SqlError)?;

    Ok(rows
        .iter()
        .map(|row| PathAccessCount {
            ip_address: row.get("ip_address"),
            path: row.get("path"),
            access_count: row.get("access_count"),
        })
        .collect())
}
