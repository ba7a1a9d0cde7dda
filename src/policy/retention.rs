//! Purging of resolved suspicion records.

use chrono::{DateTime, Utc};
use log::info;
use sqlx::SqlitePool;

use crate::error_handling::DatabaseError;
use crate::storage::delete_resolved_before;
use crate::utils::days_before;

/// Deletes resolved records detected more than `max_age_days` days ago.
/// Unresolved records are never touched.
pub async fn sweep_resolved(pool: &SqlitePool, max_age_days: i64) -> Result<u64, DatabaseError> {
    sweep_resolved_at(pool, max_age_days, Utc::now()).await
}

pub async fn sweep_resolved_at(
    pool: &SqlitePool,
    max_age_days: i64,
    now: DateTime<Utc>,
) -> Result<u64, DatabaseError> {
    let deleted = delete_resolved_before(pool, days_before(now, max_age_days)).await?;
    info!("Cleaned up {deleted} old suspicious IP records");
    Ok(deleted)
}
