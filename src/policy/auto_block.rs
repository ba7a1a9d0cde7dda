//! Promotion of repeat offenders to the block list.

use chrono::{DateTime, Utc};
use log::{info, warn};
use sqlx::SqlitePool;

use crate::config::AutoBlockSettings;
use crate::error_handling::DatabaseError;
use crate::storage::{count_unresolved_by_ip_since, insert_block_if_absent};
use crate::utils::days_before;

/// Blocks every IP with at least `count_threshold` unresolved suspicion
/// records in the last `lookback_days` days.
///
/// Already-blocked IPs are left alone, so running this repeatedly is safe.
/// Returns the number of newly created block entries.
pub async fn auto_block_repeat_offenders(
    pool: &SqlitePool,
    settings: &AutoBlockSettings,
) -> Result<usize, DatabaseError> {
    auto_block_repeat_offenders_at(pool, settings, Utc::now()).await
}

pub async fn auto_block_repeat_offenders_at(
    pool: &SqlitePool,
    settings: &AutoBlockSettings,
    now: DateTime<Utc>,
) -> Result<usize, DatabaseError> {
    let since = days_before(now, settings.lookback_days);
    let offenders = count_unresolved_by_ip_since(pool, since, settings.count_threshold).await?;

    let mut blocked_count = 0;
    for (ip_address, suspicious_count) in offenders {
        let reason = format!(
            "Automatically blocked: flagged as suspicious {} times in the last {} days",
            suspicious_count, settings.lookback_days
        );
        if insert_block_if_absent(pool, &ip_address, Some(&reason), now).await? {
            warn!("Auto-blocked IP: {ip_address} ({suspicious_count} suspicious records)");
            blocked_count += 1;
        }
    }

    info!("Auto-blocked {blocked_count} IPs");
    Ok(blocked_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_helpers::{count_rows, create_test_pool, insert_suspicion_at};
    use crate::storage::{is_blocked, list_blocked_ips, ReasonCode};
    use chrono::Duration;

    const REASONS: [ReasonCode; 4] = [
        ReasonCode::HighVolume,
        ReasonCode::SensitiveAccess,
        ReasonCode::MultipleSensitive,
        ReasonCode::SuspiciousPattern,
    ];

    async fn flag(pool: &SqlitePool, ip: &str, times: usize, at: DateTime<Utc>) {
        for reason in REASONS.iter().take(times) {
            insert_suspicion_at(pool, ip, *reason, at, false).await;
        }
    }

    #[tokio::test]
    async fn test_blocks_ip_at_threshold_once() {
        let pool = create_test_pool().await;
        let now = Utc::now();
        flag(&pool, "198.51.100.7", 3, now - Duration::days(1)).await;

        let settings = AutoBlockSettings::default();
        let blocked = auto_block_repeat_offenders_at(&pool, &settings, now)
            .await
            .unwrap();
        assert_eq!(blocked, 1);

        let entries = list_blocked_ips(&pool).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].reason.as_deref(),
            Some("Automatically blocked: flagged as suspicious 3 times in the last 7 days")
        );

        // Second run finds the same offender but creates nothing
        let blocked = auto_block_repeat_offenders_at(&pool, &settings, now)
            .await
            .unwrap();
        assert_eq!(blocked, 0);
        assert_eq!(count_rows(&pool, "blocked_ips").await, 1);
    }

    #[tokio::test]
    async fn test_below_threshold_is_never_blocked() {
        let pool = create_test_pool().await;
        let now = Utc::now();
        flag(&pool, "198.51.100.8", 2, now).await;

        let blocked = auto_block_repeat_offenders_at(&pool, &AutoBlockSettings::default(), now)
            .await
            .unwrap();
        assert_eq!(blocked, 0);
        assert!(!is_blocked(&pool, "198.51.100.8").await.unwrap());
    }

    #[tokio::test]
    async fn test_old_and_resolved_records_do_not_count() {
        let pool = create_test_pool().await;
        let now = Utc::now();
        insert_suspicion_at(&pool, "198.51.100.9", ReasonCode::HighVolume, now, false).await;
        insert_suspicion_at(&pool, "198.51.100.9", ReasonCode::SensitiveAccess, now, true).await;
        insert_suspicion_at(
            &pool,
            "198.51.100.9",
            ReasonCode::MultipleSensitive,
            now - Duration::days(8),
            false,
        )
        .await;

        let blocked = auto_block_repeat_offenders_at(&pool, &AutoBlockSettings::default(), now)
            .await
            .unwrap();
        assert_eq!(blocked, 0);
    }

    #[tokio::test]
    async fn test_existing_manual_block_is_kept() {
        let pool = create_test_pool().await;
        let now = Utc::now();
        insert_block_if_absent(&pool, "198.51.100.7", Some("manual"), now)
            .await
            .unwrap();
        flag(&pool, "198.51.100.7", 4, now).await;

        let blocked = auto_block_repeat_offenders_at(&pool, &AutoBlockSettings::default(), now)
            .await
            .unwrap();
        assert_eq!(blocked, 0);
        let entries = list_blocked_ips(&pool).await.unwrap();
        assert_eq!(entries[0].reason.as_deref(), Some("manual"));
    }
}
