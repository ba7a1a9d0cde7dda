//! High request volume detection.

use std::time::Duration;

use chrono::{DateTime, Utc};
use log::warn;
use sqlx::SqlitePool;

use crate::error_handling::DatabaseError;
use crate::storage::{count_requests_by_ip, insert_suspicion_if_absent, NewSuspicion, ReasonCode};
use crate::utils::describe_window;

/// An IP newly flagged for high request volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeFinding {
    pub ip_address: String,
    pub request_count: i64,
    /// Id of the `high_volume` suspicion record created for this finding
    pub record_id: i64,
}

/// Flags IPs whose request count inside the window exceeds a threshold.
#[derive(Debug, Clone)]
pub struct VolumeDetector {
    pool: SqlitePool,
    threshold: i64,
    window: Duration,
}

impl VolumeDetector {
    /// `window` is only used to phrase record descriptions; the scan itself
    /// starts at whatever `window_start` `detect` is given.
    pub fn new(pool: SqlitePool, threshold: i64, window: Duration) -> Self {
        Self {
            pool,
            threshold,
            window,
        }
    }

    /// Scans requests at or after `window_start`.
    ///
    /// IPs that already have an unresolved `high_volume` record are skipped,
    /// so re-running against unchanged data returns nothing.
    pub async fn detect(
        &self,
        window_start: DateTime<Utc>,
    ) -> Result<Vec<VolumeFinding>, DatabaseError> {
        let detected_at = Utc::now();
        let counts = count_requests_by_ip(&self.pool, window_start, self.threshold).await?;

        let mut findings = Vec::new();
        for entry in counts {
            let description = format!(
                "High request volume: {} requests in {} (threshold: {})",
                entry.request_count,
                describe_window(self.window),
                self.threshold
            );
            let inserted = insert_suspicion_if_absent(
                &self.pool,
                &NewSuspicion {
                    ip_address: &entry.ip_address,
                    reason: ReasonCode::HighVolume,
                    description: &description,
                    request_count: entry.request_count,
                    detected_at,
                },
            )
            .await?;

            match inserted {
                Some(record_id) => {
                    warn!(
                        "Detected high volume IP: {} with {} requests",
                        entry.ip_address, entry.request_count
                    );
                    findings.push(VolumeFinding {
                        ip_address: entry.ip_address,
                        request_count: entry.request_count,
                        record_id,
                    });
                }
                None => log::debug!(
                    "{} already has an unresolved high_volume record, skipping",
                    entry.ip_address
                ),
            }
        }

        Ok(findings)
    }
}
