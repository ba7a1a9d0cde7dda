//! Sensitive path access detection.

use chrono::{DateTime, Utc};
use log::warn;
use sqlx::SqlitePool;

use crate::error_handling::DatabaseError;
use crate::storage::{
    count_sensitive_accesses, insert_suspicion_if_absent, NewSuspicion, PathAccessCount,
    ReasonCode,
};

/// An IP newly flagged for touching sensitive paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensitiveFinding {
    pub ip_address: String,
    /// `sensitive_access` for one distinct path, `multiple_sensitive` otherwise
    pub reason: ReasonCode,
    /// Distinct paths, most accessed first
    pub paths: Vec<String>,
    pub total_accesses: i64,
    pub description: String,
    pub record_id: i64,
}

/// Accesses by one IP, accumulated from per-(IP, path) counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct IpAccessSummary {
    ip_address: String,
    paths: Vec<String>,
    total_accesses: i64,
}

impl IpAccessSummary {
    fn reason(&self) -> ReasonCode {
        if self.paths.len() > 1 {
            ReasonCode::MultipleSensitive
        } else {
            ReasonCode::SensitiveAccess
        }
    }

    fn description(&self) -> String {
        if self.paths.len() > 1 {
            format!(
                "Accessed multiple sensitive paths: {}. Total accesses: {}",
                self.paths.join(", "),
                self.total_accesses
            )
        } else {
            format!(
                "Accessed sensitive path: {}. Total accesses: {}",
                self.paths.first().map(String::as_str).unwrap_or_default(),
                self.total_accesses
            )
        }
    }
}

/// Re-groups per-(IP, path) counts by IP, keeping first-seen order for both
/// IPs and paths.
fn summarize_by_ip(counts: Vec<PathAccessCount>) -> Vec<IpAccessSummary> {
    let mut summaries: Vec<IpAccessSummary> = Vec::new();
    for count in counts {
        let idx = match summaries
            .iter()
            .position(|s| s.ip_address == count.ip_address)
        {
            Some(idx) => idx,
            None => {
                summaries.push(IpAccessSummary {
                    ip_address: count.ip_address.clone(),
                    ..Default::default()
                });
                summaries.len() - 1
            }
        };
        let summary = &mut summaries[idx];
        if !summary.paths.contains(&count.path) {
            summary.paths.push(count.path);
        }
        summary.total_accesses += count.access_count;
    }
    summaries
}

/// Flags IPs that requested any path under the configured sensitive prefixes.
#[derive(Debug, Clone)]
pub struct SensitivePathDetector {
    pool: SqlitePool,
}

impl SensitivePathDetector {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Scans requests at or after `window_start` whose path starts with one
    /// of `sensitive_path_prefixes`.
    ///
    /// IPs that already have an unresolved record with the computed reason
    /// are skipped.
    pub async fn detect(
        &self,
        window_start: DateTime<Utc>,
        sensitive_path_prefixes: &[String],
    ) -> Result<Vec<SensitiveFinding>, DatabaseError> {
        let detected_at = Utc::now();
        let counts =
            count_sensitive_accesses(&self.pool, window_start, sensitive_path_prefixes).await?;

        let mut findings = Vec::new();
        for summary in summarize_by_ip(counts) {
            let reason = summary.reason();
            let description = summary.description();

            let inserted = insert_suspicion_if_absent(
                &self.pool,
                &NewSuspicion {
                    ip_address: &summary.ip_address,
                    reason,
                    description: &description,
                    request_count: summary.total_accesses,
                    detected_at,
                },
            )
            .await?;

            let Some(record_id) = inserted else {
                log::debug!(
                    "{} already has an unresolved {} record, skipping",
                    summary.ip_address,
                    reason
                );
                continue;
            };

            warn!(
                "Detected sensitive path access from IP: {} - {}",
                summary.ip_address, description
            );
            findings.push(SensitiveFinding {
                ip_address: summary.ip_address,
                reason,
                paths: summary.paths,
                total_accesses: summary.total_accesses,
                description,
                record_id,
            });
        }

        Ok(findings)
    }
}
