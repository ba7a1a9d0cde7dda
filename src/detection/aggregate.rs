//! Merging of volume and sensitive-path findings.
//!
//! An IP that trips both rules in one cycle keeps its volume record, escalated
//! to `suspicious_pattern` with the sensitive description appended. The
//! existing description is never replaced.

use std::collections::HashMap;

use log::{info, warn};
use sqlx::SqlitePool;

use super::sensitive::SensitiveFinding;
use super::volume::VolumeFinding;
use crate::error_handling::DatabaseError;
use crate::storage::{escalate_to_pattern, EscalationOutcome, ReasonCode};

/// Final per-IP result of one detection cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedFinding {
    pub ip_address: String,
    /// Record that represents this IP for the cycle
    pub record_id: i64,
    pub reason: ReasonCode,
    /// Requests in the window for volume findings, sensitive accesses otherwise
    pub request_count: i64,
    /// Sensitive paths touched, empty for volume-only findings
    pub paths: Vec<String>,
}

impl From<&VolumeFinding> for CombinedFinding {
    fn from(f: &VolumeFinding) -> Self {
        CombinedFinding {
            ip_address: f.ip_address.clone(),
            record_id: f.record_id,
            reason: ReasonCode::HighVolume,
            request_count: f.request_count,
            paths: Vec::new(),
        }
    }
}

impl From<&SensitiveFinding> for CombinedFinding {
    fn from(f: &SensitiveFinding) -> Self {
        CombinedFinding {
            ip_address: f.ip_address.clone(),
            record_id: f.record_id,
            reason: f.reason,
            request_count: f.total_accesses,
            paths: f.paths.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombinedReport {
    /// One entry per IP, volume findings first
    pub findings: Vec<CombinedFinding>,
    pub total: usize,
}

/// Merges detector outputs into one result per IP.
#[derive(Debug, Clone)]
pub struct SuspicionAggregator {
    pool: SqlitePool,
}

impl SuspicionAggregator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Combines both finding sets, escalating the persisted volume record of
    /// every IP that appears in both.
    ///
    /// Each escalation commits on its own; an error aborts the remaining
    /// merges and is returned to the caller.
    pub async fn combine(
        &self,
        volume_findings: &[VolumeFinding],
        sensitive_findings: &[SensitiveFinding],
    ) -> Result<CombinedReport, DatabaseError> {
        let mut findings: Vec<CombinedFinding> = Vec::new();
        let mut by_ip: HashMap<String, usize> = HashMap::new();

        for finding in volume_findings {
            by_ip.insert(finding.ip_address.clone(), findings.len());
            findings.push(finding.into());
        }

        for finding in sensitive_findings {
            let Some(&idx) = by_ip.get(&finding.ip_address) else {
                by_ip.insert(finding.ip_address.clone(), findings.len());
                findings.push(finding.into());
                continue;
            };

            let existing = &mut findings[idx];
            match escalate_to_pattern(&self.pool, existing.record_id, &finding.description).await? {
                EscalationOutcome::Escalated => {
                    warn!(
                        "Escalated {} to suspicious_pattern (high volume and sensitive access)",
                        existing.ip_address
                    );
                    existing.reason = ReasonCode::SuspiciousPattern;
                }
                EscalationOutcome::AppendedOnly => {
                    info!(
                        "{} already has an open suspicious_pattern record; appended context to record {}",
                        existing.ip_address, existing.record_id
                    );
                }
                EscalationOutcome::Missing => {
                    warn!(
                        "Suspicion record {} for {} disappeared before escalation",
                        existing.record_id, existing.ip_address
                    );
                }
            }
            existing.paths = finding.paths.clone();
        }

        let total = findings.len();
        Ok(CombinedReport { findings, total })
    }
}
