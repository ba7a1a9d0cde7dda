//! Persisted record types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error_handling::DatabaseError;

/// Detection rule a suspicion record is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    HighVolume,
    SensitiveAccess,
    MultipleSensitive,
    /// The IP matched both the volume and the sensitive-path rule in one cycle
    SuspiciousPattern,
}

impl ReasonCode {
    /// Value stored in the `reason` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::HighVolume => "high_volume",
            ReasonCode::SensitiveAccess => "sensitive_access",
            ReasonCode::MultipleSensitive => "multiple_sensitive",
            ReasonCode::SuspiciousPattern => "suspicious_pattern",
        }
    }

    /// Human-readable label for listings.
    pub fn label(&self) -> &'static str {
        match self {
            ReasonCode::HighVolume => "High request volume",
            ReasonCode::SensitiveAccess => "Sensitive path access",
            ReasonCode::MultipleSensitive => "Multiple sensitive paths",
            ReasonCode::SuspiciousPattern => "Suspicious pattern",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReasonCode {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high_volume" => Ok(ReasonCode::HighVolume),
            "sensitive_access" => Ok(ReasonCode::SensitiveAccess),
            "multiple_sensitive" => Ok(ReasonCode::MultipleSensitive),
            "suspicious_pattern" => Ok(ReasonCode::SuspiciousPattern),
            other => Err(DatabaseError::InvalidValue {
                column: "suspicious_ips.reason",
                value: other.to_string(),
            }),
        }
    }
}

/// One request seen by the host application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestLogEntry {
    pub ip_address: String,
    pub timestamp: DateTime<Utc>,
    pub path: String,
}

/// A persisted flag that an IP matched a detection rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuspicionRecord {
    pub id: i64,
    pub ip_address: String,
    pub reason: ReasonCode,
    pub description: String,
    pub request_count: i64,
    pub detected_at: DateTime<Utc>,
    pub is_resolved: bool,
}

/// An IP on the block list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockEntry {
    pub ip_address: String,
    pub created_at: DateTime<Utc>,
    pub reason: Option<String>,
}

/// Converts a stored epoch-millisecond value back into a timestamp.
pub(crate) fn from_millis(column: &'static str, ms: i64) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| DatabaseError::InvalidValue {
        column,
        value: ms.to_string(),
    })
}
