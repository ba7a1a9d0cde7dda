//! Request-path helpers for a host web application.
//!
//! The host calls `client_ip` to identify the caller, `check_access` before
//! serving and `record_request` after. Neither call can fail the request:
//! a broken store allows traffic and drops the log entry.

use std::net::IpAddr;

use chrono::Utc;
use log::{error, info, warn};
use sqlx::SqlitePool;

use crate::error_handling::DatabaseError;
use crate::storage::{append_request_log, delete_block, insert_block_if_absent, is_blocked};
use crate::utils::sanitize_path;

/// Outcome of a block-list check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny,
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow)
    }
}

/// Picks the client address: the first `X-Forwarded-For` entry when present,
/// otherwise the socket peer.
pub fn client_ip(forwarded_for: Option<&str>, remote_addr: IpAddr) -> String {
    forwarded_for
        .and_then(|header| header.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| remote_addr.to_string())
}

/// Block-list gate and request recorder over one store.
#[derive(Debug, Clone)]
pub struct AccessGuard {
    pool: SqlitePool,
}

impl AccessGuard {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// `Deny` for blocked IPs. Lookup errors are logged and allow the request.
    pub async fn check_access(&self, ip: &str) -> AccessDecision {
        match is_blocked(&self.pool, ip).await {
            Ok(true) => {
                warn!("Blocked request from IP: {ip}");
                AccessDecision::Deny
            }
            Ok(false) => AccessDecision::Allow,
            Err(e) => {
                error!("Error checking blocked IP {ip}, allowing request: {e}");
                AccessDecision::Allow
            }
        }
    }

    /// Appends a request log entry. Failures are logged and swallowed.
    pub async fn record_request(&self, ip: &str, path: &str) {
        let path = sanitize_path(path);
        if let Err(e) = append_request_log(&self.pool, ip, &path, Utc::now()).await {
            error!("Failed to log request from {ip}: {e}");
        }
    }
}

/// Counts from an unblock request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnblockSummary {
    pub unblocked: usize,
    pub not_found: usize,
}

/// Manually blocks `ip`. Returns false if it was already blocked.
pub async fn block_ip(
    pool: &SqlitePool,
    ip: &str,
    reason: Option<&str>,
) -> Result<bool, DatabaseError> {
    let created = insert_block_if_absent(pool, ip, reason, Utc::now()).await?;
    if created {
        info!("Blocked IP: {ip}");
    }
    Ok(created)
}

/// Removes each IP from the block list.
pub async fn unblock_ips(pool: &SqlitePool, ips: &[String]) -> Result<UnblockSummary, DatabaseError> {
    let mut summary = UnblockSummary::default();
    for ip in ips {
        if delete_block(pool, ip).await? {
            info!("Unblocked IP: {ip}");
            summary.unblocked += 1;
        } else {
            summary.not_found += 1;
        }
    }
    Ok(summary)
}
