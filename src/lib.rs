//! ip_sentinel library: suspicious IP detection over request logs
//!
//! The host application records each request (`AccessGuard::record_request`)
//! and consults the block list before serving (`AccessGuard::check_access`).
//! Periodic jobs scan the log for abuse:
//!
//! - a detection cycle flags IPs with high request volume or sensitive path
//!   access, escalating IPs that do both to `suspicious_pattern`
//! - auto-blocking adds IPs with repeated unresolved records to the block list
//! - a retention sweep deletes old resolved records
//!
//! `GeoResolver` geolocates IPs through an ordered list of providers with a
//! TTL cache in front.
//!
//! # Example
//!
//! ```no_run
//! use ip_sentinel::initialization::init_store;
//! use ip_sentinel::{AccessGuard, Config, DetectionCycle};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = Config::default();
//! let pool = init_store(&config.db_path).await?;
//!
//! let guard = AccessGuard::new(pool.clone());
//! guard.record_request("203.0.113.5", "/admin/").await;
//!
//! let cycle = DetectionCycle::new(pool, config.detection.clone());
//! let report = cycle.run().await?;
//! println!("{} suspicious IPs", report.total_detected());
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime.

pub mod access_guard;
pub mod config;
pub mod detection;
mod error_handling;
pub mod geo;
pub mod initialization;
pub mod policy;
pub mod scheduler;
mod storage;
mod utils;

// Re-export public API
pub use access_guard::{block_ip, client_ip, unblock_ips, AccessDecision, AccessGuard, UnblockSummary};
pub use config::{Command, Config, LogFormat, LogLevel, Opt};
pub use detection::{DetectionCycle, DetectionReport};
pub use error_handling::{
    log_lookup_statistics, DatabaseError, DetectionError, InitializationError, LookupStats,
    ProviderError, ProviderFailureKind,
};
pub use geo::{GeoResolver, GeoResult};
pub use scheduler::Scheduler;
pub use storage::{
    append_request_log, get_suspicion, init_db_pool_with_path, is_blocked, list_blocked_ips,
    list_suspicious_ips, query_request_logs, resolve_suspicious_ip, run_migrations, BlockEntry,
    ReasonCode, RequestLogEntry, SuspicionRecord,
};
pub use utils::sanitize_path;
