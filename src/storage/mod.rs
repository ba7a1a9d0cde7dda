//! Database operations.
//!
//! One SQLite store holds the request log, suspicion records and the block
//! list. Schema changes live in `migrations/`.

pub mod blocklist;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod request_log;
pub mod suspicion;
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used items
pub use blocklist::{delete_block, insert_block_if_absent, is_blocked, list_blocked_ips};
pub use migrations::run_migrations;
pub use models::{BlockEntry, ReasonCode, RequestLogEntry, SuspicionRecord};
pub use pool::init_db_pool_with_path;
pub use request_log::{
    append_request_log, count_requests_by_ip, count_sensitive_accesses, query_request_logs,
    PathAccessCount,
};
pub use suspicion::{
    count_unresolved_by_ip_since, delete_resolved_before, escalate_to_pattern, get_suspicion,
    insert_suspicion_if_absent, list_suspicious_ips, resolve_suspicious_ip, EscalationOutcome,
    NewSuspicion,
};
