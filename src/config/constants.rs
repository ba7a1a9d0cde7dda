//! Configuration constants.
//!
//! Defaults for detection thresholds, policy windows and geolocation lookups.
//! Every value here can be overridden through `Config` or the CLI.

use std::time::Duration;

pub const DB_PATH: &str = "./ip_sentinel.db";

// Detection
/// Requests per window above which an IP is flagged as high volume
pub const REQUESTS_PER_HOUR_THRESHOLD: i64 = 100;
/// Trailing window the detectors aggregate over
pub const DETECTION_WINDOW_SECS: u64 = 60 * 60;
/// Path prefixes treated as sensitive when no list is configured
pub const DEFAULT_SENSITIVE_PATHS: &[&str] = &[
    "/admin/",
    "/login/",
    "/wp-admin/",
    "/wp-login.php",
    "/.env",
    "/phpmyadmin/",
];

// Auto-block policy
/// Unresolved suspicion records needed before an IP is blocked
pub const AUTO_BLOCK_COUNT_THRESHOLD: i64 = 3;
/// How far back suspicion records are counted towards auto-blocking
pub const AUTO_BLOCK_LOOKBACK_DAYS: i64 = 7;

// Retention
/// Resolved suspicion records older than this are purged
pub const RETENTION_MAX_AGE_DAYS: i64 = 30;

// Geolocation
/// Successful lookups are cached for 24 hours
pub const GEO_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// Per-provider request timeout
pub const GEO_PROVIDER_TIMEOUT: Duration = Duration::from_secs(5);
/// Pause between successive provider attempts (external rate limits)
pub const GEO_INTER_PROVIDER_DELAY: Duration = Duration::from_millis(100);
/// Error marker carried by the unresolved sentinel
pub const GEO_UNRESOLVED_ERROR: &str = "All geolocation services failed";
/// Default cache directory for the on-disk geolocation cache
pub const GEO_DISK_CACHE_DIR: &str = ".geo_cache";
pub const IPAPI_CO_BASE_URL: &str = "http://ipapi.co";
pub const IP_API_COM_BASE_URL: &str = "http://ip-api.com";
pub const DEFAULT_USER_AGENT: &str = concat!("ip_sentinel/", env!("CARGO_PKG_VERSION"));

// Scheduler
pub const DETECTION_INTERVAL_SECS: u64 = 5 * 60;
pub const AUTO_BLOCK_INTERVAL_SECS: u64 = 60 * 60;
pub const RETENTION_INTERVAL_SECS: u64 = 24 * 60 * 60;

// HTTP status codes
pub const HTTP_STATUS_OK: u16 = 200;
