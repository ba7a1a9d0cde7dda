//! Configuration types.
//!
//! `Config` is the library-level configuration and can be built without any
//! CLI dependencies. The binary maps its parsed arguments onto it.

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

use crate::config::constants::*;

/// Logging level for the application.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Which cache backs the geolocation resolver.
#[derive(Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum GeoCacheKind {
    /// Process-local map, lost on restart
    Memory,
    /// One JSON file per IP under `GeoSettings::cache_dir`
    Disk,
}

/// Settings for the volume and sensitive-path detectors.
#[derive(Debug, Clone)]
pub struct DetectionSettings {
    /// IPs with strictly more requests than this inside the window are flagged
    pub requests_per_hour_threshold: i64,
    /// Trailing window length
    pub window: Duration,
    /// Path prefixes considered sensitive (case-sensitive prefix match)
    pub sensitive_paths: Vec<String>,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            requests_per_hour_threshold: REQUESTS_PER_HOUR_THRESHOLD,
            window: Duration::from_secs(DETECTION_WINDOW_SECS),
            sensitive_paths: DEFAULT_SENSITIVE_PATHS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

/// Settings for promoting repeat offenders to the block list.
#[derive(Debug, Clone)]
pub struct AutoBlockSettings {
    pub count_threshold: i64,
    pub lookback_days: i64,
}

impl Default for AutoBlockSettings {
    fn default() -> Self {
        Self {
            count_threshold: AUTO_BLOCK_COUNT_THRESHOLD,
            lookback_days: AUTO_BLOCK_LOOKBACK_DAYS,
        }
    }
}

/// Settings for purging resolved suspicion records.
#[derive(Debug, Clone)]
pub struct RetentionSettings {
    pub max_age_days: i64,
}

impl Default for RetentionSettings {
    fn default() -> Self {
        Self {
            max_age_days: RETENTION_MAX_AGE_DAYS,
        }
    }
}

/// Settings for the geolocation resolver and its providers.
#[derive(Debug, Clone)]
pub struct GeoSettings {
    pub cache_kind: GeoCacheKind,
    pub cache_dir: PathBuf,
    pub cache_ttl: Duration,
    pub provider_timeout: Duration,
    pub inter_provider_delay: Duration,
    pub ipapi_co_base_url: String,
    pub ip_api_com_base_url: String,
    pub user_agent: String,
}

impl Default for GeoSettings {
    fn default() -> Self {
        Self {
            cache_kind: GeoCacheKind::Memory,
            cache_dir: PathBuf::from(GEO_DISK_CACHE_DIR),
            cache_ttl: GEO_CACHE_TTL,
            provider_timeout: GEO_PROVIDER_TIMEOUT,
            inter_provider_delay: GEO_INTER_PROVIDER_DELAY,
            ipapi_co_base_url: IPAPI_CO_BASE_URL.to_string(),
            ip_api_com_base_url: IP_API_COM_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Intervals for the periodic jobs driven by the scheduler.
#[derive(Debug, Clone)]
pub struct ScheduleSettings {
    pub detection_interval: Duration,
    pub auto_block_interval: Duration,
    pub retention_interval: Duration,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            detection_interval: Duration::from_secs(DETECTION_INTERVAL_SECS),
            auto_block_interval: Duration::from_secs(AUTO_BLOCK_INTERVAL_SECS),
            retention_interval: Duration::from_secs(RETENTION_INTERVAL_SECS),
        }
    }
}

/// Library configuration (no CLI dependencies).
///
/// # Examples
///
/// ```no_run
/// use ip_sentinel::Config;
/// use std::path::PathBuf;
///
/// let mut config = Config {
///     db_path: PathBuf::from("./requests.db"),
///     ..Default::default()
/// };
/// config.detection.requests_per_hour_threshold = 250;
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Log level
    pub log_level: LogLevel,

    /// Log format
    pub log_format: LogFormat,

    /// Database path (SQLite file)
    pub db_path: PathBuf,

    pub detection: DetectionSettings,
    pub auto_block: AutoBlockSettings,
    pub retention: RetentionSettings,
    pub geo: GeoSettings,
    pub schedule: ScheduleSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            db_path: PathBuf::from(DB_PATH),
            detection: DetectionSettings::default(),
            auto_block: AutoBlockSettings::default(),
            retention: RetentionSettings::default(),
            geo: GeoSettings::default(),
            schedule: ScheduleSettings::default(),
        }
    }
}
