//! Command-line options.
//!
//! Every tuning option can also come from an `IP_SENTINEL_*` environment
//! variable (or `.env`, loaded by the binary). Command-line values win.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use super::constants::*;
use super::types::{
    AutoBlockSettings, Config, DetectionSettings, GeoCacheKind, GeoSettings, LogFormat, LogLevel,
    RetentionSettings, ScheduleSettings,
};

#[derive(Debug, Parser)]
#[command(
    name = "ip_sentinel",
    version,
    about = "Flags suspicious IPs from request logs, blocks repeat offenders and geolocates IPs."
)]
pub struct Opt {
    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value_t = LogLevel::Info, env = "IP_SENTINEL_LOG_LEVEL", global = true)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, value_enum, default_value_t = LogFormat::Plain, env = "IP_SENTINEL_LOG_FORMAT", global = true)]
    pub log_format: LogFormat,

    /// Database path (SQLite file)
    #[arg(long, value_parser, default_value = DB_PATH, env = "IP_SENTINEL_DB_PATH", global = true)]
    pub db_path: PathBuf,

    /// Requests inside the detection window above which an IP is flagged
    #[arg(long, default_value_t = REQUESTS_PER_HOUR_THRESHOLD, env = "IP_SENTINEL_REQUESTS_THRESHOLD", global = true)]
    pub requests_threshold: i64,

    /// Detection window in seconds
    #[arg(long, default_value_t = DETECTION_WINDOW_SECS, env = "IP_SENTINEL_WINDOW_SECS", global = true)]
    pub window_secs: u64,

    /// Sensitive path prefixes, comma-separated (defaults to the built-in list)
    #[arg(long = "sensitive-path", value_delimiter = ',', env = "IP_SENTINEL_SENSITIVE_PATHS", global = true)]
    pub sensitive_paths: Vec<String>,

    /// Unresolved records within the lookback that trigger an automatic block
    #[arg(long, default_value_t = AUTO_BLOCK_COUNT_THRESHOLD, env = "IP_SENTINEL_AUTO_BLOCK_THRESHOLD", global = true)]
    pub auto_block_threshold: i64,

    /// Auto-block lookback in days
    #[arg(long, default_value_t = AUTO_BLOCK_LOOKBACK_DAYS, env = "IP_SENTINEL_AUTO_BLOCK_DAYS", global = true)]
    pub auto_block_days: i64,

    /// Age in days after which resolved records are deleted
    #[arg(long, default_value_t = RETENTION_MAX_AGE_DAYS, env = "IP_SENTINEL_RETENTION_DAYS", global = true)]
    pub retention_days: i64,

    /// Geolocation cache backend: memory|disk
    #[arg(long, value_enum, default_value_t = GeoCacheKind::Memory, env = "IP_SENTINEL_GEO_CACHE", global = true)]
    pub geo_cache: GeoCacheKind,

    /// Directory for the disk geolocation cache
    #[arg(long, default_value = GEO_DISK_CACHE_DIR, env = "IP_SENTINEL_GEO_CACHE_DIR", global = true)]
    pub geo_cache_dir: PathBuf,

    /// Geolocation cache TTL in seconds
    #[arg(long, default_value_t = GEO_CACHE_TTL.as_secs(), env = "IP_SENTINEL_GEO_CACHE_TTL_SECS", global = true)]
    pub geo_cache_ttl_secs: u64,

    /// Per-provider timeout in seconds
    #[arg(long, default_value_t = GEO_PROVIDER_TIMEOUT.as_secs(), env = "IP_SENTINEL_GEO_TIMEOUT_SECS", global = true)]
    pub geo_timeout_secs: u64,

    /// Pause between provider attempts in milliseconds
    #[arg(long, default_value_t = GEO_INTER_PROVIDER_DELAY.as_millis() as u64, env = "IP_SENTINEL_GEO_DELAY_MS", global = true)]
    pub geo_delay_ms: u64,

    /// HTTP User-Agent sent to geolocation providers
    #[arg(long, default_value = DEFAULT_USER_AGENT, env = "IP_SENTINEL_USER_AGENT", global = true)]
    pub user_agent: String,

    /// Seconds between detection cycles in `watch` mode
    #[arg(long, default_value_t = DETECTION_INTERVAL_SECS, env = "IP_SENTINEL_DETECTION_INTERVAL_SECS", global = true)]
    pub detection_interval_secs: u64,

    /// Seconds between auto-block runs in `watch` mode
    #[arg(long, default_value_t = AUTO_BLOCK_INTERVAL_SECS, env = "IP_SENTINEL_AUTO_BLOCK_INTERVAL_SECS", global = true)]
    pub auto_block_interval_secs: u64,

    /// Seconds between retention sweeps in `watch` mode
    #[arg(long, default_value_t = RETENTION_INTERVAL_SECS, env = "IP_SENTINEL_RETENTION_INTERVAL_SECS", global = true)]
    pub retention_interval_secs: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run one detection cycle over the current window
    Detect,
    /// Block IPs with repeated unresolved suspicion records
    AutoBlock,
    /// Delete old resolved suspicion records
    Cleanup,
    /// List suspicion records
    ListSuspicious {
        /// Include resolved records
        #[arg(long)]
        resolved: bool,
    },
    /// Mark a suspicion record resolved
    Resolve {
        /// Record id
        id: i64,
    },
    /// List blocked IPs
    ListBlocked,
    /// Block one or more IPs
    Block {
        #[arg(required = true)]
        ips: Vec<String>,
        /// Reason stored with the block entry
        #[arg(long)]
        reason: Option<String>,
    },
    /// Unblock one or more IPs
    Unblock {
        #[arg(required = true)]
        ips: Vec<String>,
    },
    /// Geolocate one or more IPs
    Geolocate {
        #[arg(required = true)]
        ips: Vec<String>,
    },
    /// Run detection, auto-block and cleanup on their intervals until Ctrl-C
    Watch,
}

impl Opt {
    /// Maps parsed options onto the library configuration.
    pub fn to_config(&self) -> Config {
        let sensitive_paths: Vec<String> = self
            .sensitive_paths
            .iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();

        Config {
            log_level: self.log_level.clone(),
            log_format: self.log_format.clone(),
            db_path: self.db_path.clone(),
            detection: DetectionSettings {
                requests_per_hour_threshold: self.requests_threshold,
                window: Duration::from_secs(self.window_secs),
                sensitive_paths: if sensitive_paths.is_empty() {
                    DetectionSettings::default().sensitive_paths
                } else {
                    sensitive_paths
                },
            },
            auto_block: AutoBlockSettings {
                count_threshold: self.auto_block_threshold,
                lookback_days: self.auto_block_days,
            },
            retention: RetentionSettings {
                max_age_days: self.retention_days,
            },
            geo: GeoSettings {
                cache_kind: self.geo_cache.clone(),
                cache_dir: self.geo_cache_dir.clone(),
                cache_ttl: Duration::from_secs(self.geo_cache_ttl_secs),
                provider_timeout: Duration::from_secs(self.geo_timeout_secs),
                inter_provider_delay: Duration::from_millis(self.geo_delay_ms),
                user_agent: self.user_agent.clone(),
                ..Default::default()
            },
            schedule: ScheduleSettings {
                detection_interval: Duration::from_secs(self.detection_interval_secs),
                auto_block_interval: Duration::from_secs(self.auto_block_interval_secs),
                retention_interval: Duration::from_secs(self.retention_interval_secs),
            },
        }
    }
}
