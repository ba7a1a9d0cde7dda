//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (thresholds, windows, timeouts)
//! - Library configuration types with sensible defaults
//! - The command-line surface of the binary

mod cli;
mod constants;
mod types;

pub use cli::{Command, Opt};
pub use constants::*;
pub use types::{
    AutoBlockSettings, Config, DetectionSettings, GeoCacheKind, GeoSettings, LogFormat, LogLevel,
    RetentionSettings, ScheduleSettings,
};
