//! Error handling and lookup statistics.
//!
//! This module provides:
//! - Error type definitions for initialization, storage, detection and providers
//! - Categorization of provider failures
//! - Thread-safe geolocation lookup statistics

mod categorization;
mod stats;
mod types;

pub use categorization::update_failure_stats;
pub use stats::{log_lookup_statistics, LookupStats};
pub use types::{
    DatabaseError, DetectionError, InitializationError, ProviderError, ProviderFailureKind,
};
