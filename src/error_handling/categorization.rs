//! Error categorization.
//!
//! Maps provider errors onto the `ProviderFailureKind` buckets counted by
//! `LookupStats`.

use super::stats::LookupStats;
use super::types::{ProviderError, ProviderFailureKind};

/// Categorizes a `reqwest::Error` into a `ProviderFailureKind`.
pub fn categorize_reqwest_error(error: &reqwest::Error) -> ProviderFailureKind {
    if error.status().is_some() || error.is_status() {
        ProviderFailureKind::Status
    } else if error.is_timeout() {
        ProviderFailureKind::Timeout
    } else if error.is_connect() {
        ProviderFailureKind::Connect
    } else if error.is_decode() || error.is_body() {
        ProviderFailureKind::Decode
    } else {
        ProviderFailureKind::Other
    }
}

/// Categorizes a provider failure.
pub fn categorize_provider_error(error: &ProviderError) -> ProviderFailureKind {
    match error {
        ProviderError::Timeout(_) => ProviderFailureKind::Timeout,
        ProviderError::Request(e) => categorize_reqwest_error(e),
        ProviderError::Status(_) => ProviderFailureKind::Status,
        ProviderError::Malformed(_) => ProviderFailureKind::Decode,
        ProviderError::Unsuccessful(_) => ProviderFailureKind::Unsuccessful,
        ProviderError::EmptyCountry => ProviderFailureKind::EmptyResult,
    }
}

/// Records a provider failure in the statistics tracker.
pub fn update_failure_stats(stats: &LookupStats, error: &ProviderError) {
    stats.increment_failure(categorize_provider_error(error));
}
