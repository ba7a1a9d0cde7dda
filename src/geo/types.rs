//! Geolocation data structures.

use serde::{Deserialize, Serialize};

use crate::config::GEO_UNRESOLVED_ERROR;

/// Normalized geolocation for one IP, independent of which provider answered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoResult {
    /// Country name (e.g., "United States")
    pub country: Option<String>,
    /// ISO 3166-1 alpha-2 country code
    pub country_code: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// IANA timezone name
    pub timezone: Option<String>,
    /// ISP or owning organization
    pub isp: Option<String>,
    /// Provider that produced this result
    pub source_provider: Option<String>,
    /// Set only on the unresolved sentinel
    pub error: Option<String>,
}

impl GeoResult {
    /// The result returned when every provider failed. Never cached.
    pub fn unresolved() -> Self {
        GeoResult {
            error: Some(GEO_UNRESOLVED_ERROR.to_string()),
            ..Default::default()
        }
    }

    /// True when a country is present.
    pub fn is_resolved(&self) -> bool {
        self.country.as_deref().is_some_and(|c| !c.trim().is_empty())
    }
}
