//! HTTP client initialization.

use reqwest::ClientBuilder;

use crate::config::GeoSettings;

/// Initializes the HTTP client shared by the geolocation providers.
///
/// The connect timeout matches the per-provider timeout; the overall bound on
/// each call is enforced by the resolver.
///
/// # Errors
///
/// Returns a `reqwest::Error` if client creation fails.
pub fn init_geo_client(settings: &GeoSettings) -> Result<reqwest::Client, reqwest::Error> {
    ClientBuilder::new()
        .connect_timeout(settings.provider_timeout)
        .user_agent(settings.user_agent.clone())
        .build()
}
