//! Provider backend abstraction.

use async_trait::async_trait;
use serde_json::Value;

use super::types::GeoResult;
use crate::config::HTTP_STATUS_OK;
use crate::error_handling::ProviderError;

/// Undecoded provider answer.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Value,
}

/// One geolocation backend.
///
/// `fetch_raw` does the network call and `normalize` maps the payload onto
/// `GeoResult`. The resolver owns timeouts and fallback; providers only
/// report what went wrong.
#[async_trait]
pub trait GeoProvider: Send + Sync {
    /// Short name used in logs and as `GeoResult::source_provider`.
    fn name(&self) -> &'static str;

    async fn fetch_raw(
        &self,
        client: &reqwest::Client,
        ip: &str,
    ) -> Result<RawResponse, ProviderError>;

    fn normalize(&self, raw: &RawResponse) -> Result<GeoResult, ProviderError>;
}

/// GETs `url` and decodes the body as JSON. Anything but 200 is an error.
pub(crate) async fn get_json(
    client: &reqwest::Client,
    url: &str,
) -> Result<RawResponse, ProviderError> {
    let response = client.get(url).send().await?;
    let status = response.status().as_u16();
    if status != HTTP_STATUS_OK {
        return Err(ProviderError::Status(status));
    }
    let body: Value = response.json().await?;
    Ok(RawResponse { status, body })
}

/// Returns the top-level object of a payload.
pub(crate) fn as_object(
    raw: &RawResponse,
) -> Result<&serde_json::Map<String, Value>, ProviderError> {
    raw.body
        .as_object()
        .ok_or_else(|| ProviderError::Malformed(format!("expected a JSON object, got {}", raw.body)))
}

/// Non-empty string field.
pub(crate) fn str_field(obj: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Numeric field; some providers send coordinates as strings.
pub(crate) fn f64_field(obj: &serde_json::Map<String, Value>, key: &str) -> Option<f64> {
    match obj.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
