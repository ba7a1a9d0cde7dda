//! ip-api.com backend.

use async_trait::async_trait;

use super::provider::{as_object, f64_field, get_json, str_field, GeoProvider, RawResponse};
use super::types::GeoResult;
use crate::error_handling::ProviderError;

pub const IP_API_COM_SOURCE: &str = "ip-api.com";

/// `GET {base_url}/json/{ip}`. Only payloads with `"status": "success"` count.
#[derive(Debug, Clone)]
pub struct IpApiCom {
    base_url: String,
}

impl IpApiCom {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl GeoProvider for IpApiCom {
    fn name(&self) -> &'static str {
        IP_API_COM_SOURCE
    }

    async fn fetch_raw(
        &self,
        client: &reqwest::Client,
        ip: &str,
    ) -> Result<RawResponse, ProviderError> {
        get_json(client, &format!("{}/json/{}", self.base_url, ip)).await
    }

    fn normalize(&self, raw: &RawResponse) -> Result<GeoResult, ProviderError> {
        let obj = as_object(raw)?;

        let status = str_field(obj, "status");
        if status.as_deref() != Some("success") {
            let message = str_field(obj, "message")
                .or(status)
                .unwrap_or_else(|| "missing status".to_string());
            return Err(ProviderError::Unsuccessful(message));
        }

        let result = GeoResult {
            country: str_field(obj, "country"),
            country_code: str_field(obj, "countryCode"),
            city: str_field(obj, "city"),
            region: str_field(obj, "regionName"),
            latitude: f64_field(obj, "lat"),
            longitude: f64_field(obj, "lon"),
            timezone: str_field(obj, "timezone"),
            isp: str_field(obj, "isp"),
            source_provider: Some(IP_API_COM_SOURCE.to_string()),
            error: None,
        };
        if !result.is_resolved() {
            return Err(ProviderError::EmptyCountry);
        }
        Ok(result)
    }
}
