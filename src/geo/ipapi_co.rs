//! ipapi.co backend.

use async_trait::async_trait;
use serde_json::Value;

use super::provider::{as_object, f64_field, get_json, str_field, GeoProvider, RawResponse};
use super::types::GeoResult;
use crate::error_handling::ProviderError;

pub const IPAPI_CO_SOURCE: &str = "ipapi.co";

/// `GET {base_url}/{ip}/json/`
#[derive(Debug, Clone)]
pub struct IpapiCo {
    base_url: String,
}

impl IpapiCo {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl GeoProvider for IpapiCo {
    fn name(&self) -> &'static str {
        IPAPI_CO_SOURCE
    }

    async fn fetch_raw(
        &self,
        client: &reqwest::Client,
        ip: &str,
    ) -> Result<RawResponse, ProviderError> {
        get_json(client, &format!("{}/{}/json/", self.base_url, ip)).await
    }

    fn normalize(&self, raw: &RawResponse) -> Result<GeoResult, ProviderError> {
        let obj = as_object(raw)?;

        // Rate limits and reserved ranges come back as 200 with {"error": true}
        if obj.get("error").and_then(Value::as_bool) == Some(true) {
            let reason = str_field(obj, "reason").unwrap_or_else(|| "unknown".to_string());
            return Err(ProviderError::Unsuccessful(reason));
        }

        let result = GeoResult {
            country: str_field(obj, "country_name"),
            country_code: str_field(obj, "country_code"),
            city: str_field(obj, "city"),
            region: str_field(obj, "region"),
            latitude: f64_field(obj, "latitude"),
            longitude: f64_field(obj, "longitude"),
            timezone: str_field(obj, "timezone"),
            isp: str_field(obj, "org"),
            source_provider: Some(IPAPI_CO_SOURCE.to_string()),
            error: None,
        };
        if !result.is_resolved() {
            return Err(ProviderError::EmptyCountry);
        }
        Ok(result)
    }
}
