//! IP geolocation.
//!
//! `GeoResolver` fronts an ordered list of `GeoProvider` backends with a
//! `GeoCache`. Only successful lookups are cached.

mod cache;
mod ip_api_com;
mod ipapi_co;
mod provider;
mod resolver;
mod types;

pub use cache::{DiskGeoCache, GeoCache, MemoryGeoCache};
pub use ip_api_com::{IpApiCom, IP_API_COM_SOURCE};
pub use ipapi_co::{IpapiCo, IPAPI_CO_SOURCE};
pub use provider::{GeoProvider, RawResponse};
pub use resolver::GeoResolver;
pub use types::GeoResult;

use crate::config::GeoSettings;

/// The built-in providers in priority order: ipapi.co, then ip-api.com.
pub fn default_providers(settings: &GeoSettings) -> Vec<Box<dyn GeoProvider>> {
    vec![
        Box::new(IpapiCo::new(settings.ipapi_co_base_url.clone())),
        Box::new(IpApiCom::new(settings.ip_api_com_base_url.clone())),
    ]
}
