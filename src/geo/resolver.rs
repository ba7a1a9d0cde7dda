//! Cached, multi-provider IP geolocation.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use super::cache::GeoCache;
use super::provider::GeoProvider;
use super::types::GeoResult;
use crate::config::GeoSettings;
use crate::error_handling::{update_failure_stats, LookupStats, ProviderError};

/// Resolves IPs to locations, trying providers in order until one answers
/// with a country.
///
/// Provider failures never reach the caller. When every provider fails the
/// caller gets `GeoResult::unresolved()`, which is not cached, so the next
/// call for the same IP tries the providers again.
pub struct GeoResolver {
    client: reqwest::Client,
    providers: Vec<Box<dyn GeoProvider>>,
    cache: Arc<dyn GeoCache>,
    cache_ttl: Duration,
    provider_timeout: Duration,
    inter_provider_delay: Duration,
    stats: LookupStats,
}

impl GeoResolver {
    pub fn new(
        client: reqwest::Client,
        providers: Vec<Box<dyn GeoProvider>>,
        cache: Arc<dyn GeoCache>,
        settings: &GeoSettings,
    ) -> Self {
        Self {
            client,
            providers,
            cache,
            cache_ttl: settings.cache_ttl,
            provider_timeout: settings.provider_timeout,
            inter_provider_delay: settings.inter_provider_delay,
            stats: LookupStats::new(),
        }
    }

    pub fn stats(&self) -> &LookupStats {
        &self.stats
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Resolves `ip`. Input that does not parse as an IP address is
    /// unresolved without touching the cache or any provider.
    pub async fn resolve(&self, ip: &str) -> GeoResult {
        let Ok(addr) = ip.trim().parse::<IpAddr>() else {
            warn!("Not geolocating invalid IP address {ip:?}");
            return GeoResult::unresolved();
        };
        let ip = addr.to_string();
        let ip = ip.as_str();

        if let Some(hit) = self.cache.get(ip) {
            debug!("Geolocation cache hit for {ip}");
            self.stats.record_cache_hit();
            return hit;
        }
        self.stats.record_cache_miss();

        for (attempt, provider) in self.providers.iter().enumerate() {
            if attempt > 0 {
                tokio::time::sleep(self.inter_provider_delay).await;
            }

            match self.try_provider(provider.as_ref(), ip).await {
                Ok(result) => {
                    info!("Geolocated {ip} via {}", provider.name());
                    self.cache.set(ip, &result, self.cache_ttl);
                    return result;
                }
                Err(e) => {
                    update_failure_stats(&self.stats, &e);
                    warn!("Geolocation via {} failed for {ip}: {e}", provider.name());
                }
            }
        }

        warn!("All geolocation services failed for {ip}");
        self.stats.record_unresolved();
        GeoResult::unresolved()
    }

    /// Resolves each IP in turn.
    pub async fn resolve_all(&self, ips: &[String]) -> Vec<(String, GeoResult)> {
        let mut results = Vec::with_capacity(ips.len());
        for ip in ips {
            results.push((ip.clone(), self.resolve(ip).await));
        }
        results
    }

    async fn try_provider(
        &self,
        provider: &dyn GeoProvider,
        ip: &str,
    ) -> Result<GeoResult, ProviderError> {
        let raw = tokio::time::timeout(self.provider_timeout, provider.fetch_raw(&self.client, ip))
            .await
            .map_err(|_| ProviderError::Timeout(self.provider_timeout))??;

        let result = provider.normalize(&raw)?;
        if !result.is_resolved() {
            return Err(ProviderError::EmptyCountry);
        }
        Ok(result)
    }
}
