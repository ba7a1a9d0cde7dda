//! Geolocation result caches.
//!
//! Two implementations share the `GeoCache` trait: an in-process map and a
//! directory of JSON files (one per IP) that survives restarts.

use std::collections::HashMap;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::{Duration, Instant, SystemTime};

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::types::GeoResult;
use crate::error_handling::InitializationError;

/// TTL cache of resolved geolocations keyed by IP.
///
/// Implementations must tolerate concurrent `get` and `set` calls. Storage
/// failures are not surfaced; a failed read is a miss and a failed write is
/// dropped.
pub trait GeoCache: Send + Sync {
    fn get(&self, ip: &str) -> Option<GeoResult>;
    fn set(&self, ip: &str, result: &GeoResult, ttl: Duration);
}

/// Entry count above which `MemoryGeoCache::set` drops every expired entry.
pub const MEMORY_CACHE_SWEEP_THRESHOLD: usize = 4096;

/// In-memory cache. Expired entries are evicted when read, and in bulk once
/// the map grows past `MEMORY_CACHE_SWEEP_THRESHOLD`.
#[derive(Debug, Default)]
pub struct MemoryGeoCache {
    entries: RwLock<HashMap<String, (GeoResult, Instant)>>,
}

impl MemoryGeoCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl GeoCache for MemoryGeoCache {
    fn get(&self, ip: &str) -> Option<GeoResult> {
        let now = Instant::now();
        {
            let entries = self.entries.read().ok()?;
            match entries.get(ip) {
                Some((result, expires_at)) if *expires_at > now => return Some(result.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        if let Ok(mut entries) = self.entries.write() {
            if entries.get(ip).is_some_and(|(_, expires_at)| *expires_at <= now) {
                entries.remove(ip);
            }
        }
        None
    }

    fn set(&self, ip: &str, result: &GeoResult, ttl: Duration) {
        let now = Instant::now();
        let Some(expires_at) = now.checked_add(ttl) else {
            return;
        };
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(ip.to_string(), (result.clone(), expires_at));
            if entries.len() > MEMORY_CACHE_SWEEP_THRESHOLD {
                let before = entries.len();
                entries.retain(|_, (_, expires_at)| *expires_at > now);
                debug!(
                    "Swept {} expired geolocation cache entries",
                    before - entries.len()
                );
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DiskCacheEntry {
    ip: String,
    result: GeoResult,
    cached_at: SystemTime,
    ttl_secs: u64,
}

/// On-disk cache, one JSON file per IP under `dir`.
#[derive(Debug, Clone)]
pub struct DiskGeoCache {
    dir: PathBuf,
}

impl DiskGeoCache {
    /// Opens (and creates if needed) the cache directory.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, InitializationError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            InitializationError::GeoCacheError(format!(
                "Failed to create geolocation cache directory {}: {e}",
                dir.display()
            ))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File for `ip`, or `None` when `ip` is not an IP address. Only parsed
    /// addresses become file names, so a key can never leave `dir`.
    fn entry_path(&self, ip: &str) -> Option<PathBuf> {
        let addr: IpAddr = ip.parse().ok()?;
        let name = addr.to_string().replace(['.', ':'], "_");
        Some(self.dir.join(format!("{name}.json")))
    }

    fn load(&self, ip: &str) -> Result<Option<GeoResult>> {
        let Some(cache_file) = self.entry_path(ip) else {
            return Ok(None);
        };
        if !cache_file.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&cache_file).context("Failed to read cache file")?;
        let entry: DiskCacheEntry =
            serde_json::from_str(&content).context("Failed to parse cache file")?;

        let age = entry.cached_at.elapsed().unwrap_or_default();
        if entry.ip != ip || age.as_secs() >= entry.ttl_secs {
            let _ = std::fs::remove_file(&cache_file);
            return Ok(None);
        }

        Ok(Some(entry.result))
    }

    fn store(&self, ip: &str, result: &GeoResult, ttl: Duration) -> Result<()> {
        let cache_file = self
            .entry_path(ip)
            .with_context(|| format!("Not an IP address: {ip:?}"))?;
        std::fs::create_dir_all(&self.dir).context("Failed to create cache directory")?;

        let entry = DiskCacheEntry {
            ip: ip.to_string(),
            result: result.clone(),
            cached_at: SystemTime::now(),
            ttl_secs: ttl.as_secs(),
        };
        let content =
            serde_json::to_string_pretty(&entry).context("Failed to serialize cache entry")?;
        std::fs::write(&cache_file, content).context("Failed to write cache file")?;

        Ok(())
    }
}

impl GeoCache for DiskGeoCache {
    fn get(&self, ip: &str) -> Option<GeoResult> {
        match self.load(ip) {
            Ok(hit) => hit,
            Err(e) => {
                debug!("Ignoring unreadable geolocation cache entry for {ip}: {e:#}");
                None
            }
        }
    }

    fn set(&self, ip: &str, result: &GeoResult, ttl: Duration) {
        if let Err(e) = self.store(ip, result, ttl) {
            warn!("Failed to cache geolocation for {ip}: {e:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn sample() -> GeoResult {
        GeoResult {
            country: Some("Australia".into()),
            country_code: Some("AU".into()),
            city: Some("Sydney".into()),
            source_provider: Some("ipapi.co".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_memory_cache_hit_and_miss() {
        let cache = MemoryGeoCache::new();
        assert!(cache.get("1.1.1.1").is_none());

        cache.set("1.1.1.1", &sample(), DAY);
        assert_eq!(cache.get("1.1.1.1"), Some(sample()));
        assert!(cache.get("1.0.0.1").is_none());
    }

    #[test]
    fn test_memory_cache_expiry_evicts() {
        let cache = MemoryGeoCache::new();
        cache.set("1.1.1.1", &sample(), Duration::ZERO);
        assert!(cache.get("1.1.1.1").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_memory_cache_sweeps_expired_entries_never_read() {
        let cache = MemoryGeoCache::new();
        cache.set("1.1.1.1", &sample(), DAY);
        for i in 0..MEMORY_CACHE_SWEEP_THRESHOLD {
            let ip = format!("10.{}.{}.{}", i >> 16, (i >> 8) & 0xff, i & 0xff);
            cache.set(&ip, &sample(), Duration::ZERO);
        }

        // Crossing the threshold drops every expired entry, keeping live ones
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("1.1.1.1"), Some(sample()));
    }

    #[test]
    fn test_memory_cache_below_threshold_is_not_swept() {
        let cache = MemoryGeoCache::new();
        for i in 0..10 {
            cache.set(&format!("10.0.0.{i}"), &sample(), Duration::ZERO);
        }
        assert_eq!(cache.len(), 10);
    }

    #[test]
    fn test_disk_cache_ignores_non_ip_keys() {
        let root = TempDir::new().unwrap();
        let cache_dir = root.path().join("cache");
        let cache = DiskGeoCache::new(&cache_dir).unwrap();

        let outside = root.path().join("victim");
        let key = outside.to_str().unwrap();
        cache.set(key, &sample(), DAY);
        cache.set("../victim", &sample(), DAY);

        assert!(!root.path().join("victim.json").exists());
        assert_eq!(std::fs::read_dir(&cache_dir).unwrap().count(), 0);
        assert!(cache.get(key).is_none());

        // A planted file next to the cache dir is never read or removed
        std::fs::write(root.path().join("victim.json"), "{}").unwrap();
        assert!(cache.get("../victim").is_none());
        assert!(root.path().join("victim.json").exists());
    }

    #[test]
    fn test_disk_cache_round_trip() {
        let dir = TempDir::new().unwrap();
        let cache = DiskGeoCache::new(dir.path()).unwrap();
        cache.set("2001:db8::1", &sample(), DAY);

        assert!(dir.path().join("2001_db8__1.json").exists());
        assert_eq!(cache.get("2001:db8::1"), Some(sample()));

        // A fresh handle over the same directory sees the entry
        let reopened = DiskGeoCache::new(dir.path()).unwrap();
        assert_eq!(reopened.get("2001:db8::1"), Some(sample()));
    }

    #[test]
    fn test_disk_cache_expired_entry_is_deleted() {
        let dir = TempDir::new().unwrap();
        let cache = DiskGeoCache::new(dir.path()).unwrap();
        cache.set("8.8.8.8", &sample(), Duration::ZERO);

        assert!(cache.get("8.8.8.8").is_none());
        assert!(!dir.path().join("8_8_8_8.json").exists());
    }

    #[test]
    fn test_disk_cache_corrupt_file_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = DiskGeoCache::new(dir.path()).unwrap();
        std::fs::write(dir.path().join("8_8_8_8.json"), "not json").unwrap();
        assert!(cache.get("8.8.8.8").is_none());
    }

    #[test]
    fn test_disk_cache_creates_nested_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let cache = DiskGeoCache::new(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(cache.dir(), nested.as_path());
    }
}
