//! Application initialization and resource setup.
//!
//! This module provides functions to initialize the shared resources:
//! - Logger
//! - Database connection pool (with migrations applied)
//! - Geolocation client, cache and resolver

mod client;
mod logger;

use std::sync::Arc;

use anyhow::Context;
use sqlx::SqlitePool;

use crate::config::{GeoCacheKind, GeoSettings};
use crate::error_handling::InitializationError;
use crate::geo::{default_providers, DiskGeoCache, GeoCache, GeoResolver, MemoryGeoCache};
use crate::storage::{init_db_pool_with_path, run_migrations};

pub use client::init_geo_client;
pub use logger::init_logger_with;

/// Opens the database at `db_path` and brings its schema up to date.
pub async fn init_store(db_path: &std::path::Path) -> anyhow::Result<SqlitePool> {
    let pool = init_db_pool_with_path(db_path)
        .await
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
    run_migrations(&pool).await?;
    Ok((*pool).clone())
}

/// Builds the configured geolocation cache.
///
/// # Errors
///
/// Returns `InitializationError::GeoCacheError` if the disk cache directory
/// cannot be created.
pub fn init_geo_cache(settings: &GeoSettings) -> Result<Arc<dyn GeoCache>, InitializationError> {
    let cache: Arc<dyn GeoCache> = match settings.cache_kind {
        GeoCacheKind::Memory => Arc::new(MemoryGeoCache::new()),
        GeoCacheKind::Disk => Arc::new(DiskGeoCache::new(&settings.cache_dir)?),
    };
    Ok(cache)
}

/// Builds a resolver over the built-in providers.
pub fn init_geo_resolver(settings: &GeoSettings) -> Result<Arc<GeoResolver>, InitializationError> {
    let client = init_geo_client(settings)?;
    let cache = init_geo_cache(settings)?;
    Ok(Arc::new(GeoResolver::new(
        client,
        default_providers(settings),
        cache,
        settings,
    )))
}
