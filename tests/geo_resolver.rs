//! Geolocation resolver tests against local HTTP stand-ins for the providers.

use std::sync::Arc;
use std::time::Duration;

use httptest::{matchers::*, responders::*, Expectation, Server};
use ip_sentinel::config::{GeoCacheKind, GeoSettings};
use ip_sentinel::geo::{default_providers, DiskGeoCache, GeoResolver};
use ip_sentinel::initialization::{init_geo_cache, init_geo_client};
use ip_sentinel::GeoResult;
use serde_json::json;
use tempfile::TempDir;

fn settings_for(primary: &Server, secondary: &Server) -> GeoSettings {
    GeoSettings {
        ipapi_co_base_url: format!("http://{}", primary.addr()),
        ip_api_com_base_url: format!("http://{}", secondary.addr()),
        provider_timeout: Duration::from_millis(500),
        inter_provider_delay: Duration::from_millis(5),
        ..Default::default()
    }
}

fn resolver(settings: &GeoSettings) -> GeoResolver {
    GeoResolver::new(
        init_geo_client(settings).unwrap(),
        default_providers(settings),
        init_geo_cache(settings).unwrap(),
        settings,
    )
}

#[tokio::test]
async fn resolves_via_primary_provider() {
    let primary = Server::run();
    let secondary = Server::run();
    primary.expect(
        Expectation::matching(request::method_path("GET", "/1.1.1.1/json/")).respond_with(
            json_encoded(json!({
                "country_name": "Australia",
                "country_code": "AU",
                "city": "Sydney",
                "region": "New South Wales",
                "latitude": -33.86,
                "longitude": 151.2,
                "timezone": "Australia/Sydney",
                "org": "CLOUDFLARENET"
            })),
        ),
    );

    let settings = settings_for(&primary, &secondary);
    let result = resolver(&settings).resolve("1.1.1.1").await;

    assert_eq!(
        result,
        GeoResult {
            country: Some("Australia".into()),
            country_code: Some("AU".into()),
            city: Some("Sydney".into()),
            region: Some("New South Wales".into()),
            latitude: Some(-33.86),
            longitude: Some(151.2),
            timezone: Some("Australia/Sydney".into()),
            isp: Some("CLOUDFLARENET".into()),
            source_provider: Some("ipapi.co".into()),
            error: None,
        }
    );
}

#[tokio::test]
async fn unreachable_providers_yield_sentinel() {
    // Nothing listens on the loopback discard port
    let settings = GeoSettings {
        ipapi_co_base_url: "http://127.0.0.1:9".into(),
        ip_api_com_base_url: "http://127.0.0.1:9".into(),
        provider_timeout: Duration::from_millis(500),
        inter_provider_delay: Duration::from_millis(5),
        ..Default::default()
    };
    let resolver = resolver(&settings);

    let result = resolver.resolve("192.0.2.44").await;
    assert_eq!(result.error.as_deref(), Some("All geolocation services failed"));
    assert!(!result.is_resolved());
    assert_eq!(resolver.stats().total_failures(), 2);
}

#[tokio::test]
async fn disk_cache_survives_a_new_resolver() {
    let dir = TempDir::new().unwrap();
    let primary = Server::run();
    let secondary = Server::run();
    secondary.expect(
        Expectation::matching(request::method_path("GET", "/json/9.9.9.9"))
            .times(1)
            .respond_with(json_encoded(json!({
                "status": "success",
                "country": "Switzerland",
                "countryCode": "CH",
                "isp": "Quad9"
            }))),
    );
    primary.expect(
        Expectation::matching(request::method_path("GET", "/9.9.9.9/json/"))
            .times(1)
            .respond_with(status_code(503)),
    );

    let settings = GeoSettings {
        cache_kind: GeoCacheKind::Disk,
        cache_dir: dir.path().join("geo"),
        ..settings_for(&primary, &secondary)
    };

    let first = resolver(&settings).resolve("9.9.9.9").await;
    assert_eq!(first.source_provider.as_deref(), Some("ip-api.com"));

    // A second resolver over the same directory answers from disk
    let second_resolver = resolver(&settings);
    let second = second_resolver.resolve("9.9.9.9").await;
    assert_eq!(first, second);
    assert_eq!(second_resolver.stats().cache_hits(), 1);
}

#[tokio::test]
async fn concurrent_lookups_share_the_resolver() {
    let primary = Server::run();
    let secondary = Server::run();
    primary.expect(
        Expectation::matching(request::method("GET"))
            .times(1..)
            .respond_with(json_encoded(json!({"country_name": "Canada"}))),
    );

    let dir = TempDir::new().unwrap();
    let settings = settings_for(&primary, &secondary);
    let resolver = Arc::new(GeoResolver::new(
        init_geo_client(&settings).unwrap(),
        default_providers(&settings),
        Arc::new(DiskGeoCache::new(dir.path().join("c")).unwrap()),
        &settings,
    ));

    let mut handles = Vec::new();
    for i in 0..8 {
        let resolver = Arc::clone(&resolver);
        handles.push(tokio::spawn(async move {
            resolver.resolve(&format!("198.51.100.{}", i % 4)).await
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().country.as_deref(), Some("Canada"));
    }
}
