//! End-to-end tests: request logging, detection, auto-blocking and access checks.

mod helpers;

use std::sync::Arc;

use chrono::{Duration, Utc};
use helpers::{create_test_pool, create_test_pool_with_path, log_requests};
use ip_sentinel::config::DetectionSettings;
use ip_sentinel::policy::{auto_block_repeat_offenders_at, sweep_resolved_at};
use ip_sentinel::{
    list_blocked_ips, list_suspicious_ips, resolve_suspicious_ip, AccessDecision, AccessGuard,
    Config, DetectionCycle, DetectionError, ReasonCode,
};
use tempfile::TempDir;

fn detection_settings() -> DetectionSettings {
    DetectionSettings {
        requests_per_hour_threshold: 100,
        window: std::time::Duration::from_secs(3600),
        sensitive_paths: vec!["/admin/".into(), "/wp-login/".into()],
    }
}

#[tokio::test]
async fn high_volume_ip_is_flagged_once() {
    let pool = create_test_pool().await;
    let now = Utc::now();
    log_requests(&pool, "203.0.113.5", "/", 150, now).await;

    let cycle = DetectionCycle::new(pool.clone(), detection_settings());
    let report = cycle.run_at(now).await.unwrap();

    assert_eq!(report.volume.len(), 1);
    assert_eq!(report.volume[0].ip_address, "203.0.113.5");
    assert_eq!(report.volume[0].request_count, 150);

    let records = list_suspicious_ips(&pool, false).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].reason, ReasonCode::HighVolume);
    assert_eq!(records[0].request_count, 150);
    assert!(!records[0].is_resolved);

    // Immediate re-run creates nothing new
    let report = cycle.run_at(now).await.unwrap();
    assert!(report.volume.is_empty());
    assert_eq!(list_suspicious_ips(&pool, false).await.unwrap().len(), 1);
}

#[tokio::test]
async fn volume_and_sensitive_access_escalate_to_pattern() {
    let pool = create_test_pool().await;
    let now = Utc::now();
    log_requests(&pool, "203.0.113.5", "/", 142, now).await;
    log_requests(&pool, "203.0.113.5", "/admin/", 5, now).await;
    log_requests(&pool, "203.0.113.5", "/wp-login/", 3, now).await;

    let cycle = DetectionCycle::new(pool.clone(), detection_settings());
    let report = cycle.run_at(now).await.unwrap();
    assert_eq!(report.total_detected(), 1);

    let records = list_suspicious_ips(&pool, false).await.unwrap();
    let pattern: Vec<_> = records
        .iter()
        .filter(|r| r.reason == ReasonCode::SuspiciousPattern)
        .collect();
    assert_eq!(pattern.len(), 1);
    assert_eq!(
        pattern[0].description,
        "High request volume: 150 requests in the last hour (threshold: 100) | Also: \
         Accessed multiple sensitive paths: /admin/, /wp-login/. Total accesses: 8"
    );
}

#[tokio::test]
async fn repeated_detections_lead_to_a_block() {
    let pool = create_test_pool().await;
    let now = Utc::now();
    let cycle = DetectionCycle::new(pool.clone(), detection_settings());
    let guard = AccessGuard::new(pool.clone());

    // Three cycles, each resolving the previous record so the IP can be re-flagged
    for round in 0..3 {
        let at = now - Duration::days(2) + Duration::hours(round);
        log_requests(&pool, "198.51.100.23", "/", 101, at).await;
        let report = cycle.run_at(at).await.unwrap();
        assert_eq!(report.volume.len(), 1, "round {round}");
        if round < 2 {
            resolve_suspicious_ip(&pool, report.volume[0].record_id)
                .await
                .unwrap();
        }
    }

    // Only one unresolved record: below the threshold of 3
    let config = Config::default();
    assert_eq!(
        auto_block_repeat_offenders_at(&pool, &config.auto_block, now)
            .await
            .unwrap(),
        0
    );

    // Two more unresolved reasons for the same IP
    log_requests(&pool, "198.51.100.23", "/admin/", 1, now).await;
    cycle.run_at(now).await.unwrap();
    log_requests(&pool, "198.51.100.23", "/wp-login/", 1, now).await;
    cycle.run_at(now).await.unwrap();

    assert_eq!(
        auto_block_repeat_offenders_at(&pool, &config.auto_block, now)
            .await
            .unwrap(),
        1
    );
    let blocked = list_blocked_ips(&pool).await.unwrap();
    assert_eq!(blocked.len(), 1);
    assert_eq!(blocked[0].ip_address, "198.51.100.23");
    assert_eq!(
        guard.check_access("198.51.100.23").await,
        AccessDecision::Deny
    );
    assert_eq!(guard.check_access("198.51.100.24").await, AccessDecision::Allow);
}

#[tokio::test]
async fn retention_keeps_unresolved_and_recent_records() {
    let pool = create_test_pool().await;
    let now = Utc::now();
    let cycle = DetectionCycle::new(pool.clone(), detection_settings());

    let old = now - Duration::days(45);
    log_requests(&pool, "192.0.2.10", "/", 101, old).await;
    let id = cycle.run_at(old).await.unwrap().volume[0].record_id;
    resolve_suspicious_ip(&pool, id).await.unwrap();

    log_requests(&pool, "192.0.2.11", "/", 101, old).await;
    cycle.run_at(old).await.unwrap();

    // Records are stamped with the wall clock, so sweep from 31 days ahead
    let later = now + Duration::days(31);
    assert_eq!(sweep_resolved_at(&pool, 30, later).await.unwrap(), 1);
    let remaining = list_suspicious_ips(&pool, true).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].ip_address, "192.0.2.11");
}

#[tokio::test]
async fn overlapping_cycles_are_serialized() {
    let dir = TempDir::new().unwrap();
    let pool = create_test_pool_with_path(&dir.path().join("cycles.db")).await;
    let now = Utc::now();
    for i in 0..20 {
        log_requests(&pool, &format!("203.0.113.{i}"), "/", 101, now).await;
    }

    let cycle = Arc::new(DetectionCycle::new(pool.clone(), detection_settings()));
    let mut handles = Vec::new();
    for _ in 0..4 {
        let cycle = Arc::clone(&cycle);
        handles.push(tokio::spawn(async move { cycle.run_at(now).await }));
    }

    let mut detected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(report) => detected += report.volume.len(),
            Err(DetectionError::CycleInProgress) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    // Whatever interleaving happened, every IP was flagged exactly once
    assert_eq!(detected, 20);
    assert_eq!(list_suspicious_ips(&pool, false).await.unwrap().len(), 20);
}
