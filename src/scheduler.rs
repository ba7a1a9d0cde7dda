//! Periodic background jobs.
//!
//! Detection, auto-blocking and retention each run on their own interval in
//! their own task. A failing run is logged and the job keeps its schedule.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use log::{debug, error, info};
use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::{AutoBlockSettings, Config, RetentionSettings, ScheduleSettings};
use crate::detection::DetectionCycle;
use crate::policy::{auto_block_repeat_offenders, sweep_resolved};

/// Shortest accepted job interval; `tokio::time::interval` rejects zero.
const MIN_JOB_INTERVAL: Duration = Duration::from_millis(10);

/// Drives the three maintenance jobs until cancelled.
pub struct Scheduler {
    pool: SqlitePool,
    cycle: Arc<DetectionCycle>,
    auto_block: AutoBlockSettings,
    retention: RetentionSettings,
    schedule: ScheduleSettings,
}

impl Scheduler {
    pub fn new(pool: SqlitePool, config: &Config) -> Self {
        Self {
            cycle: Arc::new(DetectionCycle::new(pool.clone(), config.detection.clone())),
            pool,
            auto_block: config.auto_block.clone(),
            retention: config.retention.clone(),
            schedule: config.schedule.clone(),
        }
    }

    /// Spawns every job and waits for all of them to stop.
    ///
    /// Each job first runs one full interval after start.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            "Scheduler started (detection every {}s, auto-block every {}s, retention every {}s)",
            self.schedule.detection_interval.as_secs(),
            self.schedule.auto_block_interval.as_secs(),
            self.schedule.retention_interval.as_secs()
        );

        let cycle = Arc::clone(&self.cycle);
        let detection = spawn_job(
            "detection",
            self.schedule.detection_interval,
            cancel.child_token(),
            move || {
                let cycle = Arc::clone(&cycle);
                async move {
                    // Failures are logged inside the cycle
                    let _ = cycle.run().await;
                }
            },
        );

        let pool = self.pool.clone();
        let settings = self.auto_block.clone();
        let auto_block = spawn_job(
            "auto-block",
            self.schedule.auto_block_interval,
            cancel.child_token(),
            move || {
                let pool = pool.clone();
                let settings = settings.clone();
                async move {
                    if let Err(e) = auto_block_repeat_offenders(&pool, &settings).await {
                        error!("Error in auto-block job: {e}");
                    }
                }
            },
        );

        let pool = self.pool.clone();
        let max_age_days = self.retention.max_age_days;
        let retention = spawn_job(
            "retention",
            self.schedule.retention_interval,
            cancel.child_token(),
            move || {
                let pool = pool.clone();
                async move {
                    if let Err(e) = sweep_resolved(&pool, max_age_days).await {
                        error!("Error cleaning up old records: {e}");
                    }
                }
            },
        );

        let results = join_all([detection, auto_block, retention]).await;
        for (name, result) in ["detection", "auto-block", "retention"].iter().zip(results) {
            if let Err(join_error) = result {
                error!("{name} job panicked: {join_error:?}");
            }
        }
        info!("Scheduler stopped");
    }
}

fn spawn_job<F, Fut>(
    name: &'static str,
    period: Duration,
    cancel: CancellationToken,
    mut job: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let period = period.max(MIN_JOB_INTERVAL);
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    debug!("Running {name} job");
                    job().await;
                }
                _ = cancel.cancelled() => {
                    debug!("{name} job shutting down");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectionSettings;
    use crate::storage::test_helpers::{count_rows, insert_requests, insert_suspicion_at};
    use crate::storage::{init_db_pool_with_path, is_blocked, run_migrations, ReasonCode};
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    async fn file_pool(dir: &TempDir) -> SqlitePool {
        let pool = init_db_pool_with_path(&dir.path().join("scheduler.db"))
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        (*pool).clone()
    }

    fn fast_config() -> Config {
        Config {
            detection: DetectionSettings {
                requests_per_hour_threshold: 10,
                ..Default::default()
            },
            schedule: ScheduleSettings {
                detection_interval: Duration::from_millis(20),
                auto_block_interval: Duration::from_millis(20),
                retention_interval: Duration::from_millis(20),
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_spawn_job_repeats_until_cancelled() {
        let runs = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();
        let counter = Arc::clone(&runs);
        let handle = spawn_job("counter", Duration::from_millis(10), cancel.clone(), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        handle.await.unwrap();

        let seen = runs.load(Ordering::SeqCst);
        assert!(seen >= 2, "job ran {seen} times");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(runs.load(Ordering::SeqCst), seen);
    }

    #[tokio::test]
    async fn test_zero_interval_does_not_panic() {
        let cancel = CancellationToken::new();
        let handle = spawn_job("zero", Duration::ZERO, cancel.clone(), || async {});
        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_scheduler_runs_all_jobs() {
        let dir = TempDir::new().unwrap();
        let pool = file_pool(&dir).await;
        let now = Utc::now();
        insert_requests(&pool, "203.0.113.5", "/", 20, now).await;
        insert_suspicion_at(&pool, "198.51.100.7", ReasonCode::HighVolume, now, false).await;
        insert_suspicion_at(&pool, "198.51.100.7", ReasonCode::SensitiveAccess, now, false).await;
        insert_suspicion_at(&pool, "198.51.100.7", ReasonCode::SuspiciousPattern, now, false).await;
        insert_suspicion_at(
            &pool,
            "192.0.2.1",
            ReasonCode::HighVolume,
            now - chrono::Duration::days(40),
            true,
        )
        .await;

        let cancel = CancellationToken::new();
        let scheduler = Scheduler::new(pool.clone(), &fast_config());
        let task = tokio::spawn(scheduler.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(300)).await;
        cancel.cancel();
        task.await.unwrap();

        let flagged: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM suspicious_ips WHERE ip_address = '203.0.113.5'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(flagged, 1);
        assert!(is_blocked(&pool, "198.51.100.7").await.unwrap());
        assert_eq!(count_rows(&pool, "blocked_ips").await, 1);
        // The old resolved record was swept
        let old: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM suspicious_ips WHERE ip_address = '192.0.2.1'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(old, 0);
    }
}
