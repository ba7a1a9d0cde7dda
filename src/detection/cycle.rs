//! One detection cycle: volume scan, sensitive-path scan, aggregation.

use chrono::{DateTime, Utc};
use log::{error, info};
use sqlx::SqlitePool;
use tokio::sync::Mutex;

use super::aggregate::{CombinedReport, SuspicionAggregator};
use super::sensitive::{SensitiveFinding, SensitivePathDetector};
use super::volume::{VolumeDetector, VolumeFinding};
use crate::config::DetectionSettings;
use crate::error_handling::DetectionError;
use crate::utils::window_start;

/// Outcome of a completed cycle.
#[derive(Debug, Clone)]
pub struct DetectionReport {
    pub window_start: DateTime<Utc>,
    pub volume: Vec<VolumeFinding>,
    pub sensitive: Vec<SensitiveFinding>,
    pub combined: CombinedReport,
}

impl DetectionReport {
    pub fn total_detected(&self) -> usize {
        self.combined.total
    }
}

/// Runs detection cycles against one store, one at a time.
///
/// Record creation is check-then-insert per IP, so two overlapping cycles
/// could interleave; a second `run` while one is active is rejected with
/// `DetectionError::CycleInProgress`.
pub struct DetectionCycle {
    settings: DetectionSettings,
    volume: VolumeDetector,
    sensitive: SensitivePathDetector,
    aggregator: SuspicionAggregator,
    running: Mutex<()>,
}

impl DetectionCycle {
    pub fn new(pool: SqlitePool, settings: DetectionSettings) -> Self {
        Self {
            volume: VolumeDetector::new(
                pool.clone(),
                settings.requests_per_hour_threshold,
                settings.window,
            ),
            sensitive: SensitivePathDetector::new(pool.clone()),
            aggregator: SuspicionAggregator::new(pool),
            settings,
            running: Mutex::new(()),
        }
    }

    /// Runs a cycle over the window ending now.
    pub async fn run(&self) -> Result<DetectionReport, DetectionError> {
        self.run_at(Utc::now()).await
    }

    /// Runs a cycle over the window ending at `now`.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<DetectionReport, DetectionError> {
        let Ok(_guard) = self.running.try_lock() else {
            info!("Skipping detection cycle: previous cycle still running");
            return Err(DetectionError::CycleInProgress);
        };

        info!("Starting suspicious IP detection");
        let window_start = window_start(now, self.settings.window);

        match self.run_locked(window_start).await {
            Ok(report) => {
                info!(
                    "Anomaly detection completed. Found {} suspicious IPs ({} high volume, {} sensitive access)",
                    report.total_detected(),
                    report.volume.len(),
                    report.sensitive.len()
                );
                Ok(report)
            }
            Err(e) => {
                error!("Error in anomaly detection cycle: {e}");
                Err(e)
            }
        }
    }

    async fn run_locked(
        &self,
        window_start: DateTime<Utc>,
    ) -> Result<DetectionReport, DetectionError> {
        let volume = self.volume.detect(window_start).await?;
        let sensitive = self
            .sensitive
            .detect(window_start, &self.settings.sensitive_paths)
            .await?;
        let combined = self.aggregator.combine(&volume, &sensitive).await?;

        Ok(DetectionReport {
            window_start,
            volume,
            sensitive,
            combined,
        })
    }
}
