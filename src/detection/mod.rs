//! Anomaly detection over the request log.
//!
//! A detection cycle runs two detectors over the same trailing window and
//! merges their output:
//! - `VolumeDetector`: IPs with more requests than the threshold
//! - `SensitivePathDetector`: IPs requesting paths under sensitive prefixes
//! - `SuspicionAggregator`: one result per IP, escalating IPs that hit both

mod aggregate;
mod cycle;
mod sensitive;
mod volume;

pub use aggregate::{CombinedFinding, CombinedReport, SuspicionAggregator};
pub use cycle::{DetectionCycle, DetectionReport};
pub use sensitive::{SensitiveFinding, SensitivePathDetector};
pub use volume::{VolumeDetector, VolumeFinding};
