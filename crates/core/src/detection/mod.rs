//! Anomaly detection.
//!
//! Three independent detectors run per snapshot (static thresholds, z-score
//! deviation, behavioural patterns) and their findings are folded into a
//! health score. All logic in this module is pure and works on one server's
//! history at a time, so servers can be processed in parallel.

pub mod anomaly;
pub mod health;
pub mod patterns;
pub mod statistical;
pub mod thresholds;

use crate::alert::Alert;
use crate::config::EngineConfig;
use crate::snapshot::MetricSnapshot;
use crate::types::{ServerId, Timestamp};

use self::anomaly::Anomaly;

/// Everything the detectors found for one snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotDetection {
    pub server_id: ServerId,
    pub timestamp: Timestamp,
    pub alerts: Vec<Alert>,
    pub anomalies: Vec<Anomaly>,
    pub health_score: f64,
    /// Some detection input was missing from the snapshot.
    pub partial: bool,
    /// Too little history for the statistical detector to run.
    pub insufficient_history: bool,
}

/// Run every detector for `current` against the server's prior snapshots.
///
/// `historical` must belong to the same server and precede `current`.
pub fn detect_snapshot(
    current: &MetricSnapshot,
    historical: &[MetricSnapshot],
    config: &EngineConfig,
) -> SnapshotDetection {
    let alerts = thresholds::check_thresholds(current, &config.thresholds);

    let mut anomalies =
        statistical::detect_statistical_anomalies(current, historical, &config.statistical);
    anomalies.extend(patterns::detect_pattern_anomalies(
        current,
        historical,
        &config.patterns,
    ));

    let health_score = health::health_score(&alerts, &anomalies, &config.health);

    SnapshotDetection {
        server_id: current.server_id.clone(),
        timestamp: current.timestamp,
        alerts,
        anomalies,
        health_score,
        partial: current.is_partial(),
        insufficient_history: historical.len() < config.statistical.min_history,
    }
}
