//! Per-snapshot composite health score.

use serde::{Deserialize, Serialize};

use crate::alert::{Alert, Severity};
use crate::config::HealthPolicy;
use crate::detection::anomaly::Anomaly;

/// Coarse health band derived from a health score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Critical,
}

impl HealthStatus {
    pub fn from_score(score: f64, policy: &HealthPolicy) -> Self {
        if score >= policy.healthy_floor {
            HealthStatus::Healthy
        } else if score >= policy.degraded_floor {
            HealthStatus::Degraded
        } else {
            HealthStatus::Critical
        }
    }
}

/// Start at 100 and subtract a fixed penalty per alert and anomaly,
/// weighted by severity. Clamped to `[0, 100]`.
pub fn health_score(alerts: &[Alert], anomalies: &[Anomaly], policy: &HealthPolicy) -> f64 {
    let alert_penalty: f64 = alerts
        .iter()
        .map(|a| match a.severity {
            Severity::Critical => policy.critical_alert_penalty,
            Severity::Warning => policy.warning_alert_penalty,
        })
        .sum();
    let anomaly_penalty: f64 = anomalies
        .iter()
        .map(|a| match a.severity {
            Severity::Critical => policy.critical_anomaly_penalty,
            Severity::Warning => policy.warning_anomaly_penalty,
        })
        .sum();

    (100.0 - alert_penalty - anomaly_penalty).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::alert::AlertType;
    use crate::detection::anomaly::{AnomalyKind, AnomalyMeasure, MetricKind};

    fn alert(severity: Severity) -> Alert {
        Alert {
            alert_type: AlertType::HighCpu,
            severity,
            value: 90.0,
            threshold: 80.0,
            description: String::new(),
            timestamp: Utc::now(),
        }
    }

    fn anomaly(severity: Severity) -> Anomaly {
        Anomaly {
            kind: AnomalyKind::CpuSpike,
            severity,
            metric: MetricKind::Cpu,
            measure: AnomalyMeasure::SpikeRatio(2.5),
            observed: 90.0,
            description: String::new(),
            potential_causes: Vec::new(),
        }
    }

    #[test]
    fn clean_snapshot_scores_full_health() {
        assert_eq!(health_score(&[], &[], &HealthPolicy::default()), 100.0);
    }

    #[test]
    fn penalties_are_weighted_by_severity() {
        let policy = HealthPolicy::default();
        let score = health_score(
            &[alert(Severity::Critical), alert(Severity::Warning)],
            &[anomaly(Severity::Critical), anomaly(Severity::Warning)],
            &policy,
        );
        assert_eq!(score, 100.0 - 25.0 - 10.0 - 15.0 - 5.0);
    }

    #[test]
    fn score_never_drops_below_zero() {
        let alerts: Vec<_> = (0..10).map(|_| alert(Severity::Critical)).collect();
        assert_eq!(health_score(&alerts, &[], &HealthPolicy::default()), 0.0);
    }

    #[test]
    fn status_bands() {
        let policy = HealthPolicy::default();
        assert_eq!(HealthStatus::from_score(100.0, &policy), HealthStatus::Healthy);
        assert_eq!(HealthStatus::from_score(80.0, &policy), HealthStatus::Healthy);
        assert_eq!(HealthStatus::from_score(65.0, &policy), HealthStatus::Degraded);
        assert_eq!(HealthStatus::from_score(10.0, &policy), HealthStatus::Critical);
    }
}
