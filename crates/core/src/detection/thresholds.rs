//! Static threshold evaluation.
//!
//! Pure logic. Each metric yields at most one alert per snapshot: critical
//! when the value meets the critical level, otherwise warning when it meets
//! the warning level.

use crate::alert::{Alert, AlertType, Severity};
use crate::config::{Threshold, ThresholdPolicy};
use crate::snapshot::MetricSnapshot;

/// Evaluate one snapshot against the static thresholds.
///
/// Metrics missing from the snapshot are skipped.
pub fn check_thresholds(snapshot: &MetricSnapshot, policy: &ThresholdPolicy) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if let Some(cpu) = snapshot.cpu_usage() {
        check_threshold(snapshot, AlertType::HighCpu, cpu, &policy.cpu_usage_percent, &mut alerts);
    }

    if let Some(memory) = snapshot.memory_usage() {
        check_threshold(
            snapshot,
            AlertType::HighMemory,
            memory,
            &policy.memory_usage_percent,
            &mut alerts,
        );
    }

    if let Some(disk) = snapshot.disk_usage() {
        check_threshold(
            snapshot,
            AlertType::HighDisk,
            disk,
            &policy.disk_usage_percent,
            &mut alerts,
        );
    }

    if let Some(latency) = snapshot.network_latency() {
        check_threshold(
            snapshot,
            AlertType::HighLatency,
            latency,
            &policy.network_latency_ms,
            &mut alerts,
        );
    }

    alerts
}

/// Compare a single metric value against a threshold and push an alert if violated.
fn check_threshold(
    snapshot: &MetricSnapshot,
    alert_type: AlertType,
    value: f64,
    threshold: &Threshold,
    alerts: &mut Vec<Alert>,
) {
    let (severity, threshold_value) = if value >= threshold.critical {
        (Severity::Critical, threshold.critical)
    } else if value >= threshold.warning {
        (Severity::Warning, threshold.warning)
    } else {
        return; // within normal range
    };

    alerts.push(Alert {
        alert_type,
        severity,
        value,
        threshold: threshold_value,
        description: format!(
            "{} on {} is {value:.1} (>= {} threshold {threshold_value:.1})",
            alert_type.metric_name(),
            snapshot.server_id,
            severity.as_str(),
        ),
        timestamp: snapshot.timestamp,
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn make_snapshot(cpu: f64, memory: f64, disk: f64, latency: f64) -> MetricSnapshot {
        MetricSnapshot::new("app-01", Utc::now())
            .with_cpu(cpu)
            .with_memory(memory)
            .with_disk(disk, 100.0, 100.0)
            .with_latency(latency)
    }

    #[test]
    fn no_alerts_when_within_thresholds() {
        let alerts =
            check_thresholds(&make_snapshot(50.0, 60.0, 40.0, 30.0), &ThresholdPolicy::default());
        assert!(alerts.is_empty());
    }

    #[test]
    fn warning_alert_on_high_cpu() {
        let alerts =
            check_thresholds(&make_snapshot(85.0, 60.0, 40.0, 30.0), &ThresholdPolicy::default());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::HighCpu);
        assert_eq!(alerts[0].severity, Severity::Warning);
        assert_eq!(alerts[0].threshold, 80.0);
    }

    #[test]
    fn critical_supersedes_warning() {
        let alerts =
            check_thresholds(&make_snapshot(96.0, 60.0, 40.0, 30.0), &ThresholdPolicy::default());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Critical);
    }

    #[test]
    fn exactly_at_critical_is_critical() {
        let alerts =
            check_thresholds(&make_snapshot(95.0, 60.0, 40.0, 500.0), &ThresholdPolicy::default());
        assert_eq!(alerts.len(), 2);
        assert!(alerts.iter().all(|a| a.severity == Severity::Critical));
    }

    #[test]
    fn one_alert_per_metric_when_everything_is_critical() {
        let alerts =
            check_thresholds(&make_snapshot(99.0, 99.0, 99.0, 900.0), &ThresholdPolicy::default());
        assert_eq!(alerts.len(), 4);
        let mut types: Vec<_> = alerts.iter().map(|a| a.alert_type).collect();
        types.dedup();
        assert_eq!(types.len(), 4);
    }

    #[test]
    fn missing_metrics_are_skipped() {
        let snap = MetricSnapshot::new("web-01", Utc::now()).with_latency(600.0);
        let alerts = check_thresholds(&snap, &ThresholdPolicy::default());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::HighLatency);
        assert_eq!(alerts[0].severity, Severity::Critical);
    }
}
