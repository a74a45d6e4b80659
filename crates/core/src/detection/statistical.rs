//! Z-score deviation detection against a server's own history.

use crate::alert::Severity;
use crate::config::StatisticalPolicy;
use crate::detection::anomaly::{Anomaly, AnomalyKind, AnomalyMeasure, MetricKind};
use crate::snapshot::MetricSnapshot;

/// Metrics checked for statistical deviation, with their accessor.
const STATISTICAL_METRICS: [(MetricKind, fn(&MetricSnapshot) -> Option<f64>); 3] = [
    (MetricKind::Cpu, MetricSnapshot::cpu_usage),
    (MetricKind::Memory, MetricSnapshot::memory_usage),
    (MetricKind::Disk, MetricSnapshot::disk_usage),
];

/// Population mean and standard deviation.
///
/// Returns `None` for an empty slice.
pub fn mean_and_stddev(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, variance.sqrt()))
}

/// Absolute z-score of `value`; 0 when the baseline has no variation.
pub fn z_score(value: f64, mean: f64, stddev: f64) -> f64 {
    if stddev <= f64::EPSILON {
        0.0
    } else {
        (value - mean).abs() / stddev
    }
}

/// Detect deviations of `current` from the mean of `historical`.
///
/// Returns an empty list when fewer than `policy.min_history` historical
/// points exist. Metrics absent from `current`, or present in fewer than
/// `min_history` historical points, are skipped.
pub fn detect_statistical_anomalies(
    current: &MetricSnapshot,
    historical: &[MetricSnapshot],
    policy: &StatisticalPolicy,
) -> Vec<Anomaly> {
    if historical.len() < policy.min_history {
        return Vec::new();
    }

    let mut anomalies = Vec::new();

    for (metric, accessor) in STATISTICAL_METRICS {
        let Some(value) = accessor(current) else {
            continue;
        };
        let values: Vec<f64> = historical.iter().filter_map(accessor).collect();
        if values.len() < policy.min_history {
            continue;
        }
        let Some((mean, stddev)) = mean_and_stddev(&values) else {
            continue;
        };

        let z = z_score(value, mean, stddev);
        if z <= policy.z_warning {
            continue;
        }

        let severity = if z > policy.z_critical {
            Severity::Critical
        } else {
            Severity::Warning
        };

        anomalies.push(Anomaly {
            kind: AnomalyKind::StatisticalDeviation,
            severity,
            metric,
            measure: AnomalyMeasure::ZScore(z),
            observed: value,
            description: format!(
                "{} deviates from its baseline: value={value:.1}, mean={mean:.1}, \
                 stddev={stddev:.2}, z={z:.2}",
                metric.metric_name()
            ),
            potential_causes: potential_causes(metric),
        });
    }

    anomalies
}

fn potential_causes(metric: MetricKind) -> Vec<String> {
    let causes: &[&str] = match metric {
        MetricKind::Cpu => &["traffic surge", "runaway process", "inefficient query or loop"],
        MetricKind::Memory => &["memory leak", "unbounded cache growth", "large request payloads"],
        MetricKind::Disk => &["log growth", "temporary file accumulation", "backup in progress"],
        MetricKind::DiskIops | MetricKind::Network => &["workload change"],
    };
    causes.iter().map(|c| c.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
