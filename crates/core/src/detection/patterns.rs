//! Behavioural pattern detectors: memory leak, CPU spike, disk IOPS
//! bottleneck. Each check is independent and skips silently when its inputs
//! are missing.

use crate::alert::Severity;
use crate::config::PatternPolicy;
use crate::detection::anomaly::{Anomaly, AnomalyKind, AnomalyMeasure, MetricKind};
use crate::snapshot::MetricSnapshot;

const SECS_PER_HOUR: f64 = 3600.0;

/// Run all pattern checks for `current` given the server's prior snapshots.
pub fn detect_pattern_anomalies(
    current: &MetricSnapshot,
    historical: &[MetricSnapshot],
    policy: &PatternPolicy,
) -> Vec<Anomaly> {
    [
        detect_memory_leak(current, historical, policy),
        detect_cpu_spike(current, historical, policy),
        detect_iops_bottleneck(current, policy),
    ]
    .into_iter()
    .flatten()
    .collect()
}

// ---------------------------------------------------------------------------
// Memory leak
// ---------------------------------------------------------------------------

/// Extrapolated hourly growth in percent over a non-decreasing series.
///
/// Returns `None` when the series is too short, decreases anywhere, starts
/// at zero or spans no time.
pub fn hourly_growth_rate(points: &[(chrono::DateTime<chrono::Utc>, f64)]) -> Option<f64> {
    let (first, last) = (points.first()?, points.last()?);
    if points.len() < 2 || points.windows(2).any(|w| w[1].1 < w[0].1) {
        return None;
    }
    if first.1 <= 0.0 {
        return None;
    }
    let span_secs = (last.0 - first.0).num_milliseconds() as f64 / 1000.0;
    if span_secs <= 0.0 {
        return None;
    }
    let growth_percent = (last.1 - first.1) / first.1 * 100.0;
    Some(growth_percent * SECS_PER_HOUR / span_secs)
}

fn detect_memory_leak(
    current: &MetricSnapshot,
    historical: &[MetricSnapshot],
    policy: &PatternPolicy,
) -> Option<Anomaly> {
    let points: Vec<_> = historical
        .iter()
        .filter_map(|s| s.memory_usage().map(|v| (s.timestamp, v)))
        .collect();
    if points.len() < policy.leak_window {
        return None;
    }
    let window = &points[points.len() - policy.leak_window..];
    let growth = hourly_growth_rate(window)?;
    if growth <= policy.leak_growth_percent_per_hour {
        return None;
    }

    let observed = current
        .memory_usage()
        .unwrap_or_else(|| window[window.len() - 1].1);

    Some(Anomaly {
        kind: AnomalyKind::MemoryLeak,
        severity: Severity::Warning,
        metric: MetricKind::Memory,
        measure: AnomalyMeasure::GrowthRate(growth),
        observed,
        description: format!(
            "Memory on {} has grown monotonically over the last {} samples at {growth:.1}%/hour",
            current.server_id, policy.leak_window
        ),
        potential_causes: vec![
            "unreleased object references".to_string(),
            "connection or file handle leak".to_string(),
            "unbounded in-process cache".to_string(),
        ],
    })
}

// ---------------------------------------------------------------------------
// CPU spike
// ---------------------------------------------------------------------------

fn detect_cpu_spike(
    current: &MetricSnapshot,
    historical: &[MetricSnapshot],
    policy: &PatternPolicy,
) -> Option<Anomaly> {
    let cpu = current.cpu_usage()?;
    let recent: Vec<f64> = historical
        .iter()
        .rev()
        .filter_map(MetricSnapshot::cpu_usage)
        .take(policy.spike_lookback)
        .collect();
    if recent.len() < policy.spike_lookback {
        return None;
    }
    let mean = recent.iter().sum::<f64>() / recent.len() as f64;
    if cpu <= policy.spike_multiplier * mean || cpu <= policy.spike_floor_percent {
        return None;
    }

    let ratio = cpu / mean.max(1.0);
    Some(Anomaly {
        kind: AnomalyKind::CpuSpike,
        severity: Severity::Warning,
        metric: MetricKind::Cpu,
        measure: AnomalyMeasure::SpikeRatio(ratio),
        observed: cpu,
        description: format!(
            "CPU on {} jumped to {cpu:.1}% ({ratio:.1}x the recent mean of {mean:.1}%)",
            current.server_id
        ),
        potential_causes: vec![
            "sudden traffic burst".to_string(),
            "scheduled batch job".to_string(),
            "hot loop after deployment".to_string(),
        ],
    })
}

// ---------------------------------------------------------------------------
// Disk IOPS
// ---------------------------------------------------------------------------

fn detect_iops_bottleneck(current: &MetricSnapshot, policy: &PatternPolicy) -> Option<Anomaly> {
    let iops = current.total_iops()?;
    let severity = if iops > policy.iops.critical {
        Severity::Critical
    } else if iops > policy.iops.warning {
        Severity::Warning
    } else {
        return None;
    };

    Some(Anomaly {
        kind: AnomalyKind::DiskIoBottleneck,
        severity,
        metric: MetricKind::DiskIops,
        measure: AnomalyMeasure::Iops(iops),
        observed: iops,
        description: format!(
            "Disk on {} is serving {iops:.0} IOPS (limit {:.0})",
            current.server_id, policy.iops.warning
        ),
        potential_causes: vec![
            "missing index causing table scans".to_string(),
            "checkpoint or compaction storm".to_string(),
            "swap activity".to_string(),
        ],
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
