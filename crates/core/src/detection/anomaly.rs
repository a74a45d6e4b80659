//! Anomaly types produced by statistical and pattern detection.

use serde::{Deserialize, Serialize};

use crate::alert::Severity;
use crate::metric_names::{
    METRIC_CPU_USAGE, METRIC_DISK_IOPS, METRIC_DISK_USAGE, METRIC_MEMORY_USAGE,
    METRIC_NETWORK_LATENCY,
};

/// The metric an anomaly concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Cpu,
    Memory,
    Disk,
    DiskIops,
    Network,
}

impl MetricKind {
    pub fn metric_name(&self) -> &'static str {
        match self {
            MetricKind::Cpu => METRIC_CPU_USAGE,
            MetricKind::Memory => METRIC_MEMORY_USAGE,
            MetricKind::Disk => METRIC_DISK_USAGE,
            MetricKind::DiskIops => METRIC_DISK_IOPS,
            MetricKind::Network => METRIC_NETWORK_LATENCY,
        }
    }
}

/// Which detector produced the anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    StatisticalDeviation,
    MemoryLeak,
    CpuSpike,
    DiskIoBottleneck,
}

/// The quantity that made the observation anomalous.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyMeasure {
    /// Absolute z-score against the historical baseline.
    ZScore(f64),
    /// Extrapolated growth in percent per hour.
    GrowthRate(f64),
    /// Current value divided by the recent mean.
    SpikeRatio(f64),
    /// Combined read + write operations per second.
    Iops(f64),
}

impl AnomalyMeasure {
    pub fn value(&self) -> f64 {
        match *self {
            AnomalyMeasure::ZScore(v)
            | AnomalyMeasure::GrowthRate(v)
            | AnomalyMeasure::SpikeRatio(v)
            | AnomalyMeasure::Iops(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    #[serde(rename = "type")]
    pub kind: AnomalyKind,
    pub severity: Severity,
    pub metric: MetricKind,
    pub measure: AnomalyMeasure,
    /// The observed value of `metric` in the current snapshot.
    pub observed: f64,
    pub description: String,
    pub potential_causes: Vec<String>,
}
