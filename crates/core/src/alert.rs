//! Threshold alert types.

use serde::{Deserialize, Serialize};

use crate::metric_names::{
    METRIC_CPU_USAGE, METRIC_DISK_USAGE, METRIC_MEMORY_USAGE, METRIC_NETWORK_LATENCY,
};
use crate::types::Timestamp;

/// Severity of an alert, anomaly or event.
///
/// Ordered so that `Critical > Warning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Value exceeded the warning level but not the critical level.
    Warning,
    /// Value exceeded the critical level.
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

/// The metric a threshold alert was raised for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    HighCpu,
    HighMemory,
    HighDisk,
    HighLatency,
}

impl AlertType {
    /// Canonical metric name (see [`crate::metric_names`]).
    pub fn metric_name(&self) -> &'static str {
        match self {
            AlertType::HighCpu => METRIC_CPU_USAGE,
            AlertType::HighMemory => METRIC_MEMORY_USAGE,
            AlertType::HighDisk => METRIC_DISK_USAGE,
            AlertType::HighLatency => METRIC_NETWORK_LATENCY,
        }
    }
}

/// A single metric threshold violation for one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub alert_type: AlertType,
    pub severity: Severity,
    /// The observed metric value that triggered the alert.
    pub value: f64,
    /// The threshold value that was met or exceeded.
    pub threshold: f64,
    pub description: String,
    /// When the metric was recorded.
    pub timestamp: Timestamp,
}
