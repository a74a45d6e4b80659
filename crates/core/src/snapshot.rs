//! Metric snapshot model supplied by the ingestion collaborator.
//!
//! Every sub-metric and every field inside it is optional: adapters for
//! heterogeneous backends rarely report everything, and a missing field only
//! disables the checks that reference it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{ServerId, Timestamp};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuMetrics {
    #[serde(default)]
    pub usage_percent: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetrics {
    #[serde(default)]
    pub usage_percent: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskMetrics {
    #[serde(default)]
    pub usage_percent: Option<f64>,
    #[serde(default)]
    pub read_iops: Option<f64>,
    #[serde(default)]
    pub write_iops: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkMetrics {
    #[serde(default)]
    pub latency_ms: Option<f64>,
    #[serde(default)]
    pub rx_errors: Option<u64>,
    #[serde(default)]
    pub tx_errors: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetrics {
    #[serde(default)]
    pub cpu: Option<CpuMetrics>,
    #[serde(default)]
    pub memory: Option<MemoryMetrics>,
    #[serde(default)]
    pub disk: Option<DiskMetrics>,
    #[serde(default)]
    pub network: Option<NetworkMetrics>,
}

/// Reported state of a named service on a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Running,
    Stopped,
}

/// One observation of one server at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub server_id: ServerId,
    pub timestamp: Timestamp,
    #[serde(default)]
    pub metrics: SnapshotMetrics,
    #[serde(default)]
    pub services: BTreeMap<String, ServiceState>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl MetricSnapshot {
    /// Create a snapshot with no metrics, services or errors.
    pub fn new(server_id: impl Into<ServerId>, timestamp: Timestamp) -> Self {
        Self {
            server_id: server_id.into(),
            timestamp,
            metrics: SnapshotMetrics::default(),
            services: BTreeMap::new(),
            errors: Vec::new(),
        }
    }

    pub fn with_cpu(mut self, usage_percent: f64) -> Self {
        self.metrics.cpu = Some(CpuMetrics {
            usage_percent: Some(usage_percent),
        });
        self
    }

    pub fn with_memory(mut self, usage_percent: f64) -> Self {
        self.metrics.memory = Some(MemoryMetrics {
            usage_percent: Some(usage_percent),
        });
        self
    }

    pub fn with_disk(mut self, usage_percent: f64, read_iops: f64, write_iops: f64) -> Self {
        self.metrics.disk = Some(DiskMetrics {
            usage_percent: Some(usage_percent),
            read_iops: Some(read_iops),
            write_iops: Some(write_iops),
        });
        self
    }

    pub fn with_latency(mut self, latency_ms: f64) -> Self {
        let network = self.metrics.network.get_or_insert_with(NetworkMetrics::default);
        network.latency_ms = Some(latency_ms);
        self
    }

    pub fn with_network_errors(mut self, rx_errors: u64, tx_errors: u64) -> Self {
        let network = self.metrics.network.get_or_insert_with(NetworkMetrics::default);
        network.rx_errors = Some(rx_errors);
        network.tx_errors = Some(tx_errors);
        self
    }

    pub fn with_service(mut self, name: impl Into<String>, state: ServiceState) -> Self {
        self.services.insert(name.into(), state);
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.errors.push(message.into());
        self
    }

    pub fn cpu_usage(&self) -> Option<f64> {
        self.metrics.cpu.as_ref()?.usage_percent.filter(|v| v.is_finite())
    }

    pub fn memory_usage(&self) -> Option<f64> {
        self.metrics.memory.as_ref()?.usage_percent.filter(|v| v.is_finite())
    }

    pub fn disk_usage(&self) -> Option<f64> {
        self.metrics.disk.as_ref()?.usage_percent.filter(|v| v.is_finite())
    }

    /// Combined read + write IOPS; `None` unless both counters are present.
    pub fn total_iops(&self) -> Option<f64> {
        let disk = self.metrics.disk.as_ref()?;
        let total = disk.read_iops? + disk.write_iops?;
        total.is_finite().then_some(total)
    }

    pub fn network_latency(&self) -> Option<f64> {
        self.metrics.network.as_ref()?.latency_ms.filter(|v| v.is_finite())
    }

    /// Combined rx + tx error count; `None` unless both counters are present.
    pub fn network_errors(&self) -> Option<u64> {
        let network = self.metrics.network.as_ref()?;
        Some(network.rx_errors?.saturating_add(network.tx_errors?))
    }

    /// Names of services currently reported as stopped.
    pub fn stopped_services(&self) -> Vec<&str> {
        self.services
            .iter()
            .filter(|(_, state)| **state == ServiceState::Stopped)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Whether any of the core detection inputs is absent.
    pub fn is_partial(&self) -> bool {
        self.cpu_usage().is_none()
            || self.memory_usage().is_none()
            || self.disk_usage().is_none()
            || self.total_iops().is_none()
            || self.network_latency().is_none()
    }
}

/// Half-open analysis interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimeRange {
    /// Build a range, rejecting `start > end`. An empty range (`start == end`)
    /// is valid and simply contains nothing.
    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self, CoreError> {
        if start > end {
            return Err(CoreError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// The range of the given length ending at `end`.
    ///
    /// Fails when `length` is negative or reaches past the earliest
    /// representable timestamp.
    pub fn ending_at(end: Timestamp, length: chrono::Duration) -> Result<Self, CoreError> {
        let start = end.checked_sub_signed(length).ok_or_else(|| {
            CoreError::Validation(format!("range length {length} reaches before {end}"))
        })?;
        Self::new(start, end)
    }

    pub fn contains(&self, ts: Timestamp) -> bool {
        self.start <= ts && ts < self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
