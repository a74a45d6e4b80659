//! Correlation events.
//!
//! An [`Event`] is the atomic unit fed into correlation: one notable finding
//! on one server at one instant. Events are derived from threshold alerts,
//! anomalies, stopped services, timeout error messages and network error
//! counters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::alert::{Alert, AlertType, Severity};
use crate::config::ThresholdPolicy;
use crate::detection::anomaly::{Anomaly, AnomalyKind, MetricKind};
use crate::detection::SnapshotDetection;
use crate::metric_names::{
    METRIC_CPU_SPIKE_RATIO, METRIC_DISK_IOPS, METRIC_MEMORY_GROWTH_RATE, METRIC_NETWORK_ERRORS,
    METRIC_STOPPED_SERVICES, METRIC_Z_SCORE,
};
use crate::snapshot::MetricSnapshot;
use crate::tier::ServiceTier;
use crate::types::{ServerId, Timestamp};

/// Substrings (lowercase) that mark an error message as a connection timeout.
const TIMEOUT_MARKERS: &[&str] = &["timeout", "timed out"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    HighCpu,
    MemoryPressure,
    DiskPressure,
    NetworkLatency,
    CpuSpike,
    MemoryLeak,
    DiskIoBottleneck,
    CpuDeviation,
    MemoryDeviation,
    DiskDeviation,
    ServiceDown,
    ConnectionTimeout,
    NetworkErrors,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::HighCpu => "high_cpu",
            EventType::MemoryPressure => "memory_pressure",
            EventType::DiskPressure => "disk_pressure",
            EventType::NetworkLatency => "network_latency",
            EventType::CpuSpike => "cpu_spike",
            EventType::MemoryLeak => "memory_leak",
            EventType::DiskIoBottleneck => "disk_io_bottleneck",
            EventType::CpuDeviation => "cpu_deviation",
            EventType::MemoryDeviation => "memory_deviation",
            EventType::DiskDeviation => "disk_deviation",
            EventType::ServiceDown => "service_down",
            EventType::ConnectionTimeout => "connection_timeout",
            EventType::NetworkErrors => "network_errors",
        }
    }

    fn from_alert(alert_type: AlertType) -> Self {
        match alert_type {
            AlertType::HighCpu => EventType::HighCpu,
            AlertType::HighMemory => EventType::MemoryPressure,
            AlertType::HighDisk => EventType::DiskPressure,
            AlertType::HighLatency => EventType::NetworkLatency,
        }
    }

    fn from_anomaly(anomaly: &Anomaly) -> Self {
        match (anomaly.kind, anomaly.metric) {
            (AnomalyKind::MemoryLeak, _) => EventType::MemoryLeak,
            (AnomalyKind::CpuSpike, _) => EventType::CpuSpike,
            (AnomalyKind::DiskIoBottleneck, _) => EventType::DiskIoBottleneck,
            (AnomalyKind::StatisticalDeviation, MetricKind::Cpu) => EventType::CpuDeviation,
            (AnomalyKind::StatisticalDeviation, MetricKind::Memory) => EventType::MemoryDeviation,
            (AnomalyKind::StatisticalDeviation, MetricKind::Disk | MetricKind::DiskIops) => {
                EventType::DiskDeviation
            }
            (AnomalyKind::StatisticalDeviation, MetricKind::Network) => EventType::NetworkLatency,
        }
    }
}

/// One notable finding on one server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: Timestamp,
    pub server_id: ServerId,
    pub event_type: EventType,
    pub severity: Severity,
    pub metric_values: BTreeMap<String, f64>,
    pub description: String,
}

impl Event {
    pub fn tier(&self) -> ServiceTier {
        ServiceTier::from_server_id(&self.server_id)
    }

    /// Deduplication key used by chain optimisation.
    pub fn key(&self) -> (&str, EventType) {
        (self.server_id.as_str(), self.event_type)
    }

    fn from_alert(server_id: &str, alert: &Alert) -> Self {
        Self {
            timestamp: alert.timestamp,
            server_id: server_id.to_string(),
            event_type: EventType::from_alert(alert.alert_type),
            severity: alert.severity,
            metric_values: BTreeMap::from([(
                alert.alert_type.metric_name().to_string(),
                alert.value,
            )]),
            description: alert.description.clone(),
        }
    }

    fn from_anomaly(server_id: &str, timestamp: Timestamp, anomaly: &Anomaly) -> Self {
        let measure_name = match anomaly.kind {
            AnomalyKind::StatisticalDeviation => METRIC_Z_SCORE,
            AnomalyKind::MemoryLeak => METRIC_MEMORY_GROWTH_RATE,
            AnomalyKind::CpuSpike => METRIC_CPU_SPIKE_RATIO,
            AnomalyKind::DiskIoBottleneck => METRIC_DISK_IOPS,
        };
        let mut metric_values = BTreeMap::new();
        metric_values.insert(anomaly.metric.metric_name().to_string(), anomaly.observed);
        metric_values.insert(measure_name.to_string(), anomaly.measure.value());

        Self {
            timestamp,
            server_id: server_id.to_string(),
            event_type: EventType::from_anomaly(anomaly),
            severity: anomaly.severity,
            metric_values,
            description: anomaly.description.clone(),
        }
    }
}

/// Turn one snapshot's detection results into correlation events.
///
/// When two findings map to the same event type (a threshold alert and a
/// z-score deviation never do, but custom policies might), only the most
/// severe is kept so that a snapshot contributes at most one event per type.
pub fn derive_events(
    snapshot: &MetricSnapshot,
    detection: &SnapshotDetection,
    thresholds: &ThresholdPolicy,
) -> Vec<Event> {
    let server_id = snapshot.server_id.as_str();
    let mut events: Vec<Event> = detection
        .alerts
        .iter()
        .map(|alert| Event::from_alert(server_id, alert))
        .chain(
            detection
                .anomalies
                .iter()
                .map(|anomaly| Event::from_anomaly(server_id, snapshot.timestamp, anomaly)),
        )
        .collect();

    let stopped = snapshot.stopped_services();
    if !stopped.is_empty() {
        events.push(Event {
            timestamp: snapshot.timestamp,
            server_id: server_id.to_string(),
            event_type: EventType::ServiceDown,
            severity: Severity::Critical,
            metric_values: BTreeMap::from([(
                METRIC_STOPPED_SERVICES.to_string(),
                stopped.len() as f64,
            )]),
            description: format!("Services stopped on {server_id}: {}", stopped.join(", ")),
        });
    }

    let timeouts: Vec<&str> = snapshot
        .errors
        .iter()
        .filter(|msg| {
            let lower = msg.to_lowercase();
            TIMEOUT_MARKERS.iter().any(|m| lower.contains(m))
        })
        .map(String::as_str)
        .collect();
    if !timeouts.is_empty() {
        events.push(Event {
            timestamp: snapshot.timestamp,
            server_id: server_id.to_string(),
            event_type: EventType::ConnectionTimeout,
            severity: Severity::Warning,
            metric_values: BTreeMap::new(),
            description: format!("Connection timeouts on {server_id}: {}", timeouts.join("; ")),
        });
    }

    if let Some(errors) = snapshot.network_errors() {
        if errors as f64 > thresholds.network_error_count {
            events.push(Event {
                timestamp: snapshot.timestamp,
                server_id: server_id.to_string(),
                event_type: EventType::NetworkErrors,
                severity: Severity::Warning,
                metric_values: BTreeMap::from([(METRIC_NETWORK_ERRORS.to_string(), errors as f64)]),
                description: format!("{errors} network interface errors on {server_id}"),
            });
        }
    }

    // Keep the most severe event per type.
    events.sort_by(|a, b| {
        a.event_type
            .cmp(&b.event_type)
            .then_with(|| b.severity.cmp(&a.severity))
    });
    events.dedup_by(|later, earlier| later.event_type == earlier.event_type);
    events
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::config::EngineConfig;
    use crate::detection::detect_snapshot;
    use crate::snapshot::ServiceState;

    fn events_for(snapshot: &MetricSnapshot) -> Vec<Event> {
        let config = EngineConfig::default();
        let detection = detect_snapshot(snapshot, &[], &config);
        derive_events(snapshot, &detection, &config.thresholds)
    }

    #[test]
    fn alerts_become_typed_events() {
        let snap = MetricSnapshot::new("db-01", Utc::now()).with_cpu(96.0).with_memory(90.0);
        let events = events_for(&snap);
        let types: Vec<_> = events.iter().map(|e| e.event_type).collect();
        assert_eq!(types, vec![EventType::HighCpu, EventType::MemoryPressure]);
        assert_eq!(events[0].severity, Severity::Critical);
        assert_eq!(events[0].metric_values["cpu_usage_percent"], 96.0);
        assert_eq!(events[1].severity, Severity::Warning);
    }

    #[test]
    fn iops_anomaly_becomes_bottleneck_event() {
        let snap = MetricSnapshot::new("db-01", Utc::now()).with_disk(30.0, 2500.0, 2500.0);
        let events = events_for(&snap);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::DiskIoBottleneck);
        assert_eq!(events[0].metric_values["disk_total_iops"], 5000.0);
    }

    #[test]
    fn stopped_services_and_timeouts_become_events() {
        let snap = MetricSnapshot::new("api-01", Utc::now())
            .with_service("gateway", ServiceState::Stopped)
            .with_service("auth", ServiceState::Running)
            .with_error("upstream request Timed Out after 30s")
            .with_error("disk quota warning");
        let events = events_for(&snap);
        let types: Vec<_> = events.iter().map(|e| e.event_type).collect();
        assert_eq!(types, vec![EventType::ServiceDown, EventType::ConnectionTimeout]);
        assert!(events[0].description.contains("gateway"));
        assert!(!events[1].description.contains("disk quota"));
    }

    #[test]
    fn network_errors_above_limit_become_event() {
        let quiet = MetricSnapshot::new("web-01", Utc::now()).with_network_errors(10, 10);
        assert!(events_for(&quiet).is_empty());

        let noisy = MetricSnapshot::new("web-01", Utc::now()).with_network_errors(80, 40);
        let events = events_for(&noisy);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::NetworkErrors);
    }

    #[test]
    fn healthy_snapshot_yields_no_events() {
        let snap = MetricSnapshot::new("web-01", Utc::now())
            .with_cpu(20.0)
            .with_memory(30.0)
            .with_disk(40.0, 100.0, 100.0)
            .with_latency(15.0);
        assert!(events_for(&snap).is_empty());
    }

    #[test]
    fn event_type_names_match_serde() {
        let json = serde_json::to_value(EventType::DiskIoBottleneck).unwrap();
        assert_eq!(json, EventType::DiskIoBottleneck.as_str());
    }
}
