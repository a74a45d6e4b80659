//! Canonical metric name constants.
//!
//! Used as keys in [`Event::metric_values`](crate::correlation::event::Event)
//! and in alert/anomaly descriptions so that the report collaborator can
//! look values up without knowing the snapshot layout.

/// CPU utilisation percentage (0-100).
pub const METRIC_CPU_USAGE: &str = "cpu_usage_percent";

/// Memory utilisation percentage (0-100).
pub const METRIC_MEMORY_USAGE: &str = "memory_usage_percent";

/// Disk space utilisation percentage (0-100).
pub const METRIC_DISK_USAGE: &str = "disk_usage_percent";

/// Combined disk read + write operations per second.
pub const METRIC_DISK_IOPS: &str = "disk_total_iops";

/// Network round-trip latency in milliseconds.
pub const METRIC_NETWORK_LATENCY: &str = "network_latency_ms";

/// Sum of receive and transmit error counters.
pub const METRIC_NETWORK_ERRORS: &str = "network_errors";

/// Hourly memory growth rate in percent, as extrapolated by leak detection.
pub const METRIC_MEMORY_GROWTH_RATE: &str = "memory_growth_rate_percent";

/// Ratio of the current CPU value to its recent mean.
pub const METRIC_CPU_SPIKE_RATIO: &str = "cpu_spike_ratio";

/// Absolute z-score of a statistical deviation.
pub const METRIC_Z_SCORE: &str = "z_score";

/// Number of services reported as stopped.
pub const METRIC_STOPPED_SERVICES: &str = "stopped_services";
