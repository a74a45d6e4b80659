//! Engine policy table.
//!
//! Every tunable number the analysis pipeline uses lives here: detection
//! thresholds, statistical and pattern limits, health penalties, correlation
//! bonuses, root-cause discounting and business-impact buckets. The defaults
//! reproduce the dashboard's established behaviour.
//!
//! The impact bucket and user-impact band boundaries have no empirical
//! derivation behind them; they are placeholder policy pending real business
//! data.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::threshold_validation::{validate_ordered, validate_positive, validate_unit_range};

/// Upper bound for every correlation window (one day).
pub const MAX_WINDOW_MS: i64 = 86_400_000;

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// A warning/critical pair for a single metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub warning: f64,
    pub critical: f64,
}

impl Threshold {
    pub const fn new(warning: f64, critical: f64) -> Self {
        Self { warning, critical }
    }
}

/// Static thresholds used by [`check_thresholds`](crate::detection::thresholds::check_thresholds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdPolicy {
    pub cpu_usage_percent: Threshold,
    pub memory_usage_percent: Threshold,
    pub disk_usage_percent: Threshold,
    pub network_latency_ms: Threshold,
    /// Combined rx + tx error count above which a `network_errors` event is raised.
    pub network_error_count: f64,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            cpu_usage_percent: Threshold::new(80.0, 95.0),
            memory_usage_percent: Threshold::new(85.0, 95.0),
            disk_usage_percent: Threshold::new(85.0, 95.0),
            network_latency_ms: Threshold::new(200.0, 500.0),
            network_error_count: 100.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Statistical / pattern detection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticalPolicy {
    /// Minimum number of historical points before z-scores are computed.
    pub min_history: usize,
    /// |z| above which an anomaly is reported.
    pub z_warning: f64,
    /// |z| above which the anomaly is critical.
    pub z_critical: f64,
}

impl Default for StatisticalPolicy {
    fn default() -> Self {
        Self {
            min_history: 10,
            z_warning: 2.5,
            z_critical: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternPolicy {
    /// Number of trailing memory points inspected for a leak.
    pub leak_window: usize,
    /// Extrapolated hourly growth (percent) above which a leak is reported.
    pub leak_growth_percent_per_hour: f64,
    /// Number of trailing CPU points averaged for spike detection.
    pub spike_lookback: usize,
    /// Current CPU must exceed this multiple of the recent mean.
    pub spike_multiplier: f64,
    /// Current CPU must also exceed this absolute floor.
    pub spike_floor_percent: f64,
    pub iops: Threshold,
}

impl Default for PatternPolicy {
    fn default() -> Self {
        Self {
            leak_window: 6,
            leak_growth_percent_per_hour: 5.0,
            spike_lookback: 3,
            spike_multiplier: 2.0,
            spike_floor_percent: 70.0,
            iops: Threshold::new(3000.0, 4500.0),
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthPolicy {
    pub critical_alert_penalty: f64,
    pub warning_alert_penalty: f64,
    pub critical_anomaly_penalty: f64,
    pub warning_anomaly_penalty: f64,
    /// Scores at or above this are `healthy`.
    pub healthy_floor: f64,
    /// Scores at or above this (and below `healthy_floor`) are `degraded`.
    pub degraded_floor: f64,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            critical_alert_penalty: 25.0,
            warning_alert_penalty: 10.0,
            critical_anomaly_penalty: 15.0,
            warning_anomaly_penalty: 5.0,
            healthy_floor: 80.0,
            degraded_floor: 50.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Correlation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationPolicy {
    /// Two events within this many milliseconds are potentially related.
    pub window_ms: i64,
    pub base_confidence: f64,
    /// Mean |dt| below this earns `tight_bonus`.
    pub tight_window_ms: i64,
    pub tight_bonus: f64,
    /// Mean |dt| below this (but not tight) earns `loose_bonus`.
    pub loose_window_ms: i64,
    pub loose_bonus: f64,
    /// Added when an effect server depends on the trigger's tier.
    pub dependency_bonus: f64,
}

impl Default for CorrelationPolicy {
    fn default() -> Self {
        Self {
            window_ms: 300_000,
            base_confidence: 0.5,
            tight_window_ms: 60_000,
            tight_bonus: 0.3,
            loose_window_ms: 300_000,
            loose_bonus: 0.2,
            dependency_bonus: 0.2,
        }
    }
}

// ---------------------------------------------------------------------------
// Propagation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationPolicy {
    /// A radial pattern needs strictly more distinct servers than this.
    pub radial_min_servers: usize,
    /// Distinct servers over total server mentions must exceed this.
    pub radial_unique_ratio: f64,
}

impl Default for PropagationPolicy {
    fn default() -> Self {
        Self {
            radial_min_servers: 3,
            radial_unique_ratio: 0.7,
        }
    }
}

// ---------------------------------------------------------------------------
// Root cause
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootCausePolicy {
    /// Confidence discount applied per chain segment.
    pub discount_per_segment: f64,
    /// The discount factor never drops below this.
    pub min_discount_factor: f64,
}

impl Default for RootCausePolicy {
    fn default() -> Self {
        Self {
            discount_per_segment: 0.05,
            min_discount_factor: 0.5,
        }
    }
}

// ---------------------------------------------------------------------------
// Business impact
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactPolicy {
    pub critical_trigger_score: f64,
    pub warning_trigger_score: f64,
    pub max_score: f64,
    /// Availability percentage lost per critical trigger.
    pub availability_penalty: f64,
    /// Response-time degradation percentage added per warning trigger.
    pub degradation_per_warning: f64,
    pub severe_revenue_above: f64,
    pub significant_revenue_above: f64,
    pub minor_revenue_above: f64,
    pub severe_outage_below_availability: f64,
    pub broad_degradation_below_availability: f64,
    pub response_time_impact_from_degradation: f64,
}

impl Default for ImpactPolicy {
    fn default() -> Self {
        Self {
            critical_trigger_score: 30.0,
            warning_trigger_score: 10.0,
            max_score: 100.0,
            availability_penalty: 15.0,
            degradation_per_warning: 10.0,
            severe_revenue_above: 80.0,
            significant_revenue_above: 50.0,
            minor_revenue_above: 20.0,
            severe_outage_below_availability: 50.0,
            broad_degradation_below_availability: 85.0,
            response_time_impact_from_degradation: 20.0,
        }
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Complete policy table for one [`TimelineAnalyzer`](crate::engine::TimelineAnalyzer).
///
/// Deserializes from partial JSON: any omitted section or field keeps its
/// default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub thresholds: ThresholdPolicy,
    pub statistical: StatisticalPolicy,
    pub patterns: PatternPolicy,
    pub health: HealthPolicy,
    pub correlation: CorrelationPolicy,
    pub propagation: PropagationPolicy,
    pub root_cause: RootCausePolicy,
    pub impact: ImpactPolicy,
}

impl EngineConfig {
    /// Parse a (possibly partial) JSON policy document and validate it.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CoreError::Validation(format!("Invalid engine config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject internally inconsistent policies.
    pub fn validate(&self) -> Result<(), CoreError> {
        let t = &self.thresholds;
        for (threshold, name) in [
            (t.cpu_usage_percent, "thresholds.cpu_usage_percent"),
            (t.memory_usage_percent, "thresholds.memory_usage_percent"),
            (t.disk_usage_percent, "thresholds.disk_usage_percent"),
            (t.network_latency_ms, "thresholds.network_latency_ms"),
            (self.patterns.iops, "patterns.iops"),
        ] {
            validate_positive(threshold.warning, name)?;
            validate_ordered(threshold.warning, threshold.critical, name)?;
        }

        let s = &self.statistical;
        if s.min_history < 2 {
            return Err(CoreError::Validation(
                "statistical.min_history must be at least 2".to_string(),
            ));
        }
        validate_positive(s.z_warning, "statistical.z_warning")?;
        validate_ordered(s.z_warning, s.z_critical, "statistical.z")?;

        let p = &self.patterns;
        if p.leak_window < 2 || p.spike_lookback == 0 {
            return Err(CoreError::Validation(
                "patterns.leak_window must be >= 2 and patterns.spike_lookback >= 1".to_string(),
            ));
        }
        validate_positive(p.spike_multiplier, "patterns.spike_multiplier")?;

        let h = &self.health;
        validate_ordered(h.degraded_floor, h.healthy_floor, "health floors")?;

        let c = &self.correlation;
        for (window, name) in [
            (c.window_ms, "correlation.window_ms"),
            (c.tight_window_ms, "correlation.tight_window_ms"),
            (c.loose_window_ms, "correlation.loose_window_ms"),
        ] {
            if window <= 0 || window > MAX_WINDOW_MS {
                return Err(CoreError::Validation(format!(
                    "{name} must be between 1 and {MAX_WINDOW_MS} ms, got {window}"
                )));
            }
        }
        if c.tight_window_ms > c.loose_window_ms {
            return Err(CoreError::Validation(format!(
                "correlation.tight_window_ms ({}) must not exceed loose_window_ms ({})",
                c.tight_window_ms, c.loose_window_ms
            )));
        }
        validate_unit_range(c.base_confidence, "correlation.base_confidence")?;
        validate_unit_range(c.tight_bonus, "correlation.tight_bonus")?;
        validate_unit_range(c.loose_bonus, "correlation.loose_bonus")?;
        validate_unit_range(c.dependency_bonus, "correlation.dependency_bonus")?;

        validate_unit_range(
            self.propagation.radial_unique_ratio,
            "propagation.radial_unique_ratio",
        )?;

        let r = &self.root_cause;
        validate_unit_range(r.discount_per_segment, "root_cause.discount_per_segment")?;
        validate_unit_range(r.min_discount_factor, "root_cause.min_discount_factor")?;

        let i = &self.impact;
        validate_positive(i.max_score, "impact.max_score")?;
        validate_ordered(i.minor_revenue_above, i.significant_revenue_above, "impact.minor")?;
        validate_ordered(
            i.significant_revenue_above,
            i.severe_revenue_above,
            "impact.significant",
        )?;
        validate_ordered(
            i.severe_outage_below_availability,
            i.broad_degradation_below_availability,
            "impact.availability bands",
        )?;

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
