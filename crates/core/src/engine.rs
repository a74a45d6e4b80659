//! Timeline analysis engine.
//!
//! [`TimelineAnalyzer`] runs the whole pipeline for one time range:
//!
//! 1. group the metric history by server,
//! 2. run detection for every in-range snapshot, one server per rayon task,
//! 3. merge every server's events into one chronological list (barrier),
//! 4. build and optimise the causal chain,
//! 5. classify propagation, infer the root cause and score business impact.
//!
//! The engine holds no state between runs and never mutates the history it
//! is given.

use std::collections::BTreeMap;

use chrono::Utc;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::alert::{Alert, Severity};
use crate::config::EngineConfig;
use crate::correlation::{
    build_chronological_event_map, derive_events, CausalChainBuilder, CausalChainSegment, Event,
};
use crate::detection::anomaly::Anomaly;
use crate::detection::health::HealthStatus;
use crate::detection::{detect_snapshot, SnapshotDetection};
use crate::error::CoreError;
use crate::impact::{calculate_business_impact, BusinessImpact};
use crate::propagation::analyze_propagation;
use crate::root_cause::{infer_root_cause, IncidentStatus, RootCauseAnalysis};
use crate::snapshot::{MetricSnapshot, TimeRange};
use crate::types::{ServerId, Timestamp};

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Detection summary for the most recent in-range snapshot of one server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerHealth {
    pub server_id: ServerId,
    pub timestamp: Timestamp,
    pub health_score: f64,
    pub status: HealthStatus,
    pub active_alerts: Vec<Alert>,
    pub active_anomalies: Vec<Anomaly>,
}

/// Counters for the non-fatal conditions met during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisDiagnostics {
    pub snapshots_analyzed: usize,
    pub events_correlated: usize,
    pub servers_with_insufficient_history: usize,
    pub partial_snapshots: usize,
    pub dropped_segments: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineAnalysis {
    pub analysis_id: Uuid,
    pub generated_at: Timestamp,
    pub timeline_period: TimeRange,
    pub causal_chain: Vec<CausalChainSegment>,
    pub root_cause_analysis: RootCauseAnalysis,
    pub business_impact: BusinessImpact,
    pub server_health: Vec<ServerHealth>,
    pub diagnostics: AnalysisDiagnostics,
}

impl TimelineAnalysis {
    /// Segments triggered by a critical event.
    pub fn critical_segments(&self) -> Vec<&CausalChainSegment> {
        self.causal_chain
            .iter()
            .filter(|s| s.trigger_event.severity == Severity::Critical)
            .collect()
    }

    pub fn has_critical_incident(&self) -> bool {
        self.causal_chain
            .iter()
            .any(|s| s.trigger_event.severity == Severity::Critical)
    }

    pub fn is_stable(&self) -> bool {
        self.root_cause_analysis.status == IncidentStatus::Stable
    }
}

// ---------------------------------------------------------------------------
// Engine contract
// ---------------------------------------------------------------------------

/// Produces a [`TimelineAnalysis`] for a time range over a metric history.
pub trait IncidentAnalyzer: Send + Sync {
    /// `history` may contain snapshots before `range.start`; those serve only
    /// as a statistical baseline. Snapshots at or after `range.end` are
    /// ignored.
    fn analyze(
        &self,
        range: TimeRange,
        history: &[MetricSnapshot],
    ) -> Result<TimelineAnalysis, CoreError>;
}

#[derive(Debug)]
pub struct TimelineAnalyzer {
    config: EngineConfig,
}

/// Detection output of one server for one run.
#[derive(Default)]
struct ServerDetections {
    events: Vec<Event>,
    latest: Option<SnapshotDetection>,
    analyzed: usize,
    partial: usize,
    insufficient_history: bool,
}

impl TimelineAnalyzer {
    /// Build an analyzer, rejecting an inconsistent policy table.
    pub fn new(config: EngineConfig) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Per-server snapshot lists, sorted by timestamp, cut at `end`.
    fn group_by_server(
        history: &[MetricSnapshot],
        end: Timestamp,
    ) -> BTreeMap<ServerId, Vec<MetricSnapshot>> {
        let mut grouped: BTreeMap<ServerId, Vec<MetricSnapshot>> = BTreeMap::new();
        for snapshot in history.iter().filter(|s| s.timestamp < end) {
            grouped
                .entry(snapshot.server_id.clone())
                .or_default()
                .push(snapshot.clone());
        }
        for snapshots in grouped.values_mut() {
            snapshots.sort_by_key(|s| s.timestamp);
        }
        grouped
    }

    /// Run detection on every in-range snapshot of one server, using the
    /// server's earlier snapshots as history.
    fn detect_server(&self, range: &TimeRange, snapshots: &[MetricSnapshot]) -> ServerDetections {
        let mut out = ServerDetections::default();

        for (i, current) in snapshots.iter().enumerate() {
            if !range.contains(current.timestamp) {
                continue;
            }
            let detection = detect_snapshot(current, &snapshots[..i], &self.config);

            out.analyzed += 1;
            if detection.partial {
                out.partial += 1;
            }
            out.insufficient_history |= detection.insufficient_history;
            out.events
                .extend(derive_events(current, &detection, &self.config.thresholds));
            out.latest = Some(detection);
        }

        out
    }

    fn server_health(&self, detection: SnapshotDetection) -> ServerHealth {
        ServerHealth {
            status: HealthStatus::from_score(detection.health_score, &self.config.health),
            server_id: detection.server_id,
            timestamp: detection.timestamp,
            health_score: detection.health_score,
            active_alerts: detection.alerts,
            active_anomalies: detection.anomalies,
        }
    }
}

impl IncidentAnalyzer for TimelineAnalyzer {
    fn analyze(
        &self,
        range: TimeRange,
        history: &[MetricSnapshot],
    ) -> Result<TimelineAnalysis, CoreError> {
        if range.start > range.end {
            return Err(CoreError::InvalidRange {
                start: range.start,
                end: range.end,
            });
        }

        let grouped = Self::group_by_server(history, range.end);

        // Fan out per server; collecting is the barrier before correlation.
        let per_server: Vec<ServerDetections> = grouped
            .par_iter()
            .map(|(_, snapshots)| self.detect_server(&range, snapshots))
            .collect();

        let mut diagnostics = AnalysisDiagnostics::default();
        let mut server_health = Vec::new();
        let mut event_lists = Vec::with_capacity(per_server.len());
        for detections in per_server {
            diagnostics.snapshots_analyzed += detections.analyzed;
            diagnostics.partial_snapshots += detections.partial;
            if detections.insufficient_history {
                diagnostics.servers_with_insufficient_history += 1;
            }
            if let Some(latest) = detections.latest {
                server_health.push(self.server_health(latest));
            }
            event_lists.push(detections.events);
        }

        let events = build_chronological_event_map(event_lists);
        diagnostics.events_correlated = events.len();
        tracing::debug!(
            servers = grouped.len(),
            snapshots = diagnostics.snapshots_analyzed,
            events = events.len(),
            "Detection complete"
        );

        let build = CausalChainBuilder::new(&self.config.correlation).build(&events);
        diagnostics.dropped_segments = build.dropped_segments;
        let causal_chain = build.chain;

        let propagation = analyze_propagation(&causal_chain, &self.config.propagation);
        let root_cause_analysis =
            infer_root_cause(&causal_chain, propagation, &self.config.root_cause);
        let business_impact = calculate_business_impact(&causal_chain, &self.config.impact);

        tracing::info!(
            start = %range.start,
            end = %range.end,
            segments = causal_chain.len(),
            status = ?root_cause_analysis.status,
            impact = business_impact.total_impact_score,
            "Timeline analysis complete"
        );

        Ok(TimelineAnalysis {
            analysis_id: Uuid::now_v7(),
            generated_at: Utc::now(),
            timeline_period: range,
            causal_chain,
            root_cause_analysis,
            business_impact,
            server_health,
            diagnostics,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
