//! Report hand-off subscriber.
//!
//! [`ReportLog`] subscribes to the [`EventBus`](crate::bus::EventBus) and
//! emits one structured log record per finished analysis. The report and
//! narrative collaborators consume these records; the full analysis JSON is
//! logged at `debug` level. The loop ends when the bus is dropped.

use kestrel_core::detection::health::HealthStatus;
use kestrel_core::impact::RevenueImpact;
use kestrel_core::root_cause::{IncidentStatus, RootCauseCategory};
use kestrel_core::{TimeRange, TimelineAnalysis};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::bus::{AnalysisEvent, Cadence};

/// Condensed view of a [`TimelineAnalysis`] for log-based reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub analysis_id: String,
    pub timeline_period: TimeRange,
    pub segments: usize,
    pub status: IncidentStatus,
    pub primary_root_cause: Option<RootCauseCategory>,
    pub confidence: f64,
    pub total_impact_score: f64,
    pub revenue_impact_bucket: RevenueImpact,
    pub affected_services: usize,
    /// Servers whose latest snapshot is in the critical health band.
    pub critical_servers: Vec<String>,
}

impl ReportSummary {
    pub fn from_analysis(analysis: &TimelineAnalysis) -> Self {
        let rca = &analysis.root_cause_analysis;
        Self {
            analysis_id: analysis.analysis_id.to_string(),
            timeline_period: analysis.timeline_period,
            segments: analysis.causal_chain.len(),
            status: rca.status,
            primary_root_cause: rca.primary_root_cause.as_ref().map(|h| h.category),
            confidence: rca.confidence,
            total_impact_score: analysis.business_impact.total_impact_score,
            revenue_impact_bucket: analysis.business_impact.revenue_impact_bucket,
            affected_services: analysis.business_impact.affected_services.len(),
            critical_servers: analysis
                .server_health
                .iter()
                .filter(|h| h.status == HealthStatus::Critical)
                .map(|h| h.server_id.clone())
                .collect(),
        }
    }
}

/// Background service that logs analysis results for the report collaborator.
pub struct ReportLog;

impl ReportLog {
    /// Run the logging loop until the channel is closed.
    pub async fn run(mut receiver: broadcast::Receiver<AnalysisEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => Self::record(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Report log lagged, some analyses were not logged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, report log shutting down");
                    break;
                }
            }
        }
    }

    fn record(event: &AnalysisEvent) {
        match event {
            AnalysisEvent::AnalysisCompleted { cadence, analysis } => {
                Self::record_completed(*cadence, analysis);
            }
            AnalysisEvent::CriticalIncident { analysis } => {
                let triggers: Vec<&str> = analysis
                    .critical_segments()
                    .iter()
                    .map(|s| s.trigger_event.server_id.as_str())
                    .collect();
                tracing::warn!(
                    analysis_id = %analysis.analysis_id,
                    critical_segments = triggers.len(),
                    triggers = ?triggers,
                    summary = %analysis.root_cause_analysis.summary,
                    "Critical incident detected"
                );
            }
            AnalysisEvent::RunSkipped { cadence, at } => {
                tracing::warn!(
                    cadence = cadence.as_str(),
                    at = %at,
                    "Analysis run skipped, previous run still in progress"
                );
            }
        }
    }

    fn record_completed(cadence: Cadence, analysis: &TimelineAnalysis) {
        let summary = ReportSummary::from_analysis(analysis);
        tracing::info!(
            cadence = cadence.as_str(),
            analysis_id = %summary.analysis_id,
            segments = summary.segments,
            status = ?summary.status,
            root_cause = ?summary.primary_root_cause,
            confidence = summary.confidence,
            impact = summary.total_impact_score,
            revenue = ?summary.revenue_impact_bucket,
            critical_servers = ?summary.critical_servers,
            "Analysis report"
        );

        match serde_json::to_string(analysis) {
            Ok(json) => {
                tracing::debug!(
                    analysis_id = %summary.analysis_id,
                    report = %json,
                    "Analysis report body"
                )
            }
            Err(e) => tracing::error!(error = %e, "Failed to serialize analysis report"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
