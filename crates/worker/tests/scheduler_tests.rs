//! Integration tests for the analysis scheduler.
//!
//! The scheduler is driven directly through `run_once` and `try_start`; a
//! gated metric source holds a run in flight so that overlapping ticks can be
//! observed.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use kestrel_core::{
    CoreError, EngineConfig, IncidentAnalyzer, MetricSnapshot, TimeRange, TimelineAnalysis,
    TimelineAnalyzer,
};
use kestrel_events::{AnalysisEvent, Cadence, EventBus};
use kestrel_worker::{
    AnalysisScheduler, HistorySource, IngestError, MetricHistory, MetricSource, RunError,
    ScheduleSettings,
};
use tokio::sync::{broadcast, Semaphore};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn at(secs: i64) -> DateTime<Utc> {
    t0() + chrono::Duration::seconds(secs)
}

fn settings() -> ScheduleSettings {
    ScheduleSettings {
        full_analysis_interval: Duration::from_secs(3600),
        critical_scan_interval: Duration::from_secs(60),
        full_analysis_range: chrono::Duration::hours(1),
        critical_scan_range: chrono::Duration::minutes(10),
        statistical_lookback: chrono::Duration::hours(1),
    }
}

fn analyzer() -> Arc<dyn IncidentAnalyzer> {
    Arc::new(TimelineAnalyzer::new(EngineConfig::default()).unwrap())
}

/// Database CPU saturation followed by slow web servers.
fn cascade() -> Vec<MetricSnapshot> {
    vec![
        MetricSnapshot::new("db-01", at(0)).with_cpu(96.0),
        MetricSnapshot::new("web-01", at(60)).with_latency(600.0),
        MetricSnapshot::new("web-02", at(120)).with_latency(550.0),
    ]
}

async fn history_source(snapshots: Vec<MetricSnapshot>) -> Arc<dyn MetricSource> {
    let history = MetricHistory::shared(100);
    history.write().await.ingest_all(snapshots);
    Arc::new(HistorySource::new(history))
}

fn drain(rx: &mut broadcast::Receiver<AnalysisEvent>) -> Vec<AnalysisEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Blocks every fetch until the test hands out a permit.
struct GatedSource {
    gate: Arc<Semaphore>,
}

#[async_trait]
impl MetricSource for GatedSource {
    async fn fetch(&self, _range: TimeRange) -> Result<Vec<MetricSnapshot>, IngestError> {
        let permit = self.gate.acquire().await.expect("gate closed");
        permit.forget();
        Ok(Vec::new())
    }
}

struct FailingAnalyzer;

impl IncidentAnalyzer for FailingAnalyzer {
    fn analyze(
        &self,
        _range: TimeRange,
        _history: &[MetricSnapshot],
    ) -> Result<TimelineAnalysis, CoreError> {
        Err(CoreError::Internal("engine unavailable".into()))
    }
}

// ---------------------------------------------------------------------------
// Test: critical scan publishes completion and a critical incident
// ---------------------------------------------------------------------------

/// A critical scan over a cascade with a critical trigger publishes both the
/// completed analysis and a critical-incident event carrying the same data.
#[tokio::test]
async fn critical_scan_publishes_critical_incident() {
    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();
    let scheduler = AnalysisScheduler::new(
        analyzer(),
        history_source(cascade()).await,
        Arc::clone(&bus),
        settings(),
    );

    let analysis = scheduler
        .run_once(Cadence::CriticalScan, at(600))
        .await
        .unwrap();
    assert_eq!(analysis.timeline_period.start, at(0));
    assert_eq!(analysis.causal_chain.len(), 1);

    let events = drain(&mut rx);
    let types: Vec<_> = events.iter().map(AnalysisEvent::event_type).collect();
    assert_eq!(
        types,
        vec!["analysis.completed", "analysis.critical_incident"]
    );
    assert_matches!(
        &events[0],
        AnalysisEvent::AnalysisCompleted { cadence: Cadence::CriticalScan, .. }
    );
    assert_eq!(
        events[1].analysis().map(|a| a.analysis_id),
        Some(analysis.analysis_id)
    );
}

// ---------------------------------------------------------------------------
// Test: full analysis never raises a critical incident event
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_analysis_only_publishes_completion() {
    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();
    let scheduler = AnalysisScheduler::new(
        analyzer(),
        history_source(cascade()).await,
        Arc::clone(&bus),
        settings(),
    );

    let analysis = scheduler
        .run_once(Cadence::FullAnalysis, at(3600))
        .await
        .unwrap();
    assert!(analysis.has_critical_incident());

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    assert_matches!(
        &events[0],
        AnalysisEvent::AnalysisCompleted { cadence: Cadence::FullAnalysis, .. }
    );
}

// ---------------------------------------------------------------------------
// Test: quiet fleet
// ---------------------------------------------------------------------------

#[tokio::test]
async fn quiet_scan_has_no_incident() {
    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();
    let quiet = vec![
        MetricSnapshot::new("db-01", at(0)).with_cpu(20.0),
        MetricSnapshot::new("web-01", at(60)).with_latency(40.0),
    ];
    let scheduler = AnalysisScheduler::new(
        analyzer(),
        history_source(quiet).await,
        Arc::clone(&bus),
        settings(),
    );

    let analysis = scheduler
        .run_once(Cadence::CriticalScan, at(600))
        .await
        .unwrap();
    assert!(analysis.is_stable());
    assert_eq!(drain(&mut rx).len(), 1);
}

// ---------------------------------------------------------------------------
// Test: overlapping ticks are skipped
// ---------------------------------------------------------------------------

/// While a run of one cadence is in flight, another tick of that cadence is
/// skipped and reported; the other cadence is unaffected.
#[tokio::test]
async fn overlapping_tick_is_skipped() {
    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();
    let gate = Arc::new(Semaphore::new(0));
    let scheduler = Arc::new(AnalysisScheduler::new(
        analyzer(),
        Arc::new(GatedSource {
            gate: Arc::clone(&gate),
        }),
        Arc::clone(&bus),
        settings(),
    ));

    let first = Arc::clone(&scheduler)
        .try_start(Cadence::CriticalScan)
        .expect("first run starts");
    assert!(Arc::clone(&scheduler)
        .try_start(Cadence::CriticalScan)
        .is_none());

    let skipped = drain(&mut rx);
    assert_eq!(skipped.len(), 1);
    assert_matches!(
        &skipped[0],
        AnalysisEvent::RunSkipped { cadence: Cadence::CriticalScan, .. }
    );

    let full = Arc::clone(&scheduler)
        .try_start(Cadence::FullAnalysis)
        .expect("other cadence is independent");

    gate.add_permits(2);
    first.await.unwrap().unwrap();
    full.await.unwrap().unwrap();

    // Guard released once the run finished.
    gate.add_permits(1);
    let again = Arc::clone(&scheduler)
        .try_start(Cadence::CriticalScan)
        .expect("guard released");
    again.await.unwrap().unwrap();
}

// ---------------------------------------------------------------------------
// Test: engine failures surface as run errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn analysis_failure_is_reported_and_nothing_published() {
    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();
    let scheduler = AnalysisScheduler::new(
        Arc::new(FailingAnalyzer),
        history_source(cascade()).await,
        Arc::clone(&bus),
        settings(),
    );

    let result = scheduler.run_once(Cadence::CriticalScan, at(600)).await;
    assert_matches!(result, Err(RunError::Analysis(CoreError::Internal(_))));
    assert!(drain(&mut rx).is_empty());
}

// ---------------------------------------------------------------------------
// Test: unrepresentable baseline window
// ---------------------------------------------------------------------------

/// A lookback reaching past the earliest representable timestamp fails the
/// run with a validation error instead of panicking.
#[tokio::test]
async fn oversized_lookback_fails_the_run() {
    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();
    let settings = ScheduleSettings {
        statistical_lookback: chrono::Duration::weeks(20_000_000),
        ..settings()
    };
    let scheduler = AnalysisScheduler::new(
        analyzer(),
        history_source(cascade()).await,
        Arc::clone(&bus),
        settings,
    );

    let result = scheduler.run_once(Cadence::CriticalScan, at(600)).await;
    assert_matches!(result, Err(RunError::Analysis(CoreError::Validation(_))));
    assert!(drain(&mut rx).is_empty());
}
