//! Analysis scheduler.
//!
//! Runs the engine on two cadences: a full analysis over the reporting range
//! (hourly by default) and a short critical scan (every minute). Each cadence
//! has its own in-flight guard; a tick that fires while the previous run of
//! the same cadence is still going is skipped, never queued. Results go out
//! on the [`EventBus`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use kestrel_core::snapshot::TimeRange;
use kestrel_core::types::Timestamp;
use kestrel_core::{CoreError, IncidentAnalyzer, TimelineAnalysis};
use kestrel_events::{AnalysisEvent, Cadence, EventBus};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;
use crate::source::{IngestError, MetricSource};

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Metric fetch failed: {0}")]
    Ingest(#[from] IngestError),

    #[error("Analysis failed: {0}")]
    Analysis(#[from] CoreError),

    #[error("Analysis task aborted: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Interval and range of each cadence.
#[derive(Debug, Clone)]
pub struct ScheduleSettings {
    pub full_analysis_interval: Duration,
    pub critical_scan_interval: Duration,
    pub full_analysis_range: chrono::Duration,
    pub critical_scan_range: chrono::Duration,
    /// Extra history fetched before each range as statistical baseline.
    pub statistical_lookback: chrono::Duration,
}

impl ScheduleSettings {
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self {
            full_analysis_interval: config.full_analysis_interval,
            critical_scan_interval: config.critical_scan_interval,
            full_analysis_range: config.full_analysis_range,
            critical_scan_range: config.critical_scan_range,
            statistical_lookback: config.statistical_lookback,
        }
    }

    pub fn interval(&self, cadence: Cadence) -> Duration {
        match cadence {
            Cadence::FullAnalysis => self.full_analysis_interval,
            Cadence::CriticalScan => self.critical_scan_interval,
        }
    }

    /// The analysis range for a run of `cadence` ending at `now`.
    pub fn range(&self, cadence: Cadence, now: Timestamp) -> Result<TimeRange, CoreError> {
        let length = match cadence {
            Cadence::FullAnalysis => self.full_analysis_range,
            Cadence::CriticalScan => self.critical_scan_range,
        };
        TimeRange::ending_at(now, length)
    }
}

pub struct AnalysisScheduler {
    analyzer: Arc<dyn IncidentAnalyzer>,
    source: Arc<dyn MetricSource>,
    bus: Arc<EventBus>,
    settings: ScheduleSettings,
    full_guard: Arc<Mutex<()>>,
    scan_guard: Arc<Mutex<()>>,
}

impl AnalysisScheduler {
    pub fn new(
        analyzer: Arc<dyn IncidentAnalyzer>,
        source: Arc<dyn MetricSource>,
        bus: Arc<EventBus>,
        settings: ScheduleSettings,
    ) -> Self {
        Self {
            analyzer,
            source,
            bus,
            settings,
            full_guard: Arc::new(Mutex::new(())),
            scan_guard: Arc::new(Mutex::new(())),
        }
    }

    fn guard(&self, cadence: Cadence) -> &Arc<Mutex<()>> {
        match cadence {
            Cadence::FullAnalysis => &self.full_guard,
            Cadence::CriticalScan => &self.scan_guard,
        }
    }

    /// Run both cadences until `cancel` is triggered.
    ///
    /// Both intervals fire immediately on start. In-flight runs are left to
    /// finish on their own after cancellation.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        tracing::info!(
            full_interval_secs = self.settings.full_analysis_interval.as_secs(),
            scan_interval_secs = self.settings.critical_scan_interval.as_secs(),
            "Analysis scheduler started"
        );

        let mut full = tokio::time::interval(self.settings.interval(Cadence::FullAnalysis));
        let mut scan = tokio::time::interval(self.settings.interval(Cadence::CriticalScan));

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Analysis scheduler stopping");
                    break;
                }
                _ = full.tick() => {
                    Arc::clone(&self).try_start(Cadence::FullAnalysis);
                }
                _ = scan.tick() => {
                    Arc::clone(&self).try_start(Cadence::CriticalScan);
                }
            }
        }
    }

    /// Start a run of `cadence` in the background unless one is in flight.
    ///
    /// Returns `None` (and publishes [`AnalysisEvent::RunSkipped`]) when the
    /// previous run of the same cadence has not finished yet.
    pub fn try_start(
        self: Arc<Self>,
        cadence: Cadence,
    ) -> Option<JoinHandle<Result<Arc<TimelineAnalysis>, RunError>>> {
        let permit = match Arc::clone(self.guard(cadence)).try_lock_owned() {
            Ok(permit) => permit,
            Err(_) => {
                let now = Utc::now();
                tracing::warn!(
                    cadence = cadence.as_str(),
                    "Previous run still in progress, skipping tick"
                );
                self.bus.publish(AnalysisEvent::RunSkipped { cadence, at: now });
                return None;
            }
        };

        Some(tokio::spawn(async move {
            let _permit = permit;
            let result = self.run_once(cadence, Utc::now()).await;
            if let Err(e) = &result {
                tracing::error!(cadence = cadence.as_str(), error = %e, "Analysis run failed");
            }
            result
        }))
    }

    /// Fetch history, analyse it off the async runtime and publish the result.
    pub async fn run_once(
        &self,
        cadence: Cadence,
        now: Timestamp,
    ) -> Result<Arc<TimelineAnalysis>, RunError> {
        let range = self.settings.range(cadence, now)?;
        let baseline_start = range
            .start
            .checked_sub_signed(self.settings.statistical_lookback)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "statistical lookback reaches before the earliest timestamp from {}",
                    range.start
                ))
            })?;
        let fetch_range = TimeRange::new(baseline_start, range.end)?;
        let history = self.source.fetch(fetch_range).await?;
        let fetched = history.len();

        let analyzer = Arc::clone(&self.analyzer);
        let analysis =
            tokio::task::spawn_blocking(move || analyzer.analyze(range, &history)).await??;
        let analysis = Arc::new(analysis);

        tracing::info!(
            cadence = cadence.as_str(),
            fetched,
            segments = analysis.causal_chain.len(),
            "Analysis run finished"
        );

        self.bus.publish(AnalysisEvent::AnalysisCompleted {
            cadence,
            analysis: Arc::clone(&analysis),
        });
        if cadence == Cadence::CriticalScan && analysis.has_critical_incident() {
            self.bus.publish(AnalysisEvent::CriticalIncident {
                analysis: Arc::clone(&analysis),
            });
        }

        Ok(analysis)
    }
}
