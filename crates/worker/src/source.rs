//! Metric sources.
//!
//! [`MetricSource`] is what the scheduler reads from. [`HistorySource`] serves
//! ranges out of the rolling [`MetricHistory`](crate::history::MetricHistory);
//! [`JsonFileAdapter`] feeds that history from a JSON file of snapshots.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use kestrel_core::snapshot::{MetricSnapshot, TimeRange};
use tokio_util::sync::CancellationToken;

use crate::history::SharedHistory;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Failed to read metrics from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed metrics in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Supplies ordered snapshots for a half-open time range.
#[async_trait]
pub trait MetricSource: Send + Sync {
    async fn fetch(&self, range: TimeRange) -> Result<Vec<MetricSnapshot>, IngestError>;
}

/// Serves snapshots from the shared rolling history.
#[derive(Clone)]
pub struct HistorySource {
    history: SharedHistory,
}

impl HistorySource {
    pub fn new(history: SharedHistory) -> Self {
        Self { history }
    }
}

#[async_trait]
impl MetricSource for HistorySource {
    async fn fetch(&self, range: TimeRange) -> Result<Vec<MetricSnapshot>, IngestError> {
        Ok(self.history.read().await.snapshots_in(&range))
    }
}

// ---------------------------------------------------------------------------
// JSON file adapter
// ---------------------------------------------------------------------------

/// Polls a JSON file holding an array of snapshots and ingests the points
/// that are newer than the last one seen for each server.
pub struct JsonFileAdapter {
    path: PathBuf,
}

impl JsonFileAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Vec<MetricSnapshot>, IngestError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| IngestError::Io {
                path: self.path.clone(),
                source,
            })?;
        serde_json::from_str(&raw).map_err(|source| IngestError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Read the file once and ingest its new points. Returns how many
    /// snapshots were added to the history.
    pub async fn poll(&self, history: &SharedHistory) -> Result<usize, IngestError> {
        let snapshots = self.read().await?;
        let total = snapshots.len();

        let mut history = history.write().await;
        let fresh: Vec<MetricSnapshot> = snapshots
            .into_iter()
            .filter(|s| {
                history
                    .latest_timestamp(&s.server_id)
                    .map_or(true, |latest| s.timestamp > latest)
            })
            .collect();
        let added = history.ingest_all(fresh);

        tracing::debug!(
            path = %self.path.display(),
            total,
            added,
            servers = history.server_count(),
            "Metrics file polled"
        );
        Ok(added)
    }

    /// Poll on a fixed interval until `cancel` is triggered.
    pub async fn run(&self, history: SharedHistory, interval: Duration, cancel: CancellationToken) {
        tracing::info!(
            path = %self.path.display(),
            interval_secs = interval.as_secs(),
            "Metrics file ingestion started"
        );

        let mut interval = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Metrics file ingestion stopping");
                    break;
                }
                _ = interval.tick() => {
                    match self.poll(&history).await {
                        Ok(added) if added > 0 => {
                            tracing::info!(added, "Ingested new metric snapshots");
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::error!(error = %e, "Metrics ingestion failed");
                        }
                    }
                }
            }
        }
    }
}
