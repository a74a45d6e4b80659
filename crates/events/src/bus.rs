//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] fans [`AnalysisEvent`]s out to every subscriber. Share it via
//! `Arc<EventBus>` between the scheduler and its consumers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kestrel_core::TimelineAnalysis;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Cadence
// ---------------------------------------------------------------------------

/// Which scheduled run produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    /// Hourly analysis over the full reporting range.
    FullAnalysis,
    /// Per-minute scan over a short range, looking for critical incidents.
    CriticalScan,
}

impl Cadence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cadence::FullAnalysis => "full_analysis",
            Cadence::CriticalScan => "critical_scan",
        }
    }
}

// ---------------------------------------------------------------------------
// AnalysisEvent
// ---------------------------------------------------------------------------

/// Something the scheduler wants subscribers to know about.
///
/// Analyses are shared behind an `Arc` so that every subscriber sees the same
/// allocation.
#[derive(Debug, Clone)]
pub enum AnalysisEvent {
    /// A run finished and produced an analysis.
    AnalysisCompleted {
        cadence: Cadence,
        analysis: Arc<TimelineAnalysis>,
    },
    /// A critical scan found at least one critically triggered segment.
    CriticalIncident { analysis: Arc<TimelineAnalysis> },
    /// A tick fired while the previous run of the same cadence was still
    /// in progress.
    RunSkipped {
        cadence: Cadence,
        at: DateTime<Utc>,
    },
}

impl AnalysisEvent {
    /// Dot-separated event name, e.g. `"analysis.completed"`.
    pub fn event_type(&self) -> &'static str {
        match self {
            AnalysisEvent::AnalysisCompleted { .. } => "analysis.completed",
            AnalysisEvent::CriticalIncident { .. } => "analysis.critical_incident",
            AnalysisEvent::RunSkipped { .. } => "analysis.run_skipped",
        }
    }

    pub fn analysis(&self) -> Option<&TimelineAnalysis> {
        match self {
            AnalysisEvent::AnalysisCompleted { analysis, .. }
            | AnalysisEvent::CriticalIncident { analysis } => Some(analysis),
            AnalysisEvent::RunSkipped { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// # Usage
///
/// ```rust
/// use kestrel_events::bus::{AnalysisEvent, Cadence, EventBus};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(AnalysisEvent::RunSkipped {
///     cadence: Cadence::CriticalScan,
///     at: chrono::Utc::now(),
/// });
/// ```
pub struct EventBus {
    sender: broadcast::Sender<AnalysisEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest unconsumed events are dropped and
    /// slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers; dropped if there are none.
    pub fn publish(&self, event: AnalysisEvent) {
        // SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AnalysisEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
