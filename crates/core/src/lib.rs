//! Kestrel incident analysis core.
//!
//! Pure, synchronous analysis over a closed batch of server metrics:
//!
//! - [`detection`]: threshold, statistical and pattern anomaly detection
//!   plus the per-snapshot health score.
//! - [`correlation`]: chronological event list, correlation window lookups
//!   and causal chain construction.
//! - [`propagation`], [`root_cause`], [`impact`]: conclusions drawn from the
//!   causal chain.
//! - [`engine`]: [`TimelineAnalyzer`], the [`IncidentAnalyzer`] that runs the
//!   whole pipeline for one time range.
//!
//! Every tunable number lives in [`EngineConfig`].

pub mod alert;
pub mod config;
pub mod correlation;
pub mod detection;
pub mod engine;
pub mod error;
pub mod impact;
pub mod metric_names;
pub mod propagation;
pub mod root_cause;
pub mod snapshot;
pub mod threshold_validation;
pub mod tier;
pub mod types;

pub use config::EngineConfig;
pub use engine::{IncidentAnalyzer, TimelineAnalysis, TimelineAnalyzer};
pub use error::CoreError;
pub use snapshot::{MetricSnapshot, TimeRange};
