//! `kestrel-worker` library crate.
//!
//! Re-exports internal modules for integration testing. The binary
//! entrypoint lives in `main.rs`.

pub mod config;
pub mod history;
pub mod scheduler;
pub mod source;

pub use config::{LogFormat, WorkerConfig};
pub use history::{MetricHistory, SharedHistory};
pub use scheduler::{AnalysisScheduler, RunError, ScheduleSettings};
pub use source::{HistorySource, IngestError, JsonFileAdapter, MetricSource};
