//! Kestrel analysis event bus.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`AnalysisEvent`]: what the scheduler announces after each run.
//! - [`ReportLog`]: background subscriber that hands finished analyses to
//!   the report collaborator through structured logs.

pub mod bus;
pub mod report_log;

pub use bus::{AnalysisEvent, Cadence, EventBus};
pub use report_log::ReportLog;
