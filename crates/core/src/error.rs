use crate::types::Timestamp;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid time range: start {start} is after end {end}")]
    InvalidRange { start: Timestamp, end: Timestamp },

    #[error("Failed to build chain segment for {server_id}: {reason}")]
    SegmentComputation { server_id: String, reason: String },

    #[error("Internal error: {0}")]
    Internal(String),
}
