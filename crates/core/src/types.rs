/// Server identifiers are free-form strings whose prefix encodes the tier
/// (`db-01`, `web-02`, `k8s-node-3`).
pub type ServerId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
