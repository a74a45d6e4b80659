use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use kestrel_core::EngineConfig;

/// Upper bound for analysis ranges and the statistical lookback (one year).
const MAX_SPAN_SECS: u64 = 366 * 86_400;

/// Snapshots per server needed to cover `span` at one point per `resolution`.
fn default_history_capacity(span: chrono::Duration, resolution: Duration) -> usize {
    let resolution = resolution.as_secs().max(1);
    let span = span.num_seconds().max(0) as u64;
    (span.div_ceil(resolution) + 1) as usize
}

/// Log output format for the worker binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Worker configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// JSON array of snapshots polled for new points. Ingestion is disabled
    /// when unset.
    pub metrics_file: Option<PathBuf>,
    /// Optional JSON override of the engine policy table.
    pub engine_config_file: Option<PathBuf>,
    pub full_analysis_interval: Duration,
    pub critical_scan_interval: Duration,
    pub full_analysis_range: chrono::Duration,
    pub critical_scan_range: chrono::Duration,
    /// How far before an analysis range history is fetched as baseline.
    pub statistical_lookback: chrono::Duration,
    /// Snapshots retained per server. Defaults to enough points to cover the
    /// full analysis range plus the lookback at one point per ingest
    /// interval.
    pub history_capacity: usize,
    pub ingest_interval: Duration,
    pub log_format: LogFormat,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default  |
    /// |-------------------------------|----------|
    /// | `METRICS_FILE`                | unset    |
    /// | `ENGINE_CONFIG_FILE`          | unset    |
    /// | `FULL_ANALYSIS_INTERVAL_SECS` | `3600`   |
    /// | `CRITICAL_SCAN_INTERVAL_SECS` | `60`     |
    /// | `FULL_ANALYSIS_RANGE_HOURS`   | `24`     |
    /// | `CRITICAL_SCAN_RANGE_SECS`    | `600`    |
    /// | `STATISTICAL_LOOKBACK_SECS`   | `86400`  |
    /// | `HISTORY_CAPACITY`            | derived  |
    /// | `INGEST_INTERVAL_SECS`        | `60`     |
    /// | `LOG_FORMAT`                  | `pretty` |
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse_u64 = |key: &str, default: u64| -> anyhow::Result<u64> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{key} must be a non-negative integer, got {raw:?}")),
                None => Ok(default),
            }
        };
        let positive = |key: &str, default: u64| -> anyhow::Result<u64> {
            let value = parse_u64(key, default)?;
            anyhow::ensure!(value > 0, "{key} must be greater than zero");
            Ok(value)
        };

        let span = |key: &str, value: u64, unit_secs: u64| -> anyhow::Result<chrono::Duration> {
            let secs = value
                .checked_mul(unit_secs)
                .filter(|&secs| secs <= MAX_SPAN_SECS)
                .with_context(|| format!("{key} must not exceed {MAX_SPAN_SECS} seconds"))?;
            chrono::Duration::try_seconds(secs as i64)
                .with_context(|| format!("{key} is out of range"))
        };
        let hours = |key: &str, value: u64| span(key, value, 3600);
        let seconds = |key: &str, value: u64| span(key, value, 1);

        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("") | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => anyhow::bail!("LOG_FORMAT must be `pretty` or `json`, got {other:?}"),
        };

        let full_analysis_range = hours(
            "FULL_ANALYSIS_RANGE_HOURS",
            positive("FULL_ANALYSIS_RANGE_HOURS", 24)?,
        )?;
        let critical_scan_range = seconds(
            "CRITICAL_SCAN_RANGE_SECS",
            positive("CRITICAL_SCAN_RANGE_SECS", 600)?,
        )?;
        let statistical_lookback = seconds(
            "STATISTICAL_LOOKBACK_SECS",
            parse_u64("STATISTICAL_LOOKBACK_SECS", 86_400)?,
        )?;
        let ingest_interval = Duration::from_secs(positive("INGEST_INTERVAL_SECS", 60)?);

        let history_capacity = match lookup("HISTORY_CAPACITY") {
            Some(_) => positive("HISTORY_CAPACITY", 0)? as usize,
            None => default_history_capacity(
                full_analysis_range + statistical_lookback,
                ingest_interval,
            ),
        };

        Ok(Self {
            metrics_file: lookup("METRICS_FILE")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            engine_config_file: lookup("ENGINE_CONFIG_FILE")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            full_analysis_interval: Duration::from_secs(positive(
                "FULL_ANALYSIS_INTERVAL_SECS",
                3600,
            )?),
            critical_scan_interval: Duration::from_secs(positive(
                "CRITICAL_SCAN_INTERVAL_SECS",
                60,
            )?),
            full_analysis_range,
            critical_scan_range,
            statistical_lookback,
            history_capacity,
            ingest_interval,
            log_format,
        })
    }

    /// The engine policy table: defaults, or the validated JSON override.
    pub fn load_engine_config(&self) -> anyhow::Result<EngineConfig> {
        let Some(path) = &self.engine_config_file else {
            return Ok(EngineConfig::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read engine config {}", path.display()))?;
        EngineConfig::from_json(&raw)
            .with_context(|| format!("Invalid engine config {}", path.display()))
    }
}
