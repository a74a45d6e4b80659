//! `kestrel-worker` -- incident timeline analysis daemon.
//!
//! Keeps a rolling metric history fed from a JSON snapshot file, runs the
//! timeline engine on a full-analysis cadence and a critical-scan cadence,
//! and logs every result through the analysis event bus.
//!
//! # Environment variables
//!
//! | Variable                      | Default  | Description                             |
//! |-------------------------------|----------|-----------------------------------------|
//! | `METRICS_FILE`                | --       | JSON array of snapshots to poll         |
//! | `ENGINE_CONFIG_FILE`          | --       | JSON override of the engine policies    |
//! | `FULL_ANALYSIS_INTERVAL_SECS` | `3600`   | Seconds between full analyses           |
//! | `CRITICAL_SCAN_INTERVAL_SECS` | `60`     | Seconds between critical scans          |
//! | `FULL_ANALYSIS_RANGE_HOURS`   | `24`     | Range covered by a full analysis        |
//! | `CRITICAL_SCAN_RANGE_SECS`    | `600`    | Range covered by a critical scan        |
//! | `STATISTICAL_LOOKBACK_SECS`   | `86400`  | Baseline history fetched before a range |
//! | `HISTORY_CAPACITY`            | derived  | Snapshots retained per server           |
//! | `INGEST_INTERVAL_SECS`        | `60`     | Seconds between metrics file polls      |
//! | `LOG_FORMAT`                  | `pretty` | `pretty` or `json`                      |
//! | `RUST_LOG`                    | --       | Standard `tracing` env filter           |

use std::sync::Arc;

use kestrel_core::TimelineAnalyzer;
use kestrel_events::{EventBus, ReportLog};
use kestrel_worker::{
    AnalysisScheduler, HistorySource, JsonFileAdapter, LogFormat, MetricHistory,
    ScheduleSettings, WorkerConfig,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = WorkerConfig::from_env()?;

    let (pretty, json) = match config.log_format {
        LogFormat::Pretty => (Some(tracing_subscriber::fmt::layer()), None),
        LogFormat::Json => (None, Some(tracing_subscriber::fmt::layer().json())),
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "kestrel_worker=info,kestrel_core=info,kestrel_events=info".into()
            }),
        )
        .with(pretty)
        .with(json)
        .init();

    let analyzer = TimelineAnalyzer::new(config.load_engine_config()?)?;

    tracing::info!(
        metrics_file = ?config.metrics_file,
        history_capacity = config.history_capacity,
        "Starting kestrel-worker",
    );

    let cancel = CancellationToken::new();
    let history = MetricHistory::shared(config.history_capacity);

    let ingest_handle = config.metrics_file.clone().map(|path| {
        let adapter = JsonFileAdapter::new(path);
        let history = Arc::clone(&history);
        let interval = config.ingest_interval;
        let cancel = cancel.clone();
        tokio::spawn(async move { adapter.run(history, interval, cancel).await })
    });
    if ingest_handle.is_none() {
        tracing::warn!("METRICS_FILE not set, history will stay empty");
    }

    let bus = Arc::new(EventBus::default());
    let report_handle = tokio::spawn(ReportLog::run(bus.subscribe()));

    let scheduler = Arc::new(AnalysisScheduler::new(
        Arc::new(analyzer),
        Arc::new(HistorySource::new(history)),
        Arc::clone(&bus),
        ScheduleSettings::from_config(&config),
    ));
    let scheduler_handle = tokio::spawn(scheduler.run(cancel.clone()));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    cancel.cancel();

    if let Some(handle) = ingest_handle {
        handle.await?;
    }
    scheduler_handle.await?;

    // In-flight runs may still hold a clone of the bus.
    report_handle.abort();

    tracing::info!("kestrel-worker stopped");
    Ok(())
}
