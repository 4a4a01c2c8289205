// Logwatch library - remote service log ingestion and analysis
//
// Fetches logs from a hosted platform, classifies and analyzes them,
// follows services in realtime and archives what it sees. Used by the CLI.

pub mod analyzer;
pub mod classify;
pub mod client;
pub mod config;
pub mod db_path;
pub mod model;
pub mod monitor;
pub mod pipeline;
pub mod store;
pub mod streamer;

pub use analyzer::{AnalysisReport, AnomalyKind, AnomalyRecord, LogAnalyzer, Severity};
pub use classify::classify_level;
pub use client::{ClientError, LogSource, LogWindow, RemoteLogClient};
pub use config::Config;
pub use model::{LogEntry, LogLevel, ServiceDescriptor, ServiceStatus};
pub use monitor::{AlertSink, MonitorSummary, RealtimeMonitor, TracingAlertSink};
pub use pipeline::{Fetched, LogPipeline, ServiceReport};
pub use store::{LogStore, PoolSettings};
pub use streamer::{Clock, RealtimeStreamer, StreamEvent, SystemClock};

/// Build a pipeline over the remote API described by `config`.
pub fn pipeline_from_config(config: &Config) -> Result<LogPipeline<RemoteLogClient>, ClientError> {
    let client = RemoteLogClient::from_config(&config.remote)?;
    Ok(LogPipeline::new(client).with_fetch_limit(config.remote.fetch_limit))
}
