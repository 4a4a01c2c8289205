// One-shot fetch-and-analyze facade used by the CLI

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::analyzer::{AnalysisReport, LogAnalyzer};
use crate::client::{ClientError, LogSource, LogWindow, DEFAULT_FETCH_LIMIT};
use crate::model::{LogEntry, ServiceDescriptor};

/// Items from one remote call. On a transport failure `items` is empty and
/// `failure` says what went wrong; an empty list with no failure really
/// means "nothing there".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fetched<T> {
    pub items: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl<T> Fetched<T> {
    pub fn ok(items: Vec<T>) -> Self {
        Self {
            items,
            failure: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            items: Vec::new(),
            failure: Some(reason.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceReport {
    pub service_id: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub report: AnalysisReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

pub struct LogPipeline<S> {
    source: S,
    analyzer: LogAnalyzer,
    fetch_limit: usize,
}

impl<S: LogSource> LogPipeline<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            analyzer: LogAnalyzer::new(),
            fetch_limit: DEFAULT_FETCH_LIMIT,
        }
    }

    pub fn with_fetch_limit(mut self, fetch_limit: usize) -> Self {
        self.fetch_limit = fetch_limit;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn services(&self) -> Result<Fetched<ServiceDescriptor>, ClientError> {
        degrade(self.source.list_services().await, "list services")
    }

    pub async fn recent_logs(
        &self,
        service_id: &str,
        window: LogWindow,
    ) -> Result<Fetched<LogEntry>, ClientError> {
        degrade(
            self.source
                .fetch_logs(service_id, window, self.fetch_limit)
                .await,
            "fetch logs",
        )
    }

    /// Fetch the window and analyze it. When the fetch fails the report
    /// describes an empty batch and `failure` is set.
    pub async fn report(
        &self,
        service_id: &str,
        window: LogWindow,
    ) -> Result<ServiceReport, ClientError> {
        let (window_start, window_end) = window.resolve(Utc::now());
        let fetched = self
            .recent_logs(service_id, LogWindow::new(window_start, window_end))
            .await?;

        let report = self.analyzer.analyze(&fetched.items);
        info!(
            "Report for {}: {} entries, {} errors, {} anomalies",
            service_id,
            report.total_logs,
            report.error_count(),
            report.anomalies.len()
        );

        Ok(ServiceReport {
            service_id: service_id.to_string(),
            window_start,
            window_end,
            report,
            failure: fetched.failure,
        })
    }
}

fn degrade<T>(result: Result<Vec<T>, ClientError>, action: &str) -> Result<Fetched<T>, ClientError> {
    match result {
        Ok(items) => Ok(Fetched::ok(items)),
        Err(err) if err.is_transport() => {
            warn!("Failed to {}: {}", action, err);
            Ok(Fetched::failed(err.to_string()))
        }
        Err(err) => Err(err),
    }
}
