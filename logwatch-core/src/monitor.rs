// Realtime monitoring: archive every streamed entry and alert on errors

use anyhow::Result;
use async_trait::async_trait;
use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use crate::client::LogSource;
use crate::model::LogEntry;
use crate::store::LogStore;
use crate::streamer::{Clock, RealtimeStreamer, StreamEvent};

/// Receives ERROR entries seen by a monitor.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn notify(&self, target: &str, entry: &LogEntry) -> Result<()>;
}

#[async_trait]
impl<T: AlertSink + ?Sized> AlertSink for Arc<T> {
    async fn notify(&self, target: &str, entry: &LogEntry) -> Result<()> {
        (**self).notify(target, entry).await
    }
}

/// Emits one `warn!` event per alert.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAlertSink;

#[async_trait]
impl AlertSink for TracingAlertSink {
    async fn notify(&self, target: &str, entry: &LogEntry) -> Result<()> {
        warn!(
            alert_target = target,
            service_id = entry.service_id(),
            timestamp = %entry.timestamp(),
            "ERROR in {}: {}",
            entry.service_id(),
            entry.message()
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MonitorSummary {
    pub received: u64,
    pub stored: u64,
    pub alerted: u64,
    /// Polling cycles that failed, fatal or not.
    pub failed_cycles: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_failure: Option<String>,
}

/// Binds one streamer to an archive and an alert subscriber.
///
/// The alert target is fixed when the monitor is built; nothing is looked
/// up from process-wide state while it runs.
pub struct RealtimeMonitor<A> {
    id: Uuid,
    store: LogStore,
    sink: A,
    target: String,
}

impl<A: AlertSink> RealtimeMonitor<A> {
    pub fn new(store: LogStore, sink: A, target: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            store,
            sink,
            target: target.into(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Drive `streamer` until `cancel` fires (or the stream ends).
    ///
    /// Each entry is archived first, then handed to the sink if it is an
    /// ERROR. Archive and sink failures are logged and the entry is skipped.
    /// Failed polling cycles are counted, and the last reason is kept so an
    /// unreachable API is visible in the summary.
    pub async fn run<S, C>(
        &self,
        streamer: RealtimeStreamer<S, C>,
        cancel: watch::Receiver<bool>,
    ) -> MonitorSummary
    where
        S: LogSource + 'static,
        C: Clock + 'static,
    {
        let service_id = streamer.service_id().to_string();
        info!(
            "Monitor {} watching {} (alerts to {})",
            self.id, service_id, self.target
        );

        let mut summary = MonitorSummary::default();
        let stream = streamer.into_stream(cancel);
        tokio::pin!(stream);

        while let Some(event) = stream.next().await {
            let entry = match event {
                StreamEvent::Entry(entry) => entry,
                StreamEvent::Failed { reason, fatal } => {
                    summary.failed_cycles += 1;
                    if fatal {
                        warn!("Monitor {} lost its source: {}", self.id, reason);
                    }
                    summary.last_failure = Some(reason);
                    continue;
                }
            };
            summary.received += 1;

            match self.store.store(std::slice::from_ref(&entry)).await {
                Ok(inserted) => summary.stored += inserted,
                Err(err) => warn!("Monitor {} failed to archive entry: {:#}", self.id, err),
            }

            if entry.is_error() {
                match self.sink.notify(&self.target, &entry).await {
                    Ok(()) => summary.alerted += 1,
                    Err(err) => warn!("Monitor {} failed to deliver alert: {:#}", self.id, err),
                }
            }
        }

        info!(
            "Monitor {} for {} stopped: {} received, {} stored, {} alerted, {} failed cycles",
            self.id,
            service_id,
            summary.received,
            summary.stored,
            summary.alerted,
            summary.failed_cycles
        );
        summary
    }
}
