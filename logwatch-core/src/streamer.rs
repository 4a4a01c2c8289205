// Polling realtime streamer for a single service

use async_stream::stream;
use chrono::{DateTime, Utc};
use futures::Stream;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::client::{ClientError, LogSource, LogWindow};
use crate::config::StreamConfig;
use crate::model::LogEntry;

/// Source of "now" for the watermark.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Item of a realtime stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Entry(LogEntry),
    /// A polling cycle failed. A `fatal` failure is the last event.
    Failed { reason: String, fatal: bool },
}

impl StreamEvent {
    pub fn entry(&self) -> Option<&LogEntry> {
        match self {
            StreamEvent::Entry(entry) => Some(entry),
            StreamEvent::Failed { .. } => None,
        }
    }
}

/// Follows one service by polling the source on a fixed cadence.
///
/// `last_check` is the end of the last window that was fetched
/// successfully. A cycle only ever moves it forward, and only after its
/// fetch returned, so a failed or cancelled cycle leaves it where it was.
pub struct RealtimeStreamer<S, C = SystemClock> {
    source: S,
    service_id: String,
    config: StreamConfig,
    clock: C,
    last_check: DateTime<Utc>,
}

impl<S: LogSource> RealtimeStreamer<S, SystemClock> {
    pub fn new(source: S, service_id: impl Into<String>, config: StreamConfig) -> Self {
        Self::with_clock(source, service_id, config, SystemClock)
    }
}

impl<S: LogSource, C: Clock> RealtimeStreamer<S, C> {
    pub fn with_clock(
        source: S,
        service_id: impl Into<String>,
        config: StreamConfig,
        clock: C,
    ) -> Self {
        let lookback = chrono::Duration::from_std(config.initial_lookback())
            .unwrap_or_else(|_| chrono::Duration::minutes(5));
        let now = clock.now();
        let last_check = now
            .checked_sub_signed(lookback)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        Self {
            source,
            service_id: service_id.into(),
            config,
            clock,
            last_check,
        }
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    pub fn last_check(&self) -> DateTime<Utc> {
        self.last_check
    }

    /// Run one polling cycle.
    ///
    /// Fetches `[last_check, now)` and keeps only entries strictly newer
    /// than `last_check`, in the order the source returned them. On success
    /// the watermark moves to `now`; on error it is untouched.
    pub async fn poll_once(&mut self) -> Result<Vec<LogEntry>, ClientError> {
        let now = self.clock.now();
        let window = LogWindow::new(self.last_check, now);

        let entries = self
            .source
            .fetch_logs(&self.service_id, window, self.config.batch_limit)
            .await?;

        let since = self.last_check;
        let fresh: Vec<LogEntry> = entries
            .into_iter()
            .filter(|entry| entry.timestamp() > since)
            .collect();

        self.last_check = now;
        debug!(
            "Poll for {} returned {} new entries, watermark now {}",
            self.service_id,
            fresh.len(),
            now
        );
        Ok(fresh)
    }

    /// Turn the streamer into an endless stream of new entries.
    ///
    /// Nothing is fetched until the stream is polled. Setting the `cancel`
    /// channel to `true` (or dropping its sender) ends the stream at the
    /// next check, which happens before each fetch and during each sleep.
    /// Writes of `false` do not shorten the sleep.
    ///
    /// Every failed cycle yields a `StreamEvent::Failed`. A configuration
    /// error is fatal and ends the stream; transport errors are retried
    /// after the error backoff.
    pub fn into_stream(
        mut self,
        mut cancel: watch::Receiver<bool>,
    ) -> impl Stream<Item = StreamEvent> + Send
    where
        S: 'static,
        C: 'static,
    {
        stream! {
            info!("Starting realtime stream for service {}", self.service_id);

            loop {
                let cancelled = *cancel.borrow();
                if cancelled {
                    break;
                }

                let delay = match self.poll_once().await {
                    Ok(entries) => {
                        for entry in entries {
                            yield StreamEvent::Entry(entry);
                        }
                        self.config.poll_interval()
                    }
                    Err(err) if !err.is_transport() => {
                        error!("Stopping stream for {}: {}", self.service_id, err);
                        yield StreamEvent::Failed { reason: err.to_string(), fatal: true };
                        break;
                    }
                    Err(err) => {
                        error!(
                            "Fetching logs for {} failed, retrying in {:?}: {}",
                            self.service_id,
                            self.config.error_backoff(),
                            err
                        );
                        yield StreamEvent::Failed { reason: err.to_string(), fatal: false };
                        self.config.error_backoff()
                    }
                };

                let sleep = tokio::time::sleep(delay);
                tokio::pin!(sleep);
                let stop = loop {
                    tokio::select! {
                        _ = &mut sleep => break false,
                        changed = cancel.changed() => {
                            if changed.is_err() || *cancel.borrow_and_update() {
                                break true;
                            }
                        }
                    }
                };
                if stop {
                    break;
                }
            }

            info!("Realtime stream for service {} stopped", self.service_id);
        }
    }
}
