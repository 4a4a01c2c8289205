use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::model::{LogEntry, ServiceDescriptor};

pub mod record;
pub mod remote;

pub use record::{parse_log_record, parse_timestamp, RecordError};
pub use remote::RemoteLogClient;

/// Default page size when the caller does not pass a limit.
pub const DEFAULT_FETCH_LIMIT: usize = 100;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("API request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API request timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Network, HTTP and decoding failures. These are retried by the
    /// streamer and degraded to empty results by one-shot callers.
    pub fn is_transport(&self) -> bool {
        !matches!(self, ClientError::Configuration(_))
    }
}

/// Time range of a log fetch. `None` bounds fall back to the trailing hour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl LogWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Window ending now and reaching `hours` back. A reach past the
    /// earliest representable time starts at that time instead.
    pub fn trailing_hours(hours: u32) -> Self {
        let end = Utc::now();
        let start = Duration::try_hours(i64::from(hours))
            .and_then(|span| end.checked_sub_signed(span))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self::new(start, end)
    }

    /// Fill missing bounds relative to `now`.
    pub fn resolve(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let end = self.end.unwrap_or(now);
        let start = self
            .start
            .or_else(|| end.checked_sub_signed(Duration::hours(1)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        (start, end)
    }
}

/// Anything that can list services and return a window of their logs.
///
/// `RemoteLogClient` is the production implementation; the streamer,
/// monitor and pipeline only depend on this trait.
#[async_trait::async_trait]
pub trait LogSource: Send + Sync {
    async fn list_services(&self) -> Result<Vec<ServiceDescriptor>, ClientError>;

    /// Entries of `service_id` within `window`, newest first.
    async fn fetch_logs(
        &self,
        service_id: &str,
        window: LogWindow,
        limit: usize,
    ) -> Result<Vec<LogEntry>, ClientError>;
}

#[async_trait::async_trait]
impl<T: LogSource + ?Sized> LogSource for std::sync::Arc<T> {
    async fn list_services(&self) -> Result<Vec<ServiceDescriptor>, ClientError> {
        (**self).list_services().await
    }

    async fn fetch_logs(
        &self,
        service_id: &str,
        window: LogWindow,
        limit: usize,
    ) -> Result<Vec<LogEntry>, ClientError> {
        (**self).fetch_logs(service_id, window, limit).await
    }
}
