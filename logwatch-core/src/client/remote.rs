use chrono::{SecondsFormat, Utc};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, warn};

use super::record::parse_log_record;
use super::{ClientError, LogSource, LogWindow};
use crate::config::RemoteConfig;
use crate::model::{LogEntry, ServiceDescriptor, ServiceStatus};

/// Body of a list endpoint: either a bare array or `{"data": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListEnvelope {
    Wrapped { data: Vec<Value> },
    Bare(Vec<Value>),
}

impl ListEnvelope {
    fn into_items(self) -> Vec<Value> {
        match self {
            ListEnvelope::Wrapped { data } => data,
            ListEnvelope::Bare(items) => items,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServiceRecord {
    id: String,
    name: String,
    #[serde(rename = "type")]
    service_type: String,
    status: String,
}

impl From<ServiceRecord> for ServiceDescriptor {
    fn from(record: ServiceRecord) -> Self {
        ServiceDescriptor {
            id: record.id,
            name: record.name,
            service_type: record.service_type,
            status: ServiceStatus(record.status),
        }
    }
}

/// Bearer-authenticated client for the remote `/services` API.
///
/// Holds no per-call state; clones share the underlying connection pool.
#[derive(Clone)]
pub struct RemoteLogClient {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl std::fmt::Debug for RemoteLogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteLogClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl RemoteLogClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ClientError::Configuration("API key is empty".to_string()));
        }

        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ClientError::Configuration(format!("invalid base URL: {}", base_url)));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            api_key,
            timeout,
        })
    }

    pub fn from_config(config: &RemoteConfig) -> Result<Self, ClientError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            ClientError::Configuration("no API key configured (set LOGWATCH_API_KEY)".to_string())
        })?;
        Self::new(config.base_url.clone(), api_key, Duration::from_secs(config.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_list(&self, url: &str, query: &[(&str, String)]) -> Result<Vec<Value>, ClientError> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .query(query)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let response = Self::check_status(response).await?;

        let envelope: ListEnvelope = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        Ok(envelope.into_items())
    }

    async fn check_status(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        error!("Remote API returned HTTP {}", status);
        Err(ClientError::Status {
            status: status.as_u16(),
            body,
        })
    }

    fn map_request_error(&self, error: reqwest::Error) -> ClientError {
        if error.is_timeout() {
            ClientError::Timeout(self.timeout)
        } else {
            ClientError::Request(error)
        }
    }
}

#[async_trait::async_trait]
impl LogSource for RemoteLogClient {
    async fn list_services(&self) -> Result<Vec<ServiceDescriptor>, ClientError> {
        let url = format!("{}/services", self.base_url);
        let items = self.get_list(&url, &[]).await?;

        let mut services = Vec::with_capacity(items.len());
        for item in items {
            // Some providers nest the descriptor: [{"service": {...}, "cursor": ".."}]
            let item = match item {
                Value::Object(mut map) if matches!(map.get("service"), Some(Value::Object(_))) => {
                    map.remove("service").unwrap_or(Value::Null)
                }
                other => other,
            };

            match serde_json::from_value::<ServiceRecord>(item) {
                Ok(record) => services.push(record.into()),
                Err(e) => warn!("Skipping malformed service record: {}", e),
            }
        }

        debug!("Listed {} services", services.len());
        Ok(services)
    }

    async fn fetch_logs(
        &self,
        service_id: &str,
        window: LogWindow,
        limit: usize,
    ) -> Result<Vec<LogEntry>, ClientError> {
        let (start, end) = window.resolve(Utc::now());
        let url = format!("{}/services/{}/logs", self.base_url, service_id);
        let query = [
            ("startTime", start.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ("endTime", end.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ("limit", limit.to_string()),
        ];

        let records = self.get_list(&url, &query).await?;
        let total = records.len();

        let mut entries: Vec<LogEntry> = records
            .into_iter()
            .filter_map(|record| match parse_log_record(service_id, record) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping malformed log record for {}: {}", service_id, e);
                    None
                }
            })
            .collect();

        entries.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));

        debug!(
            "Fetched {} log entries for {} ({} skipped)",
            entries.len(),
            service_id,
            total - entries.len()
        );
        Ok(entries)
    }
}
