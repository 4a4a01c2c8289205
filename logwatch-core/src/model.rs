// Data model shared by the client, analyzer, streamer and archive

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::classify_level;

/// Severity derived from the text of a log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Debug,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARNING",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_uppercase().as_str() {
            "ERROR" | "ERR" => Ok(LogLevel::Error),
            "WARNING" | "WARN" => Ok(LogLevel::Warning),
            "INFO" => Ok(LogLevel::Info),
            "DEBUG" => Ok(LogLevel::Debug),
            _ => Err(anyhow::anyhow!("Invalid log level: {}", s)),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// One log line captured from a remote service.
///
/// The level is computed from the message when the entry is built and
/// cannot be changed afterwards, so the fields are only reachable through
/// getters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    timestamp: DateTime<Utc>,
    level: LogLevel,
    message: String,
    service_id: String,
    source: String,
    raw_data: serde_json::Value,
}

impl LogEntry {
    pub fn new(
        timestamp: DateTime<Utc>,
        message: impl Into<String>,
        service_id: impl Into<String>,
        source: impl Into<String>,
        raw_data: serde_json::Value,
    ) -> Self {
        let message = message.into();
        Self {
            timestamp,
            level: classify_level(&message),
            message,
            service_id: service_id.into(),
            source: source.into(),
            raw_data,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn raw_data(&self) -> &serde_json::Value {
        &self.raw_data
    }

    pub fn is_error(&self) -> bool {
        self.level == LogLevel::Error
    }

    /// Identity used by the archive to recognise an already stored line.
    pub fn dedup_key(&self) -> (DateTime<Utc>, &str, &str) {
        (self.timestamp, &self.service_id, &self.message)
    }
}

/// Provider-reported lifecycle state of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ServiceStatus(pub String);

impl ServiceStatus {
    pub fn is_available(&self) -> bool {
        matches!(self.0.as_str(), "available" | "live" | "running")
    }

    pub fn is_failed(&self) -> bool {
        self.0.contains("failed")
    }

    pub fn is_deploying(&self) -> bool {
        matches!(self.0.as_str(), "deploying" | "build_in_progress" | "update_in_progress")
    }
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            f.write_str("unknown")
        } else {
            f.write_str(&self.0)
        }
    }
}

/// Live snapshot of a monitored service; refreshed on every listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: String,
    pub status: ServiceStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_level_is_derived_from_message() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 20, 10, 30, 0).unwrap();
        let entry = LogEntry::new(ts, "Fatal: disk full", "srv-1", "web", serde_json::json!({}));
        assert_eq!(entry.level(), LogLevel::Error);
        assert!(entry.is_error());

        let entry = LogEntry::new(ts, "GET /health 200", "srv-1", "web", serde_json::json!({}));
        assert_eq!(entry.level(), LogLevel::Info);
    }

    #[test]
    fn test_log_level_round_trip_through_str() {
        for level in [LogLevel::Error, LogLevel::Warning, LogLevel::Info, LogLevel::Debug] {
            assert_eq!(level.to_string().parse::<LogLevel>().unwrap(), level);
        }
        assert_eq!("warn".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_service_status_helpers() {
        assert!(ServiceStatus("available".to_string()).is_available());
        assert!(ServiceStatus("build_failed".to_string()).is_failed());
        assert!(ServiceStatus("deploying".to_string()).is_deploying());
        assert_eq!(ServiceStatus::default().to_string(), "unknown");
    }

    #[test]
    fn test_service_descriptor_uses_type_key() {
        let service: ServiceDescriptor = serde_json::from_value(serde_json::json!({
            "id": "srv-1",
            "name": "api",
            "type": "web_service",
            "status": "available"
        }))
        .unwrap();
        assert_eq!(service.service_type, "web_service");
        assert!(service.status.is_available());
    }
}
