use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::model::LogEntry;

/// Why a single raw record was dropped from a batch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Parse a provider timestamp. RFC 3339 first, then the naive layouts some
/// providers emit, which are read as UTC.
pub fn parse_timestamp(timestamp: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(dt.with_timezone(&Utc));
    }

    let formats = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
    for format in formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(timestamp, format) {
            return Some(naive.and_utc());
        }
    }

    None
}

/// Build a `LogEntry` from one `{timestamp, message, source}` record.
pub fn parse_log_record(service_id: &str, record: Value) -> Result<LogEntry, RecordError> {
    let object = record.as_object().ok_or(RecordError::NotAnObject)?;

    let raw_timestamp = object
        .get("timestamp")
        .and_then(Value::as_str)
        .ok_or(RecordError::MissingField("timestamp"))?;
    let timestamp = parse_timestamp(raw_timestamp)
        .ok_or_else(|| RecordError::InvalidTimestamp(raw_timestamp.to_string()))?;

    let message = object
        .get("message")
        .and_then(Value::as_str)
        .ok_or(RecordError::MissingField("message"))?
        .to_string();

    let source = object
        .get("source")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(LogEntry::new(timestamp, message, service_id, source, record))
}
