use serde::Serialize;
use std::collections::HashMap;

use crate::model::LogEntry;

/// More ERROR entries than this in one batch is a spike.
pub const ERROR_SPIKE_THRESHOLD: usize = 10;
/// Entries cited as evidence for a spike.
pub const SPIKE_EVIDENCE_LIMIT: usize = 5;
/// An error prefix seen more often than this is reported as repeated.
pub const REPEATED_ERROR_THRESHOLD: usize = 3;
/// Characters of the message used as the near-duplicate key.
pub const REPEATED_ERROR_KEY_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    ErrorSpike,
    RepeatedError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Evidence {
    Entries(Vec<LogEntry>),
    Message(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyRecord {
    pub kind: AnomalyKind,
    pub severity: Severity,
    pub message: String,
    pub count: usize,
    pub evidence: Evidence,
}

/// Spike and repeated-error detection over one closed batch.
///
/// Pure function of `entries`: nothing is remembered between calls, so a
/// caller polling in cycles sees the same anomaly again if it persists.
pub fn detect_anomalies(entries: &[LogEntry]) -> Vec<AnomalyRecord> {
    let errors: Vec<&LogEntry> = entries.iter().filter(|e| e.is_error()).collect();
    let mut anomalies = Vec::new();

    if errors.len() > ERROR_SPIKE_THRESHOLD {
        anomalies.push(AnomalyRecord {
            kind: AnomalyKind::ErrorSpike,
            severity: Severity::High,
            message: format!("High error rate detected: {} errors", errors.len()),
            count: errors.len(),
            evidence: Evidence::Entries(
                errors
                    .iter()
                    .take(SPIKE_EVIDENCE_LIMIT)
                    .map(|e| (*e).clone())
                    .collect(),
            ),
        });
    }

    // first-seen order keeps the output stable across runs
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for entry in &errors {
        let key = message_prefix(entry.message(), REPEATED_ERROR_KEY_CHARS);
        let count = counts.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            0
        });
        *count += 1;
    }

    for key in order {
        let count = counts[&key];
        if count > REPEATED_ERROR_THRESHOLD {
            anomalies.push(AnomalyRecord {
                kind: AnomalyKind::RepeatedError,
                severity: Severity::Medium,
                message: format!("Repeated error detected {} times", count),
                count,
                evidence: Evidence::Message(key),
            });
        }
    }

    anomalies
}

/// First `max_chars` characters of `message`, on char boundaries.
pub(crate) fn message_prefix(message: &str, max_chars: usize) -> String {
    message.chars().take(max_chars).collect()
}
