// Batch analysis of log entries: level tallies, performance samples,
// hourly volume, failure signatures and anomalies.

use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::model::{LogEntry, LogLevel};

pub mod anomaly;
pub mod patterns;
pub mod performance;

pub use anomaly::{detect_anomalies, AnomalyKind, AnomalyRecord, Evidence, Severity};
pub use patterns::tally_error_patterns;
pub use performance::{extract_samples, PerformanceStats};

/// ERROR messages are cut to this many characters in the evidence list.
pub const ERROR_EVIDENCE_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LevelCounts {
    pub error: usize,
    pub warning: usize,
    pub info: usize,
    pub debug: usize,
}

impl LevelCounts {
    fn record(&mut self, level: LogLevel) {
        match level {
            LogLevel::Error => self.error += 1,
            LogLevel::Warning => self.warning += 1,
            LogLevel::Info => self.info += 1,
            LogLevel::Debug => self.debug += 1,
        }
    }

    pub fn get(&self, level: LogLevel) -> usize {
        match level {
            LogLevel::Error => self.error,
            LogLevel::Warning => self.warning,
            LogLevel::Info => self.info,
            LogLevel::Debug => self.debug,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorSample {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// Result of one `analyze` call. Built once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub total_logs: usize,
    pub counts: LevelCounts,
    pub errors: Vec<ErrorSample>,
    pub performance: PerformanceStats,
    /// Hour bucket (timestamp truncated to the hour) to entry count.
    pub timeline: BTreeMap<DateTime<Utc>, usize>,
    pub error_patterns: BTreeMap<String, usize>,
    pub anomalies: Vec<AnomalyRecord>,
}

impl AnalysisReport {
    pub fn error_count(&self) -> usize {
        self.counts.error
    }

    pub fn avg_response_time(&self) -> Option<f64> {
        self.performance.avg
    }
}

/// Stateless analyzer; one instance can serve any number of batches.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAnalyzer;

impl LogAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, entries: &[LogEntry]) -> AnalysisReport {
        let mut counts = LevelCounts::default();
        let mut errors = Vec::new();
        let mut samples = Vec::new();
        let mut timeline = BTreeMap::new();

        for entry in entries {
            counts.record(entry.level());

            if entry.is_error() {
                errors.push(ErrorSample {
                    timestamp: entry.timestamp(),
                    message: anomaly::message_prefix(entry.message(), ERROR_EVIDENCE_CHARS),
                });
            }

            samples.extend(extract_samples(entry.message()));

            *timeline.entry(hour_bucket(entry.timestamp())).or_insert(0) += 1;
        }

        let report = AnalysisReport {
            total_logs: entries.len(),
            counts,
            errors,
            performance: PerformanceStats::from_samples(samples),
            timeline,
            error_patterns: tally_error_patterns(entries),
            anomalies: detect_anomalies(entries),
        };

        debug!(
            "Analyzed {} entries: {} errors, {} performance samples, {} anomalies",
            report.total_logs,
            report.counts.error,
            report.performance.samples.len(),
            report.anomalies.len()
        );
        report
    }

    pub fn detect_anomalies(&self, entries: &[LogEntry]) -> Vec<AnomalyRecord> {
        detect_anomalies(entries)
    }
}

/// Truncate a timestamp to the start of its hour.
pub fn hour_bucket(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    timestamp
        .duration_trunc(Duration::hours(1))
        .unwrap_or(timestamp)
}
