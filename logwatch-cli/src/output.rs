// Plain-text rendering for terminal output

use std::fmt;

use logwatch_core::analyzer::Evidence;
use logwatch_core::{LogEntry, ServiceDescriptor, ServiceReport};

const MESSAGE_WIDTH: usize = 160;

/// Service listing, one row per service under a header.
pub struct ServiceTable<'a>(pub &'a [ServiceDescriptor]);

impl fmt::Display for ServiceTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No services found.");
        }

        writeln!(f, "{:<24} {:<28} {:<20} STATUS", "ID", "NAME", "TYPE")?;
        for service in self.0 {
            writeln!(
                f,
                "{:<24} {:<28} {:<20} {}",
                service.id, service.name, service.service_type, service.status
            )?;
        }
        Ok(())
    }
}

/// One log line without a trailing newline.
pub struct EntryLine<'a>(pub &'a LogEntry);

impl fmt::Display for EntryLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entry = self.0;
        write!(
            f,
            "{} {:<7}",
            entry.timestamp().format("%Y-%m-%d %H:%M:%S%.3f"),
            entry.level()
        )?;
        if !entry.source().is_empty() {
            write!(f, " [{}]", entry.source())?;
        }
        let message: String = entry.message().chars().take(MESSAGE_WIDTH).collect();
        write!(f, " {}", message)
    }
}

pub struct EntryList<'a>(pub &'a [LogEntry]);

impl fmt::Display for EntryList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No log entries.");
        }
        for entry in self.0 {
            writeln!(f, "{}", EntryLine(entry))?;
        }
        Ok(())
    }
}

/// Human-readable analysis of one service window.
pub struct ReportText<'a>(pub &'a ServiceReport);

impl fmt::Display for ReportText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let analysis = &report.report;

        writeln!(f, "Service {}", report.service_id)?;
        writeln!(
            f,
            "Window  {} .. {}",
            report.window_start.format("%Y-%m-%d %H:%M:%S"),
            report.window_end.format("%Y-%m-%d %H:%M:%S")
        )?;
        if let Some(failure) = &report.failure {
            writeln!(f, "Fetch failed: {}", failure)?;
        }

        writeln!(f)?;
        writeln!(f, "Total logs: {}", analysis.total_logs)?;
        writeln!(
            f,
            "  ERROR {}  WARNING {}  INFO {}  DEBUG {}",
            analysis.counts.error, analysis.counts.warning, analysis.counts.info, analysis.counts.debug
        )?;

        match analysis.avg_response_time() {
            Some(avg) => writeln!(
                f,
                "Response time: avg {:.1}ms over {} samples (min {:.1}ms, max {:.1}ms)",
                avg,
                analysis.performance.samples.len(),
                analysis.performance.min.unwrap_or(avg),
                analysis.performance.max.unwrap_or(avg)
            )?,
            None => writeln!(f, "Response time: no samples")?,
        }

        if !analysis.error_patterns.is_empty() {
            writeln!(f)?;
            writeln!(f, "Error patterns:")?;
            for (name, count) in &analysis.error_patterns {
                writeln!(f, "  {:<20} {}", name, count)?;
            }
        }

        if !analysis.timeline.is_empty() {
            writeln!(f)?;
            writeln!(f, "Hourly volume:")?;
            for (hour, count) in &analysis.timeline {
                writeln!(f, "  {}  {}", hour.format("%Y-%m-%d %H:00"), count)?;
            }
        }

        writeln!(f)?;
        if analysis.anomalies.is_empty() {
            writeln!(f, "No anomalies detected.")?;
        } else {
            writeln!(f, "Anomalies:")?;
            for anomaly in &analysis.anomalies {
                writeln!(f, "  [{}] {}", anomaly.severity, anomaly.message)?;
                match &anomaly.evidence {
                    Evidence::Message(message) => writeln!(f, "      {}", message)?,
                    Evidence::Entries(entries) => {
                        for entry in entries {
                            writeln!(f, "      {}", EntryLine(entry))?;
                        }
                    }
                }
            }
        }

        if !analysis.errors.is_empty() {
            writeln!(f)?;
            writeln!(f, "Recent errors:")?;
            for error in analysis.errors.iter().take(10) {
                writeln!(
                    f,
                    "  {}  {}",
                    error.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    error.message
                )?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use logwatch_core::{LogAnalyzer, ServiceStatus};

    fn entry(message: &str) -> LogEntry {
        LogEntry::new(
            Utc.with_ymd_and_hms(2024, 2, 3, 4, 5, 6).unwrap(),
            message,
            "srv-1",
            "web",
            serde_json::Value::Null,
        )
    }

    #[test]
    fn test_render_entry_line() {
        let line = EntryLine(&entry("ERROR: disk full")).to_string();
        assert_eq!(line, "2024-02-03 04:05:06.000 ERROR   [web] ERROR: disk full");
    }

    #[test]
    fn test_render_services_table() {
        let services = [ServiceDescriptor {
            id: "srv-1".to_string(),
            name: "api".to_string(),
            service_type: "web_service".to_string(),
            status: ServiceStatus::default(),
        }];
        let table = ServiceTable(&services).to_string();
        assert!(table.starts_with("ID"));
        assert!(table.contains("srv-1"));
        assert!(table.contains("unknown"));

        assert_eq!(ServiceTable(&[]).to_string(), "No services found.\n");
    }

    #[test]
    fn test_render_report_sections() {
        let entries: Vec<LogEntry> = (0..11)
            .map(|i| entry(&format!("ERROR: job {} failed, took {}ms", i, i * 10)))
            .collect();
        let analysis = LogAnalyzer::new().analyze(&entries);
        let report = ServiceReport {
            service_id: "srv-1".to_string(),
            window_start: Utc.with_ymd_and_hms(2024, 2, 3, 3, 0, 0).unwrap(),
            window_end: Utc.with_ymd_and_hms(2024, 2, 3, 5, 0, 0).unwrap(),
            report: analysis,
            failure: None,
        };

        let text = ReportText(&report).to_string();
        assert!(text.contains("Total logs: 11"));
        assert!(text.contains("ERROR 11"));
        assert!(text.contains("Response time: avg 50.0ms over 11 samples"));
        assert!(text.contains("[high] High error rate detected: 11 errors"));
        assert!(text.contains("error_prefix"));
        assert!(!text.contains("Fetch failed"));
    }

    #[test]
    fn test_render_failed_report() {
        let report = ServiceReport {
            service_id: "srv-1".to_string(),
            window_start: Utc.with_ymd_and_hms(2024, 2, 3, 3, 0, 0).unwrap(),
            window_end: Utc.with_ymd_and_hms(2024, 2, 3, 4, 0, 0).unwrap(),
            report: LogAnalyzer::new().analyze(&[]),
            failure: Some("HTTP 503: unavailable".to_string()),
        };
        let text = ReportText(&report).to_string();
        assert!(text.contains("Fetch failed: HTTP 503: unavailable"));
        assert!(text.contains("Response time: no samples"));
        assert!(text.contains("No anomalies detected."));
    }

    #[test]
    fn test_entry_without_source() {
        let bare = LogEntry::new(
            Utc.with_ymd_and_hms(2024, 2, 3, 4, 5, 6).unwrap(),
            "GET / 200",
            "srv-1",
            "",
            serde_json::Value::Null,
        );
        assert_eq!(
            EntryLine(&bare).to_string(),
            "2024-02-03 04:05:06.000 INFO    GET / 200"
        );

        let listing = EntryList(&[bare.clone(), bare]).to_string();
        assert_eq!(listing.lines().count(), 2);
        assert_eq!(EntryList(&[]).to_string(), "No log entries.\n");
    }

    #[test]
    fn test_long_messages_are_cut() {
        let line = EntryLine(&entry(&"x".repeat(500))).to_string();
        assert!(line.ends_with(&"x".repeat(MESSAGE_WIDTH)));
        assert!(!line.ends_with(&"x".repeat(MESSAGE_WIDTH + 1)));
    }
}
