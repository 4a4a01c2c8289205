use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::model::LogEntry;

struct ErrorPattern {
    name: &'static str,
    regex: Regex,
}

static ERROR_PATTERNS: LazyLock<Vec<ErrorPattern>> = LazyLock::new(|| {
    [
        ("error_prefix", r"(?i)error\s*:"),
        ("exception", r"(?i)exception\s*:"),
        ("failed_to", r"(?i)failed\s+to"),
        ("cannot", r"(?i)cannot\s+"),
        ("timeout", r"(?i)timeout"),
        ("connection_refused", r"(?i)connection\s+refused"),
        ("http_500", r"(?i)500\s+internal\s+server\s+error"),
        ("http_404", r"(?i)404\s+not\s+found"),
        ("http_403", r"(?i)403\s+forbidden"),
        ("http_401", r"(?i)401\s+unauthorized"),
    ]
    .into_iter()
    .map(|(name, pattern)| ErrorPattern {
        name,
        regex: Regex::new(pattern).expect("Failed to compile error pattern regex"),
    })
    .collect()
});

/// Number of entries matching each known failure signature. Signatures
/// with no hits are left out.
pub fn tally_error_patterns(entries: &[LogEntry]) -> BTreeMap<String, usize> {
    let mut tally = BTreeMap::new();
    for entry in entries {
        for pattern in ERROR_PATTERNS.iter() {
            if pattern.regex.is_match(entry.message()) {
                *tally.entry(pattern.name.to_string()).or_insert(0) += 1;
            }
        }
    }
    tally
}
