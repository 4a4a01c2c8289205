use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

// Millisecond timing forms recognised in message text
static PERFORMANCE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)response\s+time\s*:\s*(\d+\.?\d*)ms",
        r"(?i)duration\s*:\s*(\d+\.?\d*)ms",
        r"(?i)processed\s+in\s+(\d+\.?\d*)ms",
        r"(?i)took\s+(\d+\.?\d*)ms",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("Failed to compile performance regex"))
    .collect()
});

/// Millisecond samples pulled out of message text, with summary figures.
///
/// `avg`/`min`/`max` are absent when nothing matched; zero is never used
/// as a stand-in average.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub samples: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl PerformanceStats {
    pub fn from_samples(samples: Vec<f64>) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let sum: f64 = samples.iter().sum();
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Self {
            avg: Some(sum / samples.len() as f64),
            min: Some(min),
            max: Some(max),
            samples,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Every match of every pattern in `message`, in pattern order.
pub fn extract_samples(message: &str) -> Vec<f64> {
    let mut samples = Vec::new();
    for pattern in PERFORMANCE_PATTERNS.iter() {
        for caps in pattern.captures_iter(message) {
            if let Some(value) = caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok()) {
                samples.push(value);
            }
        }
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_samples_from_each_form() {
        assert_eq!(extract_samples("processed in 123.4ms"), vec![123.4]);
        assert_eq!(extract_samples("Response time: 87ms"), vec![87.0]);
        assert_eq!(extract_samples("job DURATION: 5ms"), vec![5.0]);
        assert_eq!(extract_samples("request took 250ms"), vec![250.0]);
        assert!(extract_samples("request took a while").is_empty());
    }

    #[test]
    fn test_every_match_counts() {
        let samples = extract_samples("step one took 10ms, step two took 20ms, duration: 30ms");
        assert_eq!(samples, vec![30.0, 10.0, 20.0]);
    }

    #[test]
    fn test_stats_over_samples() {
        let stats = PerformanceStats::from_samples(vec![50.0, 150.0]);
        assert_eq!(stats.avg, Some(100.0));
        assert_eq!(stats.min, Some(50.0));
        assert_eq!(stats.max, Some(150.0));
    }

    #[test]
    fn test_empty_stats_omit_summary_fields() {
        let stats = PerformanceStats::from_samples(Vec::new());
        assert!(stats.is_empty());
        assert_eq!(stats.avg, None);

        let json = serde_json::to_value(&stats).unwrap();
        assert!(json.get("avg").is_none());
        assert!(json.get("min").is_none());
        assert!(json.get("max").is_none());
    }
}
