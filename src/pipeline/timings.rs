//! Wall-clock durations per stage, kept in the order stages ran.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::time::Duration;

/// Seconds rounded to two decimals.
pub fn round_secs(duration: Duration) -> f64 {
    (duration.as_secs_f64() * 100.0).round() / 100.0
}

/// Stage name to duration in seconds. Serializes as a JSON object whose
/// keys follow insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageTimings {
    entries: Vec<(String, f64)>,
}

impl StageTimings {
    /// Record a duration. Recording the same stage twice replaces the
    /// earlier value in place.
    pub fn record(&mut self, stage: &str, duration: Duration) {
        let seconds = round_secs(duration);
        match self.entries.iter_mut().find(|(name, _)| name == stage) {
            Some(entry) => entry.1 = seconds,
            None => self.entries.push((stage.to_string(), seconds)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(name, seconds)| (name.as_str(), *seconds))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
impl StageTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, stage: &str) -> Option<f64> {
        self.iter().find(|(name, _)| *name == stage).map(|(_, seconds)| seconds)
    }

    pub fn stages(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|(name, _)| name)
    }
}

impl Serialize for StageTimings {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, seconds) in &self.entries {
            map.serialize_entry(name, seconds)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_secs() {
        assert_eq!(round_secs(Duration::from_millis(1234)), 1.23);
        assert_eq!(round_secs(Duration::from_millis(1236)), 1.24);
        assert_eq!(round_secs(Duration::from_millis(1250)), 1.25);
        assert_eq!(round_secs(Duration::ZERO), 0.0);
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let mut timings = StageTimings::new();
        timings.record("summarizer", Duration::from_millis(500));
        timings.record("paper_search", Duration::from_millis(100));
        timings.record("summarizer", Duration::from_millis(700));

        let stages: Vec<&str> = timings.stages().collect();
        assert_eq!(stages, vec!["summarizer", "paper_search"]);
        assert_eq!(timings.get("summarizer"), Some(0.7));
        assert_eq!(timings.iter().count(), 2);
    }

    #[test]
    fn test_serializes_as_ordered_object() {
        let mut timings = StageTimings::new();
        timings.record("paper_search", Duration::from_millis(250));
        timings.record("gap_analysis", Duration::from_secs(2));

        let json = serde_json::to_string(&timings).unwrap();
        assert_eq!(json, r#"{"paper_search":0.25,"gap_analysis":2.0}"#);
    }
}
