//! Timing entries as delivered by the platform
//!
//! Entries arrive as the JSON form of `PerformanceEntry.toJSON()`, so every
//! field is optional here. Each merge rule decides which fields it requires
//! and skips entries that lack them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Entry name the platform uses for the first contentful paint
pub const FIRST_CONTENTFUL_PAINT: &str = "first-contentful-paint";

/// Timing categories the widget subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntryCategory {
    #[serde(rename = "paint")]
    Paint,
    #[serde(rename = "largest-contentful-paint")]
    LargestContentfulPaint,
    #[serde(rename = "layout-shift")]
    LayoutShift,
    #[serde(rename = "longtask")]
    LongTask,
}

impl EntryCategory {
    /// Every category, in subscription order
    pub const ALL: [EntryCategory; 4] = [
        EntryCategory::Paint,
        EntryCategory::LargestContentfulPaint,
        EntryCategory::LayoutShift,
        EntryCategory::LongTask,
    ];

    /// The platform's entry type string
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryCategory::Paint => "paint",
            EntryCategory::LargestContentfulPaint => "largest-contentful-paint",
            EntryCategory::LayoutShift => "layout-shift",
            EntryCategory::LongTask => "longtask",
        }
    }

    /// Parse a platform entry type string
    pub fn from_entry_type(entry_type: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == entry_type)
    }
}

impl fmt::Display for EntryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single timing entry
///
/// Times are `DOMHighResTimeStamp` milliseconds relative to navigation start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimingEntry {
    pub name: Option<String>,
    pub start_time: Option<f64>,
    pub duration: Option<f64>,
    /// Layout shift magnitude
    pub value: Option<f64>,
    pub had_recent_input: Option<bool>,
    pub transfer_size: Option<u64>,
    pub encoded_body_size: Option<u64>,
    pub render_time: Option<f64>,
    pub load_time: Option<f64>,
}

impl TimingEntry {
    /// A paint entry with the given name and start time
    pub fn paint(name: &str, start_time: f64) -> Self {
        Self {
            name: Some(name.to_string()),
            start_time: Some(start_time),
            duration: Some(0.0),
            ..Self::default()
        }
    }

    /// A largest-contentful-paint candidate
    pub fn lcp(start_time: f64, render_time: Option<f64>, load_time: Option<f64>) -> Self {
        Self {
            start_time: Some(start_time),
            render_time,
            load_time,
            ..Self::default()
        }
    }

    /// A layout shift of the given magnitude
    pub fn layout_shift(value: f64, had_recent_input: bool) -> Self {
        Self {
            value: Some(value),
            had_recent_input: Some(had_recent_input),
            ..Self::default()
        }
    }

    /// A long task of the given duration
    pub fn long_task(start_time: f64, duration: f64) -> Self {
        Self {
            name: Some("self".to_string()),
            start_time: Some(start_time),
            duration: Some(duration),
            ..Self::default()
        }
    }

    /// A resource transfer
    pub fn resource(name: &str, transfer_size: u64, encoded_body_size: u64) -> Self {
        Self {
            name: Some(name.to_string()),
            transfer_size: Some(transfer_size),
            encoded_body_size: Some(encoded_body_size),
            ..Self::default()
        }
    }

    /// Parse an entry from its JSON form
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Start time, if present and usable
    pub fn start_time_ms(&self) -> Option<f64> {
        non_negative(self.start_time)
    }

    /// Duration, if present and usable
    pub fn duration_ms(&self) -> Option<f64> {
        non_negative(self.duration)
    }

    /// Layout shift magnitude, if present and usable
    pub fn shift_value(&self) -> Option<f64> {
        non_negative(self.value)
    }

    /// Best-known LCP time: render time, then load time, then start time
    ///
    /// Cross-origin images served without `Timing-Allow-Origin` report a
    /// render time of zero.
    pub fn lcp_time_ms(&self) -> Option<f64> {
        non_negative(self.render_time)
            .filter(|t| *t > 0.0)
            .or_else(|| non_negative(self.load_time).filter(|t| *t > 0.0))
            .or_else(|| self.start_time_ms())
    }

    /// Bytes attributed to this resource
    ///
    /// Transfer size reads as zero for cache hits and for cross-origin
    /// responses without timing headers; fall back to the encoded body.
    pub fn transferred_bytes(&self) -> u64 {
        match (self.transfer_size, self.encoded_body_size) {
            (Some(transfer), _) if transfer > 0 => transfer,
            (_, Some(encoded)) if encoded > 0 => encoded,
            _ => 0,
        }
    }
}

/// Accept only finite, non-negative values
pub(crate) fn non_negative(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trips_entry_type() {
        for category in EntryCategory::ALL {
            assert_eq!(
                EntryCategory::from_entry_type(category.as_str()),
                Some(category)
            );
        }
        assert_eq!(EntryCategory::from_entry_type("resource"), None);
    }

    #[test]
    fn test_entry_deserializes_from_platform_json() {
        let json = r#"{"name":"first-contentful-paint","entryType":"paint","startTime":120.5,"duration":0}"#;
        let entry = TimingEntry::from_json(json).unwrap();
        assert_eq!(entry.name.as_deref(), Some(FIRST_CONTENTFUL_PAINT));
        assert_eq!(entry.start_time, Some(120.5));
        assert_eq!(entry.value, None);
    }

    #[test]
    fn test_layout_shift_json() {
        let json = r#"{"entryType":"layout-shift","value":0.042,"hadRecentInput":true,"sources":[]}"#;
        let entry = TimingEntry::from_json(json).unwrap();
        assert_eq!(entry.value, Some(0.042));
        assert_eq!(entry.had_recent_input, Some(true));
    }

    #[test]
    fn test_lcp_time_prefers_render_time() {
        let entry = TimingEntry::lcp(900.0, Some(850.0), Some(700.0));
        assert_eq!(entry.lcp_time_ms(), Some(850.0));
    }

    #[test]
    fn test_lcp_time_falls_back_to_load_time() {
        let entry = TimingEntry::lcp(900.0, Some(0.0), Some(700.0));
        assert_eq!(entry.lcp_time_ms(), Some(700.0));

        let entry = TimingEntry::lcp(900.0, None, Some(650.0));
        assert_eq!(entry.lcp_time_ms(), Some(650.0));
    }

    #[test]
    fn test_lcp_time_falls_back_to_start_time() {
        let entry = TimingEntry::lcp(900.0, None, None);
        assert_eq!(entry.lcp_time_ms(), Some(900.0));
        assert_eq!(TimingEntry::default().lcp_time_ms(), None);
    }

    #[test]
    fn test_transferred_bytes() {
        assert_eq!(TimingEntry::resource("a.js", 1024, 900).transferred_bytes(), 1024);
        assert_eq!(TimingEntry::resource("b.png", 0, 512).transferred_bytes(), 512);
        assert_eq!(TimingEntry::resource("c.css", 0, 0).transferred_bytes(), 0);
        assert_eq!(TimingEntry::default().transferred_bytes(), 0);
    }

    #[test]
    fn test_invalid_times_rejected() {
        assert_eq!(non_negative(Some(f64::NAN)), None);
        assert_eq!(non_negative(Some(-1.0)), None);
        assert_eq!(non_negative(Some(f64::INFINITY)), None);
        assert_eq!(non_negative(Some(0.0)), Some(0.0));
    }
}
