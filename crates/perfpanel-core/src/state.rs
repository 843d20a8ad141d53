//! Metrics state and published snapshots

use serde::{Deserialize, Serialize};

use crate::entry::EntryCategory;

/// Canonical mutable metrics, written only by the accumulator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsState {
    /// First contentful paint in milliseconds, set at most once
    pub first_contentful_paint: Option<f64>,
    /// Latest largest-contentful-paint candidate in milliseconds
    pub largest_contentful_paint: Option<f64>,
    /// Sum of layout shift magnitudes not caused by recent input
    pub cumulative_layout_shift: f64,
    pub long_task_count: u64,
    /// Sum of long task time beyond the blocking threshold, in milliseconds
    pub total_blocking_time: f64,
    /// Resource entries plus the document itself, as of the last scan
    pub request_count: u64,
    pub request_bytes: u64,
}

impl MetricsState {
    /// Whether a resource scan has ever run
    ///
    /// A scan always counts the document, so zero means no scan yet.
    pub fn resources_scanned(&self) -> bool {
        self.request_count > 0
    }
}

/// Immutable copy of [`MetricsState`] taken at publish time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(flatten)]
    pub metrics: MetricsState,
    /// Categories the platform could not deliver
    pub unavailable: Vec<EntryCategory>,
    /// Publication counter, starting at 1
    pub sequence: u64,
}

impl Snapshot {
    pub fn new(metrics: MetricsState, unavailable: Vec<EntryCategory>, sequence: u64) -> Self {
        Self {
            metrics,
            unavailable,
            sequence,
        }
    }

    /// Whether the given category produced (or can still produce) data
    pub fn is_available(&self, category: EntryCategory) -> bool {
        !self.unavailable.contains(&category)
    }

    /// FCP, distinguishing "unavailable" from "not yet observed"
    pub fn first_contentful_paint(&self) -> MetricReading<f64> {
        self.optional_reading(EntryCategory::Paint, self.metrics.first_contentful_paint)
    }

    pub fn largest_contentful_paint(&self) -> MetricReading<f64> {
        self.optional_reading(
            EntryCategory::LargestContentfulPaint,
            self.metrics.largest_contentful_paint,
        )
    }

    pub fn cumulative_layout_shift(&self) -> MetricReading<f64> {
        self.counter_reading(
            EntryCategory::LayoutShift,
            self.metrics.cumulative_layout_shift,
        )
    }

    pub fn total_blocking_time(&self) -> MetricReading<f64> {
        self.counter_reading(EntryCategory::LongTask, self.metrics.total_blocking_time)
    }

    pub fn long_task_count(&self) -> MetricReading<u64> {
        self.counter_reading(EntryCategory::LongTask, self.metrics.long_task_count)
    }

    /// Serialize as the JSON object exposed to page scripts
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn optional_reading<T>(&self, category: EntryCategory, value: Option<T>) -> MetricReading<T> {
        match value {
            Some(v) => MetricReading::Measured(v),
            None if self.is_available(category) => MetricReading::Pending,
            None => MetricReading::Unavailable,
        }
    }

    fn counter_reading<T>(&self, category: EntryCategory, value: T) -> MetricReading<T> {
        if self.is_available(category) {
            MetricReading::Measured(value)
        } else {
            MetricReading::Unavailable
        }
    }
}

/// A metric value as seen by consumers
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricReading<T> {
    Measured(T),
    /// Supported, but no qualifying entry has arrived yet
    Pending,
    /// The platform does not report this category
    Unavailable,
}

impl<T: Copy> MetricReading<T> {
    pub fn value(&self) -> Option<T> {
        match self {
            MetricReading::Measured(v) => Some(*v),
            _ => None,
        }
    }
}
