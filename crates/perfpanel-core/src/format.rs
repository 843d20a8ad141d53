//! Human-readable rendering of snapshot values
//!
//! The panel renderer only writes the strings produced here, so the display
//! rules stay testable without a DOM.

use serde::Serialize;

use crate::rating::{Rating, RatingThresholds};
use crate::state::{MetricReading, Snapshot};

/// Shown for metrics that have not been observed yet
pub const PENDING: &str = "-";
/// Shown for metrics the platform cannot report
pub const UNAVAILABLE: &str = "n/a";

/// Format milliseconds rounded to the nearest integer
pub fn format_ms(value: Option<f64>) -> String {
    match value {
        Some(ms) => format!("{} ms", ms.round()),
        None => PENDING.to_string(),
    }
}

/// Format a byte count as kilobytes with one decimal
pub fn format_kb(bytes: Option<u64>) -> String {
    match bytes {
        Some(b) => format!("{:.1} KB", b as f64 / 1024.0),
        None => PENDING.to_string(),
    }
}

/// Format a layout shift score with three decimals
pub fn format_cls(score: f64) -> String {
    format!("{:.3}", score)
}

/// One line of the panel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayRow {
    /// Stable element id
    pub id: &'static str,
    pub label: &'static str,
    pub text: String,
    pub rating: Option<Rating>,
}

impl DisplayRow {
    fn new(id: &'static str, label: &'static str, text: String, rating: Option<Rating>) -> Self {
        Self {
            id,
            label,
            text,
            rating,
        }
    }
}

fn reading_text<T: Copy>(reading: MetricReading<T>, fmt: impl Fn(T) -> String) -> String {
    match reading {
        MetricReading::Measured(v) => fmt(v),
        MetricReading::Pending => PENDING.to_string(),
        MetricReading::Unavailable => UNAVAILABLE.to_string(),
    }
}

/// Rows for every metric of a snapshot, in display order
pub fn display_rows(snapshot: &Snapshot, thresholds: &RatingThresholds) -> Vec<DisplayRow> {
    let fcp = snapshot.first_contentful_paint();
    let lcp = snapshot.largest_contentful_paint();
    let cls = snapshot.cumulative_layout_shift();
    let tbt = snapshot.total_blocking_time();
    let long_tasks = snapshot.long_task_count();

    let metrics = &snapshot.metrics;
    let scanned = metrics.resources_scanned();

    vec![
        DisplayRow::new(
            "fcp",
            "FCP",
            reading_text(fcp, |v| format_ms(Some(v))),
            fcp.value().map(|v| thresholds.fcp.rate(v)),
        ),
        DisplayRow::new(
            "lcp",
            "LCP",
            reading_text(lcp, |v| format_ms(Some(v))),
            lcp.value().map(|v| thresholds.lcp.rate(v)),
        ),
        DisplayRow::new(
            "cls",
            "CLS",
            reading_text(cls, format_cls),
            cls.value().map(|v| thresholds.cls.rate(v)),
        ),
        DisplayRow::new(
            "tbt",
            "TBT",
            reading_text(tbt, |v| format_ms(Some(v))),
            tbt.value().map(|v| thresholds.tbt.rate(v)),
        ),
        DisplayRow::new(
            "long-tasks",
            "Long tasks",
            reading_text(long_tasks, |v| v.to_string()),
            None,
        ),
        DisplayRow::new(
            "req",
            "Requests",
            if scanned {
                metrics.request_count.to_string()
            } else {
                PENDING.to_string()
            },
            None,
        ),
        DisplayRow::new(
            "bytes",
            "Weight",
            format_kb(scanned.then_some(metrics.request_bytes)),
            None,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryCategory;
    use crate::state::MetricsState;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_ms() {
        assert_eq!(format_ms(None), "-");
        assert_eq!(format_ms(Some(120.4)), "120 ms");
        assert_eq!(format_ms(Some(120.5)), "121 ms");
        assert_eq!(format_ms(Some(0.0)), "0 ms");
    }

    #[test]
    fn test_format_kb() {
        assert_eq!(format_kb(None), "-");
        assert_eq!(format_kb(Some(1536)), "1.5 KB");
        assert_eq!(format_kb(Some(0)), "0.0 KB");
    }

    #[test]
    fn test_format_cls() {
        assert_eq!(format_cls(0.05), "0.050");
        assert_eq!(format_cls(0.0), "0.000");
    }

    #[test]
    fn test_rows_for_fresh_snapshot() {
        let snapshot = Snapshot::new(MetricsState::default(), Vec::new(), 1);
        let rows = display_rows(&snapshot, &RatingThresholds::default());
        let texts: Vec<_> = rows.iter().map(|r| (r.id, r.text.as_str())).collect();
        assert_eq!(
            texts,
            vec![
                ("fcp", "-"),
                ("lcp", "-"),
                ("cls", "0.000"),
                ("tbt", "0 ms"),
                ("long-tasks", "0"),
                ("req", "-"),
                ("bytes", "-"),
            ]
        );
    }

    #[test]
    fn test_rows_mark_unavailable_and_rate() {
        let state = MetricsState {
            first_contentful_paint: Some(3500.0),
            largest_contentful_paint: Some(2000.0),
            request_count: 3,
            request_bytes: 1536,
            ..MetricsState::default()
        };
        let snapshot = Snapshot::new(state, vec![EntryCategory::LongTask], 4);
        let rows = display_rows(&snapshot, &RatingThresholds::default());

        assert_eq!(rows[0].rating, Some(Rating::Poor));
        assert_eq!(rows[1].rating, Some(Rating::Good));
        assert_eq!(rows[3].text, UNAVAILABLE);
        assert_eq!(rows[3].rating, None);
        assert_eq!(rows[4].text, UNAVAILABLE);
        assert_eq!(rows[5].text, "3");
        assert_eq!(rows[6].text, "1.5 KB");
    }
}
