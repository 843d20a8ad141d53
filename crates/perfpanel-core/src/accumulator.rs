//! Metric accumulator
//!
//! The accumulator owns [`MetricsState`] and is its only writer. Observer
//! batches arrive out of order across categories, so each category has its
//! own merge rule:
//!
//! - **paint**: the first `first-contentful-paint` entry wins
//! - **largest-contentful-paint**: the last candidate of each batch replaces
//!   the previous one until LCP is finalized
//! - **layout-shift**: shifts not caused by recent input are summed
//! - **longtask**: every task is counted; time above the blocking threshold
//!   is added to TBT
//!
//! Malformed entries are skipped one by one and never abort a batch.

use std::collections::BTreeSet;
use tracing::{debug, trace};

use crate::entry::{EntryCategory, TimingEntry, FIRST_CONTENTFUL_PAINT};
use crate::error::PerfPanelError;
use crate::scanner::ResourceTotals;
use crate::state::MetricsState;

/// What a batch did to the state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Entries that satisfied the merge rule's requirements
    pub applied: usize,
    /// Entries skipped as malformed
    pub skipped: usize,
    /// Whether any state field changed
    pub changed: bool,
}

#[derive(Debug)]
pub struct MetricAccumulator {
    state: MetricsState,
    blocking_threshold_ms: f64,
    lcp_final: bool,
    unavailable: BTreeSet<EntryCategory>,
    closed: bool,
}

impl MetricAccumulator {
    pub fn new(blocking_threshold_ms: f64) -> Self {
        Self {
            state: MetricsState::default(),
            blocking_threshold_ms,
            lcp_final: false,
            unavailable: BTreeSet::new(),
            closed: false,
        }
    }

    pub fn state(&self) -> &MetricsState {
        &self.state
    }

    /// Categories that will never deliver data, in stable order
    pub fn unavailable(&self) -> Vec<EntryCategory> {
        self.unavailable.iter().copied().collect()
    }

    pub fn is_lcp_final(&self) -> bool {
        self.lcp_final
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Merge one observer batch into the state
    pub fn apply_batch(&mut self, category: EntryCategory, entries: &[TimingEntry]) -> ApplyOutcome {
        if self.closed {
            trace!("Dropping {} batch after close", category);
            return ApplyOutcome::default();
        }

        let outcome = match category {
            EntryCategory::Paint => self.merge_paint(entries),
            EntryCategory::LargestContentfulPaint => self.merge_lcp(entries),
            EntryCategory::LayoutShift => self.merge_layout_shift(entries),
            EntryCategory::LongTask => self.merge_long_tasks(entries),
        };

        trace!(
            "Applied {} batch: {} applied, {} skipped, changed={}",
            category,
            outcome.applied,
            outcome.skipped,
            outcome.changed
        );
        outcome
    }

    /// Stop accepting LCP candidates
    pub fn finalize_lcp(&mut self) {
        if !self.lcp_final {
            debug!(
                "LCP finalized at {:?}ms",
                self.state.largest_contentful_paint
            );
            self.lcp_final = true;
        }
    }

    /// Record that a category will never deliver data
    pub fn mark_unavailable(&mut self, category: EntryCategory) {
        if !self.closed {
            self.unavailable.insert(category);
        }
    }

    /// Replace request totals with the result of a full scan
    pub fn record_scan(&mut self, totals: ResourceTotals) {
        if self.closed {
            return;
        }
        self.state.request_count = totals.count;
        self.state.request_bytes = totals.bytes;
    }

    /// Refuse every later write
    pub fn close(&mut self) {
        self.closed = true;
    }

    fn merge_paint(&mut self, entries: &[TimingEntry]) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::default();
        let fcp = entries
            .iter()
            .find(|e| e.name.as_deref() == Some(FIRST_CONTENTFUL_PAINT));

        let Some(entry) = fcp else {
            return outcome;
        };

        match entry.start_time_ms() {
            Some(start) => {
                outcome.applied = 1;
                if self.state.first_contentful_paint.is_none() {
                    debug!("FCP recorded at {}ms", start);
                    self.state.first_contentful_paint = Some(start);
                    outcome.changed = true;
                }
            }
            None => {
                outcome.skipped = 1;
                log_malformed(EntryCategory::Paint, "missing or invalid startTime");
            }
        }
        outcome
    }

    fn merge_lcp(&mut self, entries: &[TimingEntry]) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::default();
        if self.lcp_final {
            trace!("Ignoring LCP batch of {} after finalization", entries.len());
            return outcome;
        }

        // Batches are chronological; the newest well-formed candidate wins.
        let mut latest = None;
        for entry in entries {
            match entry.lcp_time_ms() {
                Some(time) => {
                    outcome.applied += 1;
                    latest = Some(time);
                }
                None => {
                    outcome.skipped += 1;
                    log_malformed(EntryCategory::LargestContentfulPaint, "no usable time");
                }
            }
        }

        if let Some(time) = latest {
            if self.state.largest_contentful_paint != Some(time) {
                debug!("LCP candidate at {}ms", time);
                self.state.largest_contentful_paint = Some(time);
                outcome.changed = true;
            }
        }
        outcome
    }

    fn merge_layout_shift(&mut self, entries: &[TimingEntry]) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::default();
        for entry in entries {
            let Some(value) = entry.shift_value() else {
                outcome.skipped += 1;
                log_malformed(EntryCategory::LayoutShift, "missing or invalid value");
                continue;
            };
            outcome.applied += 1;

            if entry.had_recent_input == Some(true) {
                continue;
            }
            if value > 0.0 {
                self.state.cumulative_layout_shift += value;
                outcome.changed = true;
            }
        }
        outcome
    }

    fn merge_long_tasks(&mut self, entries: &[TimingEntry]) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::default();
        for entry in entries {
            let Some(duration) = entry.duration_ms() else {
                outcome.skipped += 1;
                log_malformed(EntryCategory::LongTask, "missing or invalid duration");
                continue;
            };
            outcome.applied += 1;
            outcome.changed = true;

            self.state.long_task_count += 1;
            self.state.total_blocking_time += (duration - self.blocking_threshold_ms).max(0.0);
        }
        outcome
    }
}

fn log_malformed(category: EntryCategory, reason: &str) {
    let err = PerfPanelError::MalformedEntry {
        category,
        reason: reason.to_string(),
    };
    debug!("Skipping entry: {}", err);
}
