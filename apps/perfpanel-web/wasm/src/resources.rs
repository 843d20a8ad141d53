//! Resource timing history from `performance.getEntriesByType("resource")`

use perfpanel_core::{ResourceHistory, TimingEntry};
use tracing::debug;
use wasm_bindgen::JsCast;
use web_sys::{Performance, PerformanceEntry};

pub struct PerformanceResourceHistory {
    performance: Option<Performance>,
}

impl PerformanceResourceHistory {
    /// History backed by `performance`; `None` reads as an empty history
    pub fn new(performance: Option<Performance>) -> Self {
        if performance.is_none() {
            debug!("No performance object; resource history is empty");
        }
        Self { performance }
    }
}

impl ResourceHistory for PerformanceResourceHistory {
    fn resource_entries(&self) -> Vec<TimingEntry> {
        let Some(performance) = &self.performance else {
            return Vec::new();
        };
        performance
            .get_entries_by_type("resource")
            .iter()
            .filter_map(|value| {
                let entry = value.dyn_into::<PerformanceEntry>().ok()?;
                match serde_wasm_bindgen::from_value::<TimingEntry>(entry.to_json().into()) {
                    Ok(timing) => Some(timing),
                    Err(e) => {
                        // Count the request even if its sizes are unreadable
                        debug!("Unreadable resource entry {}: {}", entry.name(), e);
                        Some(TimingEntry {
                            name: Some(entry.name()),
                            ..TimingEntry::default()
                        })
                    }
                }
            })
            .collect()
    }
}

impl std::fmt::Debug for PerformanceResourceHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerformanceResourceHistory")
            .field("available", &self.performance.is_some())
            .finish()
    }
}
