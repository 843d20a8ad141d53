//! Resource scanner
//!
//! Request totals are re-derived from the platform's complete resource
//! history on every scan rather than accumulated, so a scan can run at any
//! time and always agrees with the history it read.

use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tracing::{debug, instrument};

use crate::entry::TimingEntry;

/// Read access to the ever-growing resource timing history
pub trait ResourceHistory {
    /// Every resource entry recorded so far, oldest first
    fn resource_entries(&self) -> Vec<TimingEntry>;
}

/// Result of a full resource scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTotals {
    /// Resource entries plus one for the document itself
    pub count: u64,
    pub bytes: u64,
}

impl ResourceTotals {
    /// Totals for a slice of resource entries
    pub fn from_entries(entries: &[TimingEntry]) -> Self {
        Self {
            count: entries.len() as u64 + 1,
            bytes: entries.iter().map(TimingEntry::transferred_bytes).sum(),
        }
    }
}

pub struct ResourceScanner {
    history: Rc<dyn ResourceHistory>,
}

impl ResourceScanner {
    pub fn new(history: Rc<dyn ResourceHistory>) -> Self {
        Self { history }
    }

    /// Recompute totals from the full history
    #[instrument(skip(self))]
    pub fn scan(&self) -> ResourceTotals {
        let entries = self.history.resource_entries();
        let totals = ResourceTotals::from_entries(&entries);
        debug!(
            "Scanned {} resource entries: {} requests, {} bytes",
            entries.len(),
            totals.count,
            totals.bytes
        );
        totals
    }
}
