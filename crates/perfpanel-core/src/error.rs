use thiserror::Error;

use crate::entry::EntryCategory;
use crate::subscription::SubscriptionState;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PerfPanelError {
    #[error("Timing category not supported by this platform: {0}")]
    UnsupportedCategory(EntryCategory),

    #[error("Failed to subscribe to {category}: {reason}")]
    Subscription {
        category: EntryCategory,
        reason: String,
    },

    #[error("Malformed {category} entry: {reason}")]
    MalformedEntry {
        category: EntryCategory,
        reason: String,
    },

    #[error("Invalid subscription transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: SubscriptionState,
        to: SubscriptionState,
    },

    #[error("Widget already started")]
    AlreadyStarted,

    #[error("Widget has been torn down")]
    TornDown,

    #[error("Snapshot sink failed: {0}")]
    Sink(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl PerfPanelError {
    /// Whether this error only means the metric is unavailable on this platform
    pub fn leaves_metric_unavailable(&self) -> bool {
        matches!(
            self,
            PerfPanelError::UnsupportedCategory(_) | PerfPanelError::Subscription { .. }
        )
    }
}
