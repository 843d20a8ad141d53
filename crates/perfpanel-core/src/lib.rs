//! Client-side performance metrics aggregation
//!
//! This crate is the platform-independent core of the perfpanel overlay. It
//! merges asynchronous timing batches (paint, largest contentful paint,
//! layout shift, long tasks) into one consistent [`MetricsState`], coalesces
//! updates to at most one snapshot per frame, and re-derives request totals
//! from the resource timing history on demand.
//!
//! The platform is reached only through three traits, so everything here
//! runs natively with synthetic batches:
//!
//! - [`SignalSource`]: subscribe to a timing category
//! - [`FrameScheduler`]: run a callback at the next frame
//! - [`ResourceHistory`]: read the complete resource timing history
//!
//! The browser implementations live in the `perfpanel-wasm` crate.

pub mod accumulator;
pub mod coalescer;
pub mod config;
pub mod entry;
pub mod error;
pub mod format;
pub mod publisher;
pub mod rating;
pub mod scanner;
pub mod state;
pub mod subscription;
pub mod widget;

pub use accumulator::{ApplyOutcome, MetricAccumulator};
pub use coalescer::{
    FrameCallback, FrameHandle, FrameScheduler, ImmediateScheduler, ManualScheduler,
    UpdateCoalescer,
};
pub use config::{LcpPolicy, PanelConfig};
pub use entry::{EntryCategory, TimingEntry};
pub use error::PerfPanelError;
pub use format::{display_rows, DisplayRow};
pub use publisher::{SnapshotPublisher, SnapshotSink};
pub use rating::{Rating, RatingThresholds, Threshold};
pub use scanner::{ResourceHistory, ResourceScanner, ResourceTotals};
pub use state::{MetricReading, MetricsState, Snapshot};
pub use subscription::{
    BatchSink, DisconnectReason, ObserverHandle, SignalSource, SubscribeOptions, Subscription,
    SubscriptionState,
};
pub use widget::{InteractionKind, PerfWidget, WeakPerfWidget};
