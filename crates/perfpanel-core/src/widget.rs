//! The widget context
//!
//! [`PerfWidget`] groups everything one instrumentation panel needs: the
//! accumulator, the update coalescer and its scheduler, the resource
//! scanner, the snapshot publisher and the per-category subscriptions.
//! Widgets are independent of each other and of any global state.
//!
//! All work happens on a single thread. Shared state lives behind `RefCell`s
//! and no borrow is held while calling into the signal source, an observer
//! handle, the scheduler or a snapshot sink, so any of them may call back
//! into the widget.
//!
//! # Example
//!
//! ```
//! use perfpanel_core::{
//!     EntryCategory, ManualScheduler, PanelConfig, PerfWidget, ResourceHistory,
//!     SignalSource, TimingEntry,
//! };
//! # use perfpanel_core::{BatchSink, ObserverHandle, PerfPanelError, SubscribeOptions};
//! # use std::rc::Rc;
//! # struct NoSignals;
//! # impl SignalSource for NoSignals {
//! #     fn subscribe(&self, c: EntryCategory, _: SubscribeOptions, _: BatchSink)
//! #         -> Result<Box<dyn ObserverHandle>, PerfPanelError> {
//! #         Err(PerfPanelError::UnsupportedCategory(c))
//! #     }
//! # }
//! # struct NoResources;
//! # impl ResourceHistory for NoResources {
//! #     fn resource_entries(&self) -> Vec<TimingEntry> { Vec::new() }
//! # }
//! let scheduler = Rc::new(ManualScheduler::new());
//! let widget = PerfWidget::new(
//!     PanelConfig::default(),
//!     Rc::new(NoSignals),
//!     scheduler.clone(),
//!     Rc::new(NoResources),
//! )
//! .unwrap();
//!
//! widget.start().unwrap();
//! widget.apply_batch(EntryCategory::LongTask, &[TimingEntry::long_task(0.0, 80.0)]);
//! widget.scan_now();
//! scheduler.run_frame();
//!
//! let snapshot = widget.snapshot().unwrap();
//! assert_eq!(snapshot.metrics.request_count, 1);
//! ```

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use tracing::{debug, info, instrument, trace, warn};

use crate::accumulator::MetricAccumulator;
use crate::coalescer::{FrameScheduler, RequestOutcome, UpdateCoalescer};
use crate::config::PanelConfig;
use crate::entry::{EntryCategory, TimingEntry};
use crate::error::PerfPanelError;
use crate::publisher::{SnapshotPublisher, SnapshotSink};
use crate::scanner::{ResourceHistory, ResourceScanner};
use crate::state::{MetricsState, Snapshot};
use crate::subscription::{
    BatchSink, DisconnectReason, ObserverHandle, SignalSource, SubscribeOptions, Subscription,
    SubscriptionState,
};

/// User interactions that can finalize LCP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    Click,
    KeyDown,
    Scroll,
}

impl InteractionKind {
    /// DOM event name for this interaction
    pub fn event_name(&self) -> &'static str {
        match self {
            InteractionKind::Click => "click",
            InteractionKind::KeyDown => "keydown",
            InteractionKind::Scroll => "scroll",
        }
    }

    pub const ALL: [InteractionKind; 3] = [
        InteractionKind::Click,
        InteractionKind::KeyDown,
        InteractionKind::Scroll,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Created,
    Running,
    TornDown,
}

struct Shared {
    config: PanelConfig,
    source: Rc<dyn SignalSource>,
    scheduler: Rc<dyn FrameScheduler>,
    scanner: ResourceScanner,
    accumulator: RefCell<MetricAccumulator>,
    coalescer: RefCell<UpdateCoalescer>,
    publisher: SnapshotPublisher,
    subscriptions: RefCell<Vec<Subscription>>,
    phase: Cell<Phase>,
}

/// A single instrumentation widget
#[derive(Clone)]
pub struct PerfWidget {
    shared: Rc<Shared>,
}

/// Non-owning reference to a [`PerfWidget`], for event callbacks
#[derive(Clone)]
pub struct WeakPerfWidget {
    shared: Weak<Shared>,
}

impl WeakPerfWidget {
    pub fn upgrade(&self) -> Option<PerfWidget> {
        self.shared.upgrade().map(|shared| PerfWidget { shared })
    }
}

impl PerfWidget {
    /// Create a widget; nothing is observed until [`PerfWidget::start`]
    ///
    /// # Errors
    ///
    /// Returns [`PerfPanelError::Config`] if the configuration is invalid
    pub fn new(
        config: PanelConfig,
        source: Rc<dyn SignalSource>,
        scheduler: Rc<dyn FrameScheduler>,
        history: Rc<dyn ResourceHistory>,
    ) -> Result<Self, PerfPanelError> {
        config.validate()?;
        let accumulator = MetricAccumulator::new(config.blocking_threshold_ms);
        Ok(Self {
            shared: Rc::new(Shared {
                config,
                source,
                scheduler,
                scanner: ResourceScanner::new(history),
                accumulator: RefCell::new(accumulator),
                coalescer: RefCell::new(UpdateCoalescer::new()),
                publisher: SnapshotPublisher::new(),
                subscriptions: RefCell::new(Vec::new()),
                phase: Cell::new(Phase::Created),
            }),
        })
    }

    pub fn downgrade(&self) -> WeakPerfWidget {
        WeakPerfWidget {
            shared: Rc::downgrade(&self.shared),
        }
    }

    pub fn config(&self) -> &PanelConfig {
        &self.shared.config
    }

    /// Register a consumer of published snapshots
    pub fn add_sink(&self, sink: Rc<dyn SnapshotSink>) {
        self.shared.publisher.add_sink(sink);
    }

    /// Subscribe to every timing category
    ///
    /// Unsupported categories do not fail the call; they are reported as
    /// unavailable in every later snapshot.
    ///
    /// # Errors
    ///
    /// [`PerfPanelError::AlreadyStarted`] or [`PerfPanelError::TornDown`]
    #[instrument(skip(self))]
    pub fn start(&self) -> Result<(), PerfPanelError> {
        match self.shared.phase.get() {
            Phase::Created => {}
            Phase::Running => return Err(PerfPanelError::AlreadyStarted),
            Phase::TornDown => return Err(PerfPanelError::TornDown),
        }
        self.shared.phase.set(Phase::Running);

        let options = SubscribeOptions {
            include_buffered: self.shared.config.include_buffered,
        };

        for category in EntryCategory::ALL {
            let mut subscription = Subscription::new(category);

            let lcp_already_final = category == EntryCategory::LargestContentfulPaint
                && self.shared.accumulator.borrow().is_lcp_final();
            if lcp_already_final {
                debug!("Skipping LCP subscription; LCP already final");
            } else if let Err(e) =
                subscription.start(self.shared.source.as_ref(), options, self.batch_sink())
            {
                if e.leaves_metric_unavailable() {
                    self.shared.accumulator.borrow_mut().mark_unavailable(category);
                } else {
                    warn!("Unexpected error subscribing to {}: {}", category, e);
                }
            }

            // Teardown may have happened from inside a buffered delivery
            if self.is_torn_down() {
                if subscription.is_active() {
                    if let Err(e) = subscription.disconnect(DisconnectReason::Teardown) {
                        warn!("Failed to disconnect {}: {}", category, e);
                    }
                }
                self.shared.subscriptions.borrow_mut().push(subscription);
                return Ok(());
            }
            self.shared.subscriptions.borrow_mut().push(subscription);
        }

        info!(
            "Widget started; unavailable: {:?}",
            self.shared.accumulator.borrow().unavailable()
        );
        // Publish once so consumers can tell pending metrics from unavailable ones
        self.request_update(false);
        Ok(())
    }

    fn batch_sink(&self) -> BatchSink {
        let weak = self.downgrade();
        Rc::new(move |category, entries: Vec<TimingEntry>| {
            if let Some(widget) = weak.upgrade() {
                widget.apply_batch(category, &entries);
            }
        })
    }

    /// Merge a batch of entries and schedule an update if anything changed
    pub fn apply_batch(&self, category: EntryCategory, entries: &[TimingEntry]) {
        if self.is_torn_down() {
            trace!("Ignoring {} batch after teardown", category);
            return;
        }
        let outcome = self
            .shared
            .accumulator
            .borrow_mut()
            .apply_batch(category, entries);
        if outcome.changed {
            self.request_update(false);
        }
    }

    /// Ask for a snapshot at the next frame, optionally rescanning resources
    pub fn request_update(&self, full_scan: bool) {
        let outcome = self.shared.coalescer.borrow_mut().request(full_scan);
        let RequestOutcome::Schedule { generation } = outcome else {
            return;
        };

        let weak = self.downgrade();
        let scheduled = self.shared.scheduler.request_frame(Box::new(move || {
            if let Some(widget) = weak.upgrade() {
                widget.on_frame(generation);
            }
        }));

        let mut coalescer = self.shared.coalescer.borrow_mut();
        match scheduled {
            Some(handle) => coalescer.attach_handle(generation, handle),
            None => {
                // The next request retries with a fresh window
                if coalescer.abandon(generation) {
                    warn!("Frame request failed; update {} dropped", generation);
                }
            }
        }
    }

    /// The "measure now" action
    pub fn scan_now(&self) {
        self.request_update(true);
    }

    /// The page finished loading; refresh everything once
    pub fn notify_load(&self) {
        self.request_update(true);
    }

    /// A user interaction happened
    pub fn notify_interaction(&self, kind: InteractionKind) {
        if self.shared.config.lcp_policy.stops_on_interaction() {
            trace!("{:?} interaction finalizes LCP", kind);
            self.finalize_lcp(DisconnectReason::Interaction);
        }
    }

    /// The page became hidden
    pub fn notify_visibility_hidden(&self) {
        if self.shared.config.lcp_policy.stops_on_hidden() {
            self.finalize_lcp(DisconnectReason::Hidden);
        }
    }

    fn finalize_lcp(&self, reason: DisconnectReason) {
        if self.is_torn_down() || self.shared.accumulator.borrow().is_lcp_final() {
            return;
        }
        self.shared.accumulator.borrow_mut().finalize_lcp();

        let handles = self.detach_subscriptions(reason, |category| {
            category == EntryCategory::LargestContentfulPaint
        });
        for mut handle in handles {
            handle.disconnect();
        }
    }

    /// Mark matching active subscriptions disconnected and collect their handles
    ///
    /// Handles are disconnected by the caller once the borrow is released.
    fn detach_subscriptions(
        &self,
        reason: DisconnectReason,
        selected: impl Fn(EntryCategory) -> bool,
    ) -> Vec<Box<dyn ObserverHandle>> {
        let mut subscriptions = self.shared.subscriptions.borrow_mut();
        let mut handles = Vec::new();
        for subscription in subscriptions
            .iter_mut()
            .filter(|s| s.is_active() && selected(s.category()))
        {
            match subscription.detach(reason) {
                Ok(Some(handle)) => handles.push(handle),
                Ok(None) => {}
                Err(e) => warn!("Failed to disconnect {}: {}", subscription.category(), e),
            }
        }
        handles
    }

    fn on_frame(&self, generation: u64) {
        let due = self.shared.coalescer.borrow_mut().take_due(generation);
        let Some(full_scan) = due else {
            trace!("Stale frame {} ignored", generation);
            return;
        };

        if full_scan || self.shared.config.scan_on_every_update {
            let totals = self.shared.scanner.scan();
            self.shared.accumulator.borrow_mut().record_scan(totals);
        }

        let (state, unavailable) = {
            let accumulator = self.shared.accumulator.borrow();
            (accumulator.state().clone(), accumulator.unavailable())
        };
        self.shared.publisher.publish(&state, unavailable);
    }

    /// Disconnect every subscription and cancel any pending frame
    ///
    /// After this returns the state never changes and nothing is published.
    #[instrument(skip(self))]
    pub fn teardown(&self) {
        if self.is_torn_down() {
            return;
        }
        self.shared.phase.set(Phase::TornDown);

        let pending = self.shared.coalescer.borrow_mut().close();
        if let Some(handle) = pending {
            self.shared.scheduler.cancel_frame(handle);
        }
        self.shared.accumulator.borrow_mut().close();

        let handles = self.detach_subscriptions(DisconnectReason::Teardown, |_| true);
        for mut handle in handles {
            handle.disconnect();
        }
        info!("Widget torn down");
    }

    pub fn is_torn_down(&self) -> bool {
        self.shared.phase.get() == Phase::TornDown
    }

    pub fn is_running(&self) -> bool {
        self.shared.phase.get() == Phase::Running
    }

    /// Whether a materialization is waiting for the next frame
    pub fn has_pending_update(&self) -> bool {
        self.shared.coalescer.borrow().is_pending()
    }

    /// The latest published snapshot
    pub fn snapshot(&self) -> Option<Rc<Snapshot>> {
        self.shared.publisher.latest()
    }

    /// Number of snapshots published so far
    pub fn published_count(&self) -> u64 {
        self.shared.publisher.published()
    }

    /// Copy of the live state, which may be newer than the latest snapshot
    pub fn state(&self) -> MetricsState {
        self.shared.accumulator.borrow().state().clone()
    }

    pub fn subscription_state(&self, category: EntryCategory) -> SubscriptionState {
        self.shared
            .subscriptions
            .borrow()
            .iter()
            .find(|s| s.category() == category)
            .map_or(SubscriptionState::Unsubscribed, Subscription::state)
    }

    pub fn disconnect_reason(&self, category: EntryCategory) -> Option<DisconnectReason> {
        self.shared
            .subscriptions
            .borrow()
            .iter()
            .find(|s| s.category() == category)
            .and_then(Subscription::disconnect_reason)
    }
}
