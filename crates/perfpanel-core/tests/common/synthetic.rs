//! Synthetic platform for driving a widget from tests

#![allow(dead_code)]

use perfpanel_core::{
    BatchSink, EntryCategory, ObserverHandle, PerfPanelError, ResourceHistory, SignalSource,
    Snapshot, SnapshotSink, SubscribeOptions, TimingEntry,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Route `tracing` output through the test harness
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

struct Registration {
    category: EntryCategory,
    sink: BatchSink,
    connected: Rc<Cell<bool>>,
}

/// Signal source fed by the test instead of the platform
#[derive(Default)]
pub struct SyntheticSource {
    unsupported: Vec<EntryCategory>,
    buffered: RefCell<Vec<(EntryCategory, Vec<TimingEntry>)>>,
    registrations: RefCell<Vec<Registration>>,
    disconnects: Rc<Cell<usize>>,
    last_options: Cell<Option<SubscribeOptions>>,
}

impl SyntheticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source that rejects the given categories
    pub fn without(unsupported: &[EntryCategory]) -> Self {
        Self {
            unsupported: unsupported.to_vec(),
            ..Self::default()
        }
    }

    /// Record history replayed to subscribers asking for buffered entries
    pub fn buffer(&self, category: EntryCategory, entries: Vec<TimingEntry>) {
        self.buffered.borrow_mut().push((category, entries));
    }

    /// Deliver a batch to every connected subscriber of `category`
    ///
    /// Returns how many subscribers received it.
    pub fn deliver(&self, category: EntryCategory, entries: Vec<TimingEntry>) -> usize {
        let sinks: Vec<BatchSink> = self
            .registrations
            .borrow()
            .iter()
            .filter(|r| r.category == category && r.connected.get())
            .map(|r| r.sink.clone())
            .collect();
        for sink in &sinks {
            sink(category, entries.clone());
        }
        sinks.len()
    }

    pub fn is_connected(&self, category: EntryCategory) -> bool {
        self.registrations
            .borrow()
            .iter()
            .any(|r| r.category == category && r.connected.get())
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.get()
    }

    pub fn last_options(&self) -> Option<SubscribeOptions> {
        self.last_options.get()
    }
}

struct SyntheticHandle {
    connected: Rc<Cell<bool>>,
    disconnects: Rc<Cell<usize>>,
}

impl ObserverHandle for SyntheticHandle {
    fn disconnect(&mut self) {
        if self.connected.replace(false) {
            self.disconnects.set(self.disconnects.get() + 1);
        }
    }
}

impl SignalSource for SyntheticSource {
    fn subscribe(
        &self,
        category: EntryCategory,
        options: SubscribeOptions,
        sink: BatchSink,
    ) -> Result<Box<dyn ObserverHandle>, PerfPanelError> {
        self.last_options.set(Some(options));
        if self.unsupported.contains(&category) {
            return Err(PerfPanelError::UnsupportedCategory(category));
        }

        let connected = Rc::new(Cell::new(true));
        self.registrations.borrow_mut().push(Registration {
            category,
            sink: sink.clone(),
            connected: connected.clone(),
        });

        if options.include_buffered {
            let replay: Vec<_> = self
                .buffered
                .borrow()
                .iter()
                .filter(|(c, _)| *c == category)
                .map(|(_, entries)| entries.clone())
                .collect();
            for entries in replay {
                sink(category, entries);
            }
        }

        Ok(Box::new(SyntheticHandle {
            connected,
            disconnects: self.disconnects.clone(),
        }))
    }
}

/// Resource history the test can grow
#[derive(Default)]
pub struct GrowingHistory {
    entries: RefCell<Vec<TimingEntry>>,
    reads: Cell<usize>,
}

impl GrowingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: TimingEntry) {
        self.entries.borrow_mut().push(entry);
    }

    pub fn reads(&self) -> usize {
        self.reads.get()
    }
}

impl ResourceHistory for GrowingHistory {
    fn resource_entries(&self) -> Vec<TimingEntry> {
        self.reads.set(self.reads.get() + 1);
        self.entries.borrow().clone()
    }
}

/// Sink that keeps every snapshot it receives
#[derive(Default)]
pub struct RecordingSink {
    snapshots: RefCell<Vec<Snapshot>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.snapshots.borrow().len()
    }

    pub fn last(&self) -> Option<Snapshot> {
        self.snapshots.borrow().last().cloned()
    }
}

impl SnapshotSink for RecordingSink {
    fn publish(&self, snapshot: &Snapshot) -> Result<(), PerfPanelError> {
        self.snapshots.borrow_mut().push(snapshot.clone());
        Ok(())
    }
}
