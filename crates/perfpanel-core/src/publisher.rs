//! Snapshot publisher
//!
//! Holds the latest immutable [`Snapshot`] and forwards each new one to the
//! registered sinks (the panel renderer, the page-global exposure). No borrow
//! is held while a sink runs, so sinks may read the publisher.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, warn};

use crate::entry::EntryCategory;
use crate::error::PerfPanelError;
use crate::state::{MetricsState, Snapshot};

/// Consumer of published snapshots
pub trait SnapshotSink {
    fn publish(&self, snapshot: &Snapshot) -> Result<(), PerfPanelError>;
}

#[derive(Default)]
pub struct SnapshotPublisher {
    latest: RefCell<Option<Rc<Snapshot>>>,
    sequence: Cell<u64>,
    sinks: RefCell<Vec<Rc<dyn SnapshotSink>>>,
}

impl SnapshotPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sink(&self, sink: Rc<dyn SnapshotSink>) {
        self.sinks.borrow_mut().push(sink);
    }

    pub fn latest(&self) -> Option<Rc<Snapshot>> {
        self.latest.borrow().clone()
    }

    /// Number of snapshots published so far
    pub fn published(&self) -> u64 {
        self.sequence.get()
    }

    /// Copy the state into a new snapshot, store it and notify every sink
    pub fn publish(&self, state: &MetricsState, unavailable: Vec<EntryCategory>) -> Rc<Snapshot> {
        let sequence = self.sequence.get() + 1;
        self.sequence.set(sequence);

        let snapshot = Rc::new(Snapshot::new(state.clone(), unavailable, sequence));
        *self.latest.borrow_mut() = Some(snapshot.clone());
        debug!("Published snapshot #{}", sequence);

        let sinks: Vec<_> = self.sinks.borrow().clone();
        for sink in sinks {
            if let Err(e) = sink.publish(&snapshot) {
                warn!("Snapshot sink failed: {}", e);
            }
        }
        snapshot
    }
}
