//! Update coalescing
//!
//! Any number of update requests between two frames collapse into a single
//! materialization. The coalescer itself only tracks the pending window; the
//! [`FrameScheduler`] decides when "next frame" is. In the browser that is
//! `requestAnimationFrame`; tests use [`ManualScheduler`] or
//! [`ImmediateScheduler`].

use std::cell::{Cell, RefCell};
use tracing::trace;

/// Callback run when a scheduled frame fires
pub type FrameCallback = Box<dyn FnOnce()>;

/// Identifier of a scheduled frame callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub i32);

/// Defers work to the next rendering frame
///
/// Implementations must not hold any lock or borrow of their own while
/// running a callback, since the callback may schedule again.
pub trait FrameScheduler {
    /// Queue `callback` for the next frame
    ///
    /// Returns `None` when the frame could not be scheduled; the callback
    /// will then never run.
    fn request_frame(&self, callback: FrameCallback) -> Option<FrameHandle>;
    fn cancel_frame(&self, handle: FrameHandle);
}

/// Outcome of [`UpdateCoalescer::request`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// A new window opened; the caller must schedule a frame for it
    Schedule { generation: u64 },
    /// Folded into the already pending window
    Coalesced,
    /// The coalescer is closed; nothing will run
    Closed,
}

#[derive(Debug, Clone, Copy)]
struct PendingFrame {
    generation: u64,
    handle: Option<FrameHandle>,
    full_scan: bool,
}

/// Tracks the single pending update window
#[derive(Debug, Default)]
pub struct UpdateCoalescer {
    pending: Option<PendingFrame>,
    next_generation: u64,
    closed: bool,
}

impl UpdateCoalescer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Register an update request
    pub fn request(&mut self, full_scan: bool) -> RequestOutcome {
        if self.closed {
            return RequestOutcome::Closed;
        }

        if let Some(pending) = self.pending.as_mut() {
            pending.full_scan |= full_scan;
            trace!(
                "Coalesced update into frame generation {}",
                pending.generation
            );
            return RequestOutcome::Coalesced;
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        self.pending = Some(PendingFrame {
            generation,
            handle: None,
            full_scan,
        });
        RequestOutcome::Schedule { generation }
    }

    /// Remember the scheduler handle for a window so it can be cancelled
    ///
    /// Ignored when the window already ran, which happens with schedulers
    /// that fire synchronously.
    pub fn attach_handle(&mut self, generation: u64, handle: FrameHandle) {
        if let Some(pending) = self.pending.as_mut() {
            if pending.generation == generation {
                pending.handle = Some(handle);
            }
        }
    }

    /// Close the window for a fired frame
    ///
    /// Returns whether a full scan was requested, or `None` if the frame is
    /// stale or the coalescer is closed.
    pub fn take_due(&mut self, generation: u64) -> Option<bool> {
        if self.closed {
            return None;
        }
        match self.pending {
            Some(pending) if pending.generation == generation => {
                self.pending = None;
                Some(pending.full_scan)
            }
            _ => None,
        }
    }

    /// Drop a window whose frame could not be scheduled
    ///
    /// The next request opens a fresh window. Returns whether the window
    /// was still pending.
    pub fn abandon(&mut self, generation: u64) -> bool {
        match self.pending {
            Some(pending) if pending.generation == generation => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Close the coalescer for good
    ///
    /// Returns the handle of the pending frame, which the caller must cancel.
    pub fn close(&mut self) -> Option<FrameHandle> {
        self.closed = true;
        self.pending.take().and_then(|pending| pending.handle)
    }
}

/// Scheduler whose frames run only when the owner calls [`ManualScheduler::run_frame`]
#[derive(Default)]
pub struct ManualScheduler {
    queue: RefCell<Vec<(FrameHandle, FrameCallback)>>,
    next_id: Cell<i32>,
    cancelled: Cell<usize>,
    refusing: Cell<bool>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every callback queued before this call; returns how many ran
    pub fn run_frame(&self) -> usize {
        let due: Vec<_> = self.queue.borrow_mut().drain(..).collect();
        let count = due.len();
        for (_, callback) in due {
            callback();
        }
        count
    }

    pub fn pending_frames(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Number of frames cancelled so far
    pub fn cancelled_frames(&self) -> usize {
        self.cancelled.get()
    }

    /// Make later requests fail, as a browser without a frame loop would
    pub fn set_refusing(&self, refusing: bool) {
        self.refusing.set(refusing);
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&self, callback: FrameCallback) -> Option<FrameHandle> {
        if self.refusing.get() {
            return None;
        }
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        let handle = FrameHandle(id);
        self.queue.borrow_mut().push((handle, callback));
        Some(handle)
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        let mut queue = self.queue.borrow_mut();
        let before = queue.len();
        queue.retain(|(h, _)| *h != handle);
        if queue.len() < before {
            self.cancelled.set(self.cancelled.get() + 1);
        }
    }
}

/// Scheduler that runs every callback synchronously
#[derive(Default)]
pub struct ImmediateScheduler {
    next_id: Cell<i32>,
}

impl ImmediateScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameScheduler for ImmediateScheduler {
    fn request_frame(&self, callback: FrameCallback) -> Option<FrameHandle> {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        callback();
        Some(FrameHandle(id))
    }

    fn cancel_frame(&self, _handle: FrameHandle) {}
}
