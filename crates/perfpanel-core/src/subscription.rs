//! Signal source subscriptions
//!
//! Each timing category gets one [`Subscription`] with the lifecycle
//! `Unsubscribed -> Subscribing -> Active -> Disconnected`. An unsupported
//! category goes straight from `Subscribing` to `Disconnected`, and nothing
//! ever leaves `Disconnected`.

use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tracing::{debug, info};

use crate::entry::{EntryCategory, TimingEntry};
use crate::error::PerfPanelError;

/// Receives batches delivered for one subscription
pub type BatchSink = Rc<dyn Fn(EntryCategory, Vec<TimingEntry>)>;

/// Subscription settings passed to the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeOptions {
    /// Replay entries recorded before the subscription was made
    pub include_buffered: bool,
}

/// The platform's timing-event delivery
pub trait SignalSource {
    /// Register `sink` for batches of `category`
    ///
    /// Buffered entries may be delivered before this returns.
    ///
    /// # Errors
    ///
    /// [`PerfPanelError::UnsupportedCategory`] when the platform does not
    /// implement the category; [`PerfPanelError::Subscription`] for any other
    /// registration failure.
    fn subscribe(
        &self,
        category: EntryCategory,
        options: SubscribeOptions,
        sink: BatchSink,
    ) -> Result<Box<dyn ObserverHandle>, PerfPanelError>;
}

/// A live platform registration
pub trait ObserverHandle {
    /// Stop delivery; no batch arrives after this returns
    fn disconnect(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionState {
    Unsubscribed,
    Subscribing,
    Active,
    Disconnected,
}

impl SubscriptionState {
    pub fn can_transition_to(&self, next: SubscriptionState) -> bool {
        use SubscriptionState::*;
        matches!(
            (*self, next),
            (Unsubscribed, Subscribing)
                | (Subscribing, Active)
                | (Subscribing, Disconnected)
                | (Active, Disconnected)
        )
    }
}

/// Why a subscription reached `Disconnected`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisconnectReason {
    Unsupported,
    Failed,
    Teardown,
    /// LCP only: user interaction finalized the candidate
    Interaction,
    /// LCP only: the page was hidden
    Hidden,
}

pub struct Subscription {
    category: EntryCategory,
    state: SubscriptionState,
    handle: Option<Box<dyn ObserverHandle>>,
    reason: Option<DisconnectReason>,
}

impl Subscription {
    pub fn new(category: EntryCategory) -> Self {
        Self {
            category,
            state: SubscriptionState::Unsubscribed,
            handle: None,
            reason: None,
        }
    }

    pub fn category(&self) -> EntryCategory {
        self.category
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    pub fn disconnect_reason(&self) -> Option<DisconnectReason> {
        self.reason
    }

    pub fn is_active(&self) -> bool {
        self.state == SubscriptionState::Active
    }

    fn transition(&mut self, next: SubscriptionState) -> Result<(), PerfPanelError> {
        if !self.state.can_transition_to(next) {
            return Err(PerfPanelError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    /// Register with the signal source
    ///
    /// On failure the subscription is permanently disconnected and the
    /// source's error is returned.
    pub fn start(
        &mut self,
        source: &dyn SignalSource,
        options: SubscribeOptions,
        sink: BatchSink,
    ) -> Result<(), PerfPanelError> {
        self.transition(SubscriptionState::Subscribing)?;

        match source.subscribe(self.category, options, sink) {
            Ok(handle) => {
                self.transition(SubscriptionState::Active)?;
                self.handle = Some(handle);
                debug!("Subscribed to {}", self.category);
                Ok(())
            }
            Err(e) => {
                self.transition(SubscriptionState::Disconnected)?;
                self.reason = Some(match &e {
                    PerfPanelError::UnsupportedCategory(_) => DisconnectReason::Unsupported,
                    _ => DisconnectReason::Failed,
                });
                info!("{} unavailable: {}", self.category, e);
                Err(e)
            }
        }
    }

    /// Disconnect an active subscription
    ///
    /// Returns `Ok(false)` if it was already disconnected.
    pub fn disconnect(&mut self, reason: DisconnectReason) -> Result<bool, PerfPanelError> {
        if self.state == SubscriptionState::Disconnected {
            return Ok(false);
        }
        if let Some(mut handle) = self.detach(reason)? {
            handle.disconnect();
        }
        Ok(true)
    }

    /// Mark an active subscription disconnected and hand back its handle
    ///
    /// The caller must call [`ObserverHandle::disconnect`] on the returned
    /// handle, which lets it release its own borrows first.
    pub fn detach(
        &mut self,
        reason: DisconnectReason,
    ) -> Result<Option<Box<dyn ObserverHandle>>, PerfPanelError> {
        self.transition(SubscriptionState::Disconnected)?;
        self.reason = Some(reason);
        debug!("Disconnected {} ({:?})", self.category, reason);
        Ok(self.handle.take())
    }
}
