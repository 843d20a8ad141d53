//! DOM event listeners that detach when dropped

use tracing::warn;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Event, EventTarget};

/// An attached event listener
///
/// The closure lives exactly as long as the registration: dropping the
/// guard removes the listener before freeing the closure.
pub struct EventListenerGuard {
    target: EventTarget,
    event: &'static str,
    capture: bool,
    callback: Closure<dyn FnMut(Event)>,
}

impl EventListenerGuard {
    /// Attach `handler` to `target` for `event`
    ///
    /// # Errors
    /// Returns the DOM exception if the listener cannot be added
    pub fn attach<F>(
        target: &EventTarget,
        event: &'static str,
        capture: bool,
        handler: F,
    ) -> Result<Self, JsValue>
    where
        F: FnMut(Event) + 'static,
    {
        let callback = Closure::<dyn FnMut(Event)>::new(handler);
        target.add_event_listener_with_callback_and_bool(
            event,
            callback.as_ref().unchecked_ref(),
            capture,
        )?;
        Ok(Self {
            target: target.clone(),
            event,
            capture,
            callback,
        })
    }

    pub fn event(&self) -> &'static str {
        self.event
    }
}

impl Drop for EventListenerGuard {
    fn drop(&mut self) {
        if let Err(e) = self.target.remove_event_listener_with_callback_and_bool(
            self.event,
            self.callback.as_ref().unchecked_ref(),
            self.capture,
        ) {
            warn!("Failed to remove {} listener: {:?}", self.event, e);
        }
    }
}
