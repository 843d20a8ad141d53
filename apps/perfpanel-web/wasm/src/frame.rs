//! `requestAnimationFrame` scheduler

use perfpanel_core::{FrameCallback, FrameHandle, FrameScheduler};
use tracing::warn;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::Window;

/// Runs callbacks at the browser's next animation frame
pub struct AnimationFrameScheduler {
    window: Window,
}

impl AnimationFrameScheduler {
    pub fn new(window: Window) -> Self {
        Self { window }
    }
}

impl FrameScheduler for AnimationFrameScheduler {
    fn request_frame(&self, callback: FrameCallback) -> Option<FrameHandle> {
        // A cancelled frame never runs, so its closure is never freed
        let js_callback = Closure::once_into_js(callback);
        match self
            .window
            .request_animation_frame(js_callback.unchecked_ref())
        {
            Ok(id) => Some(FrameHandle(id)),
            Err(e) => {
                warn!("requestAnimationFrame failed: {:?}", e);
                None
            }
        }
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        if let Err(e) = self.window.cancel_animation_frame(handle.0) {
            warn!("cancelAnimationFrame failed: {:?}", e);
        }
    }
}
