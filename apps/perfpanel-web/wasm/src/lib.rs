//! WASM bindings for the perfpanel overlay
//!
//! Wires the platform-independent widget in `perfpanel-core` to the
//! browser: `PerformanceObserver` for timing batches,
//! `requestAnimationFrame` for coalesced updates, the resource timing
//! buffer for request totals, and a floating panel plus `window.__metrics`
//! for output.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { install } from './pkg/perfpanel_wasm.js';
//!
//! await init();
//!
//! const panel = install({ lcp_policy: "stop_on_hidden" });
//! panel.scanNow();
//! console.log(window.__metrics);
//! panel.dismiss();
//! ```

pub mod frame;
pub mod listeners;
pub mod logging;
pub mod observer;
pub mod panel;
pub mod resources;

use perfpanel_core::{InteractionKind, PanelConfig, PerfPanelError, PerfWidget, WeakPerfWidget};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, EventTarget, VisibilityState, Window};

pub use frame::AnimationFrameScheduler;
pub use listeners::EventListenerGuard;
pub use observer::BrowserSignalSource;
pub use panel::{GlobalSnapshotSink, PanelView};
pub use resources::PerformanceResourceHistory;

/// Initialize the WASM module
/// Called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    let level = if cfg!(debug_assertions) {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    logging::init_logging(level);
    info!("perfpanel WASM initialized");
}

/// Get the library version
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn to_js_error(e: PerfPanelError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Read a configuration object passed from JavaScript
///
/// `undefined` and `null` select the defaults.
pub fn parse_config(config: JsValue) -> Result<PanelConfig, PerfPanelError> {
    if config.is_undefined() || config.is_null() {
        return Ok(PanelConfig::default());
    }
    let config: PanelConfig = serde_wasm_bindgen::from_value(config)
        .map_err(|e| PerfPanelError::Config(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

type Listeners = Rc<RefCell<Vec<EventListenerGuard>>>;

/// Stop measuring and take the panel off the page
///
/// Listener closures may be on the call stack (the dismiss button), so
/// they are released on a later task.
fn shut_down(widget: &PerfWidget, panel: &PanelView, listeners: &Listeners, window: &Window) {
    widget.teardown();
    panel.remove();

    let released: Vec<EventListenerGuard> = listeners.borrow_mut().drain(..).collect();
    if released.is_empty() {
        return;
    }
    let release = Closure::once_into_js(move || drop(released));
    if let Err(e) = window.set_timeout_with_callback(release.unchecked_ref()) {
        warn!("Failed to schedule listener release: {:?}", e);
    }
}

/// The performance overlay
#[wasm_bindgen]
pub struct PerfPanel {
    widget: PerfWidget,
    window: Window,
    document: Document,
    panel: Rc<PanelView>,
    listeners: Listeners,
}

#[wasm_bindgen]
impl PerfPanel {
    /// Create a panel; nothing is observed until `mount()`
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<PerfPanel, JsValue> {
        let config = parse_config(config).map_err(to_js_error)?;
        let window =
            web_sys::window().ok_or_else(|| JsValue::from_str("No window object available"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("No document object available"))?;

        let panel = Rc::new(PanelView::new(
            &document,
            &config.title,
            config.thresholds,
        )?);

        let widget = PerfWidget::new(
            config,
            Rc::new(BrowserSignalSource::new()),
            Rc::new(AnimationFrameScheduler::new(window.clone())),
            Rc::new(PerformanceResourceHistory::new(window.performance())),
        )
        .map_err(to_js_error)?;
        widget.add_sink(panel.clone());
        widget.add_sink(Rc::new(GlobalSnapshotSink::new(window.clone())));

        Ok(Self {
            widget,
            window,
            document,
            panel,
            listeners: Rc::new(RefCell::new(Vec::new())),
        })
    }

    /// Attach the panel, hook page events and start observing
    ///
    /// Calling it again while running does nothing.
    #[wasm_bindgen]
    pub fn mount(&self) -> Result<(), JsValue> {
        if self.widget.is_torn_down() {
            return Err(to_js_error(PerfPanelError::TornDown));
        }
        if self.widget.is_running() {
            return Ok(());
        }

        self.attach_listeners()?;
        self.widget.start().map_err(to_js_error)?;

        if self.document.ready_state() == "complete" {
            self.widget.notify_load();
        }
        info!("Performance panel mounted");
        Ok(())
    }

    fn listen<F>(
        &self,
        target: &EventTarget,
        event: &'static str,
        capture: bool,
        handler: F,
    ) -> Result<(), JsValue>
    where
        F: FnMut(web_sys::Event) + 'static,
    {
        let guard = EventListenerGuard::attach(target, event, capture, handler)?;
        self.listeners.borrow_mut().push(guard);
        Ok(())
    }

    fn attach_listeners(&self) -> Result<(), JsValue> {
        let window: &EventTarget = self.window.as_ref();
        let document: &EventTarget = self.document.as_ref();

        for kind in InteractionKind::ALL {
            let weak = self.widget.downgrade();
            self.listen(window, kind.event_name(), true, move |_| {
                if let Some(widget) = weak.upgrade() {
                    widget.notify_interaction(kind);
                }
            })?;
        }

        let weak = self.widget.downgrade();
        let doc = self.document.clone();
        self.listen(document, "visibilitychange", false, move |_| {
            if doc.visibility_state() == VisibilityState::Hidden {
                if let Some(widget) = weak.upgrade() {
                    widget.notify_visibility_hidden();
                }
            }
        })?;

        let weak = self.widget.downgrade();
        self.listen(window, "load", false, move |_| {
            if let Some(widget) = weak.upgrade() {
                widget.notify_load();
            }
        })?;

        let weak = self.widget.downgrade();
        self.listen(self.panel.measure_button(), "click", false, move |_| {
            if let Some(widget) = weak.upgrade() {
                widget.scan_now();
            }
        })?;

        let weak = self.widget.downgrade();
        let panel = self.panel.clone();
        let listeners = self.listeners.clone();
        let win = self.window.clone();
        self.listen(self.panel.dismiss_button(), "click", false, move |_| {
            if let Some(widget) = weak.upgrade() {
                shut_down(&widget, &panel, &listeners, &win);
            }
        })?;

        self.mount_panel_when_ready()
    }

    fn mount_panel_when_ready(&self) -> Result<(), JsValue> {
        if self.document.body().is_some() {
            return self.panel.mount(&self.document);
        }

        let panel = self.panel.clone();
        let weak: WeakPerfWidget = self.widget.downgrade();
        let doc = self.document.clone();
        let document: &EventTarget = self.document.as_ref();
        self.listen(document, "DOMContentLoaded", false, move |_| {
            let running = weak.upgrade().is_some_and(|w| !w.is_torn_down());
            if running {
                if let Err(e) = panel.mount(&doc) {
                    warn!("Failed to mount panel: {:?}", e);
                }
            }
        })
    }

    /// Rescan resources and refresh at the next frame
    #[wasm_bindgen(js_name = scanNow)]
    pub fn scan_now(&self) {
        self.widget.scan_now();
    }

    /// Stop measuring and remove the panel
    #[wasm_bindgen]
    pub fn dismiss(&self) {
        shut_down(&self.widget, &self.panel, &self.listeners, &self.window);
    }

    /// The latest published snapshot, or `null` before the first frame
    #[wasm_bindgen]
    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        match self.widget.snapshot() {
            Some(snapshot) => panel::snapshot_to_js(&snapshot),
            None => Ok(JsValue::NULL),
        }
    }

    #[wasm_bindgen(getter, js_name = isActive)]
    pub fn is_active(&self) -> bool {
        self.widget.is_running()
    }

    #[wasm_bindgen(getter, js_name = publishedCount)]
    pub fn published_count(&self) -> f64 {
        self.widget.published_count() as f64
    }
}

/// Create and mount a panel in one call
#[wasm_bindgen]
pub fn install(config: JsValue) -> Result<PerfPanel, JsValue> {
    let panel = PerfPanel::new(config)?;
    panel.mount()?;
    Ok(panel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_version() {
        let version = get_version();
        assert!(!version.is_empty());
    }
}

#[cfg(test)]
#[cfg(target_arch = "wasm32")]
mod wasm_tests {
    use super::*;
    use perfpanel_core::LcpPolicy;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_parse_config_defaults() {
        let config = parse_config(JsValue::UNDEFINED).unwrap();
        assert_eq!(config, PanelConfig::default());
        let config = parse_config(JsValue::NULL).unwrap();
        assert_eq!(config, PanelConfig::default());
    }

    #[wasm_bindgen_test]
    fn test_parse_config_object() {
        let object = js_sys::Object::new();
        js_sys::Reflect::set(&object, &"lcp_policy".into(), &"never".into()).unwrap();
        let config = parse_config(object.into()).unwrap();
        assert_eq!(config.lcp_policy, LcpPolicy::Never);
    }

    #[wasm_bindgen_test]
    fn test_parse_config_rejects_bad_threshold() {
        let object = js_sys::Object::new();
        js_sys::Reflect::set(&object, &"blocking_threshold_ms".into(), &(-1.0).into()).unwrap();
        assert!(matches!(
            parse_config(object.into()),
            Err(PerfPanelError::Config(_))
        ));
    }

    #[wasm_bindgen_test]
    fn test_install_and_dismiss() {
        let overlay = install(JsValue::UNDEFINED).unwrap();
        assert!(overlay.is_active());
        let document = web_sys::window().unwrap().document().unwrap();
        assert!(document.get_element_by_id(panel::PANEL_ID).is_some());

        overlay.dismiss();
        assert!(!overlay.is_active());
        assert!(document.get_element_by_id(panel::PANEL_ID).is_none());
        assert!(overlay.mount().is_err());
    }
}
