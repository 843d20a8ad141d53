//! On-page panel and the global `window.__metrics` snapshot
//!
//! Both are [`SnapshotSink`]s: the widget publishes, they render. Every
//! string shown comes from [`display_rows`], so this module only moves text
//! into the DOM.

use js_sys::{Object, Reflect};
use perfpanel_core::{
    display_rows, MetricsState, PerfPanelError, Rating, RatingThresholds, Snapshot, SnapshotSink,
};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, Window};

/// Id of the panel's root element
pub const PANEL_ID: &str = "perf-panel";
/// Property on `window` holding the latest snapshot
pub const GLOBAL_PROPERTY: &str = "__metrics";

const PANEL_STYLE: &str = "position:fixed;right:16px;bottom:16px;z-index:9999;\
width:320px;font-family:system-ui;\
background:#0a0c1c;color:#e8ecf1;\
border-radius:12px;padding:12px;\
box-shadow:0 10px 40px rgba(0,0,0,.5)";

const BUTTON_STYLE: &str = "margin-top:8px;margin-right:8px;cursor:pointer";

/// Text color for a rated value
pub fn rating_color(rating: Option<Rating>) -> &'static str {
    match rating {
        Some(Rating::Good) => "#0cce6b",
        Some(Rating::NeedsImprovement) => "#ffa400",
        Some(Rating::Poor) => "#ff4e42",
        None => "inherit",
    }
}

/// DOM id of the value cell for a row
pub fn value_id(row_id: &str) -> String {
    format!("perf-{}", row_id)
}

/// The floating metrics panel
pub struct PanelView {
    root: Element,
    values: Vec<(&'static str, HtmlElement)>,
    measure_button: Element,
    dismiss_button: Element,
    thresholds: RatingThresholds,
}

impl PanelView {
    /// Build the panel (detached) with every metric pending
    ///
    /// # Errors
    /// Returns JsValue error if an element cannot be created
    pub fn new(
        document: &Document,
        title: &str,
        thresholds: RatingThresholds,
    ) -> Result<Self, JsValue> {
        let root = document.create_element("div")?;
        root.set_id(PANEL_ID);
        root.set_attribute("style", PANEL_STYLE)?;

        let heading = document.create_element("strong")?;
        heading.set_text_content(Some(title));
        root.append_child(&heading)?;

        let initial = Snapshot::new(MetricsState::default(), Vec::new(), 0);
        let mut values = Vec::new();
        for row in display_rows(&initial, &thresholds) {
            let line = document.create_element("div")?;
            line.set_text_content(Some(&format!("{}: ", row.label)));

            let value = document
                .create_element("span")?
                .dyn_into::<HtmlElement>()
                .map_err(|_| JsValue::from_str("span is not an HtmlElement"))?;
            value.set_id(&value_id(row.id));
            value.set_text_content(Some(&row.text));
            line.append_child(&value)?;
            root.append_child(&line)?;
            values.push((row.id, value));
        }

        let measure_button = Self::button(document, "perf-refresh", "Measure")?;
        root.append_child(&measure_button)?;
        let dismiss_button = Self::button(document, "perf-dismiss", "Dismiss")?;
        root.append_child(&dismiss_button)?;

        Ok(Self {
            root,
            values,
            measure_button,
            dismiss_button,
            thresholds,
        })
    }

    fn button(document: &Document, id: &str, label: &str) -> Result<Element, JsValue> {
        let button = document.create_element("button")?;
        button.set_id(id);
        button.set_attribute("type", "button")?;
        button.set_attribute("style", BUTTON_STYLE)?;
        button.set_text_content(Some(label));
        Ok(button)
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn measure_button(&self) -> &Element {
        &self.measure_button
    }

    pub fn dismiss_button(&self) -> &Element {
        &self.dismiss_button
    }

    /// Append the panel to the document body
    ///
    /// # Errors
    /// Returns JsValue error if the document has no body yet
    pub fn mount(&self, document: &Document) -> Result<(), JsValue> {
        if self.is_mounted() {
            return Ok(());
        }
        let body = document
            .body()
            .ok_or_else(|| JsValue::from_str("No body element available"))?;
        body.append_child(&self.root)?;
        Ok(())
    }

    pub fn is_mounted(&self) -> bool {
        self.root.is_connected()
    }

    /// Detach the panel from the page
    pub fn remove(&self) {
        self.root.remove();
    }

    /// Write a snapshot into the value cells
    pub fn render(&self, snapshot: &Snapshot) -> Result<(), JsValue> {
        for row in display_rows(snapshot, &self.thresholds) {
            let Some((_, cell)) = self.values.iter().find(|(id, _)| *id == row.id) else {
                continue;
            };
            cell.set_text_content(Some(&row.text));
            match row.rating {
                Some(rating) => cell.set_attribute("data-rating", rating.as_str())?,
                None => cell.remove_attribute("data-rating")?,
            }
            cell.style().set_property("color", rating_color(row.rating))?;
        }
        Ok(())
    }
}

impl SnapshotSink for PanelView {
    fn publish(&self, snapshot: &Snapshot) -> Result<(), PerfPanelError> {
        self.render(snapshot)
            .map_err(|e| PerfPanelError::Sink(format!("panel render failed: {:?}", e)))
    }
}

/// Serialize a snapshot to a plain, frozen JS object
pub fn snapshot_to_js(snapshot: &Snapshot) -> Result<JsValue, JsValue> {
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    let value = snapshot
        .serialize(&serializer)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))?;
    if let Some(object) = value.dyn_ref::<Object>() {
        Object::freeze(object);
    }
    Ok(value)
}

/// Publishes each snapshot as `window.__metrics`
pub struct GlobalSnapshotSink {
    window: Window,
}

impl GlobalSnapshotSink {
    pub fn new(window: Window) -> Self {
        Self { window }
    }
}

impl SnapshotSink for GlobalSnapshotSink {
    fn publish(&self, snapshot: &Snapshot) -> Result<(), PerfPanelError> {
        let value =
            snapshot_to_js(snapshot).map_err(|e| PerfPanelError::Sink(format!("{:?}", e)))?;
        Reflect::set(&self.window, &JsValue::from_str(GLOBAL_PROPERTY), &value)
            .map_err(|e| PerfPanelError::Sink(format!("{:?}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_colors_are_distinct() {
        let colors = [
            rating_color(Some(Rating::Good)),
            rating_color(Some(Rating::NeedsImprovement)),
            rating_color(Some(Rating::Poor)),
        ];
        assert_ne!(colors[0], colors[1]);
        assert_ne!(colors[1], colors[2]);
        assert_eq!(rating_color(None), "inherit");
    }

    #[test]
    fn test_value_id() {
        assert_eq!(value_id("fcp"), "perf-fcp");
        assert_eq!(value_id("long-tasks"), "perf-long-tasks");
    }
}

#[cfg(test)]
#[cfg(target_arch = "wasm32")]
mod wasm_tests {
    use super::*;
    use perfpanel_core::EntryCategory;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn document() -> Document {
        web_sys::window().unwrap().document().unwrap()
    }

    fn snapshot() -> Snapshot {
        let metrics = MetricsState {
            first_contentful_paint: Some(120.0),
            cumulative_layout_shift: 0.05,
            request_count: 3,
            request_bytes: 1536,
            ..MetricsState::default()
        };
        Snapshot::new(metrics, vec![EntryCategory::LongTask], 1)
    }

    #[wasm_bindgen_test]
    fn test_panel_starts_pending() {
        let panel = PanelView::new(&document(), "Performance", RatingThresholds::default()).unwrap();
        assert_eq!(panel.root().id(), PANEL_ID);
        let fcp = panel.root().query_selector("#perf-fcp").unwrap().unwrap();
        assert_eq!(fcp.text_content().as_deref(), Some("-"));
        assert!(!panel.is_mounted());
    }

    #[wasm_bindgen_test]
    fn test_render_writes_rows() {
        let panel = PanelView::new(&document(), "Performance", RatingThresholds::default()).unwrap();
        panel.render(&snapshot()).unwrap();

        let text = |id: &str| {
            panel
                .root()
                .query_selector(&format!("#{}", value_id(id)))
                .unwrap()
                .unwrap()
                .text_content()
                .unwrap()
        };
        assert_eq!(text("fcp"), "120 ms");
        assert_eq!(text("cls"), "0.050");
        assert_eq!(text("tbt"), "n/a");
        assert_eq!(text("req"), "3");
        assert_eq!(text("bytes"), "1.5 KB");

        let fcp = panel.root().query_selector("#perf-fcp").unwrap().unwrap();
        assert_eq!(fcp.get_attribute("data-rating").as_deref(), Some("good"));
    }

    #[wasm_bindgen_test]
    fn test_mount_and_remove() {
        let document = document();
        let panel = PanelView::new(&document, "Performance", RatingThresholds::default()).unwrap();
        panel.mount(&document).unwrap();
        assert!(panel.is_mounted());
        panel.mount(&document).unwrap();
        assert_eq!(document.query_selector_all("#perf-panel").unwrap().length(), 1);
        panel.remove();
        assert!(!panel.is_mounted());
    }

    #[wasm_bindgen_test]
    fn test_global_sink_sets_frozen_object() {
        let window = web_sys::window().unwrap();
        let sink = GlobalSnapshotSink::new(window.clone());
        sink.publish(&snapshot()).unwrap();

        let value = Reflect::get(&window, &JsValue::from_str(GLOBAL_PROPERTY)).unwrap();
        let object = value.dyn_ref::<Object>().unwrap();
        assert!(Object::is_frozen(object));
        let fcp = Reflect::get(&value, &"firstContentfulPaint".into()).unwrap();
        assert_eq!(fcp.as_f64(), Some(120.0));
        let lcp = Reflect::get(&value, &"largestContentfulPaint".into()).unwrap();
        assert!(lcp.is_null());
        let requests = Reflect::get(&value, &"requestCount".into()).unwrap();
        assert_eq!(requests.as_f64(), Some(3.0));
    }
}
