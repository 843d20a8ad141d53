//! `PerformanceObserver` signal source
//!
//! One observer per timing category. Entries cross the boundary through
//! their `toJSON()` form so the core only ever sees [`TimingEntry`] values.

use js_sys::{Array, Function, Object, Reflect};
use perfpanel_core::{
    BatchSink, EntryCategory, ObserverHandle, PerfPanelError, SignalSource, SubscribeOptions,
    TimingEntry,
};
use tracing::debug;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{PerformanceEntry, PerformanceObserver, PerformanceObserverEntryList};

type ObserverCallback = Closure<dyn FnMut(PerformanceObserverEntryList, PerformanceObserver)>;

/// Signal source backed by the browser's `PerformanceObserver`
#[derive(Default)]
pub struct BrowserSignalSource;

impl BrowserSignalSource {
    pub fn new() -> Self {
        Self
    }
}

/// Entry types the browser advertises, or `None` when the API is missing
fn supported_entry_types() -> Option<Vec<String>> {
    let global = js_sys::global();
    let ctor = Reflect::get(&global, &JsValue::from_str("PerformanceObserver")).ok()?;
    if ctor.is_undefined() {
        return None;
    }
    let types = Reflect::get(&ctor, &JsValue::from_str("supportedEntryTypes")).ok()?;
    let types = types.dyn_into::<Array>().ok()?;
    Some(types.iter().filter_map(|t| t.as_string()).collect())
}

/// Whether the browser can deliver entries of `category`
pub fn is_supported(category: EntryCategory) -> bool {
    supported_entry_types()
        .map(|types| types.iter().any(|t| t == category.as_str()))
        .unwrap_or(false)
}

/// Convert one observed batch, skipping entries that do not deserialize
pub fn entries_from_list(
    category: EntryCategory,
    list: &PerformanceObserverEntryList,
) -> Vec<TimingEntry> {
    list.get_entries()
        .iter()
        .filter_map(|value| convert_entry(category, value))
        .collect()
}

pub(crate) fn convert_entry(category: EntryCategory, value: JsValue) -> Option<TimingEntry> {
    let entry = value.dyn_into::<PerformanceEntry>().ok()?;
    match serde_wasm_bindgen::from_value::<TimingEntry>(entry.to_json().into()) {
        Ok(timing) => Some(timing),
        Err(e) => {
            debug!("Skipping unreadable {} entry: {}", category, e);
            None
        }
    }
}

fn observe_options(category: EntryCategory, options: SubscribeOptions) -> Result<Object, JsValue> {
    let init = Object::new();
    Reflect::set(&init, &"type".into(), &category.as_str().into())?;
    Reflect::set(&init, &"buffered".into(), &options.include_buffered.into())?;
    Ok(init)
}

impl SignalSource for BrowserSignalSource {
    fn subscribe(
        &self,
        category: EntryCategory,
        options: SubscribeOptions,
        sink: BatchSink,
    ) -> Result<Box<dyn ObserverHandle>, PerfPanelError> {
        if !is_supported(category) {
            return Err(PerfPanelError::UnsupportedCategory(category));
        }

        let failed = |e: JsValue| PerfPanelError::Subscription {
            category,
            reason: format!("{:?}", e),
        };

        let callback: ObserverCallback = Closure::new(
            move |list: PerformanceObserverEntryList, _observer: PerformanceObserver| {
                let entries = entries_from_list(category, &list);
                if !entries.is_empty() {
                    sink(category, entries);
                }
            },
        );

        let observer =
            PerformanceObserver::new(callback.as_ref().unchecked_ref()).map_err(failed)?;
        let init = observe_options(category, options).map_err(failed)?;
        // observe() throws for rejected options; call it directly to surface that
        let observe = Reflect::get(&observer, &"observe".into())
            .and_then(|f| f.dyn_into::<Function>())
            .map_err(failed)?;
        observe.call1(&observer, &init).map_err(failed)?;

        debug!("Observing {} (buffered: {})", category, options.include_buffered);
        Ok(Box::new(BrowserObserverHandle {
            observer,
            _callback: callback,
        }))
    }
}

/// Keeps the observer callback alive until disconnect
struct BrowserObserverHandle {
    observer: PerformanceObserver,
    _callback: ObserverCallback,
}

impl ObserverHandle for BrowserObserverHandle {
    fn disconnect(&mut self) {
        self.observer.disconnect();
    }
}

impl Drop for BrowserObserverHandle {
    fn drop(&mut self) {
        // The callback is freed with the handle
        self.observer.disconnect();
    }
}
