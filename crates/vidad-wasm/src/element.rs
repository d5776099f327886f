//! `<video-ad-player-sdk>` custom element
//!
//! The element class is defined in JS (custom elements must extend
//! `HTMLElement`) and forwards each lifecycle callback to a
//! [`VideoAdElementBinding`] created on first connection.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::Array;
use vidad_core::{
    tag::{AttributeSource, TagAdapter, TagEvent, VISIBILITY_THRESHOLD},
    OBSERVED_ATTRIBUTES, TAG_NAME,
};
use wasm_bindgen::{prelude::*, JsCast};
use web_sys::{
    CustomEvent, CustomEventInit, HtmlElement, IntersectionObserver, IntersectionObserverEntry,
    IntersectionObserverInit,
};

use crate::{dom::DomHost, to_js_error, VideoAdHandle};

#[wasm_bindgen(inline_js = r#"
export function defineVideoAdElement(name, observed, bind) {
  if (customElements.get(name)) {
    return false;
  }
  class VideoAdPlayerElement extends HTMLElement {
    static get observedAttributes() { return observed; }
    connectedCallback() {
      if (!this._binding) { this._binding = bind(this); }
      this._binding.connected();
    }
    disconnectedCallback() { if (this._binding) { this._binding.disconnected(); } }
    attributeChangedCallback(attr, oldValue, newValue) {
      if (this._binding) { this._binding.attributeChanged(attr, oldValue, newValue); }
    }
    play() { if (this._binding) { this._binding.play(); } }
    pause() { if (this._binding) { this._binding.pause(); } }
    close() { if (this._binding) { this._binding.close(); } }
    setVolume(volume) { if (this._binding) { this._binding.setVolume(volume); } }
    seek(time) { if (this._binding) { this._binding.seek(time); } }
    getPlayer() { return this._binding ? this._binding.player() : undefined; }
  }
  customElements.define(name, VideoAdPlayerElement);
  return true;
}
"#)]
extern "C" {
    #[wasm_bindgen(js_name = defineVideoAdElement, catch)]
    fn define_video_ad_element(
        name: &str,
        observed: Array,
        bind: &js_sys::Function,
    ) -> Result<bool, JsValue>;
}

/// Register `<video-ad-player-sdk>`. Returns false if it was already defined.
pub fn register() -> Result<bool, JsValue> {
    let host = DomHost::new().map_err(|e| to_js_error(&e))?;
    let observed: Array = OBSERVED_ATTRIBUTES.iter().map(|a| JsValue::from_str(a)).collect();

    let bind = Closure::<dyn FnMut(HtmlElement) -> VideoAdElementBinding>::new(
        move |element: HtmlElement| VideoAdElementBinding::new(element, Rc::clone(&host)),
    );
    // Lives as long as the element class
    let bind = bind.into_js_value();

    define_video_ad_element(TAG_NAME, observed, bind.unchecked_ref())
}

struct ElementAttributes<'a>(&'a HtmlElement);

impl AttributeSource for ElementAttributes<'_> {
    fn attribute(&self, name: &str) -> Option<String> {
        self.0.get_attribute(name)
    }
}

fn dispatch(element: &HtmlElement, event: TagEvent<DomHost>) {
    let name = event.name();
    let detail = match event {
        TagEvent::Ready(handle) => {
            let detail = js_sys::Object::new();
            let _ = js_sys::Reflect::set(
                &detail,
                &"player".into(),
                &VideoAdHandle::from(handle).into(),
            );
            Some(JsValue::from(detail))
        }
        TagEvent::Error(e) => Some(to_js_error(&e)),
        TagEvent::Close => None,
    };

    let init = CustomEventInit::new();
    if let Some(detail) = &detail {
        init.set_detail(detail);
    }
    let dispatched = CustomEvent::new_with_event_init_dict(name, &init)
        .and_then(|event| element.dispatch_event(&event));
    if let Err(e) = dispatched {
        web_sys::console::error_2(&format!("[Vidad] Failed to dispatch '{name}'").into(), &e);
    }
}

type VisibilityCallback = Closure<dyn FnMut(Array, IntersectionObserver)>;

/// State behind one `<video-ad-player-sdk>` element
#[wasm_bindgen]
pub struct VideoAdElementBinding {
    element: HtmlElement,
    adapter: Rc<TagAdapter<DomHost>>,
    observer: RefCell<Option<(IntersectionObserver, VisibilityCallback)>>,
}

impl VideoAdElementBinding {
    fn new(element: HtmlElement, host: Rc<DomHost>) -> Self {
        let target = element.clone();
        let adapter = TagAdapter::new(
            host,
            Rc::new(move |event: TagEvent<DomHost>| dispatch(&target, event)),
        );

        Self {
            element,
            adapter: Rc::new(adapter),
            observer: RefCell::new(None),
        }
    }

    fn observe(&self) {
        if self.observer.borrow().is_some() {
            return;
        }

        let adapter = Rc::clone(&self.adapter);
        let callback: VisibilityCallback = Closure::new(move |entries: Array, _: IntersectionObserver| {
            for entry in entries.iter() {
                let entry: IntersectionObserverEntry = entry.unchecked_into();
                let ratio = if entry.is_intersecting() {
                    entry.intersection_ratio()
                } else {
                    0.0
                };
                adapter.visibility_changed(ratio);
            }
        });

        let options = IntersectionObserverInit::new();
        options.set_threshold(&JsValue::from_f64(VISIBILITY_THRESHOLD));
        match IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &options) {
            Ok(observer) => {
                observer.observe(&self.element);
                *self.observer.borrow_mut() = Some((observer, callback));
            }
            Err(e) => {
                web_sys::console::warn_2(&"[Vidad] IntersectionObserver unavailable".into(), &e);
            }
        }
    }

    fn unobserve(&self) {
        if let Some((observer, _callback)) = self.observer.borrow_mut().take() {
            observer.disconnect();
        }
    }
}

#[wasm_bindgen]
impl VideoAdElementBinding {
    pub fn connected(&self) {
        self.adapter.connect(&ElementAttributes(&self.element));
        self.observe();
    }

    pub fn disconnected(&self) {
        self.adapter.disconnect();
        self.unobserve();
    }

    #[wasm_bindgen(js_name = attributeChanged)]
    pub fn attribute_changed(&self, name: String, old: Option<String>, new: Option<String>) {
        self.adapter.attribute_changed(
            &name,
            old.as_deref(),
            new.as_deref(),
            &ElementAttributes(&self.element),
        );
    }

    pub fn play(&self) {
        self.adapter.play();
    }

    pub fn pause(&self) {
        self.adapter.pause();
    }

    pub fn close(&self) {
        self.adapter.close();
    }

    #[wasm_bindgen(js_name = setVolume)]
    pub fn set_volume(&self, volume: f64) {
        self.adapter.set_volume(volume);
    }

    pub fn seek(&self, seconds: f64) {
        self.adapter.seek(seconds);
    }

    /// Handle of the element's current overlay
    pub fn player(&self) -> Option<VideoAdHandle> {
        self.adapter.player().map(VideoAdHandle::from)
    }
}
