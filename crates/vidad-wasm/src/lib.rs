//! Vidad WASM - Video Ad Overlay for the Browser
//!
//! Browser bindings for `vidad-core`:
//! - `createVideoAdPlayer(config)` for one-off overlays
//! - `VideoAdSdk` controller keeping a single overlay on screen
//! - `<video-ad-player-sdk>` custom element, registered on load
//!
//! ## Usage
//!
//! ```javascript
//! import init, { createVideoAdPlayer } from '@vidad/wasm';
//!
//! await init();
//! const player = createVideoAdPlayer({
//!   videoUrl: 'https://cdn.example.com/ad.mp4',
//!   position: 'bottom-right',
//!   onClose: () => console.log('closed'),
//! });
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use vidad_core::{
    layout::size_of_with, tag::render_tag, Error, LifecycleController, PlayerConfig,
    PlayerHandle, StyleMap,
};
use wasm_bindgen::{prelude::*, JsCast};

mod dom;
mod element;

pub use dom::{DomHost, DomMedia, DomView, CONTAINER_ID};
pub use element::VideoAdElementBinding;

/// Initialize the WASM module and register `<video-ad-player-sdk>`
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    match element::register() {
        Ok(_) => web_sys::console::log_1(&"[Vidad WASM] Initialized".into()),
        Err(e) => web_sys::console::error_2(&"[Vidad WASM] Element registration failed".into(), &e),
    }
}

/// Library version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Register `<video-ad-player-sdk>` if `init` could not
#[wasm_bindgen(js_name = registerVideoAdElement)]
pub fn register_video_ad_element() -> Result<bool, JsValue> {
    element::register()
}

/// Convert an error into a JS `Error` carrying a `code` property
pub(crate) fn to_js_error(error: &Error) -> JsValue {
    let js = js_sys::Error::new(&error.to_string());
    js.set_name("VideoAdError");
    let _ = js_sys::Reflect::set(&js, &"code".into(), &error.error_code().into());
    js.into()
}

fn function(config: &JsValue, name: &str) -> Option<js_sys::Function> {
    js_sys::Reflect::get(config, &name.into())
        .ok()
        .and_then(|value| value.dyn_into::<js_sys::Function>().ok())
}

fn report_callback_failure(name: &str, result: Result<JsValue, JsValue>) {
    if let Err(e) = result {
        web_sys::console::error_2(&format!("[Vidad] {name} callback threw").into(), &e);
    }
}

/// Read a config object, including its `onClose` / `onComplete` / `onError` functions
fn config_from_js(value: &JsValue) -> Result<PlayerConfig, JsValue> {
    if !value.is_object() {
        return Err(to_js_error(&Error::InvalidConfig(
            "config must be an object".into(),
        )));
    }

    let mut config: PlayerConfig = serde_wasm_bindgen::from_value(value.clone())
        .map_err(|e| to_js_error(&Error::InvalidConfig(e.to_string())))?;

    if let Some(f) = function(value, "onClose") {
        config = config.on_close(move || report_callback_failure("onClose", f.call0(&JsValue::NULL)));
    }
    if let Some(f) = function(value, "onComplete") {
        config = config.on_complete(move || {
            report_callback_failure("onComplete", f.call0(&JsValue::NULL))
        });
    }
    if let Some(f) = function(value, "onError") {
        config = config.on_error(move |e| {
            report_callback_failure("onError", f.call1(&JsValue::NULL, &to_js_error(e)))
        });
    }

    Ok(config)
}

fn create(controller: &LifecycleController<DomHost>, config: &JsValue) -> Result<VideoAdHandle, JsValue> {
    let config = config_from_js(config)?;
    controller
        .create(config)
        .map(VideoAdHandle::from)
        .map_err(|e| {
            web_sys::console::error_1(&format!("[Vidad] {e}").into());
            to_js_error(&e)
        })
}

thread_local! {
    static DEFAULT_CONTROLLER: RefCell<Option<Rc<LifecycleController<DomHost>>>> = const { RefCell::new(None) };
}

fn default_controller() -> Result<Rc<LifecycleController<DomHost>>, JsValue> {
    DEFAULT_CONTROLLER.with(|slot| {
        if let Some(controller) = slot.borrow().as_ref() {
            return Ok(Rc::clone(controller));
        }
        let host = DomHost::new().map_err(|e| to_js_error(&e))?;
        let controller = Rc::new(LifecycleController::new(host));
        *slot.borrow_mut() = Some(Rc::clone(&controller));
        Ok(controller)
    })
}

/// Create an overlay. A previous overlay made this way starts closing first.
#[wasm_bindgen(js_name = createVideoAdPlayer)]
pub fn create_video_ad_player(config: JsValue) -> Result<VideoAdHandle, JsValue> {
    let controller = default_controller()?;
    create(&controller, &config)
}

/// Resolved source URL and kind for a config, without mounting anything
#[wasm_bindgen(js_name = resolveSource)]
pub fn resolve_source(config: JsValue) -> Result<JsValue, JsValue> {
    let config = config_from_js(&config)?;
    let source = vidad_core::resolve(&config).map_err(|e| to_js_error(&e))?;
    serde_wasm_bindgen::to_value(&source).map_err(Into::into)
}

#[derive(Serialize)]
struct Layout {
    width: u32,
    height: u32,
    style: StyleMap,
}

/// Dimensions and container style for a config
#[wasm_bindgen(js_name = computeLayout)]
pub fn compute_layout(config: JsValue) -> Result<JsValue, JsValue> {
    let config = config_from_js(&config)?;
    let dimensions = size_of_with(config.orientation, config.size, config.width, config.height);
    let layout = Layout {
        width: dimensions.width,
        height: dimensions.height,
        style: vidad_core::container_style(&config),
    };
    serde_wasm_bindgen::to_value(&layout).map_err(Into::into)
}

/// `<video-ad-player-sdk>` markup reproducing a config
#[wasm_bindgen(js_name = renderTag)]
pub fn render_tag_js(config: JsValue) -> Result<String, JsValue> {
    Ok(render_tag(&config_from_js(&config)?))
}

/// Persistent controller keeping at most one overlay on screen
#[wasm_bindgen]
pub struct VideoAdSdk {
    controller: LifecycleController<DomHost>,
}

#[wasm_bindgen]
impl VideoAdSdk {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<VideoAdSdk, JsValue> {
        let host = DomHost::new().map_err(|e| to_js_error(&e))?;
        Ok(Self {
            controller: LifecycleController::new(host),
        })
    }

    /// Create an overlay, closing the current one first
    pub fn init(&self, config: JsValue) -> Result<VideoAdHandle, JsValue> {
        create(&self.controller, &config)
    }

    /// Handle of the current overlay
    pub fn current(&self) -> Option<VideoAdHandle> {
        self.controller.current().map(VideoAdHandle::from)
    }

    /// Close the current overlay
    pub fn close(&self) {
        self.controller.close();
    }

    /// Alias of `close`
    pub fn destroy(&self) {
        self.controller.close();
    }

    #[wasm_bindgen(js_name = isActive)]
    pub fn is_active(&self) -> bool {
        self.controller.is_active()
    }
}

/// Caller handle to one overlay. Every method is a no-op once it is closed.
#[wasm_bindgen]
pub struct VideoAdHandle {
    inner: PlayerHandle<DomHost>,
}

impl From<PlayerHandle<DomHost>> for VideoAdHandle {
    fn from(inner: PlayerHandle<DomHost>) -> Self {
        Self { inner }
    }
}

#[wasm_bindgen]
impl VideoAdHandle {
    pub fn play(&self) {
        self.inner.play();
    }

    pub fn pause(&self) {
        self.inner.pause();
    }

    /// Start closing; `onClose` fires once the overlay is removed
    pub fn close(&self) {
        self.inner.close();
    }

    /// Volume in `[0, 1]`, clamped
    #[wasm_bindgen(js_name = setVolume)]
    pub fn set_volume(&self, volume: f64) {
        self.inner.set_volume(volume);
    }

    /// Seek to a position in seconds
    pub fn seek(&self, seconds: f64) {
        self.inner.seek(seconds);
    }

    /// Root container, absent once removed
    #[wasm_bindgen(js_name = getElement)]
    pub fn get_element(&self) -> Option<web_sys::HtmlElement> {
        self.inner.element()
    }

    #[wasm_bindgen(js_name = isActive)]
    pub fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    /// `uninitialized`, `mounted`, `closing` or `unmounted`
    #[wasm_bindgen(getter)]
    pub fn state(&self) -> String {
        self.inner.state().to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn id(&self) -> String {
        self.inner.id().to_string()
    }

    /// Playback state: `{ playing, muted, position, duration, completed }`
    pub fn snapshot(&self) -> JsValue {
        self.inner
            .snapshot()
            .and_then(|s| serde_wasm_bindgen::to_value(&s).ok())
            .unwrap_or(JsValue::UNDEFINED)
    }
}
