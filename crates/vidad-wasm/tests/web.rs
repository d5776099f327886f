//! Browser tests for Vidad WASM
//!
//! Run with `wasm-pack test --headless --chrome crates/vidad-wasm`.

#![cfg(target_arch = "wasm32")]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use vidad_wasm::{create_video_ad_player, register_video_ad_element, VideoAdSdk, CONTAINER_ID};
use wasm_bindgen::{prelude::*, JsCast};
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

async fn sleep(ms: i32) {
    let promise = js_sys::Promise::new(&mut |resolve, _| {
        web_sys::window()
            .unwrap()
            .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms)
            .unwrap();
    });
    JsFuture::from(promise).await.unwrap();
}

fn config(json: &str) -> JsValue {
    js_sys::JSON::parse(json).unwrap()
}

fn frame_with(src_part: &str) -> Option<web_sys::Element> {
    web_sys::window()
        .unwrap()
        .document()
        .unwrap()
        .query_selector(&format!("iframe[src*=\"{src_part}\"]"))
        .unwrap()
}

#[wasm_bindgen_test]
fn test_version() {
    assert!(!vidad_wasm::version().is_empty());
}

#[wasm_bindgen_test]
fn test_missing_source_rejected() {
    let err = create_video_ad_player(config(r#"{"position": "center"}"#)).err().unwrap();
    let code = js_sys::Reflect::get(&err, &"code".into()).unwrap();
    assert_eq!(code.as_string().as_deref(), Some("NO_SOURCE"));
}

#[wasm_bindgen_test]
fn test_embed_mounts_iframe() {
    let sdk = VideoAdSdk::new().unwrap();
    let handle = sdk
        .init(config(r#"{"videoId": "abc", "position": "center", "size": "large"}"#))
        .unwrap();

    let element = handle.get_element().unwrap();
    assert_eq!(element.id(), CONTAINER_ID);
    assert_eq!(element.style().get_property_value("width").unwrap(), "640px");
    assert_eq!(element.style().get_property_value("top").unwrap(), "50%");

    let frame = element.query_selector("iframe").unwrap().unwrap();
    let src = frame.get_attribute("src").unwrap();
    assert!(src.starts_with("https://www.youtube.com/embed/abc?"));

    sdk.destroy();
}

#[wasm_bindgen_test]
async fn test_close_after_grace() {
    let closes = Rc::new(Cell::new(0));
    let counter = Rc::clone(&closes);
    let on_close = Closure::<dyn FnMut()>::new(move || counter.set(counter.get() + 1));

    let cfg = config(r#"{"videoUrl": "https://example.com/ad.mp4", "muted": true}"#);
    js_sys::Reflect::set(&cfg, &"onClose".into(), on_close.as_ref()).unwrap();

    let sdk = VideoAdSdk::new().unwrap();
    let handle = sdk.init(cfg).unwrap();
    let element = handle.get_element().unwrap();
    assert!(element.query_selector("video").unwrap().is_some());

    handle.close();
    handle.close();
    assert_eq!(element.style().get_property_value("opacity").unwrap(), "0");
    assert!(element.is_connected());

    sleep(400).await;
    assert!(!element.is_connected());
    assert_eq!(closes.get(), 1);
    assert_eq!(handle.state(), "unmounted");

    // No-ops once removed
    handle.play();
    handle.seek(3.0);
    assert!(handle.get_element().is_none());
}

#[wasm_bindgen_test]
async fn test_load_failure_reports_one_error() {
    let codes = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&codes);
    let on_error = Closure::<dyn FnMut(JsValue)>::new(move |err: JsValue| {
        let code = js_sys::Reflect::get(&err, &"code".into()).ok().and_then(|c| c.as_string());
        seen.borrow_mut().push(code.unwrap_or_default());
    });

    let cfg = config(r#"{"videoUrl": "data:text/plain,not-a-video", "autoplay": false}"#);
    js_sys::Reflect::set(&cfg, &"onError".into(), on_error.as_ref()).unwrap();

    let sdk = VideoAdSdk::new().unwrap();
    let handle = sdk.init(cfg).unwrap();
    // Pending play promise is rejected when the load fails
    handle.play();

    sleep(1000).await;
    assert_eq!(codes.borrow().len(), 1, "errors: {:?}", codes.borrow());
    assert!(codes.borrow()[0].starts_with("PLAYBACK"));
    assert!(handle.is_active());

    sdk.destroy();
    sleep(400).await;
}

#[wasm_bindgen_test]
async fn test_sdk_keeps_one_overlay() {
    let sdk = VideoAdSdk::new().unwrap();
    let first = sdk.init(config(r#"{"videoId": "sdkfirst"}"#)).unwrap();
    let second = sdk.init(config(r#"{"videoId": "sdksecond"}"#)).unwrap();
    assert_eq!(first.state(), "closing");

    sleep(400).await;
    assert!(frame_with("sdkfirst").is_none());
    assert!(frame_with("sdksecond").is_some());
    assert!(second.is_active());

    sdk.close();
    sleep(400).await;
    assert!(frame_with("sdksecond").is_none());
    assert!(!sdk.is_active());
}

#[wasm_bindgen_test]
async fn test_custom_element() {
    // Idempotent: the start function may already have registered it
    register_video_ad_element().unwrap();

    let document = web_sys::window().unwrap().document().unwrap();
    let tag: web_sys::HtmlElement = document
        .create_element("video-ad-player-sdk")
        .unwrap()
        .dyn_into()
        .unwrap();
    tag.set_attribute("videoid", "tagvideo").unwrap();
    tag.set_attribute("position", "top left").unwrap();

    let readies = Rc::new(Cell::new(0));
    let counter = Rc::clone(&readies);
    let on_ready = Closure::<dyn FnMut(web_sys::Event)>::new(move |_| counter.set(counter.get() + 1));
    tag.add_event_listener_with_callback("ready", on_ready.as_ref().unchecked_ref())
        .unwrap();

    document.body().unwrap().append_child(&tag).unwrap();
    assert_eq!(readies.get(), 1);
    assert!(frame_with("tagvideo").is_some());

    tag.remove();
    sleep(400).await;
    assert!(frame_with("tagvideo").is_none());
}
