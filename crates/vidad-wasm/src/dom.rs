//! DOM host - builds the overlay subtree in the page
//!
//! Every listener is owned by the view that registered it and removed when
//! the view detaches, so a closed overlay leaves nothing subscribed.

use std::rc::Rc;
use std::time::Duration;

use vidad_core::{
    ControlAction, Error, EventSink, Host, MediaBackend, MediaEvent, MountPlan, PlaybackError,
    PlaybackErrorKind, Result, StyleMap, SurfaceEvent, SurfaceSnapshot, View,
};
use wasm_bindgen::{prelude::*, JsCast};
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    Document, DomException, Event, EventTarget, HtmlButtonElement, HtmlElement,
    HtmlIFrameElement, HtmlInputElement, HtmlVideoElement, Window,
};

/// Id of the overlay root container
pub const CONTAINER_ID: &str = "video-ad-player-container";

const FRAME_STYLE: &str = "position: relative; width: 100%; height: 100%; background: black;";
const IFRAME_STYLE: &str = "width: 100%; height: 100%; border: none;";
const IFRAME_ALLOW: &str =
    "accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture";
const VIDEO_STYLE: &str = "width: 100%; height: 100%; object-fit: cover; display: block;";
const CLOSE_STYLE: &str = "position: absolute; top: 12px; right: 12px; z-index: 30; \
    background: rgba(0, 0, 0, 0.6); color: white; border: none; border-radius: 50%; \
    width: 32px; height: 32px; display: flex; align-items: center; justify-content: center; \
    cursor: pointer; transition: all 0.2s ease; backdrop-filter: blur(4px);";
const CLOSE_ICON: &str = r#"<svg width="16" height="16" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2"><line x1="18" y1="6" x2="6" y2="18"></line><line x1="6" y1="6" x2="18" y2="18"></line></svg>"#;
const BAR_STYLE: &str = "position: absolute; left: 0; right: 0; bottom: 0; z-index: 20; \
    display: flex; align-items: center; gap: 8px; padding: 8px 12px; \
    background: linear-gradient(transparent, rgba(0, 0, 0, 0.7)); color: white; \
    font: 12px sans-serif;";
const BAR_BUTTON_STYLE: &str =
    "background: none; border: none; color: white; cursor: pointer; font-size: 14px; padding: 0;";
const SCRUB_STYLE: &str = "flex: 1; cursor: pointer;";

/// Resolution of the scrub bar
const SCRUB_STEPS: f64 = 1000.0;

const MEDIA_EVENTS: [&str; 7] = [
    "loadedmetadata",
    "loadeddata",
    "timeupdate",
    "playing",
    "pause",
    "ended",
    "error",
];

pub(crate) fn describe(value: &JsValue) -> String {
    if let Some(s) = value.as_string() {
        return s;
    }
    if let Some(e) = value.dyn_ref::<DomException>() {
        return format!("{}: {}", e.name(), e.message());
    }
    if let Some(e) = value.dyn_ref::<js_sys::Error>() {
        return String::from(e.message());
    }
    format!("{value:?}")
}

fn mount_error(context: &str, value: JsValue) -> Error {
    Error::Mount(format!("{context}: {}", describe(&value)))
}

fn create<T: JsCast>(document: &Document, tag: &str) -> Result<T> {
    document
        .create_element(tag)
        .map_err(|e| mount_error("createElement", e))?
        .dyn_into::<T>()
        .map_err(|_| Error::Mount(format!("<{tag}> is not the expected element type")))
}

fn apply_style(element: &HtmlElement, style: &StyleMap) -> Result<()> {
    let declaration = element.style();
    for (property, value) in style.iter() {
        declaration
            .set_property(property, value)
            .map_err(|e| mount_error(property, e))?;
    }
    Ok(())
}

/// An event listener removed from its target on drop
struct Listener {
    target: EventTarget,
    event: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl Listener {
    fn attach(
        target: &EventTarget,
        event: &'static str,
        handler: impl FnMut(Event) + 'static,
    ) -> Result<Self> {
        let callback = Closure::<dyn FnMut(Event)>::new(handler);
        target
            .add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
            .map_err(|e| mount_error(event, e))?;

        Ok(Self {
            target: target.clone(),
            event,
            callback,
        })
    }

    /// Listener forwarding a fixed event into the sink
    fn forward(target: &EventTarget, event: &'static str, sink: &EventSink, to: SurfaceEvent) -> Result<Self> {
        let sink = Rc::clone(sink);
        Self::attach(target, event, move |_| sink(to.clone()))
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.event, self.callback.as_ref().unchecked_ref());
    }
}

/// Translate a native media event
fn media_event(name: &str, video: &HtmlVideoElement) -> Option<MediaEvent> {
    Some(match name {
        "loadedmetadata" => MediaEvent::LoadedMetadata {
            duration: video.duration(),
        },
        "loadeddata" => MediaEvent::LoadedData,
        "timeupdate" => MediaEvent::TimeUpdate {
            current_time: video.current_time(),
        },
        "playing" => MediaEvent::Playing,
        "pause" => MediaEvent::Paused,
        "ended" => MediaEvent::Ended,
        "error" => MediaEvent::Error(match video.error() {
            Some(e) => PlaybackError::from_media_error(e.code(), e.message()),
            None => PlaybackError::new(PlaybackErrorKind::Unknown, "Video playback error"),
        }),
        _ => return None,
    })
}

/// Play rejections that are not failures of their own.
///
/// `AbortError` means a pause interrupted the request. `NotSupportedError`
/// follows a failed load, which the element's `error` event already reports.
fn is_reported_elsewhere(rejection: &JsValue) -> bool {
    rejection
        .dyn_ref::<DomException>()
        .is_some_and(|d| matches!(d.name().as_str(), "AbortError" | "NotSupportedError"))
}

/// `<video>` element driven by the surface
pub struct DomMedia {
    video: HtmlVideoElement,
    sink: EventSink,
}

impl MediaBackend for DomMedia {
    fn play(&self) {
        let promise = match self.video.play() {
            Ok(promise) => promise,
            Err(e) => js_sys::Promise::reject(&e),
        };

        // Rejections arrive later; the sink must not run while the caller holds state
        let sink = Rc::clone(&self.sink);
        wasm_bindgen_futures::spawn_local(async move {
            let Err(e) = JsFuture::from(promise).await else {
                return;
            };
            if is_reported_elsewhere(&e) {
                web_sys::console::warn_1(&format!("[Vidad] Play rejected: {}", describe(&e)).into());
            } else {
                sink(SurfaceEvent::Media(MediaEvent::Error(PlaybackError::autoplay(describe(&e)))));
            }
        });
    }

    fn pause(&self) {
        if let Err(e) = self.video.pause() {
            web_sys::console::warn_1(&format!("[Vidad] Pause failed: {}", describe(&e)).into());
        }
    }

    fn set_volume(&self, volume: f64) {
        self.video.set_volume(volume);
    }

    fn set_current_time(&self, seconds: f64) {
        self.video.set_current_time(seconds);
    }

    fn duration(&self) -> Option<f64> {
        let duration = self.video.duration();
        duration.is_finite().then_some(duration)
    }

    fn set_muted(&self, muted: bool) {
        self.video.set_muted(muted);
    }

    fn request_fullscreen(&self) {
        if let Err(e) = self.video.request_fullscreen() {
            web_sys::console::warn_1(&format!("[Vidad] Fullscreen refused: {}", describe(&e)).into());
        }
    }
}

/// `m:ss`
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

/// The full variant's play / mute / scrub / fullscreen bar
struct ControlBar {
    play: HtmlButtonElement,
    mute: HtmlButtonElement,
    scrub: HtmlInputElement,
    time: HtmlElement,
}

impl ControlBar {
    fn build(
        document: &Document,
        parent: &HtmlElement,
        sink: &EventSink,
        listeners: &mut Vec<Listener>,
    ) -> Result<Self> {
        let bar: HtmlElement = create(document, "div")?;
        bar.style().set_css_text(BAR_STYLE);

        let button = |label: &str, action: ControlAction, listeners: &mut Vec<Listener>| -> Result<HtmlButtonElement> {
            let b: HtmlButtonElement = create(document, "button")?;
            b.style().set_css_text(BAR_BUTTON_STYLE);
            b.set_type("button");
            b.set_text_content(Some(label));
            listeners.push(Listener::forward(&b, "click", sink, SurfaceEvent::Control(action))?);
            Ok(b)
        };

        let play = button("\u{25B6}", ControlAction::TogglePlay, listeners)?;
        let mute = button("\u{1F507}", ControlAction::ToggleMute, listeners)?;

        let scrub: HtmlInputElement = create(document, "input")?;
        scrub.set_type("range");
        scrub.set_min("0");
        scrub.set_max(&SCRUB_STEPS.to_string());
        scrub.set_value("0");
        scrub.style().set_css_text(SCRUB_STYLE);
        {
            let sink = Rc::clone(sink);
            let input = scrub.clone();
            listeners.push(Listener::attach(&scrub, "input", move |_| {
                let fraction = input.value_as_number() / SCRUB_STEPS;
                if fraction.is_finite() {
                    sink(SurfaceEvent::Control(ControlAction::Scrub(fraction)));
                }
            })?);
        }

        let time: HtmlElement = create(document, "span")?;
        time.set_text_content(Some("0:00 / 0:00"));

        let fullscreen = button("\u{26F6}", ControlAction::Fullscreen, listeners)?;

        for child in [
            play.unchecked_ref::<HtmlElement>(),
            mute.unchecked_ref(),
            scrub.unchecked_ref(),
            &time,
            fullscreen.unchecked_ref(),
        ] {
            bar.append_child(child).map_err(|e| mount_error("control bar", e))?;
        }
        parent
            .append_child(&bar)
            .map_err(|e| mount_error("control bar", e))?;

        Ok(Self {
            play,
            mute,
            scrub,
            time,
        })
    }

    fn sync(&self, snapshot: &SurfaceSnapshot) {
        self.play
            .set_text_content(Some(if snapshot.playing { "\u{275A}\u{275A}" } else { "\u{25B6}" }));
        self.mute
            .set_text_content(Some(if snapshot.muted { "\u{1F507}" } else { "\u{1F50A}" }));
        self.scrub
            .set_value(&(snapshot.progress() * SCRUB_STEPS).round().to_string());
        self.time.set_text_content(Some(&format!(
            "{} / {}",
            format_time(snapshot.position),
            format_time(snapshot.duration.unwrap_or(0.0))
        )));
    }
}

/// A mounted overlay in the page
pub struct DomView {
    container: HtmlElement,
    media: Option<DomMedia>,
    controls: Option<ControlBar>,
    listeners: Vec<Listener>,
    exit_style: StyleMap,
}

impl View for DomView {
    type Element = HtmlElement;

    fn element(&self) -> HtmlElement {
        self.container.clone()
    }

    fn media(&self) -> Option<&dyn MediaBackend> {
        self.media.as_ref().map(|m| m as &dyn MediaBackend)
    }

    fn begin_exit(&self) {
        if let Err(e) = apply_style(&self.container, &self.exit_style) {
            web_sys::console::warn_1(&e.to_string().into());
        }
    }

    fn detach(&mut self) {
        self.listeners.clear();
        if let Some(media) = &self.media {
            media.pause();
        }
        self.container.remove();
    }

    fn is_attached(&self) -> bool {
        self.container.is_connected()
    }

    fn sync(&self, snapshot: &SurfaceSnapshot) {
        if let Some(controls) = &self.controls {
            controls.sync(snapshot);
        }
    }
}

/// Mounts overlays into `document.body` and schedules with `setTimeout`
pub struct DomHost {
    window: Window,
    document: Document,
}

impl DomHost {
    pub fn new() -> Result<Rc<Self>> {
        let window = web_sys::window().ok_or_else(|| Error::Mount("no global window".into()))?;
        let document = window
            .document()
            .ok_or_else(|| Error::Mount("window has no document".into()))?;
        Ok(Rc::new(Self { window, document }))
    }

    fn close_button(&self, parent: &HtmlElement, sink: &EventSink, listeners: &mut Vec<Listener>) -> Result<()> {
        let button: HtmlButtonElement = create(&self.document, "button")?;
        button.set_type("button");
        button.style().set_css_text(CLOSE_STYLE);
        button.set_inner_html(CLOSE_ICON);
        button
            .set_attribute("aria-label", "Close video")
            .map_err(|e| mount_error("close button", e))?;

        listeners.push(Listener::forward(&button, "click", sink, SurfaceEvent::CloseRequested)?);
        for (event, background) in [("mouseover", "rgba(0, 0, 0, 0.8)"), ("mouseout", "rgba(0, 0, 0, 0.6)")] {
            let target = button.clone();
            listeners.push(Listener::attach(&button, event, move |_| {
                let _ = target.style().set_property("background", background);
            })?);
        }

        parent
            .append_child(&button)
            .map_err(|e| mount_error("close button", e))?;
        Ok(())
    }

    fn embed_frame(&self, plan: &MountPlan, parent: &HtmlElement) -> Result<()> {
        let frame: HtmlIFrameElement = create(&self.document, "iframe")?;
        frame.set_src(&plan.source.url);
        frame.style().set_css_text(IFRAME_STYLE);
        frame.set_allow_fullscreen(true);
        frame
            .set_attribute("allow", IFRAME_ALLOW)
            .and_then(|_| frame.set_attribute("title", "Video Ad"))
            .map_err(|e| mount_error("iframe", e))?;
        parent
            .append_child(&frame)
            .map_err(|e| mount_error("iframe", e))?;
        Ok(())
    }

    fn video(
        &self,
        plan: &MountPlan,
        parent: &HtmlElement,
        sink: &EventSink,
        listeners: &mut Vec<Listener>,
    ) -> Result<DomMedia> {
        let video: HtmlVideoElement = create(&self.document, "video")?;
        video.style().set_css_text(VIDEO_STYLE);
        video.set_autoplay(plan.autoplay);
        video.set_muted(plan.muted);
        video.set_default_muted(plan.muted);
        video
            .set_attribute("playsinline", "")
            .map_err(|e| mount_error("video", e))?;
        video.set_src(&plan.source.url);

        for name in MEDIA_EVENTS {
            let sink = Rc::clone(sink);
            let element = video.clone();
            listeners.push(Listener::attach(&video, name, move |_| {
                if let Some(event) = media_event(name, &element) {
                    sink(SurfaceEvent::Media(event));
                }
            })?);
        }

        parent
            .append_child(&video)
            .map_err(|e| mount_error("video", e))?;

        Ok(DomMedia {
            video,
            sink: Rc::clone(sink),
        })
    }
}

impl Host for DomHost {
    type View = DomView;

    fn mount(&self, plan: &MountPlan, sink: EventSink) -> Result<DomView> {
        let body = self
            .document
            .body()
            .ok_or_else(|| Error::Mount("document has no body".into()))?;

        let container: HtmlElement = create(&self.document, "div")?;
        container.set_id(CONTAINER_ID);
        apply_style(&container, &plan.style)?;

        let frame: HtmlElement = create(&self.document, "div")?;
        frame.style().set_css_text(FRAME_STYLE);
        container
            .append_child(&frame)
            .map_err(|e| mount_error("container", e))?;

        let mut listeners = Vec::new();
        if plan.closeable {
            self.close_button(&frame, &sink, &mut listeners)?;
        }

        let media = if plan.is_embed() {
            self.embed_frame(plan, &frame)?;
            None
        } else {
            Some(self.video(plan, &frame, &sink, &mut listeners)?)
        };

        let controls = if plan.has_control_bar() {
            Some(ControlBar::build(&self.document, &frame, &sink, &mut listeners)?)
        } else {
            None
        };

        body.append_child(&container)
            .map_err(|e| mount_error("document body", e))?;

        Ok(DomView {
            container,
            media,
            controls,
            listeners,
            exit_style: plan.exit_style.clone(),
        })
    }

    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) {
        let callback = Closure::once_into_js(move || task());
        let millis = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
        if let Err(e) = self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), millis)
        {
            web_sys::console::error_1(&format!("[Vidad] setTimeout failed: {}", describe(&e)).into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(7.9), "0:07");
        assert_eq!(format_time(75.0), "1:15");
        assert_eq!(format_time(f64::NAN), "0:00");
    }
}
