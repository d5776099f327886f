//! Declarative Tag Adapter
//!
//! Maps the attributes of a `<video-ad-player-sdk>` element onto a
//! [`PlayerConfig`] and drives a [`LifecycleController`] from element
//! callbacks: connect, attribute change, visibility change, disconnect.
//!
//! ```html
//! <video-ad-player-sdk videoid="dQw4w9WgXcQ" position="top left" size="small"></video-ad-player-sdk>
//! ```

use crate::{
    config::PlayerConfig,
    error::Error,
    lifecycle::{Host, LifecycleController, PlayerHandle},
    types::{Position, Size},
};
use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use std::rc::Rc;
use tracing::{debug, error, warn};

/// Registered custom element name
pub const TAG_NAME: &str = "video-ad-player-sdk";

/// Attributes whose changes re-initialize the overlay
pub const OBSERVED_ATTRIBUTES: [&str; 10] = [
    "videoid",
    "playbackid",
    "videourl",
    "position",
    "size",
    "width",
    "height",
    "muted",
    "closeable",
    "zindex",
];

/// Visible fraction of the element at or above which the overlay plays
pub const VISIBILITY_THRESHOLD: f64 = 0.1;

/// Read access to element attributes
pub trait AttributeSource {
    fn attribute(&self, name: &str) -> Option<String>;
}

impl AttributeSource for BTreeMap<String, String> {
    fn attribute(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl<S: BuildHasher> AttributeSource for HashMap<String, String, S> {
    fn attribute(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Normalize a position attribute: `"top left"`, `"Left Top"`, `"top-left"`
/// all mean top-left. Unknown values fall back to bottom-right.
pub fn normalize_position(raw: &str) -> Position {
    let words: Vec<String> = raw
        .split_whitespace()
        .map(|w| w.to_ascii_lowercase())
        .collect();
    let joined = words.join(" ");

    let mapped = match joined.as_str() {
        "top left" | "left top" => Some(Position::TopLeft),
        "top right" | "right top" => Some(Position::TopRight),
        "bottom left" | "left bottom" => Some(Position::BottomLeft),
        "bottom right" | "right bottom" => Some(Position::BottomRight),
        other => other.parse().ok(),
    };

    mapped.unwrap_or_else(|| {
        warn!(position = raw, "Unknown position attribute, using bottom-right");
        Position::default()
    })
}

/// A present boolean attribute is true unless it is literally `"false"`
pub fn parse_bool_attribute(value: &str) -> bool {
    value != "false"
}

/// Leading integer of an attribute, `"320px"` -> 320
fn parse_leading_int(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let (sign, digits) = match raw.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

/// Build a config from element attributes. Empty attributes count as absent.
pub fn config_from_attributes(attrs: &impl AttributeSource) -> PlayerConfig {
    let get = |name: &str| attrs.attribute(name).filter(|v| !v.is_empty());
    let mut config = PlayerConfig {
        video_id: get("videoid"),
        playback_id: get("playbackid"),
        video_url: get("videourl"),
        ..Default::default()
    };

    if let Some(position) = get("position") {
        config.position = normalize_position(&position);
    }
    if let Some(size) = get("size") {
        config.size = Size::parse_lenient(&size);
    }

    let dimension = |name: &str| {
        get(name)
            .and_then(|v| parse_leading_int(&v))
            .and_then(|n| u32::try_from(n).ok())
    };
    config.width = dimension("width");
    config.height = dimension("height");

    // Boolean attributes may be present with an empty value
    if let Some(muted) = attrs.attribute("muted") {
        config.muted = parse_bool_attribute(&muted);
    }
    if let Some(closeable) = attrs.attribute("closeable") {
        config.closeable = parse_bool_attribute(&closeable);
    }

    if let Some(z) = get("zindex").and_then(|v| parse_leading_int(&v)) {
        config.z_index = i32::try_from(z).unwrap_or(config.z_index);
    }

    config
}

/// Attributes reproducing a config through [`config_from_attributes`]
pub fn attributes_from_config(config: &PlayerConfig) -> Vec<(&'static str, String)> {
    let mut attrs = Vec::new();
    if let Some(id) = &config.video_id {
        attrs.push(("videoid", id.clone()));
    }
    if let Some(id) = &config.playback_id {
        attrs.push(("playbackid", id.clone()));
    }
    if let Some(url) = &config.video_url {
        attrs.push(("videourl", url.clone()));
    }
    attrs.push(("position", config.position.to_string()));
    attrs.push(("size", config.size.to_string()));
    if let Some(w) = config.width {
        attrs.push(("width", w.to_string()));
    }
    if let Some(h) = config.height {
        attrs.push(("height", h.to_string()));
    }
    attrs.push(("muted", config.muted.to_string()));
    attrs.push(("closeable", config.closeable.to_string()));
    attrs.push(("zindex", config.z_index.to_string()));
    attrs
}

/// Render an embeddable tag for a config
pub fn render_tag(config: &PlayerConfig) -> String {
    let attrs: String = attributes_from_config(config)
        .into_iter()
        .map(|(name, value)| format!(" {}=\"{}\"", name, escape_attribute(&value)))
        .collect();
    format!("<{TAG_NAME}{attrs}></{TAG_NAME}>")
}

fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

/// Notifications an element dispatches
pub enum TagEvent<H: Host> {
    /// A new overlay is mounted
    Ready(PlayerHandle<H>),
    /// An overlay finished closing
    Close,
    /// Initialization or playback failed
    Error(Error),
}

impl<H: Host> TagEvent<H> {
    /// DOM event name
    pub fn name(&self) -> &'static str {
        match self {
            TagEvent::Ready(_) => "ready",
            TagEvent::Close => "close",
            TagEvent::Error(_) => "error",
        }
    }
}

/// Receiver of [`TagEvent`]s
pub type TagNotifier<H> = Rc<dyn Fn(TagEvent<H>)>;

/// Per-element state behind the custom element callbacks
pub struct TagAdapter<H: Host> {
    controller: LifecycleController<H>,
    notify: TagNotifier<H>,
    connected: Cell<bool>,
}

impl<H: Host> TagAdapter<H> {
    pub fn new(host: Rc<H>, notify: TagNotifier<H>) -> Self {
        Self {
            controller: LifecycleController::new(host),
            notify,
            connected: Cell::new(false),
        }
    }

    /// Element inserted into the document
    pub fn connect(&self, attrs: &impl AttributeSource) {
        self.connected.set(true);
        self.init(attrs);
    }

    /// Element removed from the document: close the overlay
    pub fn disconnect(&self) {
        self.connected.set(false);
        self.controller.close();
    }

    /// An attribute changed. Observed attributes with a new value
    /// re-initialize a connected element.
    pub fn attribute_changed(
        &self,
        name: &str,
        old: Option<&str>,
        new: Option<&str>,
        attrs: &impl AttributeSource,
    ) {
        let name = name.to_ascii_lowercase();
        if !self.connected.get() || old == new || !OBSERVED_ATTRIBUTES.contains(&name.as_str()) {
            return;
        }

        debug!(attribute = %name, ?old, ?new, "Re-initializing overlay");
        self.controller.close();
        self.init(attrs);
    }

    /// Visible fraction of the element changed
    pub fn visibility_changed(&self, ratio: f64) {
        if let Some(handle) = self.controller.current() {
            if ratio >= VISIBILITY_THRESHOLD {
                handle.play();
            } else {
                handle.pause();
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.get()
    }

    /// Handle of the current overlay
    pub fn player(&self) -> Option<PlayerHandle<H>> {
        self.controller.current()
    }

    pub fn play(&self) {
        if let Some(h) = self.player() {
            h.play();
        }
    }

    pub fn pause(&self) {
        if let Some(h) = self.player() {
            h.pause();
        }
    }

    pub fn close(&self) {
        self.controller.close();
    }

    pub fn set_volume(&self, volume: f64) {
        if let Some(h) = self.player() {
            h.set_volume(volume);
        }
    }

    pub fn seek(&self, seconds: f64) {
        if let Some(h) = self.player() {
            h.seek(seconds);
        }
    }

    fn init(&self, attrs: &impl AttributeSource) {
        let close_notify = Rc::clone(&self.notify);
        let error_notify = Rc::clone(&self.notify);
        let config = config_from_attributes(attrs)
            .on_close(move || close_notify(TagEvent::Close))
            .on_error(move |e| error_notify(TagEvent::Error(e.clone())));

        match self.controller.create(config) {
            Ok(handle) => (self.notify)(TagEvent::Ready(handle)),
            Err(e) => {
                error!(error = %e, "Video ad element initialization failed");
                (self.notify)(TagEvent::Error(e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LifecycleState;

    fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_normalize_position() {
        assert_eq!(normalize_position("top left"), Position::TopLeft);
        assert_eq!(normalize_position("Right  Bottom"), Position::BottomRight);
        assert_eq!(normalize_position("left top"), Position::TopLeft);
        assert_eq!(normalize_position("CENTER"), Position::Center);
        assert_eq!(normalize_position("top-right"), Position::TopRight);
        assert_eq!(normalize_position("custom"), Position::Custom);
        assert_eq!(normalize_position("upstairs"), Position::BottomRight);
    }

    #[test]
    fn test_booleans() {
        assert!(parse_bool_attribute(""));
        assert!(parse_bool_attribute("true"));
        assert!(parse_bool_attribute("0"));
        assert!(!parse_bool_attribute("false"));
    }

    #[test]
    fn test_leading_int() {
        assert_eq!(parse_leading_int("320"), Some(320));
        assert_eq!(parse_leading_int(" 320px"), Some(320));
        assert_eq!(parse_leading_int("-5"), Some(-5));
        assert_eq!(parse_leading_int("px"), None);
    }

    #[test]
    fn test_config_from_attributes() {
        let config = config_from_attributes(&attrs(&[
            ("playbackid", "p1"),
            ("videoid", ""),
            ("position", "top left"),
            ("size", "custom"),
            ("width", "300"),
            ("height", "200px"),
            ("muted", "false"),
            ("closeable", ""),
            ("zindex", "12"),
        ]));

        assert_eq!(config.playback_id.as_deref(), Some("p1"));
        assert_eq!(config.video_id, None);
        assert_eq!(config.position, Position::TopLeft);
        assert_eq!(config.size, Size::Custom);
        assert_eq!((config.width, config.height), (Some(300), Some(200)));
        assert!(!config.muted);
        assert!(config.closeable);
        assert_eq!(config.z_index, 12);
    }

    #[test]
    fn test_negative_dimension_ignored() {
        let config = config_from_attributes(&attrs(&[("videoid", "a"), ("width", "-3")]));
        assert_eq!(config.width, None);
    }

    #[test]
    fn test_attributes_round_trip() {
        let original = PlayerConfig {
            muted: false,
            z_index: 7,
            ..PlayerConfig::with_video_url("https://x/y.mp4?a=1&b=\"2\"")
        }
        .position(Position::Center)
        .dimensions(300, 200);

        let map: BTreeMap<String, String> = attributes_from_config(&original)
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let parsed = config_from_attributes(&map);

        assert_eq!(parsed.video_url, original.video_url);
        assert_eq!(parsed.position, Position::Center);
        assert_eq!(parsed.size, Size::Custom);
        assert_eq!((parsed.width, parsed.height), (Some(300), Some(200)));
        assert!(!parsed.muted);
        assert_eq!(parsed.z_index, 7);
    }

    #[test]
    fn test_render_tag_escapes() {
        let tag = render_tag(&PlayerConfig::with_video_url("https://x/y.mp4?a=1&b=2"));
        assert!(tag.starts_with("<video-ad-player-sdk videourl=\"https://x/y.mp4?a=1&amp;b=2\""));
        assert!(tag.ends_with("></video-ad-player-sdk>"));
    }

    #[test]
    fn test_event_names() {
        let event: TagEvent<crate::testing::MemoryHost> = TagEvent::Close;
        assert_eq!(event.name(), "close");
        assert_eq!(TagEvent::<crate::testing::MemoryHost>::Error(Error::NoSource).name(), "error");
    }

    #[test]
    fn test_adapter_ignores_unobserved_and_disconnected() {
        use crate::testing::MemoryHost;

        let host = MemoryHost::new();
        let adapter = TagAdapter::new(Rc::clone(&host), Rc::new(|_event: TagEvent<MemoryHost>| {}));
        let a = attrs(&[("videoid", "a")]);

        adapter.attribute_changed("videoid", None, Some("a"), &a);
        assert!(host.nodes().is_empty());

        adapter.connect(&a);
        adapter.attribute_changed("class", None, Some("x"), &a);
        adapter.attribute_changed("videoid", Some("a"), Some("a"), &a);
        assert_eq!(host.nodes().len(), 1);
        assert_eq!(adapter.player().map(|h| h.state()), Some(LifecycleState::Mounted));
    }
}
