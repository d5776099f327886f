//! Player configuration
//!
//! [`PlayerConfig`] deserializes from the camelCase object shape hosts pass in
//! (`videoId`, `zIndex`, `customStyles`, ...). Callbacks are attached
//! separately since they cannot cross a serialization boundary.

use crate::{
    error::{Error, Result},
    types::{Orientation, PlayerVariant, Position, Size},
};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Default stacking order of the overlay
pub const DEFAULT_Z_INDEX: i32 = 9999;

/// Overlay configuration, consumed once at creation
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerConfig {
    /// Third-party platform video id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    /// Streaming service playback id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playback_id: Option<String>,
    /// Direct media URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    pub position: Position,
    pub size: Size,
    /// Only meaningful with `size = custom`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub autoplay: bool,
    pub muted: bool,
    pub closeable: bool,
    pub show_controls: bool,
    pub z_index: i32,
    /// Style overrides, applied after every computed style
    #[serde(deserialize_with = "deserialize_styles", skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_styles: BTreeMap<String, String>,
    pub variant: PlayerVariant,
    pub orientation: Orientation,
    #[serde(skip)]
    pub callbacks: Callbacks,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            video_id: None,
            playback_id: None,
            video_url: None,
            position: Position::default(),
            size: Size::default(),
            width: None,
            height: None,
            autoplay: true,
            muted: true,
            closeable: true,
            show_controls: true,
            z_index: DEFAULT_Z_INDEX,
            custom_styles: BTreeMap::new(),
            variant: PlayerVariant::default(),
            orientation: Orientation::default(),
            callbacks: Callbacks::default(),
        }
    }
}

/// The one source a config points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source<'a> {
    /// `videoId`
    Platform(&'a str),
    /// `playbackId`
    Playback(&'a str),
    /// `videoUrl`
    Url(&'a str),
}

impl PlayerConfig {
    /// Config playing a platform video id
    pub fn with_video_id(id: impl Into<String>) -> Self {
        Self {
            video_id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Config playing a streaming playback id
    pub fn with_playback_id(id: impl Into<String>) -> Self {
        Self {
            playback_id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Config playing a direct URL
    pub fn with_video_url(url: impl Into<String>) -> Self {
        Self {
            video_url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Parse from a JSON object
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    pub fn size(mut self, size: Size) -> Self {
        self.size = size;
        self
    }

    /// Set explicit dimensions and switch to the custom size
    pub fn dimensions(mut self, width: u32, height: u32) -> Self {
        self.size = Size::Custom;
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn variant(mut self, variant: PlayerVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_styles.insert(property.into(), value.into());
        self
    }

    pub fn on_close(mut self, f: impl Fn() + 'static) -> Self {
        self.callbacks.on_close = Some(Rc::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl Fn() + 'static) -> Self {
        self.callbacks.on_complete = Some(Rc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&Error) + 'static) -> Self {
        self.callbacks.on_error = Some(Rc::new(f));
        self
    }

    /// Select the single configured source.
    ///
    /// Empty strings count as absent. Fails with [`Error::NoSource`] when
    /// nothing is set and [`Error::AmbiguousSource`] when more than one is.
    pub fn source(&self) -> Result<Source<'_>> {
        let candidates = [
            ("videoUrl", present(&self.video_url).map(Source::Url)),
            ("playbackId", present(&self.playback_id).map(Source::Playback)),
            ("videoId", present(&self.video_id).map(Source::Platform)),
        ];

        let set: Vec<_> = candidates
            .iter()
            .filter_map(|(name, source)| source.map(|s| (*name, s)))
            .collect();

        match set.as_slice() {
            [] => Err(Error::NoSource),
            [(_, source)] => Ok(*source),
            many => Err(Error::AmbiguousSource {
                fields: many
                    .iter()
                    .map(|(name, _)| *name)
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    /// Validate the config before anything is mounted
    pub fn validate(&self) -> Result<()> {
        self.source()?;

        if self.size == Size::Custom && !self.has_custom_dimensions() {
            tracing::warn!(
                width = ?self.width,
                height = ?self.height,
                "Custom size without positive width and height, using medium"
            );
        }

        Ok(())
    }

    /// Both custom dimensions present and positive
    pub fn has_custom_dimensions(&self) -> bool {
        matches!((self.width, self.height), (Some(w), Some(h)) if w > 0 && h > 0)
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl fmt::Debug for PlayerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerConfig")
            .field("video_id", &self.video_id)
            .field("playback_id", &self.playback_id)
            .field("video_url", &self.video_url)
            .field("position", &self.position)
            .field("size", &self.size)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("autoplay", &self.autoplay)
            .field("muted", &self.muted)
            .field("closeable", &self.closeable)
            .field("show_controls", &self.show_controls)
            .field("z_index", &self.z_index)
            .field("custom_styles", &self.custom_styles)
            .field("variant", &self.variant)
            .field("orientation", &self.orientation)
            .field("callbacks", &self.callbacks)
            .finish()
    }
}

/// Optional caller callbacks; absent ones are no-ops
#[derive(Clone, Default)]
pub struct Callbacks {
    pub on_close: Option<Rc<dyn Fn()>>,
    pub on_complete: Option<Rc<dyn Fn()>>,
    pub on_error: Option<Rc<dyn Fn(&Error)>>,
}

impl Callbacks {
    pub fn close(&self) {
        if let Some(f) = &self.on_close {
            f();
        }
    }

    pub fn complete(&self) {
        if let Some(f) = &self.on_complete {
            f();
        }
    }

    pub fn error(&self, error: &Error) {
        if let Some(f) = &self.on_error {
            f(error);
        }
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_close", &self.on_close.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Style values arrive as strings or bare numbers (`{ "opacity": 0.8 }`)
#[derive(Deserialize)]
#[serde(untagged)]
enum StyleValue {
    Text(String),
    Number(f64),
}

/// Properties whose bare numbers carry no unit, compared without dashes and case
const UNITLESS_PROPERTIES: &[&str] = &[
    "animationiterationcount",
    "aspectratio",
    "borderimageoutset",
    "borderimageslice",
    "borderimagewidth",
    "columncount",
    "columns",
    "fillopacity",
    "flex",
    "flexgrow",
    "flexshrink",
    "floodopacity",
    "fontweight",
    "gridarea",
    "gridcolumn",
    "gridcolumnend",
    "gridcolumnstart",
    "gridrow",
    "gridrowend",
    "gridrowstart",
    "lineclamp",
    "lineheight",
    "opacity",
    "order",
    "orphans",
    "scale",
    "stopopacity",
    "strokedasharray",
    "strokedashoffset",
    "strokemiterlimit",
    "strokeopacity",
    "strokewidth",
    "tabsize",
    "widows",
    "zindex",
    "zoom",
];

fn is_unitless(property: &str) -> bool {
    if property.starts_with("--") {
        return true;
    }
    let key: String = property
        .chars()
        .filter(|c| *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    UNITLESS_PROPERTIES.contains(&key.as_str())
}

impl StyleValue {
    /// Bare numbers become pixels unless the property is unitless or the number is 0
    fn into_css(self, property: &str) -> String {
        let n = match self {
            StyleValue::Text(s) => return s,
            StyleValue::Number(n) => n,
        };
        let number = if n.is_finite() && n.fract() == 0.0 {
            format!("{}", n as i64)
        } else {
            n.to_string()
        };
        if n == 0.0 || is_unitless(property) {
            number
        } else {
            format!("{}px", number)
        }
    }
}

fn deserialize_styles<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, StyleValue>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| {
            let css = v.into_css(&k);
            (k, css)
        })
        .collect())
}
