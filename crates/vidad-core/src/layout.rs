//! Layout Calculator - container size, placement and final style
//!
//! The container style is merged in a fixed order, later layers winning:
//! placement, size, z-index, chrome, then the caller's custom styles.

use crate::{
    config::{PlayerConfig, DEFAULT_Z_INDEX},
    types::{Dimensions, Orientation, Position, Size},
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Distance of corner placements from the viewport edge
pub const EDGE_OFFSET: &str = "20px";

const CENTER_TRANSFORM: &str = "translate(-50%, -50%)";

/// Preset tables: small, medium, large
const LANDSCAPE_PRESETS: [Dimensions; 3] = [
    Dimensions::new(320, 180),
    Dimensions::new(480, 270),
    Dimensions::new(640, 360),
];

const PORTRAIT_PRESETS: [Dimensions; 3] = [
    Dimensions::new(200, 360),
    Dimensions::new(280, 500),
    Dimensions::new(360, 640),
];

impl Orientation {
    /// Look up a preset; custom and unknown keys resolve to medium
    pub fn preset(&self, size: Size) -> Dimensions {
        let table = match self {
            Orientation::Landscape => &LANDSCAPE_PRESETS,
            Orientation::Portrait => &PORTRAIT_PRESETS,
        };
        match size {
            Size::Small => table[0],
            Size::Large => table[2],
            Size::Medium | Size::Custom => table[1],
        }
    }
}

/// Container dimensions from the landscape table
pub fn size_of(size: Size, width: Option<u32>, height: Option<u32>) -> Dimensions {
    size_of_with(Orientation::Landscape, size, width, height)
}

/// Container dimensions.
///
/// `custom` uses the explicit width and height only when both are positive,
/// otherwise the medium preset.
pub fn size_of_with(
    orientation: Orientation,
    size: Size,
    width: Option<u32>,
    height: Option<u32>,
) -> Dimensions {
    match (size, width, height) {
        (Size::Custom, Some(w), Some(h)) if w > 0 && h > 0 => Dimensions::new(w, h),
        _ => orientation.preset(size),
    }
}

/// Placement fields for a position: fixed positioning, default z-index and offsets.
/// `custom` carries no offsets.
pub fn placement_of(position: Position) -> StyleMap {
    let mut style = StyleMap::new();
    style.set("position", "fixed");
    style.set("z-index", DEFAULT_Z_INDEX.to_string());

    match position {
        Position::BottomRight => {
            style.set("bottom", EDGE_OFFSET);
            style.set("right", EDGE_OFFSET);
        }
        Position::BottomLeft => {
            style.set("bottom", EDGE_OFFSET);
            style.set("left", EDGE_OFFSET);
        }
        Position::TopRight => {
            style.set("top", EDGE_OFFSET);
            style.set("right", EDGE_OFFSET);
        }
        Position::TopLeft => {
            style.set("top", EDGE_OFFSET);
            style.set("left", EDGE_OFFSET);
        }
        Position::Center => {
            style.set("top", "50%");
            style.set("left", "50%");
            style.set("transform", CENTER_TRANSFORM);
        }
        Position::Custom => {}
    }

    style
}

/// Rounded, shadowed box with the fade transition the close sequence relies on
pub fn chrome() -> StyleMap {
    let mut style = StyleMap::new();
    style.set("border-radius", "16px");
    style.set("overflow", "hidden");
    style.set("box-shadow", "0 25px 50px -12px rgba(0, 0, 0, 0.25)");
    style.set("background", "#000");
    style.set("opacity", "1");
    style.set("transition", "opacity 0.3s ease, transform 0.3s ease");
    style
}

/// Final on-screen style of the container
pub fn container_style(config: &PlayerConfig) -> StyleMap {
    let dimensions = size_of_with(config.orientation, config.size, config.width, config.height);

    let mut style = placement_of(config.position);
    style.set("width", format!("{}px", dimensions.width));
    style.set("height", format!("{}px", dimensions.height));
    style.set("z-index", config.z_index.to_string());
    style.merge(&chrome());
    for (property, value) in &config.custom_styles {
        style.set(property, value.clone());
    }
    style
}

/// Style applied when the close sequence starts.
///
/// Keeps the centering translation so a centered box shrinks in place.
pub fn exit_style(container: &StyleMap) -> StyleMap {
    let mut style = StyleMap::new();
    style.set("opacity", "0");
    let transform = match container.get("transform") {
        Some(existing) if existing != "none" => format!("{} scale(0.95)", existing),
        _ => "scale(0.95)".to_string(),
    };
    style.set("transform", transform);
    style
}

/// CSS declarations keyed by kebab-case property name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StyleMap(BTreeMap<String, String>);

impl StyleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property. camelCase names (`zIndex`) are normalized so they
    /// collide with their kebab-case form (`z-index`).
    pub fn set(&mut self, property: &str, value: impl Into<String>) {
        self.0.insert(css_property_name(property), value.into());
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.0.get(&css_property_name(property)).map(String::as_str)
    }

    pub fn contains(&self, property: &str) -> bool {
        self.get(property).is_some()
    }

    /// Overlay another map; its values win on collision
    pub fn merge(&mut self, other: &StyleMap) {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render as an inline `style` attribute value
    pub fn to_css_text(&self) -> String {
        self.iter()
            .map(|(k, v)| format!("{}: {};", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for StyleMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css_text())
    }
}

/// `borderRadius` -> `border-radius`, `WebkitMask` -> `-webkit-mask`,
/// `msTransform` -> `-ms-transform`.
/// Custom properties (`--x`) and kebab names pass through.
fn css_property_name(name: &str) -> String {
    let name = name.trim();
    if name.starts_with("--") {
        return name.to_string();
    }

    let mut out = String::with_capacity(name.len() + 4);
    // The lowercase vendor prefix still needs its leading dash
    if name
        .strip_prefix("ms")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_uppercase())
    {
        out.push('-');
    }
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
