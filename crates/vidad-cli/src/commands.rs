//! CLI command implementations

use crate::output::{format_output, Row};
use crate::ConfigArgs;
use anyhow::Context;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use vidad_core::{
    container_style,
    layout::size_of_with,
    tag::{config_from_attributes, render_tag},
    Orientation, PlayerConfig, Position, ResolvedSource, Size, StyleMap,
};

/// Build a config from an optional JSON file, then apply flag overrides
pub fn load_config(args: &ConfigArgs) -> anyhow::Result<PlayerConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            PlayerConfig::from_json(&json)
                .with_context(|| format!("Failed to parse config {}", path.display()))?
        }
        None => PlayerConfig::default(),
    };

    if let Some(id) = &args.video_id {
        config.video_id = Some(id.clone());
    }
    if let Some(id) = &args.playback_id {
        config.playback_id = Some(id.clone());
    }
    if let Some(url) = &args.video_url {
        config.video_url = Some(url.clone());
    }
    if let Some(position) = args.position {
        config.position = position;
    }
    if let Some(size) = &args.size {
        config.size = Size::parse_lenient(size);
    }
    if args.width.is_some() {
        config.width = args.width;
    }
    if args.height.is_some() {
        config.height = args.height;
    }
    if let Some(variant) = args.variant {
        config.variant = variant;
    }
    if let Some(orientation) = args.orientation {
        config.orientation = orientation;
    }
    if args.no_autoplay {
        config.autoplay = false;
    }
    if args.unmuted {
        config.muted = false;
    }
    if args.no_close {
        config.closeable = false;
    }
    if let Some(z) = args.z_index {
        config.z_index = z;
    }
    for declaration in &args.styles {
        let (property, value) = declaration
            .split_once('=')
            .with_context(|| format!("Style '{}' is not property=value", declaration))?;
        config
            .custom_styles
            .insert(property.trim().to_string(), value.trim().to_string());
    }

    debug!(?config, "Loaded config");
    Ok(config)
}

/// Resolve the playable URL
pub fn resolve(args: &ConfigArgs, format: &str) -> anyhow::Result<String> {
    let config = load_config(args)?;
    let resolved = vidad_core::resolve(&config)?;
    info!(kind = %resolved.kind, "Resolved source");

    let rows = vec![Row::new("url", &resolved.url), Row::new("kind", resolved.kind)];
    format_output(&resolved, rows, format)
}

#[derive(Serialize)]
struct LayoutReport {
    width: u32,
    height: u32,
    position: Position,
    style: StyleMap,
    css: String,
}

/// Show dimensions and the merged container style
pub fn layout(args: &ConfigArgs, format: &str) -> anyhow::Result<String> {
    let config = load_config(args)?;
    if config.size == Size::Custom && !config.has_custom_dimensions() {
        warn!("Custom size needs --width and --height, showing medium");
    }

    let dimensions = size_of_with(config.orientation, config.size, config.width, config.height);
    let style = container_style(&config);
    let report = LayoutReport {
        width: dimensions.width,
        height: dimensions.height,
        position: config.position,
        css: style.to_css_text(),
        style,
    };

    let mut rows = vec![
        Row::new("dimensions", dimensions),
        Row::new("position", report.position),
    ];
    rows.extend(report.style.iter().map(|(property, value)| Row::new(property, value)));
    format_output(&report, rows, format)
}

#[derive(Serialize)]
struct Snippet<'a> {
    tag: String,
    config: &'a PlayerConfig,
}

/// Print `<video-ad-player-sdk>` markup
pub fn snippet(args: &ConfigArgs, format: &str) -> anyhow::Result<String> {
    let config = load_config(args)?;
    config.validate()?;

    let tag = render_tag(&config);
    if matches!(format.to_lowercase().as_str(), "json" | "table") {
        let rows = vec![Row::new("tag", &tag)];
        format_output(&Snippet { tag: tag.clone(), config: &config }, rows, format)
    } else {
        Ok(tag)
    }
}

/// Split `name=value` attributes, dropping surrounding quotes from values
pub fn parse_attributes(attributes: &[String]) -> anyhow::Result<BTreeMap<String, String>> {
    attributes
        .iter()
        .map(|attribute| {
            let (name, value) = attribute
                .split_once('=')
                .map(|(n, v)| (n, v.trim_matches(|c| c == '"' || c == '\'')))
                .unwrap_or((attribute.as_str(), ""));
            let name = name.trim().to_ascii_lowercase();
            if name.is_empty() {
                anyhow::bail!("Attribute '{}' has no name", attribute);
            }
            Ok((name, value.to_string()))
        })
        .collect()
}

#[derive(Serialize)]
struct TagReport {
    config: PlayerConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<ResolvedSource>,
}

/// Parse tag attributes the way `<video-ad-player-sdk>` does
pub fn parse_tag(attributes: &[String], format: &str) -> anyhow::Result<String> {
    let attrs = parse_attributes(attributes)?;
    let config = config_from_attributes(&attrs);

    let source = match vidad_core::resolve(&config) {
        Ok(source) => Some(source),
        Err(e) => {
            warn!(error = %e, "Tag would not mount");
            None
        }
    };

    let mut rows = vec![
        Row::new("position", config.position),
        Row::new("size", config.size),
        Row::new(
            "dimensions",
            size_of_with(config.orientation, config.size, config.width, config.height),
        ),
        Row::new("muted", config.muted),
        Row::new("closeable", config.closeable),
        Row::new("zIndex", config.z_index),
    ];
    match &source {
        Some(s) => {
            rows.insert(0, Row::new("kind", s.kind));
            rows.insert(0, Row::new("url", &s.url));
        }
        None => rows.insert(0, Row::new("source", "none")),
    }

    format_output(&TagReport { config, source }, rows, format)
}

#[derive(Serialize)]
struct Preset {
    orientation: Orientation,
    size: String,
    width: u32,
    height: u32,
}

/// List the size presets
pub fn presets(orientation: Option<Orientation>, format: &str) -> anyhow::Result<String> {
    let orientations = match orientation {
        Some(o) => vec![o],
        None => vec![Orientation::Landscape, Orientation::Portrait],
    };

    let presets: Vec<Preset> = orientations
        .into_iter()
        .flat_map(|o| {
            [Size::Small, Size::Medium, Size::Large].map(|size| {
                let d = o.preset(size);
                Preset {
                    orientation: o,
                    size: size.to_string(),
                    width: d.width,
                    height: d.height,
                }
            })
        })
        .collect();

    let rows = presets
        .iter()
        .map(|p| Row::new(format!("{} {}", p.orientation, p.size), format!("{}x{}", p.width, p.height)))
        .collect();

    format_output(&presets, rows, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args() -> ConfigArgs {
        ConfigArgs::default()
    }

    #[test]
    fn test_load_config_file_with_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"videoId": "abc", "size": "large", "customStyles": {{"opacity": 0.9}}}}"#).unwrap();

        let config = load_config(&ConfigArgs {
            config: Some(file.path().to_path_buf()),
            position: Some(Position::TopLeft),
            styles: vec!["border = none".into()],
            ..args()
        })
        .unwrap();

        assert_eq!(config.video_id.as_deref(), Some("abc"));
        assert_eq!(config.size, Size::Large);
        assert_eq!(config.position, Position::TopLeft);
        assert_eq!(config.custom_styles.get("opacity").map(String::as_str), Some("0.9"));
        assert_eq!(config.custom_styles.get("border").map(String::as_str), Some("none"));
    }

    #[test]
    fn test_load_config_bad_style() {
        let err = load_config(&ConfigArgs {
            styles: vec!["border".into()],
            ..args()
        })
        .unwrap_err();
        assert!(err.to_string().contains("property=value"));
    }

    #[test]
    fn test_resolve_json() {
        let out = resolve(
            &ConfigArgs {
                playback_id: Some("p1".into()),
                ..args()
            },
            "json",
        )
        .unwrap();
        assert!(out.contains("https://stream.mux.com/p1.m3u8"));
        assert!(out.contains("\"streaming\""));
    }

    #[test]
    fn test_resolve_without_source_fails() {
        let err = resolve(&args(), "text").unwrap_err();
        assert!(err.to_string().contains("No video source provided"));
    }

    #[test]
    fn test_layout_center() {
        let out = layout(
            &ConfigArgs {
                position: Some(Position::Center),
                size: Some("large".into()),
                ..args()
            },
            "json",
        )
        .unwrap();
        let report: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(report["width"], 640);
        assert_eq!(report["style"]["transform"], "translate(-50%, -50%)");
    }

    #[test]
    fn test_snippet_text_is_markup() {
        let out = snippet(
            &ConfigArgs {
                video_id: Some("abc".into()),
                ..args()
            },
            "text",
        )
        .unwrap();
        assert!(out.starts_with("<video-ad-player-sdk videoid=\"abc\""));
    }

    #[test]
    fn test_parse_attributes() {
        let attrs = parse_attributes(&[
            "VideoId=abc".to_string(),
            "position=\"top left\"".to_string(),
            "muted".to_string(),
        ])
        .unwrap();
        assert_eq!(attrs["videoid"], "abc");
        assert_eq!(attrs["position"], "top left");
        assert_eq!(attrs["muted"], "");
        assert!(parse_attributes(&["=x".to_string()]).is_err());
    }

    #[test]
    fn test_parse_tag_json() {
        let out = parse_tag(
            &["videourl=https://x/y.mp4".to_string(), "position=right top".to_string()],
            "json",
        )
        .unwrap();
        let report: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(report["config"]["position"], "top-right");
        assert_eq!(report["source"]["kind"], "direct");
    }

    #[test]
    fn test_presets() {
        let out = presets(Some(Orientation::Portrait), "json").unwrap();
        let list: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(list.as_array().map(Vec::len), Some(3));
        assert_eq!(list[2]["width"], 360);
        assert_eq!(list[2]["height"], 640);
    }
}
