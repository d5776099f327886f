//! Source Resolver - config to playback URL
//!
//! Exactly one of `videoId`, `playbackId`, `videoUrl` selects the source:
//! - `videoUrl` is returned verbatim and classified by [`classify`]
//! - `playbackId` becomes an HLS manifest URL on the streaming provider
//! - `videoId` becomes a platform embed URL with player parameters
//!
//! Classifying a URL built here always reproduces the kind it was built for.

use crate::{
    config::{PlayerConfig, Source},
    error::Result,
    types::{PlayerVariant, SourceKind},
};
use serde::Serialize;
use url::{form_urlencoded, Url};

/// Platform embed endpoint, the video id is appended as a path segment
pub const EMBED_BASE: &str = "https://www.youtube.com/embed/";

/// Streaming provider manifest endpoint
pub const STREAM_BASE: &str = "https://stream.mux.com/";

/// Hosts whose URLs play through the platform embed
const EMBED_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "youtube-nocookie.com",
    "www.youtube-nocookie.com",
    "youtu.be",
];

const MANIFEST_SUFFIX: &str = ".m3u8";

/// A playback URL and how to play it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSource {
    pub url: String,
    pub kind: SourceKind,
}

/// Player parameters templated into the platform embed URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbedOptions {
    pub autoplay: bool,
    pub muted: bool,
    pub looping: bool,
    pub controls: bool,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self {
            autoplay: true,
            muted: true,
            looping: true,
            controls: true,
        }
    }
}

impl EmbedOptions {
    /// Derive embed parameters from a config. Only the minimal variant loops.
    pub fn from_config(config: &PlayerConfig) -> Self {
        Self {
            autoplay: config.autoplay,
            muted: config.muted,
            looping: config.variant == PlayerVariant::Minimal,
            controls: config.show_controls,
        }
    }
}

/// Resolve a config into its playback URL and source kind
pub fn resolve(config: &PlayerConfig) -> Result<ResolvedSource> {
    let source = config.source()?;
    let resolved = resolve_source(source, EmbedOptions::from_config(config));

    tracing::debug!(url = %resolved.url, kind = %resolved.kind, "Resolved video source");

    Ok(resolved)
}

/// Resolve an already selected source
pub fn resolve_source(source: Source<'_>, options: EmbedOptions) -> ResolvedSource {
    match source {
        Source::Url(url) => ResolvedSource {
            url: url.to_string(),
            kind: classify(url),
        },
        Source::Playback(id) => ResolvedSource {
            url: format!("{}{}{}", STREAM_BASE, encode_segment(id), MANIFEST_SUFFIX),
            kind: SourceKind::Streaming,
        },
        Source::Platform(id) => ResolvedSource {
            url: embed_url(id, options),
            kind: SourceKind::PlatformEmbed,
        },
    }
}

/// Build the platform embed URL for a video id
pub fn embed_url(video_id: &str, options: EmbedOptions) -> String {
    let flag = |on: bool| if on { "1" } else { "0" };

    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("autoplay", flag(options.autoplay))
        .append_pair("mute", flag(options.muted))
        .append_pair("loop", flag(options.looping))
        // Looping a single embed requires it to be its own playlist
        .append_pair("playlist", video_id)
        .append_pair("enablejsapi", "1")
        .append_pair("controls", flag(options.controls))
        .append_pair("rel", "0")
        .append_pair("modestbranding", "1")
        .append_pair("fs", "1")
        .append_pair("cc_load_policy", "0")
        .append_pair("iv_load_policy", "3")
        .finish();

    format!("{}{}?{}", EMBED_BASE, encode_segment(video_id), query)
}

/// Classify an arbitrary URL.
///
/// Embed hosts win over the manifest suffix; anything else is direct.
/// Relative URLs cannot be embeds and are checked for the suffix only.
pub fn classify(url: &str) -> SourceKind {
    match Url::parse(url) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
            if EMBED_HOSTS.contains(&host.as_str()) {
                SourceKind::PlatformEmbed
            } else if is_manifest_path(parsed.path()) {
                SourceKind::Streaming
            } else {
                SourceKind::Direct
            }
        }
        Err(_) => {
            let path = url.split(['?', '#']).next().unwrap_or_default();
            if is_manifest_path(path) {
                SourceKind::Streaming
            } else {
                SourceKind::Direct
            }
        }
    }
}

fn is_manifest_path(path: &str) -> bool {
    path.to_ascii_lowercase().ends_with(MANIFEST_SUFFIX)
}

/// Percent-encode an id for use as one path segment (space -> `%20`, `/` -> `%2F`)
fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_direct_url_verbatim() {
        let resolved = resolve(&PlayerConfig::with_video_url("https://x/y.mp4")).unwrap();
        assert_eq!(resolved.url, "https://x/y.mp4");
        assert_eq!(resolved.kind, SourceKind::Direct);
    }

    #[test]
    fn test_playback_id() {
        let resolved = resolve(&PlayerConfig::with_playback_id("abc123")).unwrap();
        assert_eq!(resolved.url, "https://stream.mux.com/abc123.m3u8");
        assert_eq!(resolved.kind, SourceKind::Streaming);
    }

    #[test]
    fn test_video_id() {
        let resolved = resolve(&PlayerConfig::with_video_id("dQw4w9WgXcQ")).unwrap();
        assert_eq!(resolved.kind, SourceKind::PlatformEmbed);
        assert_eq!(
            resolved.url,
            "https://www.youtube.com/embed/dQw4w9WgXcQ?autoplay=1&mute=1&loop=1\
             &playlist=dQw4w9WgXcQ&enablejsapi=1&controls=1&rel=0&modestbranding=1\
             &fs=1&cc_load_policy=0&iv_load_policy=3"
        );
    }

    #[test]
    fn test_embed_options_follow_config() {
        let config = PlayerConfig {
            autoplay: false,
            muted: false,
            show_controls: false,
            ..PlayerConfig::with_video_id("v")
        }
        .variant(PlayerVariant::Full);

        let url = resolve(&config).unwrap().url;
        assert!(url.contains("autoplay=0"));
        assert!(url.contains("mute=0"));
        assert!(url.contains("loop=0"));
        assert!(url.contains("controls=0"));
    }

    #[test]
    fn test_no_source() {
        assert_eq!(resolve(&PlayerConfig::default()), Err(Error::NoSource));
    }

    #[test]
    fn test_ambiguous_source() {
        let config = PlayerConfig {
            playback_id: Some("p".into()),
            ..PlayerConfig::with_video_id("v")
        };
        assert!(matches!(resolve(&config), Err(Error::AmbiguousSource { .. })));
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("https://youtu.be/abc"), SourceKind::PlatformEmbed);
        assert_eq!(classify("https://www.YouTube.com/watch?v=abc"), SourceKind::PlatformEmbed);
        assert_eq!(classify("https://cdn.example.com/live/index.m3u8?token=1"), SourceKind::Streaming);
        assert_eq!(classify("https://cdn.example.com/clip.mp4"), SourceKind::Direct);
        assert_eq!(classify("/media/master.M3U8#t=3"), SourceKind::Streaming);
        assert_eq!(classify("clip.webm"), SourceKind::Direct);
        // Lookalike hosts are not embeds
        assert_eq!(classify("https://notyoutube.com/x.mp4"), SourceKind::Direct);
    }

    #[test]
    fn test_ids_are_path_encoded() {
        let stream = resolve(&PlayerConfig::with_playback_id("a b")).unwrap();
        assert_eq!(stream.url, "https://stream.mux.com/a%20b.m3u8");
        let parsed = Url::parse(&stream.url).unwrap();
        assert_eq!(parsed.path(), "/a%20b.m3u8");

        let embed = embed_url("x y/z", EmbedOptions::default());
        assert!(embed.starts_with("https://www.youtube.com/embed/x%20y%2Fz?"));
        // The query keeps form encoding
        assert!(embed.contains("&playlist=x+y%2Fz&"));
    }

    #[test]
    fn test_classify_consistent_with_construction() {
        let configs = [
            PlayerConfig::with_video_id("id with space"),
            PlayerConfig::with_playback_id("stream/id"),
            PlayerConfig::with_video_url("https://x/y.mp4"),
        ];
        for config in &configs {
            let resolved = resolve(config).unwrap();
            assert_eq!(classify(&resolved.url), resolved.kind, "{}", resolved.url);
        }
    }
}
