//! Vidad CLI - Video Ad Overlay Toolkit
//!
//! Features:
//! - Source resolution (embed / streaming / direct URL)
//! - Layout preview (dimensions and container style)
//! - Embed snippet generation for `<video-ad-player-sdk>`
//! - Tag attribute parsing

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use vidad_core::{Orientation, PlayerVariant, Position};

mod commands;
mod output;

/// Vidad CLI - Video ad overlay toolkit
#[derive(Parser)]
#[command(name = "vidad")]
#[command(author = "Purple Squirrel Media")]
#[command(version)]
#[command(about = "Resolve, lay out and embed video-ad overlays", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json, table)
    #[arg(short, long, default_value = "text", global = true)]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

/// Overlay configuration, from a JSON file and/or flags. Flags win.
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// JSON config file (camelCase keys, as passed to createVideoAdPlayer)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Platform video id
    #[arg(long)]
    pub video_id: Option<String>,

    /// Streaming playback id
    #[arg(long)]
    pub playback_id: Option<String>,

    /// Direct media URL
    #[arg(long)]
    pub video_url: Option<String>,

    /// top-left, top-right, bottom-left, bottom-right, center or custom
    #[arg(short, long)]
    pub position: Option<Position>,

    /// small, medium, large or custom
    #[arg(short, long)]
    pub size: Option<String>,

    /// Width in px (custom size)
    #[arg(long)]
    pub width: Option<u32>,

    /// Height in px (custom size)
    #[arg(long)]
    pub height: Option<u32>,

    /// minimal or full
    #[arg(long)]
    pub variant: Option<PlayerVariant>,

    /// landscape or portrait
    #[arg(long)]
    pub orientation: Option<Orientation>,

    /// Do not start playback automatically
    #[arg(long)]
    pub no_autoplay: bool,

    /// Start with sound
    #[arg(long)]
    pub unmuted: bool,

    /// Hide the close button
    #[arg(long)]
    pub no_close: bool,

    /// Stacking order
    #[arg(long)]
    pub z_index: Option<i32>,

    /// Style override, `property=value` (repeatable)
    #[arg(long = "style", value_name = "PROPERTY=VALUE")]
    pub styles: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the playable URL and source kind
    Resolve {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Show overlay dimensions and container style
    Layout {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Print `<video-ad-player-sdk>` markup for a config
    Snippet {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Parse tag attributes (`name=value`) into a config
    ParseTag {
        /// Attributes, e.g. `videoid=abc "position=top left"`
        #[arg(required = true)]
        attributes: Vec<String>,
    },

    /// List size presets
    Presets {
        /// Only this orientation
        #[arg(long)]
        orientation: Option<Orientation>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .init();

    let out = match &cli.command {
        Commands::Resolve { config } => commands::resolve(config, &cli.format)?,
        Commands::Layout { config } => commands::layout(config, &cli.format)?,
        Commands::Snippet { config } => commands::snippet(config, &cli.format)?,
        Commands::ParseTag { attributes } => commands::parse_tag(attributes, &cli.format)?,
        Commands::Presets { orientation } => commands::presets(*orientation, &cli.format)?,
    };
    println!("{out}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resolve_flags() {
        let cli = Cli::try_parse_from([
            "vidad",
            "-f",
            "json",
            "resolve",
            "--video-id",
            "abc",
            "--position",
            "center",
            "--style",
            "border=1px solid red",
        ])
        .unwrap();

        assert_eq!(cli.format, "json");
        match cli.command {
            Commands::Resolve { config } => {
                assert_eq!(config.video_id.as_deref(), Some("abc"));
                assert_eq!(config.position, Some(Position::Center));
                assert_eq!(config.styles, vec!["border=1px solid red"]);
            }
            _ => panic!("expected resolve"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["vidad", "layout", "--playback-id", "p", "-v", "-f", "table"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.format, "table");
    }

    #[test]
    fn test_rejects_unknown_position() {
        assert!(Cli::try_parse_from(["vidad", "resolve", "--position", "middle"]).is_err());
    }

    #[test]
    fn test_parse_tag_requires_attributes() {
        assert!(Cli::try_parse_from(["vidad", "parse-tag"]).is_err());
    }

    #[test]
    fn test_variant_aliases() {
        let cli = Cli::try_parse_from(["vidad", "snippet", "--video-url", "u", "--variant", "full-controls"]).unwrap();
        match cli.command {
            Commands::Snippet { config } => assert_eq!(config.variant, Some(PlayerVariant::Full)),
            _ => panic!("expected snippet"),
        }
    }
}
