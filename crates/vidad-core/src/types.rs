//! Core types for the overlay

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Screen placement preset for the overlay container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Position {
    #[default]
    BottomRight,
    BottomLeft,
    TopRight,
    TopLeft,
    Center,
    /// No offsets; placement comes entirely from custom styles
    Custom,
}

impl Position {
    pub const ALL: [Position; 6] = [
        Position::BottomRight,
        Position::BottomLeft,
        Position::TopRight,
        Position::TopLeft,
        Position::Center,
        Position::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::BottomRight => "bottom-right",
            Position::BottomLeft => "bottom-left",
            Position::TopRight => "top-right",
            Position::TopLeft => "top-left",
            Position::Center => "center",
            Position::Custom => "custom",
        }
    }
}

impl FromStr for Position {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Position::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown position '{}'", s))
    }
}

impl TryFrom<String> for Position {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Position> for String {
    fn from(p: Position) -> Self {
        p.as_str().to_string()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Size preset for the overlay container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Size {
    Small,
    #[default]
    Medium,
    Large,
    /// Explicit width and height
    Custom,
}

impl Size {
    pub fn as_str(&self) -> &'static str {
        match self {
            Size::Small => "small",
            Size::Medium => "medium",
            Size::Large => "large",
            Size::Custom => "custom",
        }
    }

    /// Parse a size name; unknown names fall back to medium
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" => Size::Small,
            "medium" => Size::Medium,
            "large" => Size::Large,
            "custom" => Size::Custom,
            other => {
                tracing::warn!(size = other, "Unknown size preset, using medium");
                Size::Medium
            }
        }
    }
}

impl From<String> for Size {
    fn from(s: String) -> Self {
        Size::parse_lenient(&s)
    }
}

impl From<Size> for String {
    fn from(s: Size) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which preset table sizes are looked up in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// 16:9 boxes (320x180, 480x270, 640x360)
    #[default]
    Landscape,
    /// Vertical reel boxes (200x360, 280x500, 360x640)
    Portrait,
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "landscape" => Ok(Orientation::Landscape),
            "portrait" => Ok(Orientation::Portrait),
            other => Err(format!("unknown orientation '{}'", other)),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Landscape => f.write_str("landscape"),
            Orientation::Portrait => f.write_str("portrait"),
        }
    }
}

/// How a resolved URL is played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Third-party platform iframe embed
    PlatformEmbed,
    /// Adaptive streaming manifest (HLS)
    Streaming,
    /// Literal media URL played natively
    Direct,
}

impl SourceKind {
    /// Whether the source plays in a native media element
    pub fn is_native(&self) -> bool {
        !matches!(self, SourceKind::PlatformEmbed)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceKind::PlatformEmbed => "platform-embed",
            SourceKind::Streaming => "streaming",
            SourceKind::Direct => "direct",
        };
        f.write_str(s)
    }
}

/// Playback behavior of the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerVariant {
    /// Autoplays and loops forever, never completes
    #[default]
    Minimal,
    /// Autoplays once, completes at the end, has a control bar
    #[serde(alias = "full-controls")]
    Full,
}

impl FromStr for PlayerVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minimal" => Ok(PlayerVariant::Minimal),
            "full" | "full-controls" => Ok(PlayerVariant::Full),
            other => Err(format!("unknown variant '{}'", other)),
        }
    }
}

/// Pixel dimensions of the container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Identifier of one mounted overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(u64);

impl InstanceId {
    pub fn next() -> Self {
        thread_local! {
            static NEXT: std::cell::Cell<u64> = const { std::cell::Cell::new(1) };
        }
        NEXT.with(|n| {
            let id = n.get();
            n.set(id + 1);
            InstanceId(id)
        })
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vidad-{}", self.0)
    }
}

/// Lifecycle of one overlay instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    #[default]
    Uninitialized,
    Mounted,
    /// Exit transition running, detach pending
    Closing,
    /// Terminal
    Unmounted,
}

impl LifecycleState {
    /// Check if transition to target state is valid
    pub fn can_transition_to(&self, target: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, target),
            (Uninitialized, Mounted) | (Mounted, Closing) | (Closing, Unmounted)
        )
    }

    /// Mounted or closing
    pub fn is_live(&self) -> bool {
        matches!(self, LifecycleState::Mounted | LifecycleState::Closing)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Mounted => "mounted",
            LifecycleState::Closing => "closing",
            LifecycleState::Unmounted => "unmounted",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_parse() {
        assert_eq!("top-left".parse::<Position>(), Ok(Position::TopLeft));
        assert_eq!("center".parse::<Position>(), Ok(Position::Center));
        assert!("middle".parse::<Position>().is_err());
    }

    #[test]
    fn test_size_lenient() {
        assert_eq!(Size::parse_lenient("LARGE"), Size::Large);
        assert_eq!(Size::parse_lenient("huge"), Size::Medium);
    }

    #[test]
    fn test_size_serde_fallback() {
        let size: Size = serde_json::from_str("\"gigantic\"").unwrap();
        assert_eq!(size, Size::Medium);
        assert_eq!(serde_json::to_string(&Size::Small).unwrap(), "\"small\"");
    }

    #[test]
    fn test_position_serde() {
        let p: Position = serde_json::from_str("\"bottom-left\"").unwrap();
        assert_eq!(p, Position::BottomLeft);
        assert!(serde_json::from_str::<Position>("\"left\"").is_err());
    }

    #[test]
    fn test_lifecycle_transitions() {
        use LifecycleState::*;
        assert!(Uninitialized.can_transition_to(Mounted));
        assert!(Mounted.can_transition_to(Closing));
        assert!(Closing.can_transition_to(Unmounted));

        assert!(!Mounted.can_transition_to(Unmounted));
        assert!(!Unmounted.can_transition_to(Mounted));
        assert!(!Closing.can_transition_to(Mounted));
    }

    #[test]
    fn test_instance_ids_are_unique() {
        assert_ne!(InstanceId::next(), InstanceId::next());
    }

    #[test]
    fn test_variant_aliases() {
        let v: PlayerVariant = serde_json::from_str("\"full-controls\"").unwrap();
        assert_eq!(v, PlayerVariant::Full);
        assert_eq!("minimal".parse::<PlayerVariant>(), Ok(PlayerVariant::Minimal));
    }
}
