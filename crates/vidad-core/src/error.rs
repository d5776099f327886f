//! Error types for Vidad Core

use std::fmt;
use thiserror::Error;

/// Result type alias for overlay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Overlay error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Configuration errors
    #[error("No video source provided. Please provide videoId, playbackId, or videoUrl")]
    NoSource,

    #[error("Ambiguous video source: {fields} are all set, provide exactly one")]
    AmbiguousSource { fields: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Host errors
    #[error("Failed to mount player: {0}")]
    Mount(String),

    // Playback errors
    #[error(transparent)]
    Playback(#[from] PlaybackError),
}

impl Error {
    /// Returns true for errors raised while validating a config, before any mount
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::NoSource | Error::AmbiguousSource { .. } | Error::InvalidConfig(_)
        )
    }

    /// Returns the error code reported to hosts
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::NoSource => "NO_SOURCE",
            Error::AmbiguousSource { .. } => "AMBIGUOUS_SOURCE",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Mount(_) => "MOUNT",
            Error::Playback(e) => e.kind.error_code(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidConfig(e.to_string())
    }
}

/// Category of a native media failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackErrorKind {
    /// Fetching aborted by the user agent
    Aborted,
    /// Network failure while fetching media
    Network,
    /// Media could not be decoded
    Decode,
    /// Source format or URL not supported
    SourceNotSupported,
    /// The host refused to start playback (autoplay policy, interrupted play)
    Autoplay,
    /// Anything the host did not classify
    Unknown,
}

impl PlaybackErrorKind {
    /// Map an HTML `MediaError.code` value
    pub fn from_media_error_code(code: u16) -> Self {
        match code {
            1 => PlaybackErrorKind::Aborted,
            2 => PlaybackErrorKind::Network,
            3 => PlaybackErrorKind::Decode,
            4 => PlaybackErrorKind::SourceNotSupported,
            _ => PlaybackErrorKind::Unknown,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            PlaybackErrorKind::Aborted => "PLAYBACK_ABORTED",
            PlaybackErrorKind::Network => "PLAYBACK_NETWORK",
            PlaybackErrorKind::Decode => "PLAYBACK_DECODE",
            PlaybackErrorKind::SourceNotSupported => "PLAYBACK_SOURCE",
            PlaybackErrorKind::Autoplay => "PLAYBACK_AUTOPLAY",
            PlaybackErrorKind::Unknown => "PLAYBACK",
        }
    }
}

impl fmt::Display for PlaybackErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlaybackErrorKind::Aborted => "aborted",
            PlaybackErrorKind::Network => "network",
            PlaybackErrorKind::Decode => "decode",
            PlaybackErrorKind::SourceNotSupported => "source not supported",
            PlaybackErrorKind::Autoplay => "autoplay",
            PlaybackErrorKind::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// A native media failure, delivered only through `onError`
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Video playback error ({kind}): {message}")]
pub struct PlaybackError {
    pub kind: PlaybackErrorKind,
    pub message: String,
}

impl PlaybackError {
    pub fn new(kind: PlaybackErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Build from an HTML `MediaError` code and message
    pub fn from_media_error(code: u16, message: impl Into<String>) -> Self {
        Self::new(PlaybackErrorKind::from_media_error_code(code), message)
    }

    /// A rejected `play()` request
    pub fn autoplay(message: impl Into<String>) -> Self {
        Self::new(PlaybackErrorKind::Autoplay, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_classification() {
        assert!(Error::NoSource.is_configuration());
        assert!(Error::InvalidConfig("x".into()).is_configuration());
        assert!(!Error::Mount("no body".into()).is_configuration());
        assert!(!Error::from(PlaybackError::autoplay("blocked")).is_configuration());
    }

    #[test]
    fn test_media_error_codes() {
        assert_eq!(PlaybackErrorKind::from_media_error_code(2), PlaybackErrorKind::Network);
        assert_eq!(PlaybackErrorKind::from_media_error_code(3), PlaybackErrorKind::Decode);
        assert_eq!(PlaybackErrorKind::from_media_error_code(42), PlaybackErrorKind::Unknown);
    }

    #[test]
    fn test_error_codes() {
        let err = Error::from(PlaybackError::from_media_error(4, "unsupported"));
        assert_eq!(err.error_code(), "PLAYBACK_SOURCE");
        assert_eq!(Error::NoSource.error_code(), "NO_SOURCE");
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Error::NoSource.to_string(),
            "No video source provided. Please provide videoId, playbackId, or videoUrl"
        );
        let err = PlaybackError::new(PlaybackErrorKind::Decode, "bad frame");
        assert_eq!(err.to_string(), "Video playback error (decode): bad frame");
    }
}
