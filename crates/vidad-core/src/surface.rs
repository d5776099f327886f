//! Player Surface - one playback element and its controls
//!
//! The surface owns the playback state of a mounted overlay and translates
//! native media events into the callback contract. Hosts forward events in
//! through [`SurfaceEvent`]; the surface drives the element back through
//! [`MediaBackend`].
//!
//! Platform embeds have no media element, so every media operation on them
//! is a no-op.

use crate::{
    config::PlayerConfig,
    error::{PlaybackError, Result},
    layout::{container_style, exit_style, size_of_with, StyleMap},
    resolver::{resolve, ResolvedSource},
    types::{Dimensions, InstanceId, PlayerVariant, SourceKind},
};
use serde::Serialize;
use tracing::{debug, error, warn};

/// The native media element behind a surface
pub trait MediaBackend {
    /// Request playback. Rejections come back as [`MediaEvent::Error`].
    fn play(&self);

    fn pause(&self);

    /// Volume in `[0, 1]`
    fn set_volume(&self, volume: f64);

    /// Absolute position in seconds
    fn set_current_time(&self, seconds: f64);

    /// Known media duration in seconds
    fn duration(&self) -> Option<f64>;

    fn set_muted(&self, muted: bool);

    fn request_fullscreen(&self);
}

/// Native media element events
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    LoadedMetadata { duration: f64 },
    LoadedData,
    TimeUpdate { current_time: f64 },
    Playing,
    Paused,
    Ended,
    Error(PlaybackError),
}

/// User interaction with the full variant's control bar
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlAction {
    TogglePlay,
    ToggleMute,
    /// Jump to a fraction of the duration
    Scrub(f64),
    Fullscreen,
}

/// Everything a host view reports back to its instance
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    Media(MediaEvent),
    Control(ControlAction),
    /// The close affordance was activated
    CloseRequested,
}

/// Work for the caller's callbacks, run after surface state is released
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Complete,
    Error(PlaybackError),
}

/// Everything a host needs to build the DOM subtree of one overlay
#[derive(Debug, Clone, PartialEq)]
pub struct MountPlan {
    pub id: InstanceId,
    pub source: ResolvedSource,
    pub dimensions: Dimensions,
    pub style: StyleMap,
    pub exit_style: StyleMap,
    pub variant: PlayerVariant,
    pub autoplay: bool,
    pub muted: bool,
    pub closeable: bool,
    pub show_controls: bool,
}

impl MountPlan {
    /// Resolve and lay out a config. Fails before anything is mounted.
    pub fn from_config(config: &PlayerConfig) -> Result<Self> {
        config.validate()?;
        let source = resolve(config)?;
        let style = container_style(config);
        let exit_style = exit_style(&style);

        Ok(Self {
            id: InstanceId::next(),
            source,
            dimensions: size_of_with(config.orientation, config.size, config.width, config.height),
            style,
            exit_style,
            variant: config.variant,
            autoplay: config.autoplay,
            muted: config.muted,
            closeable: config.closeable,
            show_controls: config.show_controls,
        })
    }

    /// Whether the source plays in an embedded third-party frame
    pub fn is_embed(&self) -> bool {
        self.source.kind == SourceKind::PlatformEmbed
    }

    /// Whether the host should render the scrub/play/mute/fullscreen bar
    pub fn has_control_bar(&self) -> bool {
        self.variant == PlayerVariant::Full && self.show_controls && !self.is_embed()
    }
}

/// Playback state shown by a host's controls
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SurfaceSnapshot {
    pub playing: bool,
    pub muted: bool,
    pub position: f64,
    pub duration: Option<f64>,
    pub completed: bool,
}

impl SurfaceSnapshot {
    /// Played fraction in `[0, 1]`, 0 while the duration is unknown
    pub fn progress(&self) -> f64 {
        match self.duration {
            Some(d) if d > 0.0 => (self.position / d).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }
}

/// Playback state of one mounted overlay
#[derive(Debug)]
pub struct Surface {
    id: InstanceId,
    variant: PlayerVariant,
    autoplay: bool,
    playing: bool,
    muted: bool,
    autoplayed: bool,
    completed: bool,
    position: f64,
    duration: Option<f64>,
    /// Seek requested before the duration was known
    pending_seek: Option<f64>,
}

impl Surface {
    pub fn new(plan: &MountPlan) -> Self {
        Self {
            id: plan.id,
            variant: plan.variant,
            autoplay: plan.autoplay,
            playing: false,
            muted: plan.muted,
            autoplayed: false,
            completed: false,
            position: 0.0,
            duration: None,
            pending_seek: None,
        }
    }

    pub fn snapshot(&self) -> SurfaceSnapshot {
        SurfaceSnapshot {
            playing: self.playing,
            muted: self.muted,
            position: self.position,
            duration: self.duration,
            completed: self.completed,
        }
    }

    /// Apply a native media event
    pub fn on_media_event(
        &mut self,
        event: MediaEvent,
        media: Option<&dyn MediaBackend>,
    ) -> Option<Notification> {
        debug!(instance = %self.id, event = ?event, "Media event");

        match event {
            MediaEvent::LoadedMetadata { duration } => {
                if duration.is_finite() && duration > 0.0 {
                    self.duration = Some(duration);
                }
                if let (Some(target), Some(media)) = (self.pending_seek.take(), media) {
                    self.apply_seek(target, media);
                }
                None
            }
            MediaEvent::LoadedData => {
                let should_play = match self.variant {
                    PlayerVariant::Minimal => self.autoplay,
                    PlayerVariant::Full => self.autoplay && !self.autoplayed,
                };
                if should_play {
                    self.autoplayed = true;
                    self.play(media);
                }
                None
            }
            MediaEvent::TimeUpdate { current_time } => {
                self.position = current_time;
                None
            }
            MediaEvent::Playing => {
                self.playing = true;
                None
            }
            MediaEvent::Paused => {
                self.playing = false;
                None
            }
            MediaEvent::Ended => match self.variant {
                PlayerVariant::Minimal => {
                    // Continuous loop: restart from the top
                    self.position = 0.0;
                    if let Some(media) = media {
                        media.set_current_time(0.0);
                        media.play();
                    }
                    None
                }
                PlayerVariant::Full => {
                    self.playing = false;
                    if self.completed {
                        None
                    } else {
                        self.completed = true;
                        Some(Notification::Complete)
                    }
                }
            },
            MediaEvent::Error(e) => {
                error!(instance = %self.id, kind = %e.kind, error = %e.message, "Playback error");
                Some(Notification::Error(e))
            }
        }
    }

    /// Apply a control bar interaction
    pub fn on_control(&mut self, action: ControlAction, media: Option<&dyn MediaBackend>) {
        let Some(media) = media else {
            return;
        };

        match action {
            ControlAction::TogglePlay => {
                if self.playing {
                    self.pause(Some(media));
                } else {
                    self.play(Some(media));
                }
            }
            ControlAction::ToggleMute => {
                self.muted = !self.muted;
                media.set_muted(self.muted);
            }
            ControlAction::Scrub(fraction) => {
                if let Some(duration) = self.known_duration(media) {
                    self.seek(fraction.clamp(0.0, 1.0) * duration, Some(media));
                }
            }
            ControlAction::Fullscreen => media.request_fullscreen(),
        }
    }

    pub fn play(&mut self, media: Option<&dyn MediaBackend>) {
        if let Some(media) = media {
            self.playing = true;
            media.play();
        }
    }

    pub fn pause(&mut self, media: Option<&dyn MediaBackend>) {
        if let Some(media) = media {
            self.playing = false;
            media.pause();
        }
    }

    /// Set volume, clamped to `[0, 1]`. NaN is ignored.
    pub fn set_volume(&mut self, volume: f64, media: Option<&dyn MediaBackend>) {
        if volume.is_nan() {
            warn!(instance = %self.id, "Ignoring NaN volume");
            return;
        }
        if let Some(media) = media {
            media.set_volume(volume.clamp(0.0, 1.0));
        }
    }

    /// Seek to an absolute position.
    ///
    /// Negative targets clamp to 0 and, once the duration is known, targets
    /// clamp to it. Before metadata the latest target waits for
    /// `loadedmetadata`.
    pub fn seek(&mut self, seconds: f64, media: Option<&dyn MediaBackend>) {
        if !seconds.is_finite() {
            warn!(instance = %self.id, seconds, "Ignoring non-finite seek target");
            return;
        }
        let Some(media) = media else {
            return;
        };

        let target = seconds.max(0.0);
        if self.known_duration(media).is_some() {
            self.apply_seek(target, media);
        } else {
            debug!(instance = %self.id, target, "Deferring seek until metadata");
            self.pending_seek = Some(target);
        }
    }

    fn apply_seek(&mut self, target: f64, media: &dyn MediaBackend) {
        let clamped = match self.known_duration(media) {
            Some(duration) => target.min(duration),
            None => target,
        };
        self.position = clamped;
        media.set_current_time(clamped);
    }

    fn known_duration(&mut self, media: &dyn MediaBackend) -> Option<f64> {
        if self.duration.is_none() {
            self.duration = media.duration().filter(|d| d.is_finite() && *d > 0.0);
        }
        self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MediaCall, MemoryMedia};

    fn surface(variant: PlayerVariant) -> Surface {
        let config = PlayerConfig::with_video_url("https://x/y.mp4").variant(variant);
        Surface::new(&MountPlan::from_config(&config).unwrap())
    }

    #[test]
    fn test_plan_from_config() {
        let plan = MountPlan::from_config(&PlayerConfig::with_video_id("abc")).unwrap();
        assert!(plan.is_embed());
        assert!(!plan.has_control_bar());
        assert_eq!(plan.dimensions, Dimensions::new(480, 270));
        assert_eq!(plan.exit_style.get("opacity"), Some("0"));

        let full = PlayerConfig::with_video_url("https://x/y.mp4").variant(PlayerVariant::Full);
        assert!(MountPlan::from_config(&full).unwrap().has_control_bar());
    }

    #[test]
    fn test_plan_rejects_missing_source() {
        assert!(MountPlan::from_config(&PlayerConfig::default()).is_err());
    }

    #[test]
    fn test_minimal_loops_on_end() {
        let media = MemoryMedia::new();
        let mut surface = surface(PlayerVariant::Minimal);

        surface.on_media_event(MediaEvent::LoadedData, Some(&media));
        let note = surface.on_media_event(MediaEvent::Ended, Some(&media));

        assert_eq!(note, None);
        assert_eq!(
            media.calls(),
            vec![MediaCall::Play, MediaCall::Seek(0.0), MediaCall::Play]
        );
    }

    #[test]
    fn test_full_completes_once() {
        let media = MemoryMedia::new();
        let mut surface = surface(PlayerVariant::Full);

        assert_eq!(
            surface.on_media_event(MediaEvent::Ended, Some(&media)),
            Some(Notification::Complete)
        );
        assert_eq!(surface.on_media_event(MediaEvent::Ended, Some(&media)), None);
        assert!(surface.snapshot().completed);
        assert!(media.calls().is_empty());
    }

    #[test]
    fn test_full_autoplays_once() {
        let media = MemoryMedia::new();
        let mut surface = surface(PlayerVariant::Full);

        surface.on_media_event(MediaEvent::LoadedData, Some(&media));
        surface.on_media_event(MediaEvent::LoadedData, Some(&media));
        assert_eq!(media.calls(), vec![MediaCall::Play]);
    }

    #[test]
    fn test_no_autoplay() {
        let media = MemoryMedia::new();
        let config = PlayerConfig {
            autoplay: false,
            ..PlayerConfig::with_video_url("https://x/y.mp4")
        };
        let mut surface = Surface::new(&MountPlan::from_config(&config).unwrap());
        surface.on_media_event(MediaEvent::LoadedData, Some(&media));
        assert!(media.calls().is_empty());
    }

    #[test]
    fn test_error_notifies_each_occurrence() {
        let mut surface = surface(PlayerVariant::Minimal);
        let err = PlaybackError::from_media_error(2, "offline");
        for _ in 0..2 {
            assert_eq!(
                surface.on_media_event(MediaEvent::Error(err.clone()), None),
                Some(Notification::Error(err.clone()))
            );
        }
    }

    #[test]
    fn test_volume_clamped() {
        let media = MemoryMedia::new();
        let mut surface = surface(PlayerVariant::Minimal);
        surface.set_volume(1.7, Some(&media));
        surface.set_volume(-3.0, Some(&media));
        surface.set_volume(f64::NAN, Some(&media));
        assert_eq!(
            media.calls(),
            vec![MediaCall::SetVolume(1.0), MediaCall::SetVolume(0.0)]
        );
    }

    #[test]
    fn test_seek_deferred_until_metadata() {
        let media = MemoryMedia::new();
        let mut surface = surface(PlayerVariant::Full);

        surface.seek(90.0, Some(&media));
        assert!(media.calls().is_empty());

        surface.on_media_event(MediaEvent::LoadedMetadata { duration: 60.0 }, Some(&media));
        assert_eq!(media.calls(), vec![MediaCall::Seek(60.0)]);
    }

    #[test]
    fn test_seek_clamps() {
        let media = MemoryMedia::with_duration(30.0);
        let mut surface = surface(PlayerVariant::Full);

        surface.seek(-5.0, Some(&media));
        surface.seek(12.5, Some(&media));
        surface.seek(45.0, Some(&media));
        surface.seek(f64::INFINITY, Some(&media));
        assert_eq!(
            media.calls(),
            vec![MediaCall::Seek(0.0), MediaCall::Seek(12.5), MediaCall::Seek(30.0)]
        );
    }

    #[test]
    fn test_controls() {
        let media = MemoryMedia::with_duration(100.0);
        let mut surface = surface(PlayerVariant::Full);

        surface.on_control(ControlAction::TogglePlay, Some(&media));
        surface.on_control(ControlAction::TogglePlay, Some(&media));
        surface.on_control(ControlAction::ToggleMute, Some(&media));
        surface.on_control(ControlAction::Scrub(0.25), Some(&media));
        surface.on_control(ControlAction::Fullscreen, Some(&media));

        assert_eq!(
            media.calls(),
            vec![
                MediaCall::Play,
                MediaCall::Pause,
                MediaCall::SetMuted(false),
                MediaCall::Seek(25.0),
                MediaCall::Fullscreen,
            ]
        );
        assert!(!surface.snapshot().muted);
    }

    #[test]
    fn test_embed_operations_are_noops() {
        let mut surface = surface(PlayerVariant::Minimal);
        surface.play(None);
        surface.seek(3.0, None);
        surface.on_control(ControlAction::TogglePlay, None);
        assert!(!surface.snapshot().playing);
    }

    #[test]
    fn test_progress() {
        let mut surface = surface(PlayerVariant::Full);
        surface.on_media_event(MediaEvent::LoadedMetadata { duration: 40.0 }, None);
        surface.on_media_event(MediaEvent::TimeUpdate { current_time: 10.0 }, None);
        assert_eq!(surface.snapshot().progress(), 0.25);
    }
}
