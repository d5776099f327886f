//! Vidad Core - Embeddable Video Ad Overlay
//!
//! This crate provides the host-independent core of the overlay widget:
//! - Source resolution (platform embed id, streaming playback id, direct URL)
//! - Layout calculation (size presets, screen placement, style merging)
//! - Player surface logic (media events to callbacks, imperative controls)
//! - Lifecycle control (mount, grace-delayed close, single active overlay)
//! - Declarative tag adapter (attributes to config, visibility driven playback)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          Vidad Core                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐                             │
//! │  │    Source    │  │    Layout    │                             │
//! │  │   Resolver   │  │  Calculator  │                             │
//! │  └──────┬───────┘  └──────┬───────┘                             │
//! │         └────────┬────────┘                                     │
//! │           ┌──────┴──────┐        ┌──────────────┐               │
//! │           │   Player    │◄───────┤  Host / View │ (DOM, memory) │
//! │           │   Surface   │        └──────────────┘               │
//! │           └──────┬──────┘                                       │
//! │           ┌──────┴──────┐        ┌──────────────┐               │
//! │           │  Lifecycle  │◄───────┤     Tag      │               │
//! │           │ Controller  │        │   Adapter    │               │
//! │           └─────────────┘        └──────────────┘               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The browser implementation of [`Host`] lives in `vidad-wasm`.

pub mod config;
pub mod error;
pub mod layout;
pub mod lifecycle;
pub mod resolver;
pub mod surface;
pub mod tag;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{Callbacks, PlayerConfig, Source};
pub use error::{Error, PlaybackError, PlaybackErrorKind, Result};
pub use layout::{container_style, placement_of, size_of, size_of_with, StyleMap};
pub use lifecycle::{EventSink, Host, LifecycleController, PlayerHandle, View, CLOSE_GRACE};
pub use resolver::{classify, resolve, EmbedOptions, ResolvedSource};
pub use surface::{
    ControlAction, MediaBackend, MediaEvent, MountPlan, SurfaceEvent, SurfaceSnapshot,
};
pub use tag::{AttributeSource, TagAdapter, TagEvent, OBSERVED_ATTRIBUTES, TAG_NAME};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library
pub fn init() {
    tracing::info!(version = VERSION, "Vidad Core initialized");
}
