//! Lifecycle Controller - mount, close and the caller's handle
//!
//! Each overlay instance moves `Uninitialized -> Mounted -> Closing -> Unmounted`.
//! Closing starts the exit transition immediately; the subtree is detached
//! and `onClose` fires once after [`CLOSE_GRACE`].
//!
//! A [`PlayerHandle`] reaches its instance through a shared slot that is
//! emptied on unmount, so every handle method on a dead instance is a no-op.
//! A [`LifecycleController`] keeps at most one overlay live: creating a new
//! one starts the close sequence of the previous one first.

use crate::{
    config::{Callbacks, PlayerConfig},
    error::{Error, Result},
    surface::{
        ControlAction, MediaBackend, MediaEvent, MountPlan, Notification, Surface, SurfaceEvent,
        SurfaceSnapshot,
    },
    types::{InstanceId, LifecycleState},
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Delay between starting a close and detaching the subtree
pub const CLOSE_GRACE: Duration = Duration::from_millis(300);

/// Callback a host invokes for every event of a mounted view
pub type EventSink = Rc<dyn Fn(SurfaceEvent)>;

/// The environment overlays are mounted into
pub trait Host: 'static {
    type View: View;

    /// Build and attach the subtree described by `plan`.
    ///
    /// Listeners must deliver into `sink` until [`View::detach`].
    fn mount(&self, plan: &MountPlan, sink: EventSink) -> Result<Self::View>;

    /// Run `task` once after `delay`
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>);
}

/// A mounted overlay subtree
pub trait View: 'static {
    /// Root container node handed out by [`PlayerHandle::element`]
    type Element: Clone;

    fn element(&self) -> Self::Element;

    /// The native media element, absent for platform embeds
    fn media(&self) -> Option<&dyn MediaBackend>;

    /// Start the exit transition
    fn begin_exit(&self);

    /// Unsubscribe every listener and remove the subtree
    fn detach(&mut self);

    fn is_attached(&self) -> bool;

    /// Reflect playback state in the host's controls
    fn sync(&self, _snapshot: &SurfaceSnapshot) {}
}

type Slot<H> = Rc<RefCell<Option<Rc<Instance<H>>>>>;

struct Instance<H: Host> {
    id: InstanceId,
    host: Rc<H>,
    state: Cell<LifecycleState>,
    view: RefCell<Option<H::View>>,
    surface: RefCell<Surface>,
    callbacks: Callbacks,
    /// Shared with every handle. Holding the instance here keeps it alive
    /// while mounted; clearing it on unmount releases it.
    slot: Slot<H>,
}

impl<H: Host> Instance<H> {
    fn state(&self) -> LifecycleState {
        self.state.get()
    }

    fn transition(&self, to: LifecycleState) -> bool {
        let from = self.state.get();
        if !from.can_transition_to(to) {
            debug!(instance = %self.id, %from, %to, "Ignoring lifecycle transition");
            return false;
        }
        self.state.set(to);
        info!(instance = %self.id, %from, %to, "Lifecycle transition");
        true
    }

    fn dispatch(self: &Rc<Self>, event: SurfaceEvent) {
        if self.state() != LifecycleState::Mounted {
            debug!(instance = %self.id, state = %self.state(), ?event, "Dropping event");
            return;
        }

        match event {
            SurfaceEvent::CloseRequested => self.close(),
            SurfaceEvent::Media(event) => {
                let notification = self.with_media(|surface, media| surface.on_media_event(event, media));
                if let Some(notification) = notification {
                    self.notify(notification);
                }
            }
            SurfaceEvent::Control(action) => self.control(action),
        }
    }

    /// Run `f` against the surface and media element, then push the new
    /// state to the view. No borrow is held once this returns.
    fn with_media<T>(&self, f: impl FnOnce(&mut Surface, Option<&dyn MediaBackend>) -> T) -> T {
        let view = self.view.borrow();
        let mut surface = self.surface.borrow_mut();
        let out = f(&mut surface, view.as_ref().and_then(|v| v.media()));
        if let Some(view) = view.as_ref() {
            view.sync(&surface.snapshot());
        }
        out
    }

    fn notify(&self, notification: Notification) {
        match notification {
            Notification::Complete => {
                info!(instance = %self.id, "Playback complete");
                self.callbacks.complete();
            }
            Notification::Error(e) => self.callbacks.error(&Error::Playback(e)),
        }
    }

    /// Run an imperative operation while mounted, otherwise ignore it
    fn operate(&self, op: &str, f: impl FnOnce(&mut Surface, Option<&dyn MediaBackend>)) {
        if self.state() != LifecycleState::Mounted {
            debug!(instance = %self.id, state = %self.state(), op, "Ignoring operation");
            return;
        }
        self.with_media(f);
    }

    fn control(&self, action: ControlAction) {
        self.operate("control", |surface, media| surface.on_control(action, media));
    }

    fn close(self: &Rc<Self>) {
        if !self.transition(LifecycleState::Closing) {
            return;
        }

        if let Some(view) = self.view.borrow().as_ref() {
            view.begin_exit();
        }

        let this = Rc::clone(self);
        self.host
            .schedule(CLOSE_GRACE, Box::new(move || this.finish_close()));
    }

    fn finish_close(&self) {
        if !self.transition(LifecycleState::Unmounted) {
            return;
        }

        let view = self.view.borrow_mut().take();
        if let Some(mut view) = view {
            view.detach();
        }
        self.slot.borrow_mut().take();

        self.callbacks.close();
    }

    fn element(&self) -> Option<<H::View as View>::Element> {
        self.view.borrow().as_ref().map(|v| v.element())
    }

    fn snapshot(&self) -> SurfaceSnapshot {
        self.surface.borrow().snapshot()
    }

    fn is_active(&self) -> bool {
        self.state().is_live()
            && self
                .view
                .borrow()
                .as_ref()
                .is_some_and(|view| view.is_attached())
    }
}

/// Caller-owned handle to one overlay.
///
/// Cloning shares the same instance. Every method is safe to call at any
/// point of the lifecycle; calls outside `Mounted` do nothing.
pub struct PlayerHandle<H: Host> {
    id: InstanceId,
    slot: Slot<H>,
}

impl<H: Host> Clone for PlayerHandle<H> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<H: Host> PlayerHandle<H> {
    /// Mount a planned overlay on `host`
    #[instrument(skip_all, fields(instance = %plan.id, kind = %plan.source.kind))]
    pub fn mount(host: Rc<H>, plan: MountPlan, callbacks: Callbacks) -> Result<Self> {
        let slot: Slot<H> = Rc::new(RefCell::new(None));
        let instance = Rc::new(Instance {
            id: plan.id,
            host: Rc::clone(&host),
            state: Cell::new(LifecycleState::Uninitialized),
            view: RefCell::new(None),
            surface: RefCell::new(Surface::new(&plan)),
            callbacks,
            slot: Rc::clone(&slot),
        });

        // Listeners only reach the instance while something else keeps it alive
        let weak = Rc::downgrade(&instance);
        let sink: EventSink = Rc::new(move |event| {
            if let Some(instance) = weak.upgrade() {
                instance.dispatch(event);
            }
        });

        let view = host.mount(&plan, sink)?;
        *instance.view.borrow_mut() = Some(view);
        instance.transition(LifecycleState::Mounted);
        info!(url = %plan.source.url, "Overlay mounted");

        *slot.borrow_mut() = Some(instance);

        Ok(Self { id: plan.id, slot })
    }

    fn live(&self) -> Option<Rc<Instance<H>>> {
        self.slot.borrow().clone()
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Current lifecycle state; `Unmounted` once the instance is gone
    pub fn state(&self) -> LifecycleState {
        self.live()
            .map(|i| i.state())
            .unwrap_or(LifecycleState::Unmounted)
    }

    pub fn play(&self) {
        if let Some(i) = self.live() {
            i.operate("play", |surface, media| surface.play(media));
        }
    }

    pub fn pause(&self) {
        if let Some(i) = self.live() {
            i.operate("pause", |surface, media| surface.pause(media));
        }
    }

    /// Set volume, clamped to `[0, 1]`
    pub fn set_volume(&self, volume: f64) {
        if let Some(i) = self.live() {
            i.operate("set_volume", |surface, media| surface.set_volume(volume, media));
        }
    }

    /// Seek to an absolute position in seconds
    pub fn seek(&self, seconds: f64) {
        if let Some(i) = self.live() {
            i.operate("seek", |surface, media| surface.seek(seconds, media));
        }
    }

    /// Start the close sequence. Idempotent.
    pub fn close(&self) {
        if let Some(i) = self.live() {
            i.close();
        }
    }

    /// Root container while mounted or closing
    pub fn element(&self) -> Option<<H::View as View>::Element> {
        self.live()?.element()
    }

    /// Playback state while mounted or closing
    pub fn snapshot(&self) -> Option<SurfaceSnapshot> {
        self.live().map(|i| i.snapshot())
    }

    /// Mounted or closing, and still attached to the document
    pub fn is_active(&self) -> bool {
        self.live().is_some_and(|i| i.is_active())
    }

    /// Forward a host event as if a listener had fired
    pub fn dispatch(&self, event: SurfaceEvent) {
        if let Some(i) = self.live() {
            i.dispatch(event);
        }
    }

    /// Forward a native media event
    pub fn dispatch_media(&self, event: MediaEvent) {
        self.dispatch(SurfaceEvent::Media(event));
    }
}

/// Creates overlays, keeping at most one live at a time
pub struct LifecycleController<H: Host> {
    host: Rc<H>,
    active: RefCell<Option<PlayerHandle<H>>>,
}

impl<H: Host> LifecycleController<H> {
    pub fn new(host: Rc<H>) -> Self {
        Self {
            host,
            active: RefCell::new(None),
        }
    }

    pub fn host(&self) -> &Rc<H> {
        &self.host
    }

    /// Create and mount an overlay.
    ///
    /// Configuration errors are returned before anything is closed or
    /// mounted. A live previous overlay starts closing before the new one
    /// mounts.
    pub fn create(&self, config: PlayerConfig) -> Result<PlayerHandle<H>> {
        let plan = MountPlan::from_config(&config)?;

        let previous = self.active.borrow_mut().take();
        if let Some(previous) = previous {
            if previous.state().is_live() {
                info!(previous = %previous.id(), next = %plan.id, "Replacing active overlay");
                previous.close();
            }
        }

        let handle = PlayerHandle::mount(Rc::clone(&self.host), plan, config.callbacks)
            .inspect_err(|e| warn!(error = %e, "Mount failed"))?;
        *self.active.borrow_mut() = Some(handle.clone());

        Ok(handle)
    }

    /// Handle of the most recently created overlay
    pub fn current(&self) -> Option<PlayerHandle<H>> {
        self.active.borrow().clone()
    }

    /// Close the current overlay, if any
    pub fn close(&self) {
        let current = self.current();
        if let Some(handle) = current {
            handle.close();
        }
    }

    /// Whether the current overlay is mounted or closing and attached
    pub fn is_active(&self) -> bool {
        self.active
            .borrow()
            .as_ref()
            .is_some_and(|handle| handle.is_active())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryHost;

    #[test]
    fn test_mount_and_close() {
        let host = MemoryHost::new();
        let controller = LifecycleController::new(Rc::clone(&host));

        let handle = controller
            .create(PlayerConfig::with_video_url("https://x/y.mp4"))
            .unwrap();
        assert_eq!(handle.state(), LifecycleState::Mounted);
        assert!(handle.is_active());

        handle.close();
        assert_eq!(handle.state(), LifecycleState::Closing);
        assert!(handle.is_active());
        assert!(handle.element().is_some());

        host.advance(CLOSE_GRACE);
        assert_eq!(handle.state(), LifecycleState::Unmounted);
        assert!(!handle.is_active());
        assert!(handle.element().is_none());
        assert!(!controller.is_active());
    }

    #[test]
    fn test_detach_waits_for_grace() {
        let host = MemoryHost::new();
        let controller = LifecycleController::new(Rc::clone(&host));
        let handle = controller.create(PlayerConfig::with_video_id("abc")).unwrap();

        handle.close();
        host.advance(CLOSE_GRACE - Duration::from_millis(1));
        assert_eq!(host.attached_count(), 1);
        host.advance(Duration::from_millis(1));
        assert_eq!(host.attached_count(), 0);
    }

    #[test]
    fn test_config_error_before_mount() {
        let host = MemoryHost::new();
        let controller = LifecycleController::new(Rc::clone(&host));
        let first = controller.create(PlayerConfig::with_video_id("abc")).unwrap();

        let err = controller.create(PlayerConfig::default()).err().unwrap();
        assert!(err.is_configuration());
        assert!(host.nodes().len() == 1);
        assert_eq!(first.state(), LifecycleState::Mounted);
    }

    #[test]
    fn test_mount_failure() {
        let host = MemoryHost::new();
        host.fail_mounts(true);
        let controller = LifecycleController::new(Rc::clone(&host));
        let err = controller.create(PlayerConfig::with_video_id("abc")).err().unwrap();
        assert_eq!(err.error_code(), "MOUNT");
        assert!(!controller.is_active());
    }

    #[test]
    fn test_events_ignored_after_close_starts() {
        let host = MemoryHost::new();
        let controller = LifecycleController::new(Rc::clone(&host));
        let handle = controller
            .create(PlayerConfig::with_video_url("https://x/y.mp4"))
            .unwrap();
        let node = host.last_node().unwrap();
        let media = node.media.clone().unwrap();

        handle.close();
        handle.play();
        node.emit_media(MediaEvent::LoadedData);
        assert!(media.calls().is_empty());
    }
}
