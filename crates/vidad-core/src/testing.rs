//! In-memory host for tests
//!
//! [`MemoryHost`] mounts overlays into a list of [`MemoryNode`]s instead of a
//! document and runs scheduled tasks only when [`MemoryHost::advance`] moves
//! its clock, so grace delays are observable without a browser.

use crate::{
    error::{Error, Result},
    layout::StyleMap,
    lifecycle::{EventSink, Host, View},
    surface::{MediaBackend, MediaEvent, MountPlan, SurfaceEvent, SurfaceSnapshot},
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

/// A call made on [`MemoryMedia`]
#[derive(Debug, Clone, PartialEq)]
pub enum MediaCall {
    Play,
    Pause,
    SetVolume(f64),
    Seek(f64),
    SetMuted(bool),
    Fullscreen,
}

/// Media element recording every call made on it
#[derive(Debug, Default)]
pub struct MemoryMedia {
    calls: RefCell<Vec<MediaCall>>,
    duration: Cell<Option<f64>>,
}

impl MemoryMedia {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duration(duration: f64) -> Self {
        let media = Self::default();
        media.duration.set(Some(duration));
        media
    }

    pub fn calls(&self) -> Vec<MediaCall> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: MediaCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl MediaBackend for MemoryMedia {
    fn play(&self) {
        self.record(MediaCall::Play);
    }

    fn pause(&self) {
        self.record(MediaCall::Pause);
    }

    fn set_volume(&self, volume: f64) {
        self.record(MediaCall::SetVolume(volume));
    }

    fn set_current_time(&self, seconds: f64) {
        self.record(MediaCall::Seek(seconds));
    }

    fn duration(&self) -> Option<f64> {
        self.duration.get()
    }

    fn set_muted(&self, muted: bool) {
        self.record(MediaCall::SetMuted(muted));
    }

    fn request_fullscreen(&self) {
        self.record(MediaCall::Fullscreen);
    }
}

/// One mounted overlay, shared between its view and the host for inspection
pub struct MemoryNode {
    pub plan: MountPlan,
    pub media: Option<Rc<MemoryMedia>>,
    style: RefCell<StyleMap>,
    attached: Cell<bool>,
    exiting: Cell<bool>,
    snapshot: Cell<Option<SurfaceSnapshot>>,
    sink: RefCell<Option<EventSink>>,
}

impl MemoryNode {
    pub fn is_attached(&self) -> bool {
        self.attached.get()
    }

    pub fn is_exiting(&self) -> bool {
        self.exiting.get()
    }

    pub fn style(&self) -> StyleMap {
        self.style.borrow().clone()
    }

    /// Last state pushed to the node's controls
    pub fn snapshot(&self) -> Option<SurfaceSnapshot> {
        self.snapshot.get()
    }

    /// Whether event listeners are still subscribed
    pub fn is_listening(&self) -> bool {
        self.sink.borrow().is_some()
    }

    /// Deliver an event as the host would. Dropped once listeners are detached.
    pub fn emit(&self, event: SurfaceEvent) {
        let sink = self.sink.borrow().clone();
        if let Some(sink) = sink {
            sink(event);
        }
    }

    pub fn emit_media(&self, event: MediaEvent) {
        self.emit(SurfaceEvent::Media(event));
    }

    pub fn click_close(&self) {
        if self.plan.closeable {
            self.emit(SurfaceEvent::CloseRequested);
        }
    }
}

/// View over a [`MemoryNode`]
pub struct MemoryView {
    node: Rc<MemoryNode>,
}

impl View for MemoryView {
    type Element = Rc<MemoryNode>;

    fn element(&self) -> Self::Element {
        Rc::clone(&self.node)
    }

    fn media(&self) -> Option<&dyn MediaBackend> {
        self.node.media.as_deref().map(|m| m as &dyn MediaBackend)
    }

    fn begin_exit(&self) {
        self.node.exiting.set(true);
        self.node.style.borrow_mut().merge(&self.node.plan.exit_style);
    }

    fn detach(&mut self) {
        self.node.sink.borrow_mut().take();
        self.node.attached.set(false);
    }

    fn is_attached(&self) -> bool {
        self.node.attached.get()
    }

    fn sync(&self, snapshot: &SurfaceSnapshot) {
        self.node.snapshot.set(Some(*snapshot));
    }
}

type Task = Box<dyn FnOnce()>;

/// Host with a manual clock
#[derive(Default)]
pub struct MemoryHost {
    now: Cell<Duration>,
    timers: RefCell<Vec<(Duration, u64, Task)>>,
    next_timer: Cell<u64>,
    nodes: RefCell<Vec<Rc<MemoryNode>>>,
    fail_mounts: Cell<bool>,
}

impl MemoryHost {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Make subsequent mounts fail
    pub fn fail_mounts(&self, fail: bool) {
        self.fail_mounts.set(fail);
    }

    pub fn now(&self) -> Duration {
        self.now.get()
    }

    /// Move the clock forward, running due tasks in deadline order
    pub fn advance(&self, by: Duration) {
        let target = self.now.get() + by;
        loop {
            let next = {
                let mut timers = self.timers.borrow_mut();
                let due = timers
                    .iter()
                    .enumerate()
                    .filter(|(_, (at, _, _))| *at <= target)
                    .min_by_key(|(_, (at, seq, _))| (*at, *seq))
                    .map(|(i, _)| i);
                due.map(|i| timers.remove(i))
            };
            match next {
                Some((at, _, task)) => {
                    self.now.set(at);
                    task();
                }
                None => break,
            }
        }
        self.now.set(target);
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().len()
    }

    /// Every node ever mounted, oldest first
    pub fn nodes(&self) -> Vec<Rc<MemoryNode>> {
        self.nodes.borrow().clone()
    }

    pub fn last_node(&self) -> Option<Rc<MemoryNode>> {
        self.nodes.borrow().last().cloned()
    }

    /// Nodes still in the document
    pub fn attached_count(&self) -> usize {
        self.nodes.borrow().iter().filter(|n| n.is_attached()).count()
    }
}

impl Host for MemoryHost {
    type View = MemoryView;

    fn mount(&self, plan: &MountPlan, sink: EventSink) -> Result<MemoryView> {
        if self.fail_mounts.get() {
            return Err(Error::Mount("memory host refused the mount".into()));
        }

        let media = (!plan.is_embed()).then(|| Rc::new(MemoryMedia::new()));
        let node = Rc::new(MemoryNode {
            plan: plan.clone(),
            media,
            style: RefCell::new(plan.style.clone()),
            attached: Cell::new(true),
            exiting: Cell::new(false),
            snapshot: Cell::new(None),
            sink: RefCell::new(Some(sink)),
        });
        self.nodes.borrow_mut().push(Rc::clone(&node));

        Ok(MemoryView { node })
    }

    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) {
        let seq = self.next_timer.get();
        self.next_timer.set(seq + 1);
        self.timers
            .borrow_mut()
            .push((self.now.get() + delay, seq, task));
    }
}
