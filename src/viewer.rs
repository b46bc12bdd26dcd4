//! Viewer aggregate
//!
//! Owns the viewport, the gesture tracker, momentum and the render loop, and
//! exposes the operations a host UI drives: `init`, `recenter`, the pointer
//! entry points and one `tick` per display frame.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};

use crate::event_source::InputEvent;
use crate::render::{
    DocumentInfo, DocumentRenderer, FrameContext, LoadError, RenderLoop, Surface, SurfaceSize,
    TickOutcome,
};
use crate::viewport::{
    DirtyFlag, GestureConfig, GestureTracker, MomentumConfig, MomentumIntegrator, PinchState,
    Transform, ViewportState,
};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewerConfig {
    pub gesture: GestureConfig,
    pub momentum: MomentumConfig,
    /// Page shown after `init` (0-indexed)
    pub page: usize,
}

pub struct Viewer {
    viewport: ViewportState,
    gestures: GestureTracker,
    momentum: MomentumIntegrator,
    dirty: DirtyFlag,
    render_loop: RenderLoop,
    display: SurfaceSize,
    page: usize,
    document: Option<DocumentInfo>,
}

impl Viewer {
    pub fn new<R>(renderer: R, config: ViewerConfig, display: SurfaceSize) -> Self
    where
        R: DocumentRenderer + Send + 'static,
    {
        Self {
            viewport: ViewportState::new(),
            gestures: GestureTracker::new(config.gesture),
            momentum: MomentumIntegrator::new(config.momentum),
            dirty: DirtyFlag::default(),
            render_loop: RenderLoop::new(renderer, display),
            display,
            page: config.page,
            document: None,
        }
    }

    /// Load a document and start the frame loop.
    ///
    /// On failure the loop is not started and a previously loaded document
    /// stays on screen.
    pub fn init(&mut self, bytes: impl Into<Arc<[u8]>>) -> Result<DocumentInfo, LoadError> {
        let info = self.render_loop.load(bytes.into(), self.page)?;
        info!(
            "Document ready: page {} of {}",
            info.page + 1,
            info.page_count
        );
        self.document = Some(info);
        self.viewport.reset();
        self.dirty.mark();
        self.render_loop.start();
        Ok(info)
    }

    /// Back to scale 1 at the origin. Any pinch in progress keeps its
    /// baseline.
    pub fn recenter(&mut self) {
        self.viewport.recenter();
        self.dirty.mark();
        debug!("Recentered");
    }

    pub fn on_contact_start(&mut self, id: i64, x: f64, y: f64) {
        self.gestures.on_contact_start(id, x, y);
    }

    pub fn on_contact_end(&mut self, id: i64) {
        self.gestures.on_contact_end(id);
    }

    pub fn on_contact_move(&mut self, id: i64, x: f64, y: f64) {
        self.gestures
            .on_contact_move(id, x, y, &mut self.viewport, &mut self.dirty);
    }

    pub fn resize(&mut self, display: SurfaceSize) {
        if self.display != display {
            debug!("Display resized to {}x{}", display.width, display.height);
            self.display = display;
            self.dirty.mark();
        }
    }

    /// Apply one scripted input event. `Frame` markers are left to the host.
    pub fn apply(&mut self, event: &InputEvent) {
        match *event {
            InputEvent::Start { id, x, y } => self.on_contact_start(id, x, y),
            InputEvent::Move { id, x, y } => self.on_contact_move(id, x, y),
            InputEvent::End { id } => self.on_contact_end(id),
            InputEvent::Recenter => self.recenter(),
            InputEvent::Resize { width, height } => {
                self.resize(SurfaceSize::new(width, height));
            }
            InputEvent::Frame => {}
        }
    }

    /// Run one frame of the render loop.
    pub fn tick(&mut self) -> TickOutcome {
        let active_contacts = self.gestures.active_contacts();
        self.render_loop.tick(FrameContext {
            viewport: &mut self.viewport,
            momentum: &self.momentum,
            active_contacts,
            dirty: &mut self.dirty,
            display: self.display,
        })
    }

    /// Wait for the render in flight, if any. Returns true if it was swapped
    /// onto the front surface.
    pub fn settle(&mut self, timeout: Duration) -> bool {
        self.render_loop.settle(timeout)
    }

    pub fn stop(&mut self) {
        self.render_loop.stop();
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.render_loop.is_running()
    }

    #[must_use]
    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }

    #[must_use]
    pub fn document(&self) -> Option<DocumentInfo> {
        self.document
    }

    #[must_use]
    pub fn viewport(&self) -> &ViewportState {
        &self.viewport
    }

    #[must_use]
    pub fn transform(&self) -> Transform {
        self.viewport.transform()
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.is_set()
    }

    #[must_use]
    pub fn pinch(&self) -> PinchState {
        self.gestures.pinch()
    }

    #[must_use]
    pub fn active_contacts(&self) -> usize {
        self.gestures.active_contacts()
    }

    #[must_use]
    pub fn display(&self) -> SurfaceSize {
        self.display
    }

    #[must_use]
    pub fn front(&self) -> &Surface {
        self.render_loop.front()
    }

    #[must_use]
    pub fn render_loop(&self) -> &RenderLoop {
        &self.render_loop
    }
}
