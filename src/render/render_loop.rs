//! Per-frame scheduler
//!
//! The host calls [`RenderLoop::tick`] once per display frame while the loop
//! is running. A tick collects a finished render, runs momentum and, when the
//! viewport is dirty and nothing is rendering, starts a render of the current
//! transform into the back surface. Only one render is ever outstanding;
//! transforms that change while it runs are folded into the next one.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, trace, warn};

use super::adapter::{DocumentRenderer, LoadError};
use super::frame_buffer::FrameBuffer;
use super::service::{DocumentInfo, RenderCompletion, RenderService};
use super::surface::{Surface, SurfaceSize};
use crate::viewport::{DirtyFlag, MomentumIntegrator, ViewportState};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoopState {
    #[default]
    Idle,
    Running,
}

/// Everything a tick reads or mutates outside the loop itself
pub struct FrameContext<'a> {
    pub viewport: &'a mut ViewportState,
    pub momentum: &'a MomentumIntegrator,
    pub active_contacts: usize,
    pub dirty: &'a mut DirtyFlag,
    /// Current display size; the back surface follows it
    pub display: SurfaceSize,
}

/// What one tick did
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// A finished frame was swapped onto the front surface
    pub swapped: bool,
    /// A new render was started
    pub dispatched: bool,
    /// A render is outstanding after this tick
    pub in_flight: bool,
}

pub struct RenderLoop {
    state: LoopState,
    frames: FrameBuffer,
    service: RenderService,
    failed_renders: u64,
}

impl RenderLoop {
    /// Create an idle loop whose renders run on a worker hosting `renderer`.
    pub fn new<R>(renderer: R, display: SurfaceSize) -> Self
    where
        R: DocumentRenderer + Send + 'static,
    {
        Self {
            state: LoopState::Idle,
            frames: FrameBuffer::new(display),
            service: RenderService::spawn(renderer),
            failed_renders: 0,
        }
    }

    pub fn start(&mut self) {
        if self.state == LoopState::Idle {
            info!("Render loop started");
            self.state = LoopState::Running;
        }
    }

    /// Stop scheduling work. A render already in flight can still be
    /// collected with [`RenderLoop::settle`].
    pub fn stop(&mut self) {
        if self.state == LoopState::Running {
            info!("Render loop stopped");
            self.state = LoopState::Idle;
        }
    }

    #[must_use]
    pub fn state(&self) -> LoopState {
        self.state
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    #[must_use]
    pub fn is_rendering(&self) -> bool {
        self.service.in_flight().is_some()
    }

    #[must_use]
    pub fn frame_buffer(&self) -> &FrameBuffer {
        &self.frames
    }

    #[must_use]
    pub fn front(&self) -> &Surface {
        self.frames.front()
    }

    #[must_use]
    pub fn document_info(&self) -> Option<DocumentInfo> {
        self.service.document_info()
    }

    /// Renders that came back with an error since the loop was created
    #[must_use]
    pub fn failed_renders(&self) -> u64 {
        self.failed_renders
    }

    /// Load a document on the worker and wait for the answer.
    pub fn load(&mut self, bytes: Arc<[u8]>, page: usize) -> Result<DocumentInfo, LoadError> {
        self.service.load_blocking(bytes, page)
    }

    pub fn tick(&mut self, ctx: FrameContext<'_>) -> TickOutcome {
        if !self.is_running() {
            return TickOutcome::default();
        }

        let mut outcome = TickOutcome::default();

        if let Some(completion) = self.service.poll() {
            outcome.swapped = self.finish(completion);
        }

        if ctx.momentum.step(ctx.viewport, ctx.active_contacts) {
            ctx.dirty.mark();
        }

        if ctx.dirty.is_set() {
            if self.is_rendering() {
                trace!("dirty while a render is in flight, deferring");
            } else {
                ctx.dirty.take();
                outcome.dispatched = self.dispatch(ctx.viewport, ctx.display);
            }
        }

        outcome.in_flight = self.is_rendering();
        trace!("tick: {outcome:?}");
        outcome
    }

    /// Block until the render in flight finishes, at most `timeout`, and
    /// handle it the way a tick would. Returns true if a frame was swapped.
    pub fn settle(&mut self, timeout: Duration) -> bool {
        self.service
            .wait(timeout)
            .is_some_and(|completion| self.finish(completion))
    }

    fn dispatch(&mut self, viewport: &ViewportState, display: SurfaceSize) -> bool {
        self.frames.resize_back(display);
        self.frames.clear_back();
        let Some(target) = self.frames.lend_back() else {
            warn!("Back surface is not available, skipping render");
            return false;
        };
        match self.service.dispatch(viewport.transform(), target) {
            Ok(id) => {
                debug!("Rendering {:?} as {id:?}", viewport.transform());
                true
            }
            Err(target) => {
                warn!("Render could not be dispatched");
                self.frames.return_back(target);
                false
            }
        }
    }

    fn finish(&mut self, completion: RenderCompletion) -> bool {
        match completion {
            RenderCompletion::Rendered { id, target } => {
                self.frames.return_back(target);
                let swapped = self.frames.swap();
                debug!("Render {id:?} complete, swapped: {swapped}");
                swapped
            }
            RenderCompletion::Failed { id, error, target } => {
                self.frames.return_back(target);
                self.failed_renders += 1;
                warn!("Render {id:?} failed: {error}");
                false
            }
        }
    }
}
