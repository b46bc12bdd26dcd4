//! Test doubles and builders shared by unit and integration tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use flume::{Receiver, Sender};

use crate::event_source::InputEvent;
use crate::render::{
    DocumentRenderer, LoadError, RenderError, Surface, SurfaceSize, ViewportDescriptor,
};
use crate::viewport::Transform;

/// Page size, in points, of every mock page
pub const MOCK_PAGE_SIZE: (f32, f32) = (100.0, 150.0);

/// In-memory renderer that fills the target with a solid color.
///
/// Bytes starting with `corrupt`, or no bytes at all, fail to load.
pub struct MockRenderer {
    page_count: usize,
    rendered: Arc<Mutex<Vec<Transform>>>,
    fail_next: Arc<AtomicUsize>,
    gate: Option<Receiver<()>>,
}

/// Test-side view of a [`MockRenderer`] living on the render worker
#[derive(Clone)]
pub struct MockHandle {
    rendered: Arc<Mutex<Vec<Transform>>>,
    fail_next: Arc<AtomicUsize>,
    gate: Option<Sender<()>>,
}

#[derive(Debug)]
pub struct MockDocument {
    page_count: usize,
}

#[derive(Debug)]
pub struct MockPage {
    pub number: usize,
}

impl MockRenderer {
    pub const COLOR: [u8; 4] = [200, 180, 40, 255];

    pub fn new() -> (Self, MockHandle) {
        Self::build(None)
    }

    /// Renders block until [`MockHandle::release`] is called once per render.
    pub fn gated() -> (Self, MockHandle) {
        let (tx, rx) = flume::unbounded();
        let (renderer, mut handle) = Self::build(Some(rx));
        handle.gate = Some(tx);
        (renderer, handle)
    }

    pub fn with_page_count(mut self, page_count: usize) -> Self {
        self.page_count = page_count;
        self
    }

    fn build(gate: Option<Receiver<()>>) -> (Self, MockHandle) {
        let rendered = Arc::new(Mutex::new(Vec::new()));
        let fail_next = Arc::new(AtomicUsize::new(0));
        let renderer = Self {
            page_count: 3,
            rendered: Arc::clone(&rendered),
            fail_next: Arc::clone(&fail_next),
            gate,
        };
        let handle = MockHandle {
            rendered,
            fail_next,
            gate: None,
        };
        (renderer, handle)
    }
}

impl MockHandle {
    /// Transforms of every render attempt, failed ones included
    pub fn rendered(&self) -> Vec<Transform> {
        self.rendered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn render_count(&self) -> usize {
        self.rendered().len()
    }

    /// Make the next `count` renders fail
    pub fn fail_next(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Let one held render proceed
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            let _ = gate.send(());
        }
    }
}

impl DocumentRenderer for MockRenderer {
    type Document = MockDocument;
    type Page = MockPage;

    fn load(&mut self, bytes: &[u8]) -> Result<MockDocument, LoadError> {
        if bytes.is_empty() {
            return Err(LoadError::malformed("no document bytes"));
        }
        if bytes.starts_with(b"corrupt") {
            return Err(LoadError::malformed("not a document"));
        }
        Ok(MockDocument {
            page_count: self.page_count,
        })
    }

    fn page_count(&self, document: &MockDocument) -> usize {
        document.page_count
    }

    fn page(&mut self, document: &MockDocument, number: usize) -> Result<MockPage, LoadError> {
        if number >= document.page_count {
            return Err(LoadError::MissingPage {
                page: number,
                detail: format!("document has {} pages", document.page_count),
            });
        }
        Ok(MockPage { number })
    }

    fn compute_viewport(
        &self,
        _page: &MockPage,
        surface: SurfaceSize,
        transform: &Transform,
    ) -> Result<ViewportDescriptor, RenderError> {
        self.rendered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(*transform);
        ViewportDescriptor::fit_width(MOCK_PAGE_SIZE, surface, transform)
    }

    fn render(
        &mut self,
        _page: &MockPage,
        _viewport: &ViewportDescriptor,
        target: &mut Surface,
    ) -> Result<(), RenderError> {
        if let Some(gate) = &self.gate {
            gate.recv().map_err(|_| RenderError::engine("gate closed"))?;
        }

        let pending = self.fail_next.load(Ordering::SeqCst);
        if pending > 0 {
            self.fail_next.store(pending - 1, Ordering::SeqCst);
            return Err(RenderError::engine("injected failure"));
        }
        target.fill(Self::COLOR);
        Ok(())
    }
}

/// Builder for gesture scripts
#[derive(Default)]
pub struct GestureScriptBuilder {
    events: Vec<InputEvent>,
}

impl GestureScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(mut self, id: i64, x: f64, y: f64) -> Self {
        self.events.push(InputEvent::Start { id, x, y });
        self
    }

    pub fn move_to(mut self, id: i64, x: f64, y: f64) -> Self {
        self.events.push(InputEvent::Move { id, x, y });
        self
    }

    pub fn end(mut self, id: i64) -> Self {
        self.events.push(InputEvent::End { id });
        self
    }

    pub fn recenter(mut self) -> Self {
        self.events.push(InputEvent::Recenter);
        self
    }

    pub fn frame(mut self) -> Self {
        self.events.push(InputEvent::Frame);
        self
    }

    /// Add `count` frame markers
    pub fn frames(mut self, count: usize) -> Self {
        for _ in 0..count {
            self.events.push(InputEvent::Frame);
        }
        self
    }

    /// Drag one contact from `from` to `to` in `steps` moves, one frame each
    pub fn drag(mut self, id: i64, from: (f64, f64), to: (f64, f64), steps: usize) -> Self {
        self = self.start(id, from.0, from.1);
        let steps = steps.max(1);
        for step in 1..=steps {
            let t = step as f64 / steps as f64;
            self = self
                .move_to(
                    id,
                    from.0 + (to.0 - from.0) * t,
                    from.1 + (to.1 - from.1) * t,
                )
                .frame();
        }
        self.end(id)
    }

    pub fn build(self) -> Vec<InputEvent> {
        self.events
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.events).unwrap_or_default()
    }
}
