//! Render service - owns the worker thread and tracks the render in flight

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use flume::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use log::{debug, error, info};

use super::adapter::{DocumentRenderer, LoadError, RenderError};
use super::request::{RenderRequest, RenderResponse, RequestId};
use super::surface::{Surface, SurfaceSize};
use super::worker::render_worker;
use crate::viewport::Transform;

/// Outcome of a finished render
#[derive(Debug)]
pub enum RenderCompletion {
    Rendered {
        id: RequestId,
        target: Surface,
    },
    Failed {
        id: RequestId,
        error: RenderError,
        target: Surface,
    },
}

/// Document metadata reported on load
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DocumentInfo {
    pub page_count: usize,
    pub page: usize,
}

/// Sends work to the render worker; at most one render is in flight.
pub struct RenderService {
    request_tx: Sender<RenderRequest>,
    response_rx: Receiver<RenderResponse>,
    next_request_id: u64,
    in_flight: Option<RequestId>,
    /// Render responses that arrived while waiting for a load
    backlog: VecDeque<RenderResponse>,
    doc_info: Option<DocumentInfo>,
}

impl RenderService {
    /// Spawn the worker thread hosting `renderer`.
    pub fn spawn<R>(renderer: R) -> Self
    where
        R: DocumentRenderer + Send + 'static,
    {
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();

        // A failed spawn drops both channel ends; every request then
        // reports the worker as gone.
        if let Err(e) = std::thread::Builder::new()
            .name("pagepinch-render".into())
            .spawn(move || render_worker(renderer, request_rx, response_tx))
        {
            error!("Failed to spawn render worker: {e}");
        }

        Self {
            request_tx,
            response_rx,
            next_request_id: 1,
            in_flight: None,
            backlog: VecDeque::new(),
            doc_info: None,
        }
    }

    #[must_use]
    pub fn document_info(&self) -> Option<DocumentInfo> {
        self.doc_info
    }

    #[must_use]
    pub fn in_flight(&self) -> Option<RequestId> {
        self.in_flight
    }

    /// Load a document and open `page`, blocking until the worker answers.
    pub fn load_blocking(&mut self, bytes: Arc<[u8]>, page: usize) -> Result<DocumentInfo, LoadError> {
        let id = self.next_id();
        info!("Loading document ({} bytes), page {page}", bytes.len());
        self.request_tx
            .send(RenderRequest::Load { id, bytes, page })
            .map_err(|_| LoadError::WorkerGone)?;

        loop {
            let response = self.response_rx.recv().map_err(|_| LoadError::WorkerGone)?;
            match response {
                RenderResponse::Loaded {
                    id: reply,
                    page_count,
                } if reply == id => {
                    let info = DocumentInfo { page_count, page };
                    self.doc_info = Some(info);
                    return Ok(info);
                }
                RenderResponse::LoadFailed { id: reply, error } if reply == id => {
                    return Err(error);
                }
                other => self.backlog.push_back(other),
            }
        }
    }

    /// Start rendering `transform` into `target`.
    ///
    /// While another render is in flight the target is handed straight back.
    pub fn dispatch(&mut self, transform: Transform, target: Surface) -> Result<RequestId, Surface> {
        if self.in_flight.is_some() {
            return Err(target);
        }

        let id = self.next_id();
        let request = RenderRequest::Render {
            id,
            transform,
            target,
        };
        if let Err(flume::SendError(RenderRequest::Render { target, .. })) =
            self.request_tx.send(request)
        {
            return Err(target);
        }
        self.in_flight = Some(id);
        debug!("Dispatched render {id:?}");
        Ok(id)
    }

    /// Collect a finished render without blocking.
    pub fn poll(&mut self) -> Option<RenderCompletion> {
        while let Some(response) = self.backlog.pop_front() {
            if let Some(done) = self.complete(response) {
                return Some(done);
            }
        }
        loop {
            match self.response_rx.try_recv() {
                Ok(response) => {
                    if let Some(done) = self.complete(response) {
                        return Some(done);
                    }
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => return self.abandon_in_flight(),
            }
        }
    }

    /// Block for at most `timeout` waiting for the render in flight.
    pub fn wait(&mut self, timeout: Duration) -> Option<RenderCompletion> {
        if let Some(done) = self.poll() {
            return Some(done);
        }
        self.in_flight?;
        let deadline = std::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            match self.response_rx.recv_timeout(remaining) {
                Ok(response) => {
                    if let Some(done) = self.complete(response) {
                        return Some(done);
                    }
                }
                Err(RecvTimeoutError::Timeout) => return None,
                Err(RecvTimeoutError::Disconnected) => return self.abandon_in_flight(),
            }
        }
    }

    fn complete(&mut self, response: RenderResponse) -> Option<RenderCompletion> {
        let done = match response {
            RenderResponse::Rendered { id, target } => RenderCompletion::Rendered { id, target },
            RenderResponse::RenderFailed { id, error, target } => {
                RenderCompletion::Failed { id, error, target }
            }
            // Stale load replies are dropped
            RenderResponse::Loaded { .. } | RenderResponse::LoadFailed { .. } => return None,
        };
        let id = match &done {
            RenderCompletion::Rendered { id, .. } | RenderCompletion::Failed { id, .. } => *id,
        };
        if self.in_flight == Some(id) {
            self.in_flight = None;
        }
        Some(done)
    }

    /// The worker died with a render in flight; its target is gone, so
    /// report a failure with a fresh surface in its place.
    fn abandon_in_flight(&mut self) -> Option<RenderCompletion> {
        let id = self.in_flight.take()?;
        Some(RenderCompletion::Failed {
            id,
            error: RenderError::WorkerGone,
            target: Surface::new(SurfaceSize::default()),
        })
    }

    /// Ask the worker to exit
    pub fn shutdown(&self) {
        let _ = self.request_tx.send(RenderRequest::Shutdown);
    }

    fn next_id(&mut self) -> RequestId {
        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        id
    }
}

impl Drop for RenderService {
    fn drop(&mut self) {
        self.shutdown();
    }
}
