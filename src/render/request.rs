//! Render request and response types

use std::sync::Arc;

use crate::viewport::Transform;

use super::adapter::{LoadError, RenderError};
use super::surface::Surface;

/// Unique identifier for worker requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Request sent to the render worker
#[derive(Debug)]
pub enum RenderRequest {
    /// Load a document, replacing the current one, and open `page`
    Load {
        id: RequestId,
        bytes: Arc<[u8]>,
        page: usize,
    },

    /// Render the open page at `transform` into `target`
    Render {
        id: RequestId,
        transform: Transform,
        target: Surface,
    },

    /// Shutdown the worker
    Shutdown,
}

/// Response from the render worker
#[derive(Debug)]
pub enum RenderResponse {
    Loaded {
        id: RequestId,
        page_count: usize,
    },

    LoadFailed {
        id: RequestId,
        error: LoadError,
    },

    /// The target surface, fully drawn
    Rendered {
        id: RequestId,
        target: Surface,
    },

    /// The target surface comes back even when rendering failed
    RenderFailed {
        id: RequestId,
        error: RenderError,
        target: Surface,
    },
}
