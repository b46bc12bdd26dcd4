//! Render worker - hosts the document renderer on its own thread

use flume::{Receiver, Sender};
use log::{debug, error, warn};

use super::adapter::{DocumentRenderer, LoadError, RenderError};
use super::request::{RenderRequest, RenderResponse};
use super::surface::Surface;
use crate::viewport::Transform;

struct OpenDocument<R: DocumentRenderer> {
    // Kept alive for as long as the page is in use
    _document: R::Document,
    page: R::Page,
}

/// Main worker function - runs in a dedicated thread
#[expect(
    clippy::needless_pass_by_value,
    reason = "Values moved into thread, need ownership"
)]
pub fn render_worker<R: DocumentRenderer>(
    mut renderer: R,
    requests: Receiver<RenderRequest>,
    responses: Sender<RenderResponse>,
) {
    let mut open: Option<OpenDocument<R>> = None;

    for request in requests {
        let response = match request {
            RenderRequest::Load { id, bytes, page } => {
                // The previous document stays open if the new one fails
                match load_document(&mut renderer, &bytes, page) {
                    Ok((document, page_count)) => {
                        open = Some(document);
                        RenderResponse::Loaded { id, page_count }
                    }
                    Err(error) => {
                        error!("Failed to load document: {error}");
                        RenderResponse::LoadFailed { id, error }
                    }
                }
            }

            RenderRequest::Render {
                id,
                transform,
                mut target,
            } => match render_into(&mut renderer, open.as_ref(), &transform, &mut target) {
                Ok(()) => RenderResponse::Rendered { id, target },
                Err(error) => RenderResponse::RenderFailed { id, error, target },
            },

            RenderRequest::Shutdown => break,
        };

        if responses.send(response).is_err() {
            warn!("Render service went away, stopping worker");
            break;
        }
    }

    debug!("Render worker exiting");
}

fn load_document<R: DocumentRenderer>(
    renderer: &mut R,
    bytes: &[u8],
    page: usize,
) -> Result<(OpenDocument<R>, usize), LoadError> {
    let document = renderer.load(bytes)?;
    let page_count = renderer.page_count(&document);
    let page = renderer.page(&document, page)?;
    Ok((
        OpenDocument {
            _document: document,
            page,
        },
        page_count,
    ))
}

fn render_into<R: DocumentRenderer>(
    renderer: &mut R,
    open: Option<&OpenDocument<R>>,
    transform: &Transform,
    target: &mut Surface,
) -> Result<(), RenderError> {
    let open = open.ok_or(RenderError::NoDocument)?;
    let viewport = renderer.compute_viewport(&open.page, target.size(), transform)?;
    renderer.render(&open.page, &viewport, target)
}
