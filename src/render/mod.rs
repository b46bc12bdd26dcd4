//! Double-buffered, asynchronous page rendering

mod adapter;
mod frame_buffer;
#[cfg(feature = "pdf")]
mod mupdf_renderer;
mod render_loop;
mod request;
mod service;
mod surface;
mod worker;

pub use adapter::{DocumentRenderer, LoadError, PixelRegion, RenderError, ViewportDescriptor};
pub use frame_buffer::FrameBuffer;
#[cfg(feature = "pdf")]
pub use mupdf_renderer::{MupdfPage, MupdfRenderer};
pub use render_loop::{FrameContext, LoopState, RenderLoop, TickOutcome};
pub use request::{RenderRequest, RenderResponse, RequestId};
pub use service::{DocumentInfo, RenderCompletion, RenderService};
pub use surface::{Surface, SurfaceSize};
