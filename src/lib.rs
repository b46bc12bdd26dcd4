// Export modules for use in tests
pub mod event_source;
pub mod panic_handler;
pub mod render;
pub mod settings;
pub mod source_store;
pub mod viewer;
pub mod viewport;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use viewer::{Viewer, ViewerConfig};
