//! Page modules: the render-capable units the routing core loads by logical path.

pub mod handler;
pub mod loader;
pub mod registry;

pub use handler::{PageError, PageModule, RenderContext, RenderOutput};
pub use loader::PageLoader;
pub use registry::{PageRegistry, PageState};
