//! # ssr-lambda - server-side rendering behind API Gateway
//!
//! Serves a statically exported and server-rendered site from a single AWS
//! Lambda. Every request goes through the same dispatch procedure:
//!
//! ```text
//! API Gateway event
//!        │
//!        ▼
//! ┌──────────────────────┐   route    ┌──────────────────────────────┐
//! │  DispatchController  │ ─────────▶ │  RoutingCore (manifests)     │
//! └──────────────────────┘            └──────────────────────────────┘
//!        │  External ─────────▶ ExternalRewriter (reqwest)
//!        │  PublicFile/Static ─▶ StorageFetcher (S3)
//!        │  store miss ───────▶ RoutingCore::resolve_fallback (once)
//!        ▼
//! API Gateway response
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ssr_lambda::prelude::*;
//! use std::sync::Arc;
//!
//! #[page(path = "pages/index.js")]
//! async fn index(_ctx: &RenderContext) -> Result<RenderOutput, PageError> {
//!     Ok(RenderOutput::html("<h1>Hello</h1>"))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let manifests = Manifests::load_dir(".")?;
//!     let pages = PageRegistry::new();
//!     pages.register(Box::new(IndexPage::new())).await?;
//!
//!     let controller = Arc::new(DispatchController::new(Arc::new(manifests), Arc::new(pages)));
//!     ssr_lambda::runtime::lambda::run(controller).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Page lifecycle
//!
//! Pages are registered under their logical path (`pages/about.js`). The
//! first request that needs a page runs its `on_load` hook; later requests
//! reuse the loaded instance.

// Lets `#[page]` expansions resolve `::ssr_lambda` inside this crate too.
extern crate self as ssr_lambda;

pub mod dispatch;
pub mod http;
pub mod manifest;
pub mod page;
pub mod perf;
pub mod proxy;
pub mod routing;
pub mod runtime;
pub mod storage;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::dispatch::{DispatchController, DispatchError};
    pub use crate::http::{GatewayRequest, ResponseWriter, StatusCode};
    pub use crate::manifest::Manifests;
    pub use crate::page::{PageError, PageModule, PageRegistry, RenderContext, RenderOutput};
    pub use crate::runtime::{DevServer, RuntimeConfig};
    pub use async_trait::async_trait;
    pub use ssr_lambda_macro::page;
}

pub use dispatch::{DispatchController, DispatchError};
pub use manifest::Manifests;
pub use page::{PageModule, PageRegistry};
