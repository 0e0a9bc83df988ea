//! The routing core seam: primary and fallback resolution.

use crate::http::{GatewayRequest, ResponseError, ResponseWriter};
use crate::manifest::Manifests;
use crate::page::{PageError, PageLoader};
use crate::routing::route::{FallbackRoute, Route};
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error(transparent)]
    Page(#[from] PageError),
    #[error(transparent)]
    Response(#[from] ResponseError),
}

/// Decides how a request is fulfilled.
///
/// Both methods may write to and end `res` themselves (redirects, renders,
/// auth challenges). They signal that by returning `Ok(None)`, after which the
/// caller must not touch the response again.
#[async_trait]
pub trait RoutingCore: Send + Sync {
    async fn resolve_primary(
        &self,
        request: &GatewayRequest,
        res: &mut ResponseWriter,
        manifests: &Manifests,
        loader: &PageLoader,
    ) -> Result<Option<Route>, RoutingError>;

    /// Called at most once per request, after `route` could not be served.
    async fn resolve_fallback(
        &self,
        request: &GatewayRequest,
        res: &mut ResponseWriter,
        route: &Route,
        manifests: &Manifests,
        loader: &PageLoader,
    ) -> Result<Option<FallbackRoute>, RoutingError>;
}
