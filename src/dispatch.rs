//! Dispatch controller: turns one request event into exactly one response.
//!
//! The routing core picks a route; the controller serves it from the object
//! store or an external origin. When a store read misses, the routing core is
//! asked once for a fallback, which is either a rendered page or an error page
//! that is read from the store in the same way.

use crate::http::compat::{self, ApiGatewayEvent, ApiGatewayResponse, CompatError};
use crate::http::{GatewayRequest, ResponseError, ResponseWriter};
use crate::manifest::Manifests;
use crate::page::{PageLoader, PageRegistry};
use crate::perf::PerfLogger;
use crate::proxy::{ExternalRewriter, HttpRewriter, ProxyError};
use crate::routing::{FallbackRoute, ManifestRouter, Route, RoutingCore, RoutingError, StaticRoute};
use crate::storage::{FetchOutcome, ObjectStore, S3ObjectStore, StorageFetcher};
use std::sync::Arc;
use tracing::{debug, error, info_span, Instrument};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The error page chosen as the last resort could not be read.
    #[error("failed to get error page")]
    ErrorPageUnavailable,
    #[error(transparent)]
    Request(#[from] CompatError),
    #[error(transparent)]
    Routing(#[from] RoutingError),
    #[error(transparent)]
    Proxy(#[from] ProxyError),
    #[error(transparent)]
    Response(#[from] ResponseError),
}

pub struct DispatchController {
    manifests: Arc<Manifests>,
    pages: Arc<PageRegistry>,
    routing: Arc<dyn RoutingCore>,
    fetcher: StorageFetcher,
    rewriter: Arc<dyn ExternalRewriter>,
}

impl DispatchController {
    /// Controller with the default collaborators: [`ManifestRouter`], an S3 store
    /// in the manifest's region, and [`HttpRewriter`].
    pub fn new(manifests: Arc<Manifests>, pages: Arc<PageRegistry>) -> Self {
        let store = Arc::new(S3ObjectStore::new(manifests.build.region.clone()));
        let fetcher = StorageFetcher::new(store, manifests.build.bucket_name.clone());
        Self {
            manifests,
            pages,
            routing: Arc::new(ManifestRouter::new()),
            fetcher,
            rewriter: Arc::new(HttpRewriter::new()),
        }
    }

    pub fn with_routing(mut self, routing: Arc<dyn RoutingCore>) -> Self {
        self.routing = routing;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.fetcher = StorageFetcher::new(store, self.manifests.build.bucket_name.clone());
        self
    }

    pub fn with_rewriter(mut self, rewriter: Arc<dyn ExternalRewriter>) -> Self {
        self.rewriter = rewriter;
        self
    }

    pub fn manifests(&self) -> &Manifests {
        &self.manifests
    }

    fn perf(&self) -> PerfLogger {
        PerfLogger::new(self.manifests.build.log_lambda_execution_times)
    }

    /// Handle one API Gateway event end to end.
    pub async fn handle_event(
        &self,
        event: ApiGatewayEvent,
    ) -> Result<ApiGatewayResponse, DispatchError> {
        let span = info_span!(
            "handle_event",
            request_id = %event.request_context.request_id,
            path = %event.raw_path,
        );
        async move {
            let (request, mut res) = compat::adapt(event)?;
            self.handle(&request, &mut res).await?;
            Ok(compat::finish(res))
        }
        .instrument(span)
        .await
    }

    /// [`dispatch`](Self::dispatch) timed as "handler execution time". Entry
    /// point for both the Lambda runtime and the dev server.
    pub async fn handle(
        &self,
        request: &GatewayRequest,
        res: &mut ResponseWriter,
    ) -> Result<(), DispatchError> {
        let perf = self.perf();
        let t_begin = perf.now();
        self.dispatch(request, res).await?;
        perf.log("handler execution time", t_begin, perf.now());
        Ok(())
    }

    /// Run the dispatch procedure against an already adapted request.
    ///
    /// On `Ok`, `res` holds the response to send (ended on every path except
    /// when the routing core handed back nothing without ending it). On
    /// `Err(ErrorPageUnavailable)` the response was not ended.
    pub async fn dispatch(
        &self,
        request: &GatewayRequest,
        res: &mut ResponseWriter,
    ) -> Result<(), DispatchError> {
        let perf = self.perf();
        let loader = PageLoader::new(self.pages.clone(), perf);

        let route = self
            .routing
            .resolve_primary(request, res, &self.manifests, &loader)
            .await?;
        if let Some(t_before_ssr) = loader.render_started() {
            perf.log("SSR execution time", t_before_ssr, perf.now());
        }

        let Some(route) = route else {
            debug!("Routing core handled the request");
            return Ok(());
        };

        match &route {
            Route::External(external) => {
                debug!(target = %external.path, "External rewrite");
                self.rewriter
                    .proxy(&external.path, request, res, request.body.clone())
                    .await?;
                return Ok(());
            }
            Route::PublicFile(public) => {
                let prefix = format!("{}/public", self.manifests.base_path());
                if self.fetcher.fetch(res, &public.file, &prefix).await?.is_served() {
                    res.end()?;
                    return Ok(());
                }
            }
            Route::Static(route) => {
                if self.serve_static(route, res).await?.is_served() {
                    res.end()?;
                    return Ok(());
                }
            }
        }

        debug!(route = ?route, "Primary route missed, resolving fallback");
        let fallback = self
            .routing
            .resolve_fallback(request, res, &route, &self.manifests, &loader)
            .await?;

        match fallback {
            None => Ok(()),
            Some(FallbackRoute::Render {
                html,
                render_opts,
                route,
            }) => {
                if route.is_data {
                    res.set_header("Content-Type", "application/json");
                    res.end_with(render_opts.page_data.to_string())?;
                } else {
                    res.set_header("Content-Type", "text/html");
                    res.end_with(html)?;
                }
                Ok(())
            }
            Some(FallbackRoute::Static(route)) => {
                if !self.serve_static(&route, res).await?.is_served() {
                    error!(file = %route.file, "Error page missing from storage");
                    return Err(DispatchError::ErrorPageUnavailable);
                }
                res.end()?;
                Ok(())
            }
        }
    }

    /// Storage key prefix and relative file for a static route.
    pub fn static_location<'a>(&self, route: &'a StaticRoute) -> (String, &'a str) {
        let base_path = self.manifests.base_path();
        if route.is_data {
            (base_path.to_string(), route.file.as_str())
        } else {
            (
                format!("{base_path}/static-pages/{}", self.manifests.build_id()),
                route.file.strip_prefix("pages").unwrap_or(&route.file),
            )
        }
    }

    async fn serve_static(
        &self,
        route: &StaticRoute,
        res: &mut ResponseWriter,
    ) -> Result<FetchOutcome, ResponseError> {
        if let Some(status) = route.status_override() {
            res.set_status(status);
        }
        let (prefix, file) = self.static_location(route);
        self.fetcher.fetch(res, file, &prefix).await
    }
}
