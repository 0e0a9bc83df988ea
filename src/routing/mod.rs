//! Routing: deciding how each request is fulfilled.

pub mod resolver;
pub mod matcher;
pub mod route;
pub mod router;

pub use resolver::{RoutingCore, RoutingError};
pub use matcher::RoutePattern;
pub use route::{
    ExternalRoute, FallbackRoute, PublicFileRoute, RenderOpts, Route, StaticRoute,
    NOT_FOUND_FILE,
};
pub use router::ManifestRouter;
