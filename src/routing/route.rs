//! Routing decisions handed from the routing core to the dispatcher.

use crate::http::StatusCode;
use serde::{Deserialize, Serialize};

/// Key of the pre-rendered not-found page.
pub const NOT_FOUND_FILE: &str = "pages/404.html";

/// Proxy the request to another origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalRoute {
    /// Absolute target URL.
    pub path: String,
}

/// Serve a file from the `public` namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicFileRoute {
    /// Key relative to the namespace, with a leading `/`.
    pub file: String,
}

/// Serve a pre-rendered page (`pages/...html`) or a data file (`/_next/data/...json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticRoute {
    pub file: String,
    pub is_data: bool,
}

impl StaticRoute {
    pub fn page(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            is_data: false,
        }
    }

    pub fn data(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            is_data: true,
        }
    }

    pub fn not_found() -> Self {
        Self::page(NOT_FOUND_FILE)
    }

    /// Status forced by the file name, if any.
    pub fn status_override(&self) -> Option<u16> {
        if self.file.ends_with("/404.html") {
            Some(StatusCode::NOT_FOUND.0)
        } else if self.file.ends_with("/500.html") {
            Some(StatusCode::INTERNAL_SERVER_ERROR.0)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Route {
    External(ExternalRoute),
    PublicFile(PublicFileRoute),
    Static(StaticRoute),
}

impl Route {
    pub fn external(path: impl Into<String>) -> Self {
        Route::External(ExternalRoute { path: path.into() })
    }

    pub fn public_file(file: impl Into<String>) -> Self {
        Route::PublicFile(PublicFileRoute { file: file.into() })
    }

    pub fn static_page(file: impl Into<String>) -> Self {
        Route::Static(StaticRoute::page(file))
    }

    pub fn static_data(file: impl Into<String>) -> Self {
        Route::Static(StaticRoute::data(file))
    }
}

/// Options a render produced besides the HTML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOpts {
    pub page_data: serde_json::Value,
}

/// Second-stage decision after the primary route could not be served.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackRoute {
    /// The page was rendered on demand. `route.is_data` picks JSON or HTML.
    Render {
        html: String,
        render_opts: RenderOpts,
        route: StaticRoute,
    },
    /// Serve this pre-rendered page instead, typically an error page.
    Static(StaticRoute),
}
