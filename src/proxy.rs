//! External rewrites: forward the request to another origin and relay its response.

use crate::http::{GatewayRequest, ResponseError, ResponseWriter};
use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

/// Headers that describe a single connection and must not be forwarded.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("invalid rewrite target '{0}'")]
    InvalidTarget(String),
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
    #[error(transparent)]
    Response(#[from] ResponseError),
}

#[async_trait]
pub trait ExternalRewriter: Send + Sync {
    /// Proxy `request` to `target`, writing the upstream response onto `res` and
    /// ending it.
    async fn proxy(
        &self,
        target: &str,
        request: &GatewayRequest,
        res: &mut ResponseWriter,
        body: Option<Bytes>,
    ) -> Result<(), ProxyError>;
}

/// [`ExternalRewriter`] backed by a shared `reqwest` client.
#[derive(Clone, Default)]
pub struct HttpRewriter {
    client: reqwest::Client,
}

impl HttpRewriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn forwardable_request_header(name: &str) -> bool {
    name != "host" && name != "content-length" && !HOP_BY_HOP.contains(&name)
}

fn forwardable_response_header(name: &str) -> bool {
    name != "content-length" && name != "content-encoding" && !HOP_BY_HOP.contains(&name)
}

#[async_trait]
impl ExternalRewriter for HttpRewriter {
    async fn proxy(
        &self,
        target: &str,
        request: &GatewayRequest,
        res: &mut ResponseWriter,
        body: Option<Bytes>,
    ) -> Result<(), ProxyError> {
        let url = reqwest::Url::parse(target)
            .map_err(|_| ProxyError::InvalidTarget(target.to_string()))?;
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|_| ProxyError::InvalidTarget(target.to_string()))?;

        debug!(method = %method, target = %url, "Proxying external rewrite");

        let mut upstream = self.client.request(method, url);
        for (name, value) in &request.headers {
            if forwardable_request_header(name) {
                upstream = upstream.header(name.as_str(), value.as_str());
            }
        }
        if let Some(body) = body {
            upstream = upstream.body(body);
        }

        let response = upstream.send().await?;

        res.set_status(response.status().as_u16());
        for (name, value) in response.headers() {
            if !forwardable_response_header(name.as_str()) {
                continue;
            }
            if let Ok(value) = value.to_str() {
                res.set_header(name.as_str(), value);
            }
        }
        let bytes = response.bytes().await?;
        res.end_with(&bytes)?;
        Ok(())
    }
}
