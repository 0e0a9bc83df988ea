//! Local development server.
//!
//! Serves the dispatch controller over plain HTTP/1 so a build can be
//! exercised without API Gateway in front of it.

use crate::dispatch::DispatchController;
use crate::http::{GatewayRequest, Method, ResponseWriter};
use crate::runtime::RuntimeConfig;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

pub struct DevServer {
    config: RuntimeConfig,
    controller: Arc<DispatchController>,
}

impl DevServer {
    pub fn new(config: RuntimeConfig, controller: Arc<DispatchController>) -> Self {
        Self { config, controller }
    }

    /// Bind to the configured address and serve until the process exits.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr: SocketAddr = self.config.bind_addr().parse()?;
        let listener = TcpListener::bind(addr).await?;
        info!("Dev server listening on http://{}", addr);
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener.
    pub async fn serve(
        self,
        listener: TcpListener,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let controller = self.controller;
        let config = Arc::new(self.config);

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);

            let controller = controller.clone();
            let config = config.clone();

            tokio::task::spawn(async move {
                let service = service_fn(move |req| {
                    let controller = controller.clone();
                    let config = config.clone();
                    async move { handle_request(req, &controller, &config, remote_addr).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Error serving connection: {:?}", err);
                }
            });
        }
    }
}

async fn handle_request(
    req: Request<Incoming>,
    controller: &DispatchController,
    config: &RuntimeConfig,
    remote_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    debug!("Handling request: {} {} from {}", req.method(), req.uri(), remote_addr);

    if config.enable_health && req.uri().path() == "/_health" {
        return Ok(plain_response(200, "OK"));
    }

    let request = match convert_request(req, config.max_body_size).await {
        Ok(request) => request,
        Err(e) => {
            warn!("Failed to convert request: {}", e);
            return Ok(plain_response(400, e.to_string()));
        }
    };

    Ok(respond(controller, &request).await)
}

async fn respond(controller: &DispatchController, request: &GatewayRequest) -> Response<Full<Bytes>> {
    let mut res = ResponseWriter::new();
    match controller.handle(request, &mut res).await {
        Ok(()) => build_response(res),
        Err(e) => {
            error!("Dispatch failed for {}: {}", request.path, e);
            plain_response(500, "Internal Server Error")
        }
    }
}

async fn convert_request(
    req: Request<Incoming>,
    max_body_size: usize,
) -> Result<GatewayRequest, Box<dyn std::error::Error + Send + Sync>> {
    let method = Method::from(req.method());
    let path = req.uri().path().to_string();
    let query = req.uri().query().unwrap_or_default().to_string();

    let mut headers = BTreeMap::new();
    for (name, value) in req.headers() {
        if let Ok(v) = value.to_str() {
            headers.insert(name.as_str().to_string(), v.to_string());
        }
    }

    let body_bytes = req.collect().await?.to_bytes();
    let body = if body_bytes.len() > max_body_size {
        return Err("Request body too large".into());
    } else if body_bytes.is_empty() {
        None
    } else {
        Some(body_bytes)
    };

    Ok(GatewayRequest {
        method,
        path,
        query,
        headers,
        body,
    })
}

fn build_response(res: ResponseWriter) -> Response<Full<Bytes>> {
    let (status, headers, cookies, body) = res.into_parts();
    let status = hyper::StatusCode::from_u16(status.0).unwrap_or_else(|_| {
        warn!(
            "Invalid status code {}, falling back to 500 Internal Server Error",
            status.0
        );
        hyper::StatusCode::INTERNAL_SERVER_ERROR
    });

    let mut builder = Response::builder().status(status);
    for (name, value) in headers {
        builder = builder.header(name, value);
    }
    for cookie in cookies {
        builder = builder.header(hyper::header::SET_COOKIE, cookie);
    }

    builder
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            warn!("Invalid response headers: {}", e);
            plain_response(500, "Internal Server Error")
        })
}

fn plain_response(status: u16, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() =
        hyper::StatusCode::from_u16(status).unwrap_or(hyper::StatusCode::INTERNAL_SERVER_ERROR);
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("text/plain"),
    );
    response
}
