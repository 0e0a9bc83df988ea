//! API Gateway (HTTP API, payload format 2.0) event adaptation.

use crate::http::{GatewayRequest, Method, ResponseWriter};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inbound API Gateway v2 event. Only the fields this crate reads are modelled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGatewayEvent {
    #[serde(default)]
    pub raw_path: String,
    #[serde(default)]
    pub raw_query_string: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub cookies: Vec<String>,
    #[serde(default)]
    pub request_context: RequestContext,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub http: HttpContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpContext {
    pub method: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub source_ip: String,
}

impl Default for HttpContext {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            path: String::new(),
            source_ip: String::new(),
        }
    }
}

/// Outbound API Gateway v2 response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGatewayResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cookies: Vec<String>,
    pub body: String,
    pub is_base64_encoded: bool,
}

impl ApiGatewayResponse {
    /// Decode the body back into bytes.
    pub fn body_bytes(&self) -> Vec<u8> {
        if self.is_base64_encoded {
            STANDARD.decode(&self.body).unwrap_or_default()
        } else {
            self.body.clone().into_bytes()
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CompatError {
    #[error("request body is not valid base64: {0}")]
    InvalidBody(#[from] base64::DecodeError),
}

/// Turn an event into a request plus a fresh response accumulator.
pub fn adapt(event: ApiGatewayEvent) -> Result<(GatewayRequest, ResponseWriter), CompatError> {
    let path = if event.raw_path.is_empty() {
        match event.request_context.http.path.as_str() {
            "" => "/".to_string(),
            p => p.to_string(),
        }
    } else {
        event.raw_path
    };

    let mut headers: BTreeMap<String, String> = event
        .headers
        .into_iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), v))
        .collect();
    if !event.cookies.is_empty() {
        headers.insert("cookie".to_string(), event.cookies.join("; "));
    }

    let body = match event.body {
        Some(body) if event.is_base64_encoded => Some(STANDARD.decode(body)?.into()),
        Some(body) => Some(body.into()),
        None => None,
    };

    let request = GatewayRequest {
        method: Method::from(event.request_context.http.method.as_str()),
        path,
        query: event.raw_query_string,
        headers,
        body,
    };
    Ok((request, ResponseWriter::new()))
}

/// Convert the accumulated response into the platform response shape.
pub fn finish(response: ResponseWriter) -> ApiGatewayResponse {
    let (status, headers, cookies, body) = response.into_parts();
    let textual = headers
        .get("content-type")
        .map(|ct| is_textual(ct))
        .unwrap_or(true);

    let (body, is_base64_encoded) = match (textual, std::str::from_utf8(&body)) {
        (true, Ok(text)) => (text.to_string(), false),
        _ => (STANDARD.encode(&body), true),
    };

    ApiGatewayResponse {
        status_code: status.0,
        headers,
        cookies,
        body,
        is_base64_encoded,
    }
}

fn is_textual(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    ct.starts_with("text/")
        || ct.contains("json")
        || ct.contains("javascript")
        || ct.contains("xml")
}
