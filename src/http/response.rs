//! Mutable response accumulator shared by the routing core and the dispatcher.

use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCode(pub u16);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);
    pub const PERMANENT_REDIRECT: StatusCode = StatusCode(308);
    pub const TEMPORARY_REDIRECT: StatusCode = StatusCode(307);
    pub const UNAUTHORIZED: StatusCode = StatusCode(401);
    pub const NOT_FOUND: StatusCode = StatusCode(404);
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);
}

impl Default for StatusCode {
    fn default() -> Self {
        StatusCode::OK
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        StatusCode(code)
    }
}

impl From<StatusCode> for u16 {
    fn from(code: StatusCode) -> Self {
        code.0
    }
}

/// Error returned when a finalized response is touched again.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResponseError {
    #[error("response already ended")]
    AlreadyEnded,
}

/// The in-flight HTTP response for a single request.
///
/// Header names are stored lowercased. `Set-Cookie` is kept as a list because
/// it is the one header that may legitimately repeat.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    status: StatusCode,
    headers: BTreeMap<String, String>,
    cookies: Vec<String>,
    body: BytesMut,
    ended: bool,
}

impl ResponseWriter {
    /// Create an empty 200 response.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: impl Into<StatusCode>) {
        self.status = status.into();
    }

    /// Set a header, replacing any previous value.
    pub fn set_header(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        let name = name.as_ref().to_ascii_lowercase();
        if name == "set-cookie" {
            self.cookies.push(value.into());
        } else {
            self.headers.insert(name, value.into());
        }
    }

    /// Get a header value (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn cookies(&self) -> &[String] {
        &self.cookies
    }

    /// Append bytes to the body.
    pub fn write(&mut self, chunk: impl AsRef<[u8]>) -> Result<(), ResponseError> {
        if self.ended {
            return Err(ResponseError::AlreadyEnded);
        }
        self.body.extend_from_slice(chunk.as_ref());
        Ok(())
    }

    /// Finalize the response. May only happen once.
    pub fn end(&mut self) -> Result<(), ResponseError> {
        if self.ended {
            return Err(ResponseError::AlreadyEnded);
        }
        self.ended = true;
        Ok(())
    }

    /// Write a final chunk and finalize.
    pub fn end_with(&mut self, chunk: impl AsRef<[u8]>) -> Result<(), ResponseError> {
        self.write(chunk)?;
        self.end()
    }

    /// Write a redirect and finalize.
    pub fn redirect(
        &mut self,
        status: impl Into<StatusCode>,
        location: impl Into<String>,
    ) -> Result<(), ResponseError> {
        self.set_status(status);
        self.set_header("location", location);
        self.set_header("refresh", "0");
        self.end()
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Get the body as text.
    pub fn text_body(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Split the writer into its parts once the request is done.
    pub fn into_parts(self) -> (StatusCode, BTreeMap<String, String>, Vec<String>, Bytes) {
        (self.status, self.headers, self.cookies, self.body.freeze())
    }
}
