//! Page module trait and render types.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;

/// Everything a page needs to render one request.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    /// Request path with the base path removed.
    pub path: String,
    /// Route pattern that matched, e.g. `/posts/[id]`.
    pub route: String,
    /// Values captured by dynamic segments.
    pub params: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    /// True for `/_next/data/...json` requests.
    pub is_data: bool,
}

impl RenderContext {
    pub fn new(path: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            route: route.into(),
            ..Default::default()
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// Result of rendering a page: the HTML document and the props it was built from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderOutput {
    pub html: String,
    pub page_data: serde_json::Value,
    pub status: Option<u16>,
}

impl RenderOutput {
    pub fn html(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            page_data: serde_json::Value::Null,
            status: None,
        }
    }

    pub fn with_page_data<T: Serialize>(mut self, data: &T) -> Result<Self, PageError> {
        self.page_data = serde_json::to_value(data)?;
        Ok(self)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Page data serialized as the JSON body of a data request.
    pub fn page_data_json(&self) -> String {
        self.page_data.to_string()
    }
}

/// A render-capable page registered under its logical path (e.g. `pages/about.js`).
#[async_trait]
pub trait PageModule: Send + Sync {
    /// Called once before the first render.
    async fn on_load(&mut self) -> Result<(), PageError> {
        Ok(())
    }

    async fn render(&self, ctx: &RenderContext) -> Result<RenderOutput, PageError>;

    /// Logical path this page is registered under.
    fn path(&self) -> &str;
}

#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("page '{0}' is not registered")]
    NotFound(String),
    #[error("page '{0}' is already registered")]
    AlreadyRegistered(String),
    #[error("page '{path}' failed to load: {message}")]
    Load { path: String, message: String },
    #[error("render failed: {0}")]
    Render(String),
    #[error("invalid page data: {0}")]
    Data(#[from] serde_json::Error),
}

impl PageError {
    pub fn render(message: impl Into<String>) -> Self {
        PageError::Render(message.into())
    }
}
