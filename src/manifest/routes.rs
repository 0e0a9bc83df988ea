//! Routes manifest: base path plus user-configured redirects, rewrites and headers.

use crate::http::StatusCode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectRule {
    pub source: String,
    pub destination: String,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub permanent: bool,
}

impl RedirectRule {
    /// 308 for permanent redirects, 307 otherwise, unless a code is given.
    pub fn status(&self) -> u16 {
        match self.status_code {
            Some(code) => code,
            None if self.permanent => StatusCode::PERMANENT_REDIRECT.0,
            None => StatusCode::TEMPORARY_REDIRECT.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteRule {
    pub source: String,
    pub destination: String,
}

impl RewriteRule {
    pub fn is_external(&self) -> bool {
        self.destination.starts_with("http://") || self.destination.starts_with("https://")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderEntry {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderRule {
    pub source: String,
    pub headers: Vec<HeaderEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutesManifest {
    #[serde(default)]
    pub base_path: String,
    #[serde(default)]
    pub redirects: Vec<RedirectRule>,
    #[serde(default)]
    pub rewrites: Vec<RewriteRule>,
    #[serde(default)]
    pub headers: Vec<HeaderRule>,
}

impl RoutesManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn with_redirect(
        mut self,
        source: impl Into<String>,
        destination: impl Into<String>,
        permanent: bool,
    ) -> Self {
        self.redirects.push(RedirectRule {
            source: source.into(),
            destination: destination.into(),
            status_code: None,
            permanent,
        });
        self
    }

    pub fn with_rewrite(mut self, source: impl Into<String>, destination: impl Into<String>) -> Self {
        self.rewrites.push(RewriteRule {
            source: source.into(),
            destination: destination.into(),
        });
        self
    }

    pub fn with_header(
        mut self,
        source: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.headers.push(HeaderRule {
            source: source.into(),
            headers: vec![HeaderEntry {
                key: key.into(),
                value: value.into(),
            }],
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_status() {
        let manifest = RoutesManifest::new()
            .with_redirect("/old", "/new", true)
            .with_redirect("/tmp", "/new", false);
        assert_eq!(manifest.redirects[0].status(), 308);
        assert_eq!(manifest.redirects[1].status(), 307);

        let explicit: RedirectRule = serde_json::from_str(
            r#"{ "source": "/a", "destination": "/b", "statusCode": 301 }"#,
        )
        .unwrap();
        assert_eq!(explicit.status(), 301);
    }

    #[test]
    fn test_rewrite_is_external() {
        let manifest = RoutesManifest::new()
            .with_rewrite("/docs/:path*", "https://docs.example.com/:path*")
            .with_rewrite("/a", "/b");
        assert!(manifest.rewrites[0].is_external());
        assert!(!manifest.rewrites[1].is_external());
    }
}
