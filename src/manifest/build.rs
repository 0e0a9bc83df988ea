//! Build manifest: build id, bucket location and the page tables.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Route → file tables for one kind of page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageTable {
    #[serde(default)]
    pub dynamic: BTreeMap<String, String>,
    #[serde(default)]
    pub non_dynamic: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pages {
    /// Pages rendered on every request, keyed by route, valued by page module path.
    #[serde(default)]
    pub ssr: PageTable,
    /// Pre-rendered HTML pages, keyed by route, valued by `pages/...html`.
    #[serde(default)]
    pub html: PageTable,
}

/// Credentials for HTTP basic auth in front of every route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authentication {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildManifest {
    pub build_id: String,
    #[serde(default)]
    pub bucket_name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub log_lambda_execution_times: bool,
    #[serde(default)]
    pub trailing_slash: bool,
    #[serde(default)]
    pub authentication: Option<Authentication>,
    /// Request path → key under the `public` namespace.
    #[serde(default)]
    pub public_files: BTreeMap<String, String>,
    #[serde(default)]
    pub pages: Pages,
}

impl BuildManifest {
    pub fn new(build_id: impl Into<String>, bucket_name: impl Into<String>) -> Self {
        Self {
            build_id: build_id.into(),
            bucket_name: bucket_name.into(),
            ..Default::default()
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_execution_times(mut self, enabled: bool) -> Self {
        self.log_lambda_execution_times = enabled;
        self
    }

    pub fn with_trailing_slash(mut self, trailing_slash: bool) -> Self {
        self.trailing_slash = trailing_slash;
        self
    }

    pub fn with_authentication(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.authentication = Some(Authentication {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    pub fn with_public_file(mut self, path: impl Into<String>, key: impl Into<String>) -> Self {
        self.public_files.insert(path.into(), key.into());
        self
    }

    /// Register an SSR page. Routes containing `[` are treated as dynamic.
    pub fn with_ssr_page(mut self, route: impl Into<String>, module: impl Into<String>) -> Self {
        let route = route.into();
        let table = if route.contains('[') {
            &mut self.pages.ssr.dynamic
        } else {
            &mut self.pages.ssr.non_dynamic
        };
        table.insert(route, module.into());
        self
    }

    /// Register a pre-rendered HTML page. Routes containing `[` are treated as dynamic.
    pub fn with_html_page(mut self, route: impl Into<String>, file: impl Into<String>) -> Self {
        let route = route.into();
        let table = if route.contains('[') {
            &mut self.pages.html.dynamic
        } else {
            &mut self.pages.html.non_dynamic
        };
        table.insert(route, file.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_camel_case() {
        let json = r#"{
            "buildId": "b1",
            "bucketName": "assets",
            "region": "eu-west-1",
            "logLambdaExecutionTimes": true,
            "publicFiles": { "/favicon.ico": "favicon.ico" },
            "pages": {
                "ssr": { "dynamic": { "/posts/[id]": "pages/posts/[id].js" }, "nonDynamic": {} },
                "html": { "nonDynamic": { "/about": "pages/about.html" } }
            }
        }"#;
        let manifest: BuildManifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.build_id, "b1");
        assert!(manifest.log_lambda_execution_times);
        assert!(!manifest.trailing_slash);
        assert!(manifest.authentication.is_none());
        assert_eq!(
            manifest.pages.ssr.dynamic.get("/posts/[id]").map(String::as_str),
            Some("pages/posts/[id].js")
        );
        assert!(manifest.pages.html.dynamic.is_empty());
    }

    #[test]
    fn test_builder_splits_dynamic_routes() {
        let manifest = BuildManifest::new("b1", "bucket")
            .with_ssr_page("/posts/[id]", "pages/posts/[id].js")
            .with_ssr_page("/account", "pages/account.js")
            .with_html_page("/about", "pages/about.html");
        assert_eq!(manifest.pages.ssr.dynamic.len(), 1);
        assert_eq!(manifest.pages.ssr.non_dynamic.len(), 1);
        assert_eq!(manifest.pages.html.non_dynamic.len(), 1);
    }
}
