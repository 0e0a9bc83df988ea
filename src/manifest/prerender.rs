//! Prerender manifest: statically generated routes and their fallbacks.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// A concrete prerendered route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrerenderRoute {
    #[serde(default)]
    pub initial_revalidate_seconds: Option<u64>,
    #[serde(default)]
    pub src_route: Option<String>,
    #[serde(default)]
    pub data_route: String,
}

/// What to serve when a dynamic SSG path was not generated at build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fallback {
    /// `fallback: false` → the path is a 404.
    Disabled,
    /// `fallback: null` → render on demand (blocking).
    Blocking,
    /// `fallback: "/x/[id].html"` → serve this shell page.
    Page(String),
}

impl Serialize for Fallback {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Fallback::Disabled => serializer.serialize_bool(false),
            Fallback::Blocking => serializer.serialize_none(),
            Fallback::Page(file) => serializer.serialize_str(file),
        }
    }
}

impl<'de> Deserialize<'de> for Fallback {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Null => Ok(Fallback::Blocking),
            serde_json::Value::Bool(false) => Ok(Fallback::Disabled),
            serde_json::Value::String(file) => Ok(Fallback::Page(file)),
            other => Err(serde::de::Error::custom(format!(
                "invalid fallback value: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicPrerenderRoute {
    pub fallback: Fallback,
    #[serde(default)]
    pub data_route: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrerenderManifest {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub routes: BTreeMap<String, PrerenderRoute>,
    #[serde(default)]
    pub dynamic_routes: BTreeMap<String, DynamicPrerenderRoute>,
}

impl PrerenderManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.routes.insert(route.into(), PrerenderRoute::default());
        self
    }

    pub fn with_dynamic_route(mut self, pattern: impl Into<String>, fallback: Fallback) -> Self {
        self.dynamic_routes.insert(
            pattern.into(),
            DynamicPrerenderRoute {
                fallback,
                data_route: String::new(),
            },
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_variants() {
        let json = r#"{
            "version": 3,
            "routes": { "/blog/first": { "initialRevalidateSeconds": 60, "srcRoute": "/blog/[slug]", "dataRoute": "/_next/data/b1/blog/first.json" } },
            "dynamicRoutes": {
                "/blog/[slug]": { "fallback": "/blog/[slug].html", "dataRoute": "" },
                "/docs/[page]": { "fallback": null },
                "/shop/[item]": { "fallback": false }
            }
        }"#;
        let manifest: PrerenderManifest = serde_json::from_str(json).unwrap();
        assert_eq!(
            manifest.routes["/blog/first"].initial_revalidate_seconds,
            Some(60)
        );
        assert_eq!(
            manifest.dynamic_routes["/blog/[slug]"].fallback,
            Fallback::Page("/blog/[slug].html".to_string())
        );
        assert_eq!(manifest.dynamic_routes["/docs/[page]"].fallback, Fallback::Blocking);
        assert_eq!(manifest.dynamic_routes["/shop/[item]"].fallback, Fallback::Disabled);
    }

    #[test]
    fn test_fallback_rejects_true() {
        let result: Result<DynamicPrerenderRoute, _> =
            serde_json::from_str(r#"{ "fallback": true }"#);
        assert!(result.is_err());
    }
}
