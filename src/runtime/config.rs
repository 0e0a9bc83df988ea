//! Runtime configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const MANIFEST_DIR_ENV: &str = "SSR_MANIFEST_DIR";
pub const HOST_ENV: &str = "SSR_HOST";
pub const PORT_ENV: &str = "SSR_PORT";
/// Set by the Lambda execution environment.
pub const LAMBDA_RUNTIME_API_ENV: &str = "AWS_LAMBDA_RUNTIME_API";

/// Configuration for the Lambda entry point and the local dev server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Directory holding the three manifest documents.
    pub manifest_dir: PathBuf,
    /// Dev server bind host.
    pub host: String,
    /// Dev server port.
    pub port: u16,
    /// Whether the dev server answers `/_health` itself.
    pub enable_health: bool,
    /// Maximum request body size in bytes (dev server only).
    pub max_body_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            manifest_dir: PathBuf::from("."),
            host: "127.0.0.1".to_string(),
            port: 3000,
            enable_health: true,
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `SSR_MANIFEST_DIR`, `SSR_HOST` and `SSR_PORT`.
    /// An unparsable port keeps the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(dir) = lookup(MANIFEST_DIR_ENV) {
            config.manifest_dir = PathBuf::from(dir);
        }
        if let Some(host) = lookup(HOST_ENV) {
            config.host = host;
        }
        if let Some(port) = lookup(PORT_ENV).and_then(|p| p.parse().ok()) {
            config.port = port;
        }
        config
    }

    pub fn manifest_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.manifest_dir = dir.into();
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// True when running inside AWS Lambda.
    pub fn in_lambda() -> bool {
        std::env::var_os(LAMBDA_RUNTIME_API_ENV).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_and_builder() {
        let config = RuntimeConfig::new().host("0.0.0.0").port(8080);
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert!(config.enable_health);
    }

    #[test]
    fn test_from_lookup() {
        let env: HashMap<&str, &str> = [
            (MANIFEST_DIR_ENV, "/var/task"),
            (PORT_ENV, "9000"),
        ]
        .into_iter()
        .collect();
        let config = RuntimeConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.manifest_dir, PathBuf::from("/var/task"));
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn test_from_lookup_bad_port() {
        let config = RuntimeConfig::from_lookup(|k| (k == PORT_ENV).then(|| "nope".to_string()));
        assert_eq!(config.port, 3000);
    }
}
