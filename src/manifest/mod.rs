//! Build-time manifests describing pages, prerendered routes and routing rules.
//!
//! The three documents are loaded once at startup into [`Manifests`] and shared
//! read-only for the lifetime of the process.

mod build;
mod prerender;
mod routes;

pub use build::{Authentication, BuildManifest, PageTable, Pages};
pub use prerender::{DynamicPrerenderRoute, Fallback, PrerenderManifest, PrerenderRoute};
pub use routes::{HeaderEntry, HeaderRule, RedirectRule, RewriteRule, RoutesManifest};

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

pub const BUILD_MANIFEST_FILE: &str = "manifest.json";
pub const PRERENDER_MANIFEST_FILE: &str = "prerender-manifest.json";
pub const ROUTES_MANIFEST_FILE: &str = "routes-manifest.json";

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// The immutable manifest set.
#[derive(Debug, Clone, Default)]
pub struct Manifests {
    pub build: BuildManifest,
    pub prerender: PrerenderManifest,
    pub routes: RoutesManifest,
}

impl Manifests {
    pub fn new(build: BuildManifest, prerender: PrerenderManifest, routes: RoutesManifest) -> Self {
        Self {
            build,
            prerender,
            routes,
        }
    }

    /// Load `manifest.json`, `prerender-manifest.json` and `routes-manifest.json`
    /// from a directory.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let dir = dir.as_ref();
        Ok(Self {
            build: read_json(&dir.join(BUILD_MANIFEST_FILE))?,
            prerender: read_json(&dir.join(PRERENDER_MANIFEST_FILE))?,
            routes: read_json(&dir.join(ROUTES_MANIFEST_FILE))?,
        })
    }

    pub fn base_path(&self) -> &str {
        &self.routes.base_path
    }

    pub fn build_id(&self) -> &str {
        &self.build.build_id
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ManifestError> {
    let raw = std::fs::read(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&raw).map_err(|source| ManifestError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
