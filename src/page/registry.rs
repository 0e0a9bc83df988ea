//! Registry mapping logical page paths to page modules.

use crate::page::handler::{PageError, PageModule};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell, RwLock};
use tracing::{debug, error, info};

/// Lifecycle state of a registered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    /// Registered but `on_load` has not run.
    Unloaded,
    /// `on_load` is running.
    Loading,
    /// Loaded and able to render.
    Ready,
}

struct PageEntry {
    /// Module waiting for its first load. Emptied once `ready` is set.
    pending: Mutex<Option<Box<dyn PageModule>>>,
    ready: OnceCell<Arc<dyn PageModule>>,
}

impl PageEntry {
    fn state(&self) -> PageState {
        if self.ready.initialized() {
            PageState::Ready
        } else if self.pending.try_lock().is_err() {
            PageState::Loading
        } else {
            PageState::Unloaded
        }
    }
}

/// Pages are registered at startup and loaded lazily on first request.
#[derive(Default)]
pub struct PageRegistry {
    pages: RwLock<HashMap<String, Arc<PageEntry>>>,
}

impl PageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page under its own [`PageModule::path`].
    pub async fn register(&self, page: Box<dyn PageModule>) -> Result<(), PageError> {
        let path = page.path().to_string();
        let mut pages = self.pages.write().await;

        if pages.contains_key(&path) {
            return Err(PageError::AlreadyRegistered(path));
        }

        pages.insert(
            path.clone(),
            Arc::new(PageEntry {
                pending: Mutex::new(Some(page)),
                ready: OnceCell::new(),
            }),
        );
        info!("Registered page: {}", path);
        Ok(())
    }

    /// Return a render-ready handle, running `on_load` the first time.
    ///
    /// A failed `on_load` leaves the page unloaded so a later request retries it.
    pub async fn load(&self, path: &str) -> Result<Arc<dyn PageModule>, PageError> {
        let entry = self
            .pages
            .read()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| PageError::NotFound(path.to_string()))?;

        if let Some(ready) = entry.ready.get() {
            debug!("Page '{}' is already loaded", path);
            return Ok(ready.clone());
        }

        let pending = &entry.pending;
        let module = entry
            .ready
            .get_or_try_init(move || async move {
                let mut pending = pending.lock().await;
                let mut module = pending.take().ok_or_else(|| PageError::Load {
                    path: path.to_string(),
                    message: "module missing".to_string(),
                })?;
                match module.on_load().await {
                    Ok(()) => Ok(Arc::<dyn PageModule>::from(module)),
                    Err(e) => {
                        error!("Failed to load page '{}': {}", path, e);
                        *pending = Some(module);
                        Err(PageError::Load {
                            path: path.to_string(),
                            message: e.to_string(),
                        })
                    }
                }
            })
            .await?;

        info!("Loaded page: {}", path);
        Ok(module.clone())
    }

    pub async fn state(&self, path: &str) -> Option<PageState> {
        self.pages.read().await.get(path).map(|e| e.state())
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.pages.read().await.contains_key(path)
    }

    /// List all registered pages, sorted by path.
    pub async fn list(&self) -> Vec<(String, PageState)> {
        let pages = self.pages.read().await;
        let mut listed: Vec<_> = pages
            .iter()
            .map(|(path, entry)| (path.clone(), entry.state()))
            .collect();
        listed.sort_by(|a, b| a.0.cmp(&b.0));
        listed
    }
}
