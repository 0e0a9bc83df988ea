//! Page loading callback handed to the routing core.

use crate::page::handler::{PageError, PageModule};
use crate::page::registry::PageRegistry;
use crate::perf::PerfLogger;
use std::sync::{Arc, Mutex};

/// Per-request view of the page registry.
///
/// Times each load and remembers when the last one finished, which is where
/// server-side rendering starts.
pub struct PageLoader {
    registry: Arc<PageRegistry>,
    perf: PerfLogger,
    render_started: Mutex<Option<f64>>,
}

impl PageLoader {
    pub fn new(registry: Arc<PageRegistry>, perf: PerfLogger) -> Self {
        Self {
            registry,
            perf,
            render_started: Mutex::new(None),
        }
    }

    pub async fn load(&self, path: &str) -> Result<Arc<dyn PageModule>, PageError> {
        let t_before = self.perf.now();
        let page = self.registry.load(path).await?;
        let t_after = self.perf.now();
        self.perf.log("require JS execution time", t_before, t_after);

        if let Ok(mut started) = self.render_started.lock() {
            *started = Some(t_after);
        }
        Ok(page)
    }

    /// Timestamp at which the most recent page finished loading, if any page was loaded.
    pub fn render_started(&self) -> Option<f64> {
        self.render_started.lock().ok().and_then(|started| *started)
    }

    pub fn perf(&self) -> PerfLogger {
        self.perf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::handler::{RenderContext, RenderOutput};
    use async_trait::async_trait;

    struct Plain;

    #[async_trait]
    impl PageModule for Plain {
        async fn render(&self, _ctx: &RenderContext) -> Result<RenderOutput, PageError> {
            Ok(RenderOutput::html("plain"))
        }

        fn path(&self) -> &str {
            "pages/plain.js"
        }
    }

    #[tokio::test]
    async fn test_records_render_start() {
        let registry = Arc::new(PageRegistry::new());
        registry.register(Box::new(Plain)).await.unwrap();

        let loader = PageLoader::new(registry, PerfLogger::new(true));
        assert!(loader.render_started().is_none());

        loader.load("pages/plain.js").await.unwrap();
        assert!(loader.render_started().unwrap() > 0.0);
    }

    #[tokio::test]
    async fn test_disabled_perf_records_zero() {
        let registry = Arc::new(PageRegistry::new());
        registry.register(Box::new(Plain)).await.unwrap();

        let loader = PageLoader::new(registry, PerfLogger::disabled());
        loader.load("pages/plain.js").await.unwrap();
        assert_eq!(loader.render_started(), Some(0.0));
    }
}
