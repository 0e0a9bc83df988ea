//! Optional execution-time logging.

use std::time::Instant;
use tracing::info;

/// Timestamps are milliseconds since the logger was created. A disabled logger
/// always reports `0.0` and never logs.
#[derive(Debug, Clone, Copy)]
pub struct PerfLogger {
    origin: Option<Instant>,
}

impl PerfLogger {
    pub fn new(enabled: bool) -> Self {
        Self {
            origin: enabled.then(Instant::now),
        }
    }

    pub fn disabled() -> Self {
        Self { origin: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.origin.is_some()
    }

    pub fn now(&self) -> f64 {
        match self.origin {
            // Never return an exact zero from an enabled logger; zero means "unset".
            Some(origin) => (origin.elapsed().as_secs_f64() * 1000.0).max(f64::MIN_POSITIVE),
            None => 0.0,
        }
    }

    /// Log `t2 - t1` under `description`. Skipped when either timestamp is unset.
    pub fn log(&self, description: &str, t1: f64, t2: f64) {
        if !self.is_enabled() || t1 == 0.0 || t2 == 0.0 {
            return;
        }
        let duration_ms = t2 - t1;
        info!(metric = description, duration_ms, "{}: {} (ms)", description, duration_ms);
    }
}

impl Default for PerfLogger {
    fn default() -> Self {
        Self::disabled()
    }
}
