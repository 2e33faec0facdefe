//! Per-daemon runtime state shared by the daemon's context and its tasks.

use std::sync::{Arc, PoisonError, RwLock};

use crate::error::TaskError;
use crate::policies::RateLimiter;
use crate::stats::Metric;

/// Callback invoked once for every failed general task of a daemon.
pub type PanicHandler = Arc<dyn Fn(&TaskError) + Send + Sync>;

/// Identity and controls of a registered daemon.
pub(crate) struct Owner {
    name: Arc<str>,
    metric: Arc<Metric>,
    panic_handler: RwLock<Option<PanicHandler>>,
    limiter: RwLock<Option<Arc<RateLimiter>>>,
}

impl Owner {
    pub(crate) fn new(name: Arc<str>, metric: Arc<Metric>) -> Self {
        Self {
            name,
            metric,
            panic_handler: RwLock::new(None),
            limiter: RwLock::new(None),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn metric(&self) -> &Arc<Metric> {
        &self.metric
    }

    pub(crate) fn panic_handler(&self) -> Option<PanicHandler> {
        self.panic_handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_panic_handler(&self, handler: PanicHandler) {
        *self
            .panic_handler
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(handler);
    }

    pub(crate) fn limiter(&self) -> Option<Arc<RateLimiter>> {
        self.limiter
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_limiter(&self, limiter: Arc<RateLimiter>) {
        *self.limiter.write().unwrap_or_else(PoisonError::into_inner) = Some(limiter);
    }
}
