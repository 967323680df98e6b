//! Application state shared across request handlers.

use std::sync::Arc;

use imgcache::Resolver;

use crate::metrics::MetricsSink;

/// Shared application state.
///
/// This is passed to all request handlers via Axum's state extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    resolver: Arc<Resolver>,
    metrics: Arc<dyn MetricsSink>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(resolver: Resolver, metrics: Arc<dyn MetricsSink>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                resolver: Arc::new(resolver),
                metrics,
            }),
        }
    }

    /// Get a handle to the resolver.
    pub fn resolver(&self) -> Arc<Resolver> {
        Arc::clone(&self.inner.resolver)
    }

    /// Get a reference to the metrics sink.
    pub fn metrics(&self) -> &dyn MetricsSink {
        self.inner.metrics.as_ref()
    }
}
