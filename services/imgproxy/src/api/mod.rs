//! HTTP API handlers and routing.

mod image;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the router.
///
/// Every path is served by the image handler; the path only matters for
/// the bare `/` health check.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .fallback(image::serve)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
