pub mod health;
pub mod jobs;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::ws;

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Build the full application router.
///
/// ```text
/// /health                          GET   health check
/// /ws                              GET   event stream (WebSocket)
/// /api/jobs                        GET   list jobs, POST create (multipart)
/// /api/jobs/{id}                   GET   job snapshot
/// /api/jobs/{id}/results           GET   tracking results
/// /api/jobs/{id}/export            GET   results as CSV
/// /api/jobs/{id}/control           POST  pause | resume | cancel
/// ```
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(jobs::router())
        .route("/ws", get(ws::ws_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
