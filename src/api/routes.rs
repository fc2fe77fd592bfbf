//! API Routes
//!
//! Configures the Axum router: the `/_sw/` control surface plus a fallback
//! that intercepts every other request for the caching strategies.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    health_handler, message_handler, proxy_handler, stats_handler, AppState,
};

/// Creates the main router.
///
/// # Endpoints
/// - `POST /_sw/message` - Control channel (SKIP_WAITING, GET_VERSION)
/// - `GET /_sw/stats` - Cache statistics and queue depth
/// - `GET /_sw/health` - Health check endpoint
/// - everything else - intercepted and served through the caching strategies
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/_sw/message", post(message_handler))
        .route("/_sw/stats", get(stats_handler))
        .route("/_sw/health", get(health_handler))
        .fallback(proxy_handler)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
