//! API Routes
//!
//! Configures the Axum router with all inspection endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_all_handler, clear_category_handler, delete_handler, export_handler,
    get_config_handler, get_handler, health_handler, invalidate_handler, put_config_handler,
    reset_stats_handler, set_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check endpoint
/// - `GET /stats`, `POST /stats/reset` - Per-category statistics
/// - `GET|PUT|DELETE /cache/:category/:key` - Single entry access
/// - `DELETE /cache/:category`, `DELETE /cache` - Clearing
/// - `POST /cache/:category/invalidate` - Prefix invalidation
/// - `GET /cache/:category/export` - Memory-tier snapshot
/// - `GET|PUT /config` - Active configuration
///
/// Keys containing `/` must be percent-encoded.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/stats/reset", post(reset_stats_handler))
        .route("/config", get(get_config_handler).put(put_config_handler))
        .route("/cache", delete(clear_all_handler))
        .route("/cache/:category", delete(clear_category_handler))
        .route("/cache/:category/export", get(export_handler))
        .route("/cache/:category/invalidate", post(invalidate_handler))
        .route(
            "/cache/:category/:key",
            get(get_handler).put(set_handler).delete(delete_handler),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
