use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::AppState;

/// Build the application router with all routes
pub fn build(state: Arc<AppState>, frontend_dir: &str) -> Router {
    Router::new()
        // Record routes
        .route("/api/records", get(handlers::records::list_records))
        .route("/api/records", post(handlers::records::create_record))
        .route("/api/records/search", get(handlers::records::search_records))
        .route("/api/records/:id", get(handlers::records::get_record))
        .route("/api/records/:id", put(handlers::records::update_record))
        .route("/api/records/:id", delete(handlers::records::delete_record))
        // Stats route
        .route("/api/stats", get(handlers::stats::station_stats))
        // Path routes
        .route("/api/paths/search", post(handlers::paths::search_paths))
        .route("/api/paths/commit", post(handlers::paths::commit_path))
        .route("/api/paths", get(handlers::paths::list_paths))
        .route("/api/paths/:id", put(handlers::paths::update_path))
        .route("/api/paths/:id", delete(handlers::paths::release_path))
        // Health route
        .route("/api/health", get(handlers::healthcheck))
        // Static files (frontend)
        .nest_service("/assets", ServeDir::new(format!("{}/assets", frontend_dir)))
        .fallback_service(ServeDir::new(frontend_dir).fallback(
            tower_http::services::ServeFile::new(format!("{}/index.html", frontend_dir)),
        ))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
