//! Portal server library logic.

pub mod api_users;
pub mod config;
pub mod middleware;

use axum::{
    extract::DefaultBodyLimit,
    routing::get,
    Extension, Json, Router,
};
use portal_db::DbPool;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
}

/// Maximum request body size (256 KiB). User payloads are small JSON
/// documents; anything larger is malformed or hostile.
const MAX_REQUEST_BODY_BYTES: usize = 256 * 1024;

/// Health check handler.
///
/// Probes the database with `SELECT 1` and reports `healthy`/`degraded`
/// accordingly. Used by load balancers, monitoring, and CI.
async fn health(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    let pool = state.pool.clone();
    let db_ok = tokio::task::spawn_blocking(move || {
        pool.get()
            .ok()
            .and_then(|conn| conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)).ok())
            .is_some()
    })
    .await
    .unwrap_or(false);

    if !db_ok {
        tracing::warn!("database health probe failed");
    }

    Json(json!({
        "status": if db_ok { "healthy" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": if db_ok { "connected" } else { "disconnected" },
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/v1/users",
            get(api_users::list_users_handler).post(api_users::create_user_handler),
        )
        .route("/api/v1/users/search", get(api_users::search_users_handler))
        .route(
            "/api/v1/users/{id}",
            get(api_users::get_user_handler)
                .put(api_users::update_user_handler)
                .delete(api_users::delete_user_handler),
        )
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(axum::middleware::from_fn(middleware::request_log_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
