// Public API for integration tests and potential library usage

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod leaderboard;
pub mod lock;
pub mod progress;
pub mod protocol;
pub mod puzzles;
pub mod state;
pub mod store;
pub mod types;
pub mod ws;

// Re-export broadcast for testing
pub mod broadcast;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use state::AppState;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

/// Full HTTP surface: websocket, public API, admin API and static files
pub fn build_router(state: Arc<AppState>, admin: Arc<auth::AdminAuth>) -> Router {
    let admin_routes = Router::new()
        .route("/api/admin/export", get(api::export_progress))
        .route("/api/admin/import", post(api::import_progress))
        .layer(middleware::from_fn_with_state(
            admin,
            auth::admin_auth_middleware,
        ));

    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/api/leaderboard", get(api::leaderboard))
        .merge(admin_routes)
        .fallback_service(ServeDir::new("static"))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
