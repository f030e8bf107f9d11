//! HTTP API endpoints.
//!
//! The leaderboard is public; export/import sit behind admin auth.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::state::export::ProgressExport;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

/// Ranked standings.
///
/// GET /api/leaderboard?limit=N
pub async fn leaderboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeaderboardQuery>,
) -> Response {
    match state.leaderboard(query.limit).await {
        Ok(entries) => Json(entries).into_response(),
        Err(e) => {
            tracing::error!("Leaderboard read failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response()
        }
    }
}

/// Export every progress record as JSON.
///
/// GET /api/admin/export
pub async fn export_progress(State(state): State<Arc<AppState>>) -> Response {
    match state.export_progress().await {
        Ok(export) => Json(export).into_response(),
        Err(e) => {
            tracing::error!("Progress export failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response()
        }
    }
}

/// Import a progress snapshot.
///
/// POST /api/admin/import
///
/// Records in the snapshot overwrite records with the same key.
pub async fn import_progress(
    State(state): State<Arc<AppState>>,
    Json(export): Json<ProgressExport>,
) -> Response {
    match state.import_progress(export).await {
        Ok(count) => (StatusCode::OK, format!("Imported {} records", count)).into_response(),
        Err(e) => {
            tracing::error!("Progress import failed: {}", e);
            (StatusCode::BAD_REQUEST, format!("Import failed: {}", e)).into_response()
        }
    }
}
