//! File content lookup inside a session

use crate::server::{blocking, ApiError, ApiResult, AppState};
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    pub path: String,
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct FileContent {
    pub content: String,
}

/// GET /api/v1/files?path=..&session_id=..
pub async fn get_file_contents(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
) -> ApiResult<Json<FileContent>> {
    let path = state.sessions.resolve(&query.session_id, &query.path)?;
    let requested = query.path;
    let content = blocking(move || {
        if !path.is_file() {
            return Err(ApiError::NotFound(format!("File not found at: {}", requested)));
        }
        std::fs::read_to_string(&path)
            .map_err(|e| ApiError::Internal(format!("read {}: {}", path.display(), e)))
    })
    .await?;
    Ok(Json(FileContent { content }))
}

pub fn file_routes() -> Router<AppState> {
    Router::new().route("/api/v1/files", get(get_file_contents))
}
