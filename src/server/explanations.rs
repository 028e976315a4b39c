//! Explanation and feedback endpoints

use crate::explain::{Explanation, Template};
use crate::models::{ExperienceLevel, Issue};
use crate::server::{blocking, ApiResult, AppState};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct ExplainRequest {
    pub issue: Issue,
    pub user_id: String,
    /// Ask the AI backend first, when one is configured
    #[serde(default)]
    pub use_ai: bool,
}

#[derive(Debug, Deserialize)]
pub struct TemplateQuery {
    #[serde(default)]
    pub level: ExperienceLevel,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub user_id: String,
    pub issue_code: String,
    pub was_helpful: bool,
    pub explanation_level: ExperienceLevel,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

/// POST /api/v1/explanations/explain
pub async fn explain(
    State(state): State<AppState>,
    Json(req): Json<ExplainRequest>,
) -> ApiResult<Json<Explanation>> {
    let explainer = Arc::clone(&state.explainer);
    let explanation =
        blocking(move || Ok(explainer.explain(&req.issue, &req.user_id, req.use_ai)?)).await?;
    Ok(Json(explanation))
}

/// GET /api/v1/explanations/template/:code?level=
pub async fn get_template(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<TemplateQuery>,
) -> Json<Template> {
    debug!("Fetching template for {} at {}", code, query.level);
    Json(state.explainer.template(&code, query.level))
}

/// POST /api/v1/feedback/explanation
pub async fn log_feedback(
    State(state): State<AppState>,
    Json(req): Json<FeedbackRequest>,
) -> ApiResult<Json<StatusResponse>> {
    let profiles = Arc::clone(&state.profiles);
    blocking(move || {
        profiles.update(&req.user_id, |p| {
            p.record_feedback(&req.issue_code, req.was_helpful, req.explanation_level)
        })?;
        Ok(())
    })
    .await?;
    Ok(Json(StatusResponse {
        status: "feedback_recorded",
    }))
}

pub fn explanation_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/explanations/explain", post(explain))
        .route("/api/v1/explanations/template/:code", get(get_template))
        .route("/api/v1/feedback/explanation", post(log_feedback))
}
