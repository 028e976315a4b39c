//! Profile endpoints

use crate::models::ExperienceLevel;
use crate::profile::UserProfile;
use crate::server::{blocking, ApiResult, AppState};
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct LevelRequest {
    pub level: ExperienceLevel,
}

#[derive(Debug, Deserialize)]
pub struct QuizRequest {
    pub score: u32,
    pub level: ExperienceLevel,
}

/// GET /api/v1/profile/:user_id
pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserProfile>> {
    let profiles = Arc::clone(&state.profiles);
    let profile = blocking(move || Ok(profiles.get(&user_id)?)).await?;
    Ok(Json(profile))
}

/// POST /api/v1/profile/:user_id/experience-level
pub async fn update_experience_level(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<LevelRequest>,
) -> ApiResult<Json<UserProfile>> {
    let profiles = Arc::clone(&state.profiles);
    let profile = blocking(move || {
        Ok(profiles.update(&user_id, |p| p.experience_level = req.level)?)
    })
    .await?;
    Ok(Json(profile))
}

/// POST /api/v1/profile/:user_id/quiz
pub async fn submit_quiz(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<QuizRequest>,
) -> ApiResult<Json<UserProfile>> {
    let profiles = Arc::clone(&state.profiles);
    let profile = blocking(move || {
        Ok(profiles.update(&user_id, |p| p.update_from_quiz(req.score, req.level))?)
    })
    .await?;
    Ok(Json(profile))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/profile/:user_id", get(get_profile))
        .route(
            "/api/v1/profile/:user_id/experience-level",
            post(update_experience_level),
        )
        .route("/api/v1/profile/:user_id/quiz", post(submit_quiz))
}
