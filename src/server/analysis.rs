//! Analysis endpoints: upload, single-file re-analysis, fixes, export

use crate::fixes::{apply_line_fix, generate_fix, FixSuggestion};
use crate::models::{
    AnalysisResult, ExperienceLevel, Issue, ProjectType, ToolKind, ToolReport,
};
use crate::server::{blocking, ApiError, ApiResult, AppState};
use crate::session::{build_export, export_file_name, SessionStore};
use crate::tools::record::relative_path;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Header carrying the caller's identity
pub const USER_HEADER: &str = "x-user-id";

#[derive(Debug, Clone, Serialize)]
pub struct IssueView {
    #[serde(flatten)]
    pub issue: Issue,
    pub flamingo_message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportView {
    pub success: bool,
    pub issues: Vec<IssueView>,
    pub error: Option<String>,
}

impl From<ToolReport> for ReportView {
    fn from(report: ToolReport) -> Self {
        Self {
            success: report.success,
            issues: report
                .issues
                .into_iter()
                .map(|issue| IssueView {
                    flamingo_message: issue.flamingo_message(),
                    issue,
                })
                .collect(),
            error: report.error,
        }
    }
}

/// Combined result as sent to clients
#[derive(Debug, Clone, Serialize)]
pub struct ResultView {
    pub project_type: ProjectType,
    pub linter: ToolKind,
    pub complexity: ToolKind,
    pub experience_level: ExperienceLevel,
    pub security_scan: ReportView,
    pub main_analysis: ReportView,
    pub complexity_analysis: ReportView,
}

impl From<AnalysisResult> for ResultView {
    fn from(result: AnalysisResult) -> Self {
        Self {
            project_type: result.project_type,
            linter: result.linter,
            complexity: result.complexity,
            experience_level: result.experience_level,
            security_scan: result.security_scan.into(),
            main_analysis: result.main_analysis.into(),
            complexity_analysis: result.complexity_analysis.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    #[serde(flatten)]
    pub result: ResultView,
    pub session_id: String,
    pub temp_dir: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub level: Option<ExperienceLevel>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeCodeRequest {
    pub code: String,
    pub file_path: String,
    pub session_id: String,
    pub experience_level: Option<ExperienceLevel>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FixTarget {
    pub line: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ApplyFixRequest {
    pub file_path: String,
    #[serde(default)]
    pub issue: FixTarget,
    pub fix: String,
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct ApplyFixResponse {
    pub success: bool,
    pub new_content: String,
    pub message: String,
    pub file_path: String,
}

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateFixRequest {
    pub code: String,
    pub issue: Issue,
}

fn empty_result(level: ExperienceLevel) -> AnalysisResult {
    AnalysisResult {
        project_type: ProjectType::Unknown,
        linter: ToolKind::Ruff,
        complexity: ToolKind::Radon,
        experience_level: level,
        security_scan: ToolReport::ok(Vec::new()),
        main_analysis: ToolReport::ok(Vec::new()),
        complexity_analysis: ToolReport::ok(Vec::new()),
    }
}

/// Drop the session when its first analysis fails
fn discard_on_error<T, E>(
    sessions: &SessionStore,
    id: &str,
    outcome: Result<T, E>,
) -> Result<T, E> {
    if outcome.is_err() {
        if let Err(e) = sessions.cleanup(id) {
            warn!("Failed to remove session {}: {}", id, e);
        }
    }
    outcome
}

/// POST /api/v1/analysis/analyze-zip
///
/// Body is the raw zip archive. The level comes from `?level=`, else from the
/// caller's profile, else the default.
pub async fn analyze_zip(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> ApiResult<Json<UploadResponse>> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("Empty upload".to_string()));
    }
    let user_id = headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let level = match (query.level, user_id.clone()) {
        (Some(level), _) => level,
        (None, Some(user)) => {
            let profiles = Arc::clone(&state.profiles);
            blocking(move || Ok(profiles.get(&user)?.experience_level)).await?
        }
        (None, None) => ExperienceLevel::default(),
    };

    let sessions = Arc::clone(&state.sessions);
    let session =
        blocking(move || Ok(sessions.create_from_zip(&body, user_id.as_deref())?)).await?;
    info!(
        "Analyzing upload in session {} (level: {})",
        session.id, level
    );

    let limit = Duration::from_secs(state.settings.pipeline.timeout_secs);
    let outcome = Arc::clone(&state.pipeline)
        .analyze_with_timeout(session.directory.clone(), level, limit)
        .await;
    let result = discard_on_error(&state.sessions, &session.id, outcome)?;
    state.sessions.attach_result(&session.id, result.clone())?;

    Ok(Json(UploadResponse {
        result: result.into(),
        session_id: session.id,
        temp_dir: session.directory.to_string_lossy().into_owned(),
    }))
}

/// POST /api/v1/analysis/analyze-code
pub async fn analyze_code(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeCodeRequest>,
) -> ApiResult<Json<ResultView>> {
    let cached_level = state
        .sessions
        .last_result(&req.session_id)?
        .map(|r| r.experience_level);
    let level = req
        .experience_level
        .or(cached_level)
        .unwrap_or_default();

    if req.code.trim().is_empty() {
        return Ok(Json(empty_result(level).into()));
    }

    let root = state.sessions.get_directory(&req.session_id)?;
    let path = state.sessions.resolve(&req.session_id, &req.file_path)?;
    let file_key = relative_path(&req.file_path, &root);

    let pipeline = Arc::clone(&state.pipeline);
    let code = req.code;
    let target = file_key.clone();
    let report = blocking(move || {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ApiError::Internal(format!("create {}: {}", parent.display(), e)))?;
        }
        std::fs::write(&path, code)
            .map_err(|e| ApiError::Internal(format!("write {}: {}", path.display(), e)))?;
        Ok(pipeline.reanalyze_file(&root, Path::new(&target), level))
    })
    .await?;

    // Edit under the session lock; concurrent edits to other files must survive
    let updated = if report.success {
        let issues = report.issues.clone();
        state.sessions.update_result(&req.session_id, |result| {
            result.replace_file_issues(&file_key, issues);
            result.clone()
        })?
    } else {
        warn!("Re-analysis of {} failed; keeping cached issues", file_key);
        let error = report.error.clone();
        state.sessions.update_result(&req.session_id, |result| {
            let mut view = result.clone();
            view.main_analysis.error = error;
            view
        })?
    };

    let result = updated.unwrap_or_else(|| AnalysisResult {
        main_analysis: report,
        ..empty_result(level)
    });
    Ok(Json(result.into()))
}

/// POST /api/v1/analysis/apply-fix
pub async fn apply_fix(
    State(state): State<AppState>,
    Json(req): Json<ApplyFixRequest>,
) -> ApiResult<Json<ApplyFixResponse>> {
    let path = state.sessions.resolve(&req.session_id, &req.file_path)?;
    let line = req.issue.line.unwrap_or(0);
    let fix = req.fix;
    let new_content = blocking(move || Ok(apply_line_fix(&path, line, &fix)?)).await?;

    Ok(Json(ApplyFixResponse {
        success: true,
        new_content,
        message: "Fix applied successfully".to_string(),
        file_path: req.file_path,
    }))
}

/// POST /api/v1/analysis/export-project
pub async fn export_project(
    State(state): State<AppState>,
    Json(req): Json<ExportRequest>,
) -> ApiResult<Response> {
    let directory = state.sessions.get_directory(&req.session_id)?;
    if !directory.is_dir() {
        return Err(ApiError::NotFound("Project not found".to_string()));
    }
    let bytes = blocking(move || Ok(build_export(&directory)?)).await?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export_file_name(&req.session_id)
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// POST /api/v1/analysis/generate-fix
pub async fn generate_fix_handler(Json(req): Json<GenerateFixRequest>) -> Json<FixSuggestion> {
    Json(generate_fix(&req.code, &req.issue))
}

/// GET /api/v1/analysis/debug-config
pub async fn debug_config(
    State(state): State<AppState>,
) -> ApiResult<Json<BTreeMap<String, String>>> {
    let pipeline = Arc::clone(&state.pipeline);
    let configs = blocking(move || {
        pipeline
            .invoker()
            .configs()
            .snapshot()
            .map_err(|e| ApiError::Internal(format!("render linter configs: {}", e)))
    })
    .await?;
    Ok(Json(configs))
}

pub fn analysis_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/analysis/analyze-zip", post(analyze_zip))
        .route("/api/v1/analysis/analyze-code", post(analyze_code))
        .route("/api/v1/analysis/apply-fix", post(apply_fix))
        .route("/api/v1/analysis/export-project", post(export_project))
        .route("/api/v1/analysis/generate-fix", post(generate_fix_handler))
        .route("/api/v1/analysis/debug-config", get(debug_config))
}
