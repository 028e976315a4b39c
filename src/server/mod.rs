//! HTTP service
//!
//! Routes are grouped per concern, each module exposing a `*_routes()`
//! builder merged in [`build_router`]. Analyzer runs and file work happen on
//! the blocking pool.

pub mod analysis;
pub mod error;
pub mod explanations;
pub mod files;
pub mod profile;

pub use error::{ApiError, ApiResult};

use crate::ai::AiClient;
use crate::config::Settings;
use crate::explain::ExplanationEngine;
use crate::pipeline::AnalysisPipeline;
use crate::profile::ProfileStore;
use crate::session::SessionStore;
use crate::tools::ToolInvoker;
use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub pipeline: Arc<AnalysisPipeline>,
    pub sessions: Arc<SessionStore>,
    pub profiles: Arc<ProfileStore>,
    pub explainer: Arc<ExplanationEngine>,
}

impl AppState {
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let session_root = settings.sessions.root_dir();
        std::fs::create_dir_all(&session_root).with_context(|| {
            format!("Failed to create session root {}", session_root.display())
        })?;

        let ai = match AiClient::from_settings(&settings.ai) {
            Ok(client) => client.map(Arc::new),
            Err(e) => {
                warn!("AI explanations disabled: {}", e);
                None
            }
        };

        let invoker = Arc::new(ToolInvoker::new(settings.tools.clone()));
        let profiles = Arc::new(ProfileStore::new(settings.profiles.dir.clone()));
        Ok(Self {
            pipeline: Arc::new(AnalysisPipeline::new(invoker)),
            sessions: Arc::new(SessionStore::new(
                session_root,
                settings.sessions.prefix.clone(),
            )),
            explainer: Arc::new(ExplanationEngine::new(Arc::clone(&profiles), ai)),
            profiles,
            settings: Arc::new(settings),
        })
    }
}

/// Run `work` on the blocking pool
pub(crate) async fn blocking<T, F>(work: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let max_upload = state.settings.server.max_upload_bytes;
    let cors = cors_layer(&state.settings.server.cors_origins);

    Router::new()
        .route("/health", get(health))
        .merge(analysis::analysis_routes())
        .merge(files::file_routes())
        .merge(explanations::explanation_routes())
        .merge(profile::profile_routes())
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

/// Remove every session directory, giving up after `limit`
pub async fn cleanup_sessions(sessions: Arc<SessionStore>, limit: Duration) {
    let sweep = tokio::task::spawn_blocking(move || sessions.cleanup_all());
    match tokio::time::timeout(limit, sweep).await {
        Ok(Ok(removed)) => info!("Session cleanup finished ({} removed)", removed),
        Ok(Err(e)) => error!("Session cleanup task failed: {}", e),
        Err(_) => error!("Timeout during session cleanup after {}s", limit.as_secs()),
    }
}

/// Serve until Ctrl+C/SIGTERM, then clean up sessions
pub async fn serve(state: AppState, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!("Listening on http://{}", listener.local_addr()?);

    let sessions = Arc::clone(&state.sessions);
    let cleanup_limit = Duration::from_secs(state.settings.server.shutdown_cleanup_secs);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    cleanup_sessions(sessions, cleanup_limit).await;
    Ok(())
}
