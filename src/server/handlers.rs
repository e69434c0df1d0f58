//! HTTP handlers for the analyzer and narrative endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use super::error::ApiError;
use super::AppState;
use crate::analysis;
use crate::github::{self, GitHubError};
use crate::narrative;
use crate::report::AnalysisReport;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub repo_url: String,
}

#[derive(Debug, Deserialize)]
pub struct NarrativeRequest {
    /// Null when absent; the provider still gets a prompt.
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Serialize)]
pub struct NarrativeResponse {
    pub message: String,
}

pub async fn health() -> &'static str {
    "ok"
}

/// POST /analyze: `{repoUrl}` to the full analyzer report.
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalysisReport>, ApiError> {
    let Json(request) = payload?;
    let id = github::parse_repo_url(&request.repo_url)?;
    let source = state.source.as_deref().ok_or(GitHubError::MissingToken)?;

    info!(repo = %id, "analyzing repository");
    let report = analysis::analyze(source, &state.signals, &id, Utc::now()).await?;
    info!(
        repo = %id,
        technical = report.scores.technical_health.value,
        effectiveness = report.scores.effectiveness.value,
        "analysis complete"
    );
    Ok(Json(report))
}

/// POST /ai: `{data}` to `{message}` with the generated narrative.
pub async fn narrative(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NarrativeRequest>, JsonRejection>,
) -> Result<Json<NarrativeResponse>, ApiError> {
    // Unreadable bodies are internal errors on this route, never a 400
    let Json(request) = payload.map_err(|rejection| ApiError::Internal(rejection.body_text()))?;
    let message = narrative::generate_narrative(state.generator.as_ref(), &request.data).await?;
    info!(bytes = message.len(), "narrative generated");
    Ok(Json(NarrativeResponse { message }))
}
