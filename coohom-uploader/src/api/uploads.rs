//! Upload workflow API handlers
//!
//! POST /uploads, POST /uploads/sts, POST /uploads/:task_id/parse,
//! GET /uploads/:task_id/status, POST /uploads/:task_id/poll,
//! POST /uploads/:task_id/submit, GET /uploads/history

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use coohom_common::UploadStatus;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::client::{CoohomApi, CoohomError};
use crate::error::{ApiError, ApiResult};
use crate::models::{GrantSummary, PollOutcome, SubmissionResult, SubmitParams, UploadRecord};
use crate::services::{
    get_sts_with_retry, interval_from_minutes, poll_until_complete, safe_submit, PollConfig,
    SafeSubmitOptions, WorkflowOptions, WorkflowReport,
};
use crate::AppState;

/// Poll budget overrides shared by several requests
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PollOverrides {
    pub max_attempts: Option<u32>,
    pub interval_minutes: Option<u64>,
    /// Takes precedence over `interval_minutes`
    pub interval_seconds: Option<u64>,
}

impl PollOverrides {
    fn apply(&self, defaults: PollConfig) -> PollConfig {
        let interval = match (self.interval_seconds, self.interval_minutes) {
            (Some(secs), _) => Duration::from_secs(secs),
            (None, Some(minutes)) => interval_from_minutes(minutes),
            (None, None) => defaults.interval,
        };
        PollConfig::new(self.max_attempts.unwrap_or(defaults.max_attempts), interval)
    }
}

/// POST /uploads request
#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    /// Local file readable by the service
    pub file_path: PathBuf,
    pub model_name: Option<String>,
    pub submit: Option<bool>,
    pub auto_poll: Option<bool>,
    pub max_poll_attempts: Option<u32>,
    pub poll_interval_minutes: Option<u64>,
    pub poll_interval_seconds: Option<u64>,
    pub sts_retries: Option<u32>,
}

/// POST /uploads/sts request
#[derive(Debug, Deserialize)]
pub struct StsRequest {
    pub file_name: String,
    pub retries: Option<u32>,
}

/// POST /uploads/:task_id/submit request
#[derive(Debug, Default, Deserialize)]
pub struct SubmitRequest {
    pub model_name: Option<String>,
    pub auto_poll: Option<bool>,
    pub max_poll_attempts: Option<u32>,
    pub poll_interval_minutes: Option<u64>,
    pub poll_interval_seconds: Option<u64>,
    /// Full catalog parameters; `model_name` overrides `params.model_name`
    pub params: Option<SubmitParams>,
}

/// POST /uploads/:task_id/parse response
#[derive(Debug, Serialize)]
pub struct ParseResponse {
    pub task_id: String,
    pub parse_requested: bool,
}

/// GET /uploads/:task_id/status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub task_id: String,
    pub status: UploadStatus,
    pub status_code: i64,
    pub description: String,
    pub is_terminal: bool,
    pub checked_at: DateTime<Utc>,
    pub raw_response: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// Record a remote failure for /health and convert it
async fn remote<T>(state: &AppState, result: Result<T, CoohomError>) -> ApiResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(e) => {
            *state.last_error.write().await = Some(e.to_string());
            Err(ApiError::from(e))
        }
    }
}

fn require_task_id(task_id: &str) -> ApiResult<()> {
    if task_id.trim().is_empty() {
        return Err(ApiError::BadRequest("task_id must not be empty".to_string()));
    }
    Ok(())
}

/// POST /uploads
///
/// Runs the whole workflow for a local file. Workflow failures are reported
/// in the body with `success: false`.
pub async fn run_upload(
    State(state): State<AppState>,
    Json(request): Json<UploadRequest>,
) -> ApiResult<Json<WorkflowReport>> {
    if request.file_path.as_os_str().is_empty() {
        return Err(ApiError::BadRequest("file_path must not be empty".to_string()));
    }

    let poll = PollOverrides {
        max_attempts: request.max_poll_attempts,
        interval_minutes: request.poll_interval_minutes,
        interval_seconds: request.poll_interval_seconds,
    }
    .apply(state.poll_defaults);

    let options = WorkflowOptions {
        params: request
            .model_name
            .map(SubmitParams::named)
            .unwrap_or_default(),
        submit: request.submit.unwrap_or(true),
        submit_options: SafeSubmitOptions {
            auto_poll: request.auto_poll.unwrap_or(true),
            poll,
            cancel: Some(state.shutdown.child_token()),
        },
        sts_retries: request.sts_retries.unwrap_or(0),
        cleanup: true,
    };

    let report = state.workflow.run(&request.file_path, &options).await;
    if let Some(error) = &report.error {
        *state.last_error.write().await = Some(error.clone());
    }
    Ok(Json(report))
}

/// POST /uploads/sts
///
/// Returns the grant without its temporary credentials.
pub async fn request_sts(
    State(state): State<AppState>,
    Json(request): Json<StsRequest>,
) -> ApiResult<Json<GrantSummary>> {
    if request.file_name.trim().is_empty() {
        return Err(ApiError::BadRequest("file_name must not be empty".to_string()));
    }
    let result = get_sts_with_retry(
        state.api.as_ref(),
        &request.file_name,
        request.retries.unwrap_or(0),
    )
    .await;
    let grant = remote(&state, result).await?;
    Ok(Json(grant.summary()))
}

/// POST /uploads/:task_id/parse
pub async fn request_parse(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<ParseResponse>> {
    require_task_id(&task_id)?;
    let result = state.api.request_parse(&task_id).await;
    remote(&state, result).await?;
    Ok(Json(ParseResponse {
        task_id,
        parse_requested: true,
    }))
}

/// GET /uploads/:task_id/status
pub async fn get_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    require_task_id(&task_id)?;
    let result = state.api.check_status(&task_id).await;
    let record = remote(&state, result).await?;
    Ok(Json(StatusResponse {
        task_id: record.task_id,
        status: record.status,
        status_code: record.status.code(),
        description: record.status.description().to_string(),
        is_terminal: record.status.is_terminal(),
        checked_at: record.timestamp,
        raw_response: record.raw_response,
    }))
}

/// POST /uploads/:task_id/poll
pub async fn poll_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    body: Option<Json<PollOverrides>>,
) -> ApiResult<Json<PollOutcome>> {
    require_task_id(&task_id)?;
    let overrides = body.map(|Json(b)| b).unwrap_or_default();
    let config = overrides.apply(state.poll_defaults);
    let cancel = state.shutdown.child_token();

    let outcome = poll_until_complete(state.api.as_ref(), &task_id, &config, Some(&cancel)).await;
    Ok(Json(outcome))
}

/// POST /uploads/:task_id/submit
pub async fn submit(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    body: Option<Json<SubmitRequest>>,
) -> ApiResult<Json<SubmissionResult>> {
    require_task_id(&task_id)?;
    let request = body.map(|Json(b)| b).unwrap_or_default();

    let mut params = request.params.unwrap_or_default();
    if let Some(name) = request.model_name {
        params.model_name = name;
    }
    let options = SafeSubmitOptions {
        auto_poll: request.auto_poll.unwrap_or(true),
        poll: PollOverrides {
            max_attempts: request.max_poll_attempts,
            interval_minutes: request.poll_interval_minutes,
            interval_seconds: request.poll_interval_seconds,
        }
        .apply(state.poll_defaults),
        cancel: Some(state.shutdown.child_token()),
    };

    let result = safe_submit(state.api.as_ref(), &task_id, &params, &options).await;
    if let Some(error) = &result.error {
        *state.last_error.write().await = Some(error.clone());
    }
    Ok(Json(result))
}

/// GET /uploads/history
pub async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Json<Vec<UploadRecord>> {
    let limit = query.limit.unwrap_or(crate::models::upload_record::MAX_HISTORY_ITEMS);
    Json(state.history.recent(limit).await)
}

/// Build upload routes
pub fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/uploads", post(run_upload))
        .route("/uploads/sts", post(request_sts))
        .route("/uploads/history", get(history))
        .route("/uploads/:task_id/parse", post(request_parse))
        .route("/uploads/:task_id/status", get(get_status))
        .route("/uploads/:task_id/poll", post(poll_status))
        .route("/uploads/:task_id/submit", post(submit))
}
