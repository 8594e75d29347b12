//! coohom-uploader library interface
//!
//! Coohom 3D-model upload workflow: API client, object-store adapter,
//! status poller, safe submitter, packager and the HTTP service around them.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::client::CoohomApi;
use crate::models::UploadHistory;
use crate::services::{FilePackager, PollConfig, UploadWorkflow};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn CoohomApi>,
    pub workflow: UploadWorkflow,
    pub history: UploadHistory,
    /// Poll budget used when a request does not give one
    pub poll_defaults: PollConfig,
    /// Cancelled on shutdown; running polls stop at their next wait
    pub shutdown: CancellationToken,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(api: Arc<dyn CoohomApi>, work_dir: impl Into<PathBuf>, poll_defaults: PollConfig) -> Self {
        let history = UploadHistory::new();
        let workflow = UploadWorkflow::new(api.clone(), FilePackager::new(work_dir), history.clone());
        Self {
            api,
            workflow,
            history,
            poll_defaults,
            shutdown: CancellationToken::new(),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::upload_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
