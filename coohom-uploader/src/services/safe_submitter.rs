//! Safe submission
//!
//! Submitting while the archive is still being generated or parsed makes the
//! remote reject the model ("compressed package not parsed successfully").
//! `safe_submit` checks the status first and only calls submit once the task
//! is parsed. Every outcome is returned as a `SubmissionResult`.

use coohom_common::UploadStatus;
use tokio_util::sync::CancellationToken;

use super::poller::{poll_until, PollConfig};
use crate::client::{CoohomApi, CoohomError};
use crate::models::{SubmissionResult, SubmitErrorCode, SubmitParams};

/// Behaviour when the task is not parsed yet
#[derive(Debug, Clone)]
pub struct SafeSubmitOptions {
    /// Poll until parsed instead of failing right away
    pub auto_poll: bool,
    pub poll: PollConfig,
    pub cancel: Option<CancellationToken>,
}

impl Default for SafeSubmitOptions {
    fn default() -> Self {
        Self {
            auto_poll: true,
            poll: PollConfig::default(),
            cancel: None,
        }
    }
}

/// Submit `task_id` once its archive is parsed
pub async fn safe_submit(
    api: &dyn CoohomApi,
    task_id: &str,
    params: &SubmitParams,
    options: &SafeSubmitOptions,
) -> SubmissionResult {
    let mut status = match api.check_status(task_id).await {
        Ok(record) => record.status,
        Err(e) => {
            tracing::warn!(task_id, error = %e, "Pre-submit status check failed");
            return SubmissionResult::failure(
                SubmitErrorCode::StatusCheckFailed,
                format!("Failed to check status: {}", e),
                None,
            );
        }
    };

    let mut poll = None;
    if status.is_pending() {
        if !options.auto_poll {
            return SubmissionResult::failure(
                SubmitErrorCode::ParsingNotComplete,
                format!(
                    "Archive is not parsed yet (status {}); poll until parsed or enable auto-poll",
                    status
                ),
                Some(status),
            );
        }

        tracing::info!(task_id, status = %status, "Archive not parsed yet, polling before submit");
        let outcome = poll_until(
            api,
            task_id,
            &options.poll,
            options.cancel.as_ref(),
            |s| s == UploadStatus::Parsed || s.is_terminal(),
        )
        .await;
        if let Some(last) = outcome.status {
            status = last;
        }
        poll = Some(outcome);
    }

    let result = match status {
        UploadStatus::Parsed => submit(api, task_id, params).await,
        UploadStatus::Submitted => {
            tracing::info!(task_id, "Model already submitted, skipping submit");
            SubmissionResult::already_submitted()
        }
        UploadStatus::Generating | UploadStatus::Parsing => {
            let attempts = poll.as_ref().map(|p| p.final_attempt).unwrap_or(0);
            SubmissionResult::failure(
                SubmitErrorCode::ParsingNotComplete,
                format!(
                    "Archive still not parsed after {} poll attempts (status {})",
                    attempts, status
                ),
                Some(status),
            )
        }
        UploadStatus::ParseFailed => SubmissionResult::failure(
            SubmitErrorCode::ParsingFailed,
            format!("Archive parsing failed (status {})", status),
            Some(status),
        ),
        UploadStatus::SubmitFailed => SubmissionResult::failure(
            SubmitErrorCode::PreviousSubmitFailed,
            format!("Previous submission failed (status {})", status),
            Some(status),
        ),
        UploadStatus::Offline => SubmissionResult::failure(
            SubmitErrorCode::OfflineAnalysis,
            format!("Archive is being analyzed offline (status {})", status),
            Some(status),
        ),
    };

    if !result.success {
        tracing::warn!(
            task_id,
            error_code = ?result.error_code,
            error = result.error.as_deref().unwrap_or_default(),
            "Safe submit did not submit"
        );
    }
    result.with_poll(poll)
}

async fn submit(api: &dyn CoohomApi, task_id: &str, params: &SubmitParams) -> SubmissionResult {
    match api.submit_model(task_id, params).await {
        Ok(result) => result,
        Err(e @ CoohomError::NotParsed { .. }) => SubmissionResult::failure(
            SubmitErrorCode::ParsingNotComplete,
            e.to_string(),
            Some(UploadStatus::Parsed),
        ),
        Err(e) => SubmissionResult::failure(
            SubmitErrorCode::SubmitFailed,
            format!("Submit failed: {}", e),
            Some(UploadStatus::Parsed),
        ),
    }
}
