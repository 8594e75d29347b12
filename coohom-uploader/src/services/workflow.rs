//! End-to-end upload workflow
//!
//! package → STS → object-store upload → parse → safe submit
//!
//! The first failing step ends the run. Every run, successful or not, is
//! recorded in the upload history.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

use super::packager::{FilePackager, PackagedArchive};
use super::safe_submitter::{safe_submit, SafeSubmitOptions};
use super::sts_retry::get_sts_with_retry;
use crate::client::CoohomApi;
use crate::models::{SubmissionResult, SubmitParams, UploadHistory, UploadRecord};

/// Workflow step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    Package,
    Sts,
    Upload,
    Parse,
    Submit,
}

/// Outcome of one step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRecord {
    pub stage: WorkflowStage,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl StepRecord {
    fn ok(stage: WorkflowStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            success: true,
            message: Some(message.into()),
            completed_at: Utc::now(),
        }
    }

    fn failed(stage: WorkflowStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            success: false,
            message: Some(message.into()),
            completed_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowOptions {
    pub params: SubmitParams,
    /// Run the submit step; when false the run ends after the parse request
    pub submit: bool,
    pub submit_options: SafeSubmitOptions,
    /// STS retries on remote timeout
    pub sts_retries: u32,
    /// Remove generated archives once the run ends
    pub cleanup: bool,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            params: SubmitParams::default(),
            submit: true,
            submit_options: SafeSubmitOptions::default(),
            sts_retries: 0,
            cleanup: true,
        }
    }
}

/// Result of a workflow run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive: Option<PackagedArchive>,
    pub steps: Vec<StepRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission: Option<SubmissionResult>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowReport {
    fn new() -> Self {
        Self {
            task_id: None,
            archive: None,
            steps: Vec::new(),
            submission: None,
            success: false,
            error: None,
        }
    }

    fn fail(&mut self, stage: WorkflowStage, error: String) {
        tracing::error!(stage = ?stage, task_id = ?self.task_id, error = %error, "Upload workflow failed");
        self.steps.push(StepRecord::failed(stage, error.clone()));
        self.error = Some(error);
        self.success = false;
    }

    /// Status label stored in the upload history
    pub fn history_status(&self) -> String {
        if let Some(submission) = &self.submission {
            if submission.skipped {
                return "already_submitted".to_string();
            }
            if submission.success {
                return "submitted".to_string();
            }
            if let Some(code) = submission.error_code {
                return serde_json::to_value(code)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_lowercase))
                    .unwrap_or_else(|| "failed".to_string());
            }
            return "failed".to_string();
        }
        match self.steps.last() {
            Some(step) if step.success => "parse_requested".to_string(),
            Some(step) => format!("{:?}_failed", step.stage).to_lowercase(),
            None => "failed".to_string(),
        }
    }
}

/// Runs uploads against a `CoohomApi`
#[derive(Clone)]
pub struct UploadWorkflow {
    api: Arc<dyn CoohomApi>,
    packager: FilePackager,
    history: UploadHistory,
}

impl UploadWorkflow {
    pub fn new(api: Arc<dyn CoohomApi>, packager: FilePackager, history: UploadHistory) -> Self {
        Self {
            api,
            packager,
            history,
        }
    }

    pub fn history(&self) -> &UploadHistory {
        &self.history
    }

    /// Upload `path` and (optionally) submit it
    pub async fn run(&self, path: &Path, options: &WorkflowOptions) -> WorkflowReport {
        let mut report = WorkflowReport::new();
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        tracing::info!(file = %display_name, submit = options.submit, "Starting upload workflow");

        self.run_steps(path, options, &mut report).await;

        if options.cleanup {
            if let Some(archive) = &report.archive {
                archive.cleanup().await;
            }
        }

        if report.success {
            tracing::info!(
                file = %display_name,
                task_id = ?report.task_id,
                "Upload workflow finished"
            );
        }

        self.history
            .push(UploadRecord::new(
                display_name,
                report.task_id.clone(),
                report.history_status(),
            ))
            .await;

        report
    }

    async fn run_steps(&self, path: &Path, options: &WorkflowOptions, report: &mut WorkflowReport) {
        let api = self.api.as_ref();

        let archive = match self.packager.package(path).await {
            Ok(archive) => archive,
            Err(e) => return report.fail(WorkflowStage::Package, e.to_string()),
        };
        report.steps.push(StepRecord::ok(
            WorkflowStage::Package,
            format!("{} ({} bytes)", archive.file_name, archive.size_bytes),
        ));
        report.archive = Some(archive.clone());

        let grant = match get_sts_with_retry(api, &archive.file_name, options.sts_retries).await {
            Ok(grant) => grant,
            Err(e) => return report.fail(WorkflowStage::Sts, e.to_string()),
        };
        report.task_id = Some(grant.upload_task_id.clone());
        report.steps.push(StepRecord::ok(
            WorkflowStage::Sts,
            format!("upload task {}", grant.upload_task_id),
        ));

        let task = match api.upload_to_object_store(grant, &archive.path).await {
            Ok(task) => task,
            Err(e) => return report.fail(WorkflowStage::Upload, e.to_string()),
        };
        report
            .steps
            .push(StepRecord::ok(WorkflowStage::Upload, task.file_path.clone()));

        if let Err(e) = api.request_parse(&task.upload_task_id).await {
            return report.fail(WorkflowStage::Parse, e.to_string());
        }
        report
            .steps
            .push(StepRecord::ok(WorkflowStage::Parse, "parse requested"));

        if !options.submit {
            report.success = true;
            return;
        }

        let submission = safe_submit(
            api,
            &task.upload_task_id,
            &options.params,
            &options.submit_options,
        )
        .await;

        if submission.success {
            let message = match &submission.model_id {
                Some(id) => format!("model {}", id),
                None => "already submitted".to_string(),
            };
            report.steps.push(StepRecord::ok(WorkflowStage::Submit, message));
            report.success = true;
        } else {
            let error = submission
                .error
                .clone()
                .unwrap_or_else(|| "Submission failed".to_string());
            report.fail(WorkflowStage::Submit, error);
        }
        report.submission = Some(submission);
    }
}
