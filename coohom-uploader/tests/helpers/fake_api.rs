//! Scripted in-memory `CoohomApi`
//!
//! Status calls replay a script; the last entry repeats once the script is
//! used up. Every operation counts its calls.

use async_trait::async_trait;
use coohom_common::UploadStatus;
use coohom_uploader::client::{CoohomApi, CoohomError, TIMEOUT_CODE};
use coohom_uploader::models::{StatusRecord, StsGrant, SubmissionResult, SubmitParams, UploadTask};
use serde_json::json;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// One scripted status response
#[derive(Debug, Clone)]
pub enum StatusStep {
    Status(UploadStatus),
    /// Transport failure
    Fail,
}

/// One scripted STS response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StsStep {
    Grant,
    Timeout,
    Denied,
}

/// Scripted submit response
#[derive(Debug, Clone)]
pub enum SubmitStep {
    Ok(String),
    NotParsed,
    Fail,
}

pub fn test_grant(task_id: &str) -> StsGrant {
    serde_json::from_value(json!({
        "accessKeyId": "AKID",
        "accessKeySecret": "OSS-SECRET",
        "securityToken": "OSS-TOKEN",
        "bucket": "coohom-upload",
        "region": "cn-hangzhou",
        "filePath": format!("upload/{}/model.zip", task_id),
        "uploadTaskId": task_id,
    }))
    .unwrap()
}

pub struct FakeApi {
    task_id: String,
    statuses: Mutex<VecDeque<StatusStep>>,
    sts: Mutex<VecDeque<StsStep>>,
    submit: Mutex<SubmitStep>,
    upload_fails: bool,
    pub sts_calls: AtomicUsize,
    pub upload_calls: AtomicUsize,
    pub parse_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub submit_calls: AtomicUsize,
}

impl FakeApi {
    /// Grants `task_id`, reports `statuses` in order, submits as `M-{task_id}`
    pub fn new(task_id: &str, statuses: Vec<StatusStep>) -> Self {
        Self {
            task_id: task_id.to_string(),
            statuses: Mutex::new(statuses.into()),
            sts: Mutex::new(VecDeque::new()),
            submit: Mutex::new(SubmitStep::Ok(format!("M-{}", task_id))),
            upload_fails: false,
            sts_calls: AtomicUsize::new(0),
            upload_calls: AtomicUsize::new(0),
            parse_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_statuses(task_id: &str, codes: &[i64]) -> Self {
        let steps = codes
            .iter()
            .map(|c| StatusStep::Status(UploadStatus::from_code(*c).unwrap()))
            .collect();
        Self::new(task_id, steps)
    }

    /// STS responses in order; `Grant` once the script is used up
    pub fn with_sts(self, steps: Vec<StsStep>) -> Self {
        *self.sts.lock().unwrap() = steps.into();
        self
    }

    pub fn with_submit(self, step: SubmitStep) -> Self {
        *self.submit.lock().unwrap() = step;
        self
    }

    pub fn with_failing_upload(mut self) -> Self {
        self.upload_fails = true;
        self
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn remote_calls(&self) -> usize {
        Self::count(&self.sts_calls)
            + Self::count(&self.upload_calls)
            + Self::count(&self.parse_calls)
            + Self::count(&self.status_calls)
            + Self::count(&self.submit_calls)
    }

    fn next_status(&self) -> StatusStep {
        let mut statuses = self.statuses.lock().unwrap();
        if statuses.len() > 1 {
            statuses.pop_front().unwrap()
        } else {
            statuses
                .front()
                .cloned()
                .unwrap_or(StatusStep::Status(UploadStatus::Parsing))
        }
    }
}

#[async_trait]
impl CoohomApi for FakeApi {
    async fn get_sts_credentials(&self, _file_name: &str) -> Result<StsGrant, CoohomError> {
        self.sts_calls.fetch_add(1, Ordering::SeqCst);
        let step = self.sts.lock().unwrap().pop_front().unwrap_or(StsStep::Grant);
        match step {
            StsStep::Grant => Ok(test_grant(&self.task_id)),
            StsStep::Timeout => Err(CoohomError::Transient {
                code: TIMEOUT_CODE.to_string(),
                message: "Request timeout".to_string(),
            }),
            StsStep::Denied => Err(CoohomError::Auth {
                code: "100001".to_string(),
                message: "Invalid sign".to_string(),
            }),
        }
    }

    async fn upload_to_object_store(
        &self,
        grant: StsGrant,
        _archive_path: &Path,
    ) -> Result<UploadTask, CoohomError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if self.upload_fails {
            return Err(CoohomError::Upload("HTTP 403: AccessDenied".to_string()));
        }
        Ok(UploadTask::from(grant))
    }

    async fn request_parse(&self, _upload_task_id: &str) -> Result<(), CoohomError> {
        self.parse_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn check_status(&self, upload_task_id: &str) -> Result<StatusRecord, CoohomError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        match self.next_status() {
            StatusStep::Status(status) => Ok(StatusRecord::new(
                upload_task_id,
                status,
                json!({ "status": status.code() }),
            )),
            StatusStep::Fail => Err(CoohomError::Network("connection reset".to_string())),
        }
    }

    async fn submit_model(
        &self,
        _upload_task_id: &str,
        _params: &SubmitParams,
    ) -> Result<SubmissionResult, CoohomError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        match self.submit.lock().unwrap().clone() {
            SubmitStep::Ok(model_id) => Ok(SubmissionResult::submitted(model_id)),
            SubmitStep::NotParsed => Err(CoohomError::NotParsed {
                code: "-1".to_string(),
                message: "Compressed package not parsed successfully".to_string(),
            }),
            SubmitStep::Fail => Err(CoohomError::Remote {
                code: "500".to_string(),
                message: "Invalid category".to_string(),
            }),
        }
    }
}
