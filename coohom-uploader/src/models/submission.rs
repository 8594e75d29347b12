//! Model submission parameters and results

use coohom_common::UploadStatus;
use serde::{Deserialize, Serialize};

use super::PollOutcome;

const DEFAULT_LIBRARY_ID: &str = "3FO4K6E984C7";

/// Catalog parameters sent with the submit call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitParams {
    pub model_name: String,
    pub pos: u32,
    pub prod_cat: u32,
    pub brand_cats: Vec<String>,
    pub brand_good_code: String,
    pub custom_lib_id: String,
    pub business_cat_ids: Vec<String>,
    /// Always 1 for the commodity library
    pub location: u32,
}

impl Default for SubmitParams {
    fn default() -> Self {
        Self {
            model_name: "3D Model".to_string(),
            pos: 99,
            prod_cat: 288,
            brand_cats: vec![DEFAULT_LIBRARY_ID.to_string()],
            brand_good_code: "code".to_string(),
            custom_lib_id: DEFAULT_LIBRARY_ID.to_string(),
            business_cat_ids: vec![DEFAULT_LIBRARY_ID.to_string()],
            location: 1,
        }
    }
}

impl SubmitParams {
    pub fn named(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            ..Self::default()
        }
    }

    /// Form fields for the submit endpoint, lists comma-joined
    pub fn to_form(&self) -> Vec<(&'static str, String)> {
        vec![
            ("name", self.model_name.clone()),
            ("pos", self.pos.to_string()),
            ("prod_cat", self.prod_cat.to_string()),
            ("brand_cats", self.brand_cats.join(",")),
            ("brand_good_code", self.brand_good_code.clone()),
            ("custom_lib_id", self.custom_lib_id.clone()),
            ("business_cat_ids", self.business_cat_ids.join(",")),
            ("location", self.location.to_string()),
        ]
    }
}

/// Why a safe submission did not submit, or failed submitting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmitErrorCode {
    /// The pre-flight status call failed
    StatusCheckFailed,
    /// Status still 0/1 (and polling disabled or exhausted), or the remote
    /// rejected the submit as not parsed
    ParsingNotComplete,
    /// Status 2
    ParsingFailed,
    /// Status 5
    PreviousSubmitFailed,
    /// Status 6
    OfflineAnalysis,
    /// The submit call itself failed
    SubmitFailed,
}

/// Terminal outcome of a submission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<SubmitErrorCode>,

    /// True when the task was already submitted and no submit call was made
    #[serde(default)]
    pub skipped: bool,

    /// Last known task status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<UploadStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Polling performed while waiting for parsing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll: Option<PollOutcome>,
}

impl SubmissionResult {
    pub fn submitted(model_id: String) -> Self {
        Self {
            success: true,
            model_id: Some(model_id),
            status: Some(UploadStatus::Submitted),
            message: Some("Model submitted".to_string()),
            ..Self::default()
        }
    }

    pub fn already_submitted() -> Self {
        Self {
            success: true,
            skipped: true,
            status: Some(UploadStatus::Submitted),
            message: Some("Model already submitted, submission skipped".to_string()),
            ..Self::default()
        }
    }

    pub fn failure(
        code: SubmitErrorCode,
        error: impl Into<String>,
        status: Option<UploadStatus>,
    ) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            error_code: Some(code),
            status,
            ..Self::default()
        }
    }

    pub fn with_poll(mut self, poll: Option<PollOutcome>) -> Self {
        self.poll = poll;
        self
    }
}
