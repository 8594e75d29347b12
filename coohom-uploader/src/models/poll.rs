//! Poll history and outcome

use chrono::{DateTime, Utc};
use coohom_common::UploadStatus;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One status call made by the poller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollAttempt {
    /// 1-based attempt number
    pub attempt: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<UploadStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

/// Summary of a polling run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollOutcome {
    /// At least one status call succeeded and polling was not cancelled
    pub success: bool,
    /// Polling stopped because the stop condition was met
    pub completed_early: bool,
    /// Last status seen
    pub status: Option<UploadStatus>,
    /// Number of status calls made
    pub final_attempt: u32,
    pub history: Vec<PollAttempt>,
    /// Raw payload of the last successful status call
    pub final_response: Option<Value>,
    /// Last error, when no status was ever obtained or polling was cancelled
    pub error: Option<String>,
    pub cancelled: bool,
}

impl PollOutcome {
    pub fn reached_terminal(&self) -> bool {
        self.completed_early && self.status.map(UploadStatus::is_terminal).unwrap_or(false)
    }
}
