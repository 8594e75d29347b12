//! Data models for the upload workflow
//!
//! - Upload task identity and STS grants
//! - Status records and poll outcomes
//! - Submission parameters and results
//! - Upload history records

pub mod poll;
pub mod submission;
pub mod upload_record;
pub mod upload_task;

pub use poll::{PollAttempt, PollOutcome};
pub use submission::{SubmissionResult, SubmitErrorCode, SubmitParams};
pub use upload_record::{UploadHistory, UploadRecord};
pub use upload_task::{GrantSummary, StatusRecord, StsGrant, UploadTask};
