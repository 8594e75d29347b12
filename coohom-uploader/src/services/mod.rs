//! Upload workflow services
//!
//! - Status poller
//! - Safe submitter
//! - File packager
//! - STS retry helper
//! - End-to-end workflow

pub mod packager;
pub mod poller;
pub mod safe_submitter;
pub mod sts_retry;
pub mod workflow;

pub use packager::{FileInfo, FilePackager, PackagedArchive};
pub use poller::{interval_from_minutes, poll_until, poll_until_complete, PollConfig};
pub use safe_submitter::{safe_submit, SafeSubmitOptions};
pub use sts_retry::{get_sts_with_backoff, get_sts_with_retry};
pub use workflow::{StepRecord, UploadWorkflow, WorkflowOptions, WorkflowReport, WorkflowStage};
