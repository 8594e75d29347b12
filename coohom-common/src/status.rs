//! Upload task status codes reported by the Coohom status endpoint
//!
//! Lifecycle: GENERATING → PARSING → PARSED → SUBMITTED, with PARSE_FAILED,
//! SUBMIT_FAILED and OFFLINE as the other terminal outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Remote upload task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UploadStatus {
    /// 0: archive received, task being generated
    Generating,
    /// 1: archive is being analyzed
    Parsing,
    /// 2: archive could not be analyzed (terminal)
    ParseFailed,
    /// 3: archive analyzed, ready to submit
    Parsed,
    /// 4: model submitted (terminal)
    Submitted,
    /// 5: submission failed (terminal)
    SubmitFailed,
    /// 6: archive analyzed offline (terminal)
    Offline,
}

impl UploadStatus {
    /// Map a remote status code, `None` for codes outside 0..=6
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Generating),
            1 => Some(Self::Parsing),
            2 => Some(Self::ParseFailed),
            3 => Some(Self::Parsed),
            4 => Some(Self::Submitted),
            5 => Some(Self::SubmitFailed),
            6 => Some(Self::Offline),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::Generating => 0,
            Self::Parsing => 1,
            Self::ParseFailed => 2,
            Self::Parsed => 3,
            Self::Submitted => 4,
            Self::SubmitFailed => 5,
            Self::Offline => 6,
        }
    }

    /// No further transitions happen after a terminal status
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::ParseFailed | Self::Submitted | Self::SubmitFailed | Self::Offline
        )
    }

    /// Archive still being generated or parsed; submitting now is rejected remotely
    pub fn is_pending(self) -> bool {
        matches!(self, Self::Generating | Self::Parsing)
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Generating => "Generating - upload is being processed",
            Self::Parsing => "Analyzing - ZIP file is being analyzed",
            Self::ParseFailed => "Failed - failed to analyze the ZIP file",
            Self::Parsed => "Ready - ZIP file analyzed and ready to submit",
            Self::Submitted => "Submitted - model has been submitted successfully",
            Self::SubmitFailed => "Failed - failed to submit the model",
            Self::Offline => "Offline - ZIP file analyzed offline",
        }
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.description())
    }
}
