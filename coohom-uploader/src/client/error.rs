//! Coohom client errors

use thiserror::Error;

/// Remote code the API returns when it timed out server-side
pub const TIMEOUT_CODE: &str = "100004";

/// Errors raised by the API client and the object-store adapter
///
/// Remote failures keep the raw code and message: a server timeout and a
/// credential problem look alike without them.
#[derive(Debug, Error)]
pub enum CoohomError {
    #[error("Authentication rejected (code {code}): {message}")]
    Auth { code: String, message: String },

    /// Code 100004. Safe to retry later; never retried inside a single call.
    #[error("Remote timeout (code {code}): {message}")]
    Transient { code: String, message: String },

    #[error("Object store upload failed: {0}")]
    Upload(String),

    /// Submit called before the archive finished parsing
    #[error("Archive not parsed (code {code}): {message}")]
    NotParsed { code: String, message: String },

    #[error("Unknown upload status code: {0}")]
    StatusUnknown(i64),

    #[error("API error (code {code}): {message}")]
    Remote { code: String, message: String },

    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoohomError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Stable machine-readable kind, used in HTTP error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "AUTH_ERROR",
            Self::Transient { .. } => "TRANSIENT_ERROR",
            Self::Upload(_) => "UPLOAD_ERROR",
            Self::NotParsed { .. } => "NOT_PARSED_ERROR",
            Self::StatusUnknown(_) => "STATUS_UNKNOWN_ERROR",
            Self::Remote { .. } => "REMOTE_ERROR",
            Self::Http { .. } => "HTTP_ERROR",
            Self::Network(_) => "NETWORK_ERROR",
            Self::Parse(_) => "PARSE_ERROR",
            Self::Io(_) => "IO_ERROR",
        }
    }
}
