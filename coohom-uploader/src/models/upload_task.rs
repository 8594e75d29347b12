//! Upload task identity, STS grants and status records

use chrono::{DateTime, Utc};
use coohom_common::UploadStatus;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Temporary object-store credentials for one upload
///
/// Returned by the STS endpoint. A grant is single-use: the upload step
/// takes it by value and the type is not `Clone`, so it cannot back a
/// second upload.
///
/// ```compile_fail
/// use coohom_uploader::models::StsGrant;
///
/// fn reuse(grant: StsGrant) -> (StsGrant, StsGrant) {
///     (grant.clone(), grant)
/// }
/// ```
#[derive(PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StsGrant {
    pub access_key_id: String,
    pub access_key_secret: String,
    pub security_token: String,
    pub bucket: String,
    pub region: String,
    pub file_path: String,
    #[serde(deserialize_with = "string_or_number")]
    pub upload_task_id: String,
}

impl fmt::Debug for StsGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StsGrant")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<redacted>")
            .field("security_token", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("file_path", &self.file_path)
            .field("upload_task_id", &self.upload_task_id)
            .finish()
    }
}

impl StsGrant {
    /// Non-secret view of the grant for logs and responses
    pub fn summary(&self) -> GrantSummary {
        GrantSummary {
            upload_task_id: self.upload_task_id.clone(),
            bucket: self.bucket.clone(),
            region: self.region.clone(),
            file_path: self.file_path.clone(),
        }
    }
}

/// STS grant without credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrantSummary {
    pub upload_task_id: String,
    pub bucket: String,
    pub region: String,
    pub file_path: String,
}

/// Identifies one upload from STS through parse and submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTask {
    pub upload_task_id: String,
    pub file_path: String,
    pub created_at: DateTime<Utc>,
}

impl From<StsGrant> for UploadTask {
    fn from(grant: StsGrant) -> Self {
        Self {
            upload_task_id: grant.upload_task_id,
            file_path: grant.file_path,
            created_at: Utc::now(),
        }
    }
}

/// Result of one successful status call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub task_id: String,
    pub status: UploadStatus,
    pub timestamp: DateTime<Utc>,
    /// The `d` payload exactly as the remote returned it
    pub raw_response: Value,
}

impl StatusRecord {
    pub fn new(task_id: impl Into<String>, status: UploadStatus, raw_response: Value) -> Self {
        Self {
            task_id: task_id.into(),
            status,
            timestamp: Utc::now(),
            raw_response,
        }
    }
}

/// Accept `"T1"` or `12345` for identifier fields
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}
