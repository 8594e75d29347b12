//! Coohom REST API client
//!
//! Five calls make up an upload:
//! 1. `GET  /global/commodity/upload/sts`    temporary object-store credentials
//! 2. object-store PUT of the archive (delegated to an `ObjectStore`)
//! 3. `POST /global/commodity/upload/parse`  start remote parsing
//! 4. `GET  /global/commodity/upload/status` read task status
//! 5. `POST /global/commodity/upload/submit` publish the parsed model
//!
//! Every call carries freshly signed `appkey`/`timestamp`/`sign` parameters.
//! Responses use the envelope `{"c": code, "m": message, "d": data}`, where a
//! code of `"0"` means success.

pub mod error;

pub use error::{CoohomError, TIMEOUT_CODE};

use async_trait::async_trait;
use coohom_common::{Credentials, SignedParams, UploadStatus};
use reqwest::StatusCode;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{StatusRecord, StsGrant, SubmissionResult, SubmitParams, UploadTask};
use crate::storage::{ObjectStore, OssObjectStore};

const USER_AGENT: &str = concat!("coohom-uploader/", env!("CARGO_PKG_VERSION"));
const ARCHIVE_CONTENT_TYPE: &str = "application/zip";
const ERROR_BODY_EXCERPT: usize = 200;

/// Remote endpoints used by the workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Sts,
    Parse,
    Status,
    Submit,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Self::Sts => "/global/commodity/upload/sts",
            Self::Parse => "/global/commodity/upload/parse",
            Self::Status => "/global/commodity/upload/status",
            Self::Submit => "/global/commodity/upload/submit",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sts => "sts",
            Self::Parse => "parse",
            Self::Status => "status",
            Self::Submit => "submit",
        }
    }

    fn is_post(self) -> bool {
        matches!(self, Self::Parse | Self::Submit)
    }
}

/// The five remote operations of an upload
///
/// `CoohomClient` is the HTTP implementation; the poller and safe submitter
/// only depend on this trait.
#[async_trait]
pub trait CoohomApi: Send + Sync {
    /// Request temporary object-store credentials for `file_name`
    ///
    /// Code 100004 fails with `Transient`; any other non-zero code with `Auth`.
    async fn get_sts_credentials(&self, file_name: &str) -> Result<StsGrant, CoohomError>;

    /// Upload the archive with the grant's temporary credentials
    ///
    /// Consumes the grant.
    async fn upload_to_object_store(
        &self,
        grant: StsGrant,
        archive_path: &Path,
    ) -> Result<UploadTask, CoohomError>;

    /// Ask the remote service to start parsing the uploaded archive
    async fn request_parse(&self, upload_task_id: &str) -> Result<(), CoohomError>;

    /// Read the current task status. Idempotent.
    async fn check_status(&self, upload_task_id: &str) -> Result<StatusRecord, CoohomError>;

    /// Submit the parsed model
    ///
    /// Fails with `NotParsed` when the remote reports the archive has not
    /// finished parsing.
    async fn submit_model(
        &self,
        upload_task_id: &str,
        params: &SubmitParams,
    ) -> Result<SubmissionResult, CoohomError>;
}

/// Decoded response envelope
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Envelope {
    pub code: String,
    pub message: String,
    pub data: Value,
}

impl Envelope {
    /// Decode `{"c", "m", "d"}`; `c` may be a string or a number
    pub(crate) fn from_value(value: Value) -> Result<Self, CoohomError> {
        let Value::Object(mut map) = value else {
            return Err(CoohomError::Parse("response is not a JSON object".to_string()));
        };

        let code = match map.remove("c") {
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(CoohomError::Parse(
                    "response is missing the 'c' code field".to_string(),
                ))
            }
        };
        let message = match map.remove("m") {
            Some(Value::String(s)) => s,
            None | Some(Value::Null) => String::new(),
            Some(other) => other.to_string(),
        };
        let data = map.remove("d").unwrap_or(Value::Null);

        Ok(Self { code, message, data })
    }

    pub(crate) fn is_success(&self) -> bool {
        self.code == "0"
    }
}

/// Map a non-zero response code to a typed error
pub(crate) fn classify_failure(endpoint: Endpoint, code: String, message: String) -> CoohomError {
    if code == TIMEOUT_CODE {
        return CoohomError::Transient { code, message };
    }
    match endpoint {
        Endpoint::Sts => CoohomError::Auth { code, message },
        Endpoint::Submit if is_not_parsed_message(&message) => {
            CoohomError::NotParsed { code, message }
        }
        _ => CoohomError::Remote { code, message },
    }
}

/// The remote's "compressed package not parsed successfully" rejection
pub fn is_not_parsed_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("not parsed") || lower.contains("not been parsed") || message.contains("未解析")
}

/// Read the status code from a status payload (`{"status": 3}`, `"3"` or `3`)
pub(crate) fn parse_status_code(data: &Value) -> Result<i64, CoohomError> {
    let field = match data {
        Value::Object(map) => map.get("status").cloned().unwrap_or(Value::Null),
        other => other.clone(),
    };
    match field {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| CoohomError::Parse(format!("status is not an integer: {}", n))),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| CoohomError::Parse(format!("status is not an integer: {}", s))),
        _ => Err(CoohomError::Parse(
            "status response is missing the 'status' field".to_string(),
        )),
    }
}

/// Model identifier from a submit payload
pub(crate) fn extract_model_id(data: &Value) -> Option<String> {
    fn scalar(value: &Value) -> Option<String> {
        match value {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    match data {
        Value::Object(map) => ["modelId", "brandGoodId", "obsBrandGoodId", "model_id"]
            .iter()
            .find_map(|key| map.get(*key).and_then(scalar)),
        other => scalar(other),
    }
}

fn excerpt(text: &str) -> String {
    text.chars().take(ERROR_BODY_EXCERPT).collect()
}

/// HTTP implementation of `CoohomApi`
pub struct CoohomClient {
    http_client: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    object_store: Arc<dyn ObjectStore>,
}

impl CoohomClient {
    pub fn new(
        credentials: Credentials,
        base_url: impl Into<String>,
        timeout: Duration,
        object_store: Arc<dyn ObjectStore>,
    ) -> Result<Self, CoohomError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| CoohomError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            object_store,
        })
    }

    /// Client backed by Alibaba OSS
    pub fn with_oss(
        credentials: Credentials,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CoohomError> {
        let store = OssObjectStore::new()?;
        Self::new(credentials, base_url, timeout, Arc::new(store))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sign, send and unwrap one call, returning the `d` payload
    async fn call(
        &self,
        endpoint: Endpoint,
        params: Vec<(&'static str, String)>,
    ) -> Result<Value, CoohomError> {
        // Signatures are time-bound: sign right before sending
        let signed = SignedParams::now(&self.credentials);
        let mut fields: Vec<(&'static str, String)> = vec![
            ("appkey", signed.appkey.clone()),
            ("timestamp", signed.timestamp.to_string()),
            ("sign", signed.sign.clone()),
        ];
        fields.extend(params);

        let url = format!("{}{}", self.base_url, endpoint.path());
        tracing::debug!(
            endpoint = endpoint.name(),
            timestamp = signed.timestamp,
            sign = signed.sign_prefix(),
            "Calling Coohom API"
        );

        let request = if endpoint.is_post() {
            self.http_client.post(&url).form(&fields)
        } else {
            self.http_client.get(&url).query(&fields)
        };

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                CoohomError::Network(format!("request to {} timed out: {}", endpoint.name(), e))
            } else {
                CoohomError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(CoohomError::Auth {
                code: status.as_u16().to_string(),
                message: excerpt(&body),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoohomError::Http {
                status: status.as_u16(),
                body: excerpt(&body),
            });
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| CoohomError::Parse(e.to_string()))?;
        let envelope = Envelope::from_value(value)?;

        if envelope.is_success() {
            return Ok(envelope.data);
        }

        tracing::warn!(
            endpoint = endpoint.name(),
            code = %envelope.code,
            message = %envelope.message,
            "Coohom API returned an error"
        );
        Err(classify_failure(endpoint, envelope.code, envelope.message))
    }
}

#[async_trait]
impl CoohomApi for CoohomClient {
    async fn get_sts_credentials(&self, file_name: &str) -> Result<StsGrant, CoohomError> {
        let data = self
            .call(Endpoint::Sts, vec![("file_name", file_name.to_string())])
            .await?;

        let grant: StsGrant = serde_json::from_value(data)
            .map_err(|e| CoohomError::Parse(format!("invalid STS payload: {}", e)))?;

        tracing::info!(
            upload_task_id = %grant.upload_task_id,
            bucket = %grant.bucket,
            region = %grant.region,
            "STS credentials obtained"
        );
        Ok(grant)
    }

    async fn upload_to_object_store(
        &self,
        grant: StsGrant,
        archive_path: &Path,
    ) -> Result<UploadTask, CoohomError> {
        let body = tokio::fs::read(archive_path).await?;

        tracing::info!(
            upload_task_id = %grant.upload_task_id,
            key = %grant.file_path,
            bytes = body.len(),
            "Uploading archive to object store"
        );

        self.object_store
            .put_object(&grant, body, ARCHIVE_CONTENT_TYPE)
            .await?;

        let task = UploadTask::from(grant);
        tracing::info!(upload_task_id = %task.upload_task_id, "Archive uploaded");
        Ok(task)
    }

    async fn request_parse(&self, upload_task_id: &str) -> Result<(), CoohomError> {
        self.call(
            Endpoint::Parse,
            vec![("upload_task_id", upload_task_id.to_string())],
        )
        .await?;

        tracing::info!(upload_task_id, "Parse requested");
        Ok(())
    }

    async fn check_status(&self, upload_task_id: &str) -> Result<StatusRecord, CoohomError> {
        let data = self
            .call(
                Endpoint::Status,
                vec![("upload_task_id", upload_task_id.to_string())],
            )
            .await?;

        let code = parse_status_code(&data)?;
        let status = UploadStatus::from_code(code).ok_or(CoohomError::StatusUnknown(code))?;

        tracing::debug!(upload_task_id, status = %status, "Status checked");
        Ok(StatusRecord::new(upload_task_id, status, data))
    }

    async fn submit_model(
        &self,
        upload_task_id: &str,
        params: &SubmitParams,
    ) -> Result<SubmissionResult, CoohomError> {
        let mut fields = vec![("upload_task_id", upload_task_id.to_string())];
        fields.extend(params.to_form());

        let data = self.call(Endpoint::Submit, fields).await?;
        let model_id = extract_model_id(&data).unwrap_or_else(|| upload_task_id.to_string());

        tracing::info!(upload_task_id, model_id = %model_id, "Model submitted");
        Ok(SubmissionResult::submitted(model_id))
    }
}
