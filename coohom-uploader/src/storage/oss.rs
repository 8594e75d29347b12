//! Alibaba Cloud OSS upload with STS credentials
//!
//! Uses OSS header signing (V1):
//!
//! ```text
//! StringToSign = VERB \n Content-MD5 \n Content-Type \n Date \n
//!                CanonicalizedOSSHeaders CanonicalizedResource
//! Authorization = "OSS " AccessKeyId ":" base64(hmac-sha1(AccessKeySecret, StringToSign))
//! ```
//!
//! The only OSS header sent is `x-oss-security-token`, so it is the whole
//! canonicalized header block.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::time::Duration;

use super::ObjectStore;
use crate::client::CoohomError;
use crate::models::StsGrant;

type HmacSha1 = Hmac<Sha1>;

const SECURITY_TOKEN_HEADER: &str = "x-oss-security-token";
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(600);
const OSS_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Virtual-hosted OSS endpoint for a bucket
///
/// Regions are accepted with or without the `oss-` prefix.
///
/// # Examples
///
/// ```
/// use coohom_uploader::storage::oss::endpoint_host;
///
/// assert_eq!(endpoint_host("models", "cn-hangzhou"), "models.oss-cn-hangzhou.aliyuncs.com");
/// assert_eq!(endpoint_host("models", "oss-us-west-1"), "models.oss-us-west-1.aliyuncs.com");
/// ```
pub fn endpoint_host(bucket: &str, region: &str) -> String {
    let region = region.strip_prefix("oss-").unwrap_or(region);
    format!("{}.oss-{}.aliyuncs.com", bucket, region)
}

/// `Date` header value in the format OSS expects
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format(OSS_DATE_FORMAT).to_string()
}

/// Canonical string for a PUT with an STS security token
pub fn string_to_sign(
    content_type: &str,
    date: &str,
    security_token: &str,
    bucket: &str,
    key: &str,
) -> String {
    format!(
        "PUT\n\n{}\n{}\n{}:{}\n/{}/{}",
        content_type,
        date,
        SECURITY_TOKEN_HEADER,
        security_token,
        bucket,
        key.trim_start_matches('/')
    )
}

/// `Authorization` header value for a canonical string
pub fn authorization(
    access_key_id: &str,
    access_key_secret: &str,
    string_to_sign: &str,
) -> Result<String, CoohomError> {
    let mut mac = HmacSha1::new_from_slice(access_key_secret.as_bytes())
        .map_err(|e| CoohomError::Upload(format!("invalid signing key: {}", e)))?;
    mac.update(string_to_sign.as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());
    Ok(format!("OSS {}:{}", access_key_id, signature))
}

/// OSS-backed `ObjectStore`
pub struct OssObjectStore {
    http_client: reqwest::Client,
    /// Base URL replacing the bucket endpoint, for local test servers
    endpoint_override: Option<String>,
}

impl OssObjectStore {
    pub fn new() -> Result<Self, CoohomError> {
        let http_client = reqwest::Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()
            .map_err(|e| CoohomError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint_override: None,
        })
    }

    /// Send uploads to `base_url` instead of `https://{bucket}.oss-{region}.aliyuncs.com`
    pub fn with_endpoint(base_url: impl Into<String>) -> Result<Self, CoohomError> {
        let mut store = Self::new()?;
        store.endpoint_override = Some(base_url.into().trim_end_matches('/').to_string());
        Ok(store)
    }

    fn object_url(&self, grant: &StsGrant) -> String {
        let key = grant.file_path.trim_start_matches('/');
        match &self.endpoint_override {
            Some(base) => format!("{}/{}", base, key),
            None => format!("https://{}/{}", endpoint_host(&grant.bucket, &grant.region), key),
        }
    }
}

#[async_trait]
impl ObjectStore for OssObjectStore {
    async fn put_object(
        &self,
        grant: &StsGrant,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), CoohomError> {
        let date = http_date(Utc::now());
        let canonical = string_to_sign(
            content_type,
            &date,
            &grant.security_token,
            &grant.bucket,
            &grant.file_path,
        );
        let auth = authorization(&grant.access_key_id, &grant.access_key_secret, &canonical)?;
        let url = self.object_url(grant);

        tracing::debug!(url = %url, bytes = body.len(), "PUT object");

        let response = self
            .http_client
            .put(&url)
            .header("Date", date)
            .header("Content-Type", content_type)
            .header(SECURITY_TOKEN_HEADER, &grant.security_token)
            .header("Authorization", auth)
            .body(body)
            .send()
            .await
            .map_err(|e| CoohomError::Upload(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(200).collect();
            tracing::warn!(status = status.as_u16(), "Object store rejected upload");
            return Err(CoohomError::Upload(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        Ok(())
    }
}
