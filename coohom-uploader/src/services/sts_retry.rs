//! Caller-driven retry of the STS step
//!
//! The client never retries on its own. When the STS endpoint answers with the
//! server-timeout code, the workflow may call it again after a linear backoff.

use std::time::Duration;

use crate::client::{CoohomApi, CoohomError};
use crate::models::StsGrant;

/// Base delay; attempt `n` (0-based) waits `(n + 1) * base`
pub const DEFAULT_STS_BACKOFF: Duration = Duration::from_secs(2);

/// Request STS credentials, retrying up to `max_retries` times on `Transient`
pub async fn get_sts_with_retry(
    api: &dyn CoohomApi,
    file_name: &str,
    max_retries: u32,
) -> Result<StsGrant, CoohomError> {
    get_sts_with_backoff(api, file_name, max_retries, DEFAULT_STS_BACKOFF).await
}

/// `get_sts_with_retry` with an explicit base delay
pub async fn get_sts_with_backoff(
    api: &dyn CoohomApi,
    file_name: &str,
    max_retries: u32,
    base: Duration,
) -> Result<StsGrant, CoohomError> {
    let mut attempt = 0;

    loop {
        match api.get_sts_credentials(file_name).await {
            Ok(grant) => {
                if attempt > 0 {
                    tracing::info!(file_name, attempt, "STS credentials obtained after retry");
                }
                return Ok(grant);
            }
            Err(e) if e.is_transient() && attempt < max_retries => {
                let delay = base * (attempt + 1);
                tracing::warn!(
                    file_name,
                    attempt = attempt + 1,
                    max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "STS request timed out remotely, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
