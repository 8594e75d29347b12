//! Status poller
//!
//! Calls `check_status` on a fixed interval until a stop condition holds or the
//! attempt budget runs out. Polling state only advances on successful status
//! calls; a failed call uses up an attempt and is kept in the history.

use chrono::Utc;
use coohom_common::config::PollingConfig;
use coohom_common::UploadStatus;
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::client::CoohomApi;
use crate::models::{PollAttempt, PollOutcome};

/// Attempt budget and interval for one polling run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Maximum number of status calls. 0 is treated as 1.
    pub max_attempts: u32,
    /// Delay between two status calls
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::from_minutes(5, 2)
    }
}

impl PollConfig {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    pub fn from_minutes(max_attempts: u32, interval_minutes: u64) -> Self {
        Self::new(max_attempts, interval_from_minutes(interval_minutes))
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl From<&PollingConfig> for PollConfig {
    fn from(config: &PollingConfig) -> Self {
        Self::from_minutes(config.max_attempts, config.interval_minutes)
    }
}

/// Minute-based interval; saturates instead of overflowing
pub fn interval_from_minutes(interval_minutes: u64) -> Duration {
    Duration::from_secs(interval_minutes.saturating_mul(60))
}

/// Accumulated state of a polling run
#[derive(Default)]
struct PollState {
    history: Vec<PollAttempt>,
    status: Option<UploadStatus>,
    final_response: Option<Value>,
    last_error: Option<String>,
}

impl PollState {
    fn finish(self, completed_early: bool, cancelled: bool) -> PollOutcome {
        let error = if cancelled {
            Some("Polling cancelled".to_string())
        } else if self.status.is_none() {
            self.last_error
        } else {
            None
        };

        PollOutcome {
            success: self.status.is_some() && !cancelled,
            completed_early,
            status: self.status,
            final_attempt: self.history.len() as u32,
            history: self.history,
            final_response: self.final_response,
            error,
            cancelled,
        }
    }
}

/// Poll until the task reaches a terminal status (2, 4, 5 or 6)
pub async fn poll_until_complete(
    api: &dyn CoohomApi,
    task_id: &str,
    config: &PollConfig,
    cancel: Option<&CancellationToken>,
) -> PollOutcome {
    poll_until(api, task_id, config, cancel, UploadStatus::is_terminal).await
}

/// Poll until `stop_when` accepts a status
///
/// Stops on the same call that returns an accepted status, with
/// `completed_early = true`. Otherwise makes exactly `max_attempts` calls and
/// reports the last status seen. Cancellation stops the run at the next wait.
pub async fn poll_until<F>(
    api: &dyn CoohomApi,
    task_id: &str,
    config: &PollConfig,
    cancel: Option<&CancellationToken>,
    stop_when: F,
) -> PollOutcome
where
    F: Fn(UploadStatus) -> bool,
{
    let max_attempts = config.attempts();
    let mut state = PollState::default();

    tracing::info!(
        task_id,
        max_attempts,
        interval_secs = config.interval.as_secs(),
        "Polling upload status"
    );

    for attempt in 1..=max_attempts {
        if cancel.map(CancellationToken::is_cancelled).unwrap_or(false) {
            tracing::info!(task_id, attempt, "Polling cancelled");
            return state.finish(false, true);
        }

        match api.check_status(task_id).await {
            Ok(record) => {
                tracing::debug!(task_id, attempt, status = %record.status, "Poll attempt");

                state.history.push(PollAttempt {
                    attempt,
                    status: Some(record.status),
                    error: None,
                    checked_at: record.timestamp,
                });
                state.status = Some(record.status);
                state.final_response = Some(record.raw_response);

                if stop_when(record.status) {
                    tracing::info!(
                        task_id,
                        attempt,
                        status = %record.status,
                        "Polling complete"
                    );
                    return state.finish(true, false);
                }
            }
            Err(e) => {
                tracing::warn!(task_id, attempt, error = %e, "Status check failed during polling");

                state.history.push(PollAttempt {
                    attempt,
                    status: None,
                    error: Some(e.to_string()),
                    checked_at: Utc::now(),
                });
                state.last_error = Some(e.to_string());
            }
        }

        if attempt < max_attempts && wait_cancelled(config.interval, cancel).await {
            tracing::info!(task_id, attempt, "Polling cancelled");
            return state.finish(false, true);
        }
    }

    tracing::warn!(
        task_id,
        max_attempts,
        last_status = ?state.status,
        "Polling attempts exhausted"
    );
    state.finish(false, false)
}

/// Sleep for `interval`; returns true if the token fired first
async fn wait_cancelled(interval: Duration, cancel: Option<&CancellationToken>) -> bool {
    match cancel {
        Some(token) => {
            tokio::select! {
                _ = token.cancelled() => true,
                _ = tokio::time::sleep(interval) => false,
            }
        }
        None => {
            tokio::time::sleep(interval).await;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PollConfig::default();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.interval, Duration::from_secs(120));
    }

    #[test]
    fn test_zero_attempts_means_one() {
        assert_eq!(PollConfig::new(0, Duration::ZERO).attempts(), 1);
        assert_eq!(PollConfig::new(3, Duration::ZERO).attempts(), 3);
    }

    #[test]
    fn test_from_polling_config() {
        let polling = PollingConfig {
            max_attempts: 7,
            interval_minutes: 1,
        };
        assert_eq!(
            PollConfig::from(&polling),
            PollConfig::new(7, Duration::from_secs(60))
        );
    }

    #[test]
    fn test_interval_minutes_saturate() {
        assert_eq!(interval_from_minutes(3), Duration::from_secs(180));
        assert_eq!(
            PollConfig::from_minutes(1, u64::MAX).interval,
            Duration::from_secs(u64::MAX)
        );
    }

    #[tokio::test]
    async fn test_wait_returns_early_when_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        assert!(wait_cancelled(Duration::from_secs(3600), Some(&token)).await);
        assert!(!wait_cancelled(Duration::from_millis(1), None).await);
    }

    #[test]
    fn test_finish_without_any_status() {
        let state = PollState {
            last_error: Some("Network error: refused".to_string()),
            ..PollState::default()
        };
        let outcome = state.finish(false, false);
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("Network error: refused"));
    }
}
