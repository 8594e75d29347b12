//! Recent upload history
//!
//! In-memory, newest first, capped at `MAX_HISTORY_ITEMS`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const MAX_HISTORY_ITEMS: usize = 20;

/// One workflow run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRecord {
    pub file_name: String,
    pub task_id: Option<String>,
    /// e.g. "submitted", "parsing_not_complete", "failed"
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

impl UploadRecord {
    pub fn new(file_name: impl Into<String>, task_id: Option<String>, status: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            task_id,
            status: status.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Shared, bounded upload history
#[derive(Debug, Clone, Default)]
pub struct UploadHistory {
    records: Arc<RwLock<VecDeque<UploadRecord>>>,
}

impl UploadHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, record: UploadRecord) {
        let mut records = self.records.write().await;
        records.push_front(record);
        records.truncate(MAX_HISTORY_ITEMS);
    }

    /// Up to `limit` records, newest first
    pub async fn recent(&self, limit: usize) -> Vec<UploadRecord> {
        self.records.read().await.iter().take(limit).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}
