//! Test helper utilities
//!
//! Shared utilities for testing coohom-uploader

#![allow(dead_code)]

pub mod fake_api;
pub mod log_capture;
pub mod mock_server;

pub use fake_api::{test_grant, FakeApi, StatusStep, StsStep, SubmitStep};
pub use log_capture::{capture_logs, LogCapture};
pub use mock_server::{client_for, spawn_mock, Canned, MockCoohom, APP_KEY, APP_SECRET};

use std::path::PathBuf;
use std::time::Duration;

use coohom_uploader::services::PollConfig;

/// Poll budget with no waiting between attempts
pub fn fast_poll(max_attempts: u32) -> PollConfig {
    PollConfig::new(max_attempts, Duration::from_millis(1))
}

/// Write a small zip-named file into `dir`
pub fn write_archive(dir: &std::path::Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"PK\x03\x04 test archive").unwrap();
    path
}
