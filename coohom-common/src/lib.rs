//! # Coohom Common Library
//!
//! Shared code for the Coohom uploader crates:
//! - Error type
//! - Configuration and credential loading
//! - Request signature generation
//! - Upload status codes
//! - Human-readable size and duration helpers

pub mod config;
pub mod error;
pub mod human_size;
pub mod signature;
pub mod status;

pub use config::Credentials;
pub use error::{Error, Result};
pub use signature::{sign, SignedParams};
pub use status::UploadStatus;
