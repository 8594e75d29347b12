//! Settings resolution for coohom-uploader
//!
//! Combines an already loaded TOML config, command-line overrides and the
//! credential resolver into one `Settings` value, and builds the API client
//! from it. The TOML is loaded separately so logging can be set up first.

use coohom_common::config::{CredentialResolver, TomlConfig};
use coohom_common::{Credentials, Result};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::client::{CoohomClient, CoohomError};
use crate::services::PollConfig;

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub config_path: Option<PathBuf>,
    pub credentials_file: Option<PathBuf>,
    pub base_url: Option<String>,
}

/// Fully resolved runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub toml: TomlConfig,
    pub credentials: Credentials,
    pub api_base_url: String,
}

impl Settings {
    /// Resolve credentials for an already loaded config
    ///
    /// Missing credentials are fatal (`Error::Config`). The resolver logs
    /// which source was used.
    pub fn resolve(toml: TomlConfig, overrides: &SettingsOverrides) -> Result<Self> {
        let (credentials, _source) =
            CredentialResolver::new(overrides.credentials_file.clone(), &toml).resolve()?;
        Ok(Self::from_parts(toml, credentials, overrides.base_url.clone()))
    }

    pub fn from_parts(toml: TomlConfig, credentials: Credentials, base_url: Option<String>) -> Self {
        let api_base_url = base_url.unwrap_or_else(|| toml.api_base_url.clone());
        info!(api_base_url = %api_base_url, "Coohom API endpoint");
        Self {
            toml,
            credentials,
            api_base_url,
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.toml.http_timeout_secs.max(1))
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig::from(&self.toml.polling)
    }

    pub fn work_dir(&self) -> PathBuf {
        self.toml.work_dir()
    }

    /// OSS-backed client for the configured endpoint
    pub fn build_client(&self) -> std::result::Result<CoohomClient, CoohomError> {
        CoohomClient::with_oss(
            self.credentials.clone(),
            self.api_base_url.clone(),
            self.http_timeout(),
        )
    }
}
