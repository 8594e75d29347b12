//! Configuration loading and credential resolution
//!
//! Two inputs feed the uploader:
//! - An optional TOML file (`config.toml`) with API, polling and logging settings
//! - API credentials (`appKey`/`appSecret`), resolved from several sources
//!
//! Credential resolution priority:
//! 1. `--credentials` file given on the command line
//! 2. Environment variables `COOHOM_APP_KEY` / `COOHOM_APP_SECRET`
//! 3. `app_key` / `app_secret` in the TOML file
//! 4. `credentials_file` named in the TOML file
//! 5. `credentials.txt`, then `credential.txt`, in the working directory
//!
//! Missing credentials are a fatal configuration error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the TOML config path
pub const CONFIG_PATH_ENV: &str = "COOHOM_CONFIG";
/// Environment variable holding the app key
pub const APP_KEY_ENV: &str = "COOHOM_APP_KEY";
/// Environment variable holding the app secret
pub const APP_SECRET_ENV: &str = "COOHOM_APP_SECRET";

/// Credential file names probed in the working directory, in order
pub const DEFAULT_CREDENTIAL_FILES: [&str; 2] = ["credentials.txt", "credential.txt"];

pub const DEFAULT_API_BASE_URL: &str = "https://api.coohom.com";
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5790";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Coohom API credentials
///
/// Loaded once at startup and never mutated.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub app_key: String,
    pub app_secret: String,
}

impl Credentials {
    pub fn new(app_key: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            app_key: app_key.into(),
            app_secret: app_secret.into(),
        }
    }

    /// Parse `key=value` credential text (`appKey=...`, `appSecret=...`)
    ///
    /// Lines without `=` and `#` comments are ignored. Only the first `=`
    /// splits, so secrets may contain `=`.
    pub fn parse(content: &str) -> Result<Self> {
        let mut app_key = None;
        let mut app_secret = None;

        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            match key.trim() {
                "appKey" => app_key = Some(value.trim().to_string()),
                "appSecret" => app_secret = Some(value.trim().to_string()),
                _ => {}
            }
        }

        match (app_key, app_secret) {
            (Some(key), Some(secret)) if is_valid_value(&key) && is_valid_value(&secret) => {
                Ok(Self::new(key, secret))
            }
            _ => Err(Error::Config(
                "credentials must define non-empty appKey and appSecret".to_string(),
            )),
        }
    }

    /// Load credentials from a `key=value` file
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read credentials file {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("{} ({})", e, path.display())))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("app_key", &self.app_key)
            .field("app_secret", &"<redacted>")
            .finish()
    }
}

/// Reject empty or whitespace-only values
pub fn is_valid_value(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Logging section of the TOML config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Polling section of the TOML config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval_minutes: default_interval_minutes(),
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_interval_minutes() -> u64 {
    2
}

/// Uploader TOML configuration
///
/// Every field is optional in the file; missing fields take defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default)]
    pub credentials_file: Option<PathBuf>,

    #[serde(default)]
    pub app_key: Option<String>,

    #[serde(default)]
    pub app_secret: Option<String>,

    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Directory for generated archives (system temp dir when unset)
    #[serde(default)]
    pub work_dir: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub polling: PollingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            credentials_file: None,
            app_key: None,
            app_secret: None,
            http_timeout_secs: default_http_timeout_secs(),
            bind_address: default_bind_address(),
            work_dir: None,
            logging: LoggingConfig::default(),
            polling: PollingConfig::default(),
        }
    }
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}

impl TomlConfig {
    /// Work directory for generated archives
    pub fn work_dir(&self) -> PathBuf {
        self.work_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("coohom-uploader"))
    }
}

/// Platform config path: `{config_dir}/coohom-uploader/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("coohom-uploader").join("config.toml"))
}

/// Load the TOML config
///
/// An explicitly requested file (argument or `COOHOM_CONFIG`) must exist.
/// The platform default path is optional: when absent, defaults are used and
/// a warning is logged.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let env_path = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);

    if let Some(path) = explicit.map(Path::to_path_buf).or(env_path) {
        return read_toml_config(&path);
    }

    match default_config_path() {
        Some(path) if path.exists() => read_toml_config(&path),
        Some(path) => {
            warn!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            Ok(TomlConfig::default())
        }
        None => {
            warn!("Could not determine config directory, using defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Read and parse a TOML config file
pub fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Where resolved credentials came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    CliFile(PathBuf),
    Environment,
    Toml,
    TomlFile(PathBuf),
    WorkingDirectory(PathBuf),
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CliFile(p) => write!(f, "command-line file {}", p.display()),
            Self::Environment => write!(f, "environment"),
            Self::Toml => write!(f, "TOML config"),
            Self::TomlFile(p) => write!(f, "TOML credentials_file {}", p.display()),
            Self::WorkingDirectory(p) => write!(f, "{}", p.display()),
        }
    }
}

/// Multi-source credential resolver
pub struct CredentialResolver<'a> {
    cli_file: Option<PathBuf>,
    toml: &'a TomlConfig,
    search_dir: PathBuf,
}

impl<'a> CredentialResolver<'a> {
    pub fn new(cli_file: Option<PathBuf>, toml: &'a TomlConfig) -> Self {
        Self {
            cli_file,
            toml,
            search_dir: PathBuf::from("."),
        }
    }

    /// Directory probed for `credentials.txt` / `credential.txt`
    pub fn with_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_dir = dir.into();
        self
    }

    /// Resolve credentials by priority
    pub fn resolve(&self) -> Result<(Credentials, CredentialSource)> {
        // Tier 1: explicit file. A bad explicit file is an error, not a fallthrough.
        if let Some(path) = &self.cli_file {
            let creds = Credentials::load_file(path)?;
            return Ok(self.finish(creds, CredentialSource::CliFile(path.clone())));
        }

        let mut sources = Vec::new();

        // Tier 2: environment
        let env_creds = match (std::env::var(APP_KEY_ENV), std::env::var(APP_SECRET_ENV)) {
            (Ok(key), Ok(secret)) if is_valid_value(&key) && is_valid_value(&secret) => {
                sources.push("environment");
                Some(Credentials::new(key.trim(), secret.trim()))
            }
            _ => None,
        };

        // Tier 3: inline TOML values
        let toml_creds = match (&self.toml.app_key, &self.toml.app_secret) {
            (Some(key), Some(secret)) if is_valid_value(key) && is_valid_value(secret) => {
                sources.push("TOML");
                Some(Credentials::new(key.trim(), secret.trim()))
            }
            _ => None,
        };

        if sources.len() > 1 {
            warn!(
                "Credentials found in multiple sources: {}. Using {}.",
                sources.join(", "),
                sources[0]
            );
        }

        if let Some(creds) = env_creds {
            return Ok(self.finish(creds, CredentialSource::Environment));
        }
        if let Some(creds) = toml_creds {
            return Ok(self.finish(creds, CredentialSource::Toml));
        }

        // Tier 4: credentials file named in TOML
        if let Some(path) = &self.toml.credentials_file {
            let creds = Credentials::load_file(path)?;
            return Ok(self.finish(creds, CredentialSource::TomlFile(path.clone())));
        }

        // Tier 5: well-known files in the working directory
        for name in DEFAULT_CREDENTIAL_FILES {
            let path = self.search_dir.join(name);
            if !path.exists() {
                continue;
            }
            match Credentials::load_file(&path) {
                Ok(creds) => {
                    return Ok(self.finish(creds, CredentialSource::WorkingDirectory(path)));
                }
                Err(e) => warn!("Skipping incomplete credentials file: {}", e),
            }
        }

        Err(Error::Config(format!(
            "Coohom credentials not configured. Provide one of:\n\
             1. --credentials <file> with appKey=... and appSecret=... lines\n\
             2. Environment: {}=... and {}=...\n\
             3. TOML config: app_key / app_secret, or credentials_file\n\
             4. credentials.txt in {}",
            APP_KEY_ENV,
            APP_SECRET_ENV,
            self.search_dir.display()
        )))
    }

    fn finish(&self, creds: Credentials, source: CredentialSource) -> (Credentials, CredentialSource) {
        info!(app_key = %creds.app_key, "Credentials loaded from {}", source);
        (creds, source)
    }
}
