//! Configuration management for the harvest CLI
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `HARVEST_*` environment variables for the tuning knobs, then command-line flags
//! (which also cover `HARVEST_ENDPOINT_BASE`, `HARVEST_AUTH_TOKEN` and
//! `HARVEST_OUTPUT_DIR` through clap). The resolved [`HarvestConfig`] is passed
//! explicitly to every component that needs it.

use crate::collect::RetryOn;
use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// Configuration Defaults
// ============================================================================

/// Records requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Attempts per request before giving up.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Base delay for linear retry backoff (attempt `k` waits `k * base`).
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 2_000;

/// Pause between page requests.
pub const DEFAULT_PACING_DELAY_MS: u64 = 100;

/// Timeout for a single API request.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Timeout for a single attachment download.
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 60;

/// Config file picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "harvest.toml";

/// Resolved harvest configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Base URL of the paginated API (e.g. `https://api.example.com`)
    pub endpoint_base: String,

    /// Bearer token sent with every API request
    pub auth_token: Option<String>,

    /// Records requested per page
    pub page_size: u32,

    /// Attempts per request (including the first)
    pub max_retries: u32,

    /// Linear backoff base delay in milliseconds
    pub retry_base_delay_ms: u64,

    /// Delay between page requests in milliseconds
    pub pacing_delay_ms: u64,

    /// API request timeout in seconds
    pub request_timeout_secs: u64,

    /// Attachment download timeout in seconds
    pub download_timeout_secs: u64,

    /// Which failures are retried
    pub retry_on: RetryOn,

    /// Query parameter carrying the page size
    pub limit_param: String,

    /// Query parameter carrying the page offset
    pub skip_param: String,

    /// Root directory for produced artifacts
    pub output_dir: PathBuf,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            endpoint_base: String::new(),
            auth_token: None,
            page_size: DEFAULT_PAGE_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            pacing_delay_ms: DEFAULT_PACING_DELAY_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            retry_on: RetryOn::default(),
            limit_param: "$limit".to_string(),
            skip_param: "$skip".to_string(),
            output_dir: PathBuf::from("data"),
        }
    }
}

/// Values supplied on the command line; `None` leaves the lower layer untouched
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub endpoint_base: Option<String>,
    pub auth_token: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub page_size: Option<u32>,
}

impl HarvestConfig {
    /// Load a TOML config file; missing keys fall back to defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::config(format!("cannot read config file '{}': {}", path.display(), e))
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Load the explicit file if given, otherwise `harvest.toml` when present,
    /// otherwise the defaults
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Self::load(DEFAULT_CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    /// Apply `HARVEST_*` tuning overrides from the environment
    ///
    /// Recognized: `HARVEST_PAGE_SIZE`, `HARVEST_MAX_RETRIES`,
    /// `HARVEST_RETRY_BASE_DELAY_MS`, `HARVEST_PACING_DELAY_MS`,
    /// `HARVEST_REQUEST_TIMEOUT_SECS`, `HARVEST_DOWNLOAD_TIMEOUT_SECS`,
    /// `HARVEST_RETRY_ON`, `HARVEST_LIMIT_PARAM`, `HARVEST_SKIP_PARAM`.
    pub fn with_env(mut self) -> Result<Self> {
        if let Some(v) = env_parse("HARVEST_PAGE_SIZE")? {
            self.page_size = v;
        }
        if let Some(v) = env_parse("HARVEST_MAX_RETRIES")? {
            self.max_retries = v;
        }
        if let Some(v) = env_parse("HARVEST_RETRY_BASE_DELAY_MS")? {
            self.retry_base_delay_ms = v;
        }
        if let Some(v) = env_parse("HARVEST_PACING_DELAY_MS")? {
            self.pacing_delay_ms = v;
        }
        if let Some(v) = env_parse("HARVEST_REQUEST_TIMEOUT_SECS")? {
            self.request_timeout_secs = v;
        }
        if let Some(v) = env_parse("HARVEST_DOWNLOAD_TIMEOUT_SECS")? {
            self.download_timeout_secs = v;
        }
        if let Some(v) = env_parse("HARVEST_RETRY_ON")? {
            self.retry_on = v;
        }
        if let Ok(v) = std::env::var("HARVEST_LIMIT_PARAM") {
            self.limit_param = v;
        }
        if let Ok(v) = std::env::var("HARVEST_SKIP_PARAM") {
            self.skip_param = v;
        }
        Ok(self)
    }

    /// Apply command-line overrides
    pub fn apply(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(base) = overrides.endpoint_base {
            self.endpoint_base = base;
        }
        if let Some(token) = overrides.auth_token {
            self.auth_token = Some(token);
        }
        if let Some(dir) = overrides.output_dir {
            self.output_dir = dir;
        }
        if let Some(size) = overrides.page_size {
            self.page_size = size;
        }
        self
    }

    /// Reject settings the collector cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.endpoint_base.trim().is_empty() {
            return Err(CliError::config(
                "endpoint_base is not set (use --base-url or HARVEST_ENDPOINT_BASE)",
            ));
        }
        if self.page_size == 0 {
            return Err(CliError::config("page_size must be at least 1"));
        }
        if self.max_retries == 0 {
            return Err(CliError::config("max_retries must be at least 1"));
        }
        if self.limit_param.is_empty() || self.skip_param.is_empty() {
            return Err(CliError::config("limit_param and skip_param must not be empty"));
        }
        Ok(())
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    /// Copy safe to print: the token is masked
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.auth_token.is_some() {
            copy.auth_token = Some("********".to_string());
        }
        copy
    }
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| CliError::config(format!("{} has an invalid value '{}'", name, raw))),
        Err(_) => Ok(None),
    }
}
