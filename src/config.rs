//! Dashboard Configuration
//!
//! The backend base URL is process-wide configuration supplied from the
//! environment (or `.env`) or the command line. It is validated before any
//! view mounts.

use std::time::Duration;

use clap::Parser;
use url::Url;

/// Dashboard refresh period
pub const DASHBOARD_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Log history refresh period
pub const LOGS_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Entries shown under "Recent Activity"
pub const RECENT_LOGS_LIMIT: u32 = 5;

/// Entries shown on the logs page
pub const LOG_HISTORY_LIMIT: u32 = 100;

pub const DEFAULT_OAUTH_RETURN_TIMEOUT_SECS: u64 = 300;

/// Command-line arguments
#[derive(Debug, Clone, Parser)]
#[command(
    name = "whmcs-sync-dashboard",
    version,
    about = "Terminal dashboard for the WHMCS to FreeAgent invoice sync service"
)]
pub struct Cli {
    /// Base URL of the sync backend (the `/api` prefix is added automatically)
    #[arg(long, env = "BACKEND_URL")]
    pub backend_url: Option<String>,

    /// Page to open first: `/`, `/settings` or `/logs`
    #[arg(long, default_value = "/")]
    pub route: String,

    /// Local address the backend's post-OAuth redirect points at
    /// (its FRONTEND_URL), e.g. 127.0.0.1:3000
    #[arg(long, env = "OAUTH_RETURN_ADDR")]
    pub oauth_return_addr: Option<String>,

    /// How long to wait for the browser to come back after connecting
    #[arg(long, default_value_t = DEFAULT_OAUTH_RETURN_TIMEOUT_SECS)]
    pub oauth_return_timeout_secs: u64,
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub backend_url: Url,
    pub initial_route: String,
    pub oauth_return: Option<OAuthReturnConfig>,
}

#[derive(Debug, Clone)]
pub struct OAuthReturnConfig {
    pub addr: String,
    pub timeout: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("BACKEND_URL is not set (pass --backend-url or set it in the environment)")]
    MissingBackendUrl,

    #[error("BACKEND_URL '{0}' is not a valid URL: {1}")]
    InvalidBackendUrl(String, url::ParseError),

    #[error("BACKEND_URL '{0}' must use http or https")]
    UnsupportedScheme(String),

    #[error("OAuth return timeout must be at least 1 second")]
    InvalidReturnTimeout,
}

impl DashboardConfig {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let backend_url = validate_backend_url(cli.backend_url.as_deref())?;

        let oauth_return = match cli.oauth_return_addr {
            Some(addr) if !addr.trim().is_empty() => {
                if cli.oauth_return_timeout_secs == 0 {
                    return Err(ConfigError::InvalidReturnTimeout);
                }
                Some(OAuthReturnConfig {
                    addr: addr.trim().to_string(),
                    timeout: Duration::from_secs(cli.oauth_return_timeout_secs),
                })
            }
            _ => None,
        };

        Ok(Self {
            backend_url,
            initial_route: cli.route,
            oauth_return,
        })
    }
}

/// Reject a missing, blank, unparseable or non-http(s) backend URL
pub fn validate_backend_url(raw: Option<&str>) -> Result<Url, ConfigError> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(ConfigError::MissingBackendUrl);
    }

    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidBackendUrl(raw.to_string(), e))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(ConfigError::UnsupportedScheme(raw.to_string())),
    }
}
