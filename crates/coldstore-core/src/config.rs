//! Configuration module
//!
//! Client configuration is resolved once at startup by [`ClientConfig::from_env`]
//! and then passed explicitly to the API client and the upload workflow.

use std::env;
use std::time::Duration;

// Common constants
const DEFAULT_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_API_PORT: u16 = 8000;
const HTTP_TIMEOUT_SECS: u64 = 30;
const PROGRESS_TIMEOUT_SECS: u64 = 600;
const CLEAR_DELAY_MS: u64 = 3000;

/// Deployment mode, which decides how the API base URL is derived from the origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    /// API served on the same host, different port.
    Development,
    /// API served on the same host under `/api`.
    Production,
}

impl std::str::FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(anyhow::anyhow!("Invalid environment: {}", s)),
        }
    }
}

/// Where the API lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiLocation {
    /// Explicit base URL, used as-is.
    Explicit(String),
    /// Derived from the origin the client runs against.
    Origin {
        origin: String,
        environment: Environment,
        dev_port: u16,
    },
}

/// Timing knobs for one upload workflow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// Maximum lifetime of one progress channel.
    pub progress_timeout: Duration,
    /// Delay after a successful import before the file leaves the selection.
    pub clear_delay: Duration,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            progress_timeout: Duration::from_secs(PROGRESS_TIMEOUT_SECS),
            clear_delay: Duration::from_millis(CLEAR_DELAY_MS),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api: ApiLocation,
    pub http_timeout: Duration,
    pub workflow: WorkflowConfig,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api = match lookup("COLDSTORE_API_URL").filter(|s| !s.trim().is_empty()) {
            Some(url) => ApiLocation::Explicit(url.trim().trim_end_matches('/').to_string()),
            None => {
                let environment = lookup("COLDSTORE_ENV")
                    .or_else(|| lookup("ENVIRONMENT"))
                    .unwrap_or_else(|| "development".to_string())
                    .parse::<Environment>()?;
                ApiLocation::Origin {
                    origin: lookup("COLDSTORE_ORIGIN")
                        .unwrap_or_else(|| DEFAULT_ORIGIN.to_string()),
                    environment,
                    dev_port: lookup("COLDSTORE_API_PORT")
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(DEFAULT_API_PORT),
                }
            }
        };

        let http_timeout_secs = lookup("COLDSTORE_HTTP_TIMEOUT_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(HTTP_TIMEOUT_SECS);
        let progress_timeout_secs = lookup("COLDSTORE_PROGRESS_TIMEOUT_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(PROGRESS_TIMEOUT_SECS);
        let clear_delay_ms = lookup("COLDSTORE_CLEAR_DELAY_MS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(CLEAR_DELAY_MS);

        Ok(Self {
            api,
            http_timeout: Duration::from_secs(http_timeout_secs),
            workflow: WorkflowConfig {
                progress_timeout: Duration::from_secs(progress_timeout_secs),
                clear_delay: Duration::from_millis(clear_delay_ms),
            },
        })
    }
}
