//! Shared HTTP client for the Cold Storage file index API.
//!
//! Provides a minimal client with generic GET/POST/DELETE helpers, domain
//! methods for every endpoint (disks, browse, search, upload), the
//! Server-Sent-Events payload stream behind the upload progress stream, and the
//! [`UploadBackend`](coldstore_core::UploadBackend) implementation the upload
//! workflow runs on.

pub mod api;
mod backend;
pub mod sse;

use anyhow::{Context, Result};
use coldstore_core::{ApiLocation, ClientConfig, Environment};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// A non-2xx response from the API.
#[derive(Debug, Clone, thiserror::Error)]
#[error("API request failed with status {status}: {message}")]
pub struct ApiStatusError {
    pub status: u16,
    pub message: String,
}

/// HTTP client for the file index API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    /// No total timeout: the progress channel bounds its own lifetime.
    stream_client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;
        let stream_client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .context("Failed to create streaming HTTP client")?;

        Ok(Self {
            client,
            stream_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let base_url = Self::resolve_base_url(&config.api)?;
        Self::new(base_url, config.http_timeout)
    }

    /// Create client from environment. See [`ClientConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        let config = ClientConfig::from_env()?;
        Self::from_config(&config)
    }

    /// Turn an [`ApiLocation`] into a base URL.
    ///
    /// Development: same host as the origin on the API port.
    /// Production: the origin plus `/api`.
    pub fn resolve_base_url(location: &ApiLocation) -> Result<String> {
        match location {
            ApiLocation::Explicit(url) => {
                let parsed =
                    Url::parse(url).with_context(|| format!("Invalid API URL: {}", url))?;
                Ok(parsed.as_str().trim_end_matches('/').to_string())
            }
            ApiLocation::Origin {
                origin,
                environment,
                dev_port,
            } => {
                let mut parsed =
                    Url::parse(origin).with_context(|| format!("Invalid origin: {}", origin))?;
                if parsed.host_str().is_none() {
                    return Err(anyhow::anyhow!("Origin has no host: {}", origin));
                }
                match environment {
                    Environment::Development => {
                        parsed
                            .set_port(Some(*dev_port))
                            .map_err(|_| anyhow::anyhow!("Cannot set port on {}", origin))?;
                        Ok(parsed.origin().ascii_serialization())
                    }
                    Environment::Production => {
                        Ok(format!("{}/api", parsed.origin().ascii_serialization()))
                    }
                }
            }
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET request with optional query parameters. Deserializes JSON response.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        debug!(method = "GET", path, "API request");
        let mut request = self.client.get(self.build_url(path));
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().await.context("Failed to send request")?;
        let response = ensure_success("GET", path, response).await?;

        let body: T = response
            .json()
            .await
            .context("Failed to parse response as JSON")?;

        Ok(body)
    }

    /// POST multipart form and deserialize response.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T> {
        debug!(method = "POST", path, "API request");
        let response = self
            .client
            .post(self.build_url(path))
            .multipart(form)
            .send()
            .await
            .context("Failed to send request")?;
        let response = ensure_success("POST", path, response).await?;

        let body: T = response
            .json()
            .await
            .context("Failed to parse response as JSON")?;

        Ok(body)
    }

    /// DELETE request. Returns Ok(()) on success.
    pub async fn delete(&self, path: &str) -> Result<()> {
        debug!(method = "DELETE", path, "API request");
        let response = self
            .client
            .delete(self.build_url(path))
            .send()
            .await
            .context("Failed to send request")?;
        ensure_success("DELETE", path, response).await?;

        Ok(())
    }

    /// Open a `text/event-stream` response.
    pub async fn get_event_stream(&self, path: &str) -> Result<Response> {
        debug!(method = "GET", path, "Opening event stream");
        let response = self
            .stream_client
            .get(self.build_url(path))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .context("Failed to open event stream")?;
        ensure_success("GET", path, response).await
    }

    /// Raw client for custom requests.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Turn a non-2xx response into an [`ApiStatusError`], using the server's
/// `detail` field when the body is JSON.
async fn ensure_success(method: &str, path: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        debug!(method, path, status = status.as_u16(), "API response");
        return Ok(response);
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    let message = serde_json::from_str::<serde_json::Value>(&error_text)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or(error_text);

    warn!(method, path, status = status.as_u16(), %message, "API request failed");
    Err(ApiStatusError {
        status: status.as_u16(),
        message,
    }
    .into())
}

// Re-export domain response types for convenience.
pub use coldstore_core::models::{
    AsyncUploadResponse, BrowseItem, BrowseResponse, DiskFilesPage, DiskSummary,
    DuplicateCheckResult, FileRecord, HealthStatus, ImportResult, SearchQuery, SearchResponse,
    SystemStats, UploadStatusSnapshot,
};

#[cfg(test)]
mod tests {
    use super::*;

    fn origin(origin: &str, environment: Environment) -> ApiLocation {
        ApiLocation::Origin {
            origin: origin.to_string(),
            environment,
            dev_port: 8000,
        }
    }

    #[test]
    fn development_uses_api_port_on_same_host() {
        let url = ApiClient::resolve_base_url(&origin(
            "http://192.168.1.20:3000/explorer",
            Environment::Development,
        ))
        .unwrap();
        assert_eq!(url, "http://192.168.1.20:8000");
    }

    #[test]
    fn production_uses_api_path_on_same_origin() {
        let url = ApiClient::resolve_base_url(&origin(
            "https://files.example.com/",
            Environment::Production,
        ))
        .unwrap();
        assert_eq!(url, "https://files.example.com/api");
    }

    #[test]
    fn explicit_url_is_validated() {
        assert!(ApiClient::resolve_base_url(&ApiLocation::Explicit("not a url".into())).is_err());
        let url = ApiClient::resolve_base_url(&ApiLocation::Explicit(
            "http://localhost:8000/".into(),
        ))
        .unwrap();
        assert_eq!(url, "http://localhost:8000");
    }

    #[test]
    fn build_url_joins_without_double_slash() {
        let client =
            ApiClient::new("http://localhost:8000/".to_string(), Duration::from_secs(5)).unwrap();
        assert_eq!(client.build_url("/disks"), "http://localhost:8000/disks");
    }
}
