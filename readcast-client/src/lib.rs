//! Readcast HTTP Client
//!
//! A simple, type-safe client for the Readcast conversion backend.
//!
//! This crate provides a unified interface for talking to the backend API:
//! job creation (PDF upload), status queries, history, auth, and the live
//! job status synchronizer (see [`watch`]) that follows a conversion over
//! Server-Sent Events and falls back to polling when streaming fails.
//!
//! # Example
//!
//! ```no_run
//! use readcast_client::{JobUpload, ReadcastClient};
//! use readcast_core::validate::UploadLimits;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ReadcastClient::new("http://localhost:8000");
//!
//!     let bytes = tokio::fs::read("book.pdf").await?;
//!     let created = client
//!         .create_job(JobUpload::new("book.pdf", bytes), &UploadLimits::default())
//!         .await?;
//!
//!     println!("Created job: {}", created.id);
//!     Ok(())
//! }
//! ```

pub mod error;
mod auth;
mod jobs;
pub mod sse;
pub mod watch;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use jobs::JobUpload;
pub use readcast_core::domain::job::{JobStatus, JobUpdate};
pub use watch::{DEFAULT_POLL_INTERVAL, TransportError, WatchEvent, WatchHandle, WatchOptions};

use reqwest::{Client, Method};
use serde::de::DeserializeOwned;

/// HTTP client for the Readcast backend API
///
/// This client provides methods for all backend endpoints, organized into
/// logical groups:
/// - Job lifecycle (create from a PDF upload, status, history)
/// - Live status watching (SSE with polling fallback)
/// - Authentication (login, register, refresh, profile)
/// - Health check
#[derive(Debug, Clone)]
pub struct ReadcastClient {
    /// Base URL of the backend (e.g., "http://localhost:8000")
    base_url: String,
    /// HTTP client instance
    client: Client,
    /// Bearer token attached to every request when set
    token: Option<String>,
}

impl ReadcastClient {
    /// Create a new backend client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the backend API (e.g., "http://localhost:8000")
    ///
    /// # Example
    /// ```
    /// use readcast_client::ReadcastClient;
    ///
    /// let client = ReadcastClient::new("http://localhost:8000");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
            token: None,
        }
    }

    /// Create a new backend client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the backend API
    /// * `client` - A configured reqwest Client
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            token: None,
        }
    }

    /// Attach a bearer token for authenticated endpoints
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Get the base URL of the backend
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Start a request builder with auth applied
    pub(crate) fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let mut req = self.client.request(method, url);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        req
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// This method checks the status code and returns an appropriate error if
    /// the request failed, or deserializes the response body if successful.
    pub(crate) async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response that returns no content
    ///
    /// This method checks the status code and returns an error if the request failed.
    pub(crate) async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ReadcastClient::new("http://localhost:8000");
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = ReadcastClient::new("http://localhost:8000/");
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_client_with_custom_client() {
        let http_client = Client::new();
        let client = ReadcastClient::with_client("http://localhost:8000", http_client);
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_client_with_token() {
        let client = ReadcastClient::new("http://localhost:8000").with_token("tok");
        assert_eq!(client.token.as_deref(), Some("tok"));
    }
}
