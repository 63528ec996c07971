//! Auth API endpoints
//!
//! Thin wrappers over the backend's token auth. Policy (when to refresh,
//! where to keep tokens) is left to the caller; the client only attaches
//! whatever token it was built with.

use reqwest::Method;

use crate::ReadcastClient;
use crate::error::Result;
use readcast_core::dto::auth::{Account, LoginRequest, RefreshRequest, RegisterRequest, Session};

impl ReadcastClient {
    /// Register a new account and obtain a session
    pub async fn register(&self, req: RegisterRequest) -> Result<Session> {
        let url = format!("{}/api/auth/register", self.base_url());
        let response = self.request(Method::POST, &url).json(&req).send().await?;

        self.handle_response(response).await
    }

    /// Log in with an email address or username
    pub async fn login(&self, req: LoginRequest) -> Result<Session> {
        tracing::debug!(who = %req.email_or_username, "Logging in");
        let url = format!("{}/api/auth/login", self.base_url());
        let response = self.request(Method::POST, &url).json(&req).send().await?;

        self.handle_response(response).await
    }

    /// Exchange a refresh token for a fresh session
    pub async fn refresh(&self, refresh_token: impl Into<String>) -> Result<Session> {
        let url = format!("{}/api/auth/refresh", self.base_url());
        let req = RefreshRequest {
            refresh_token: refresh_token.into(),
        };
        let response = self.request(Method::POST, &url).json(&req).send().await?;

        self.handle_response(response).await
    }

    /// Fetch the profile of the authenticated user
    ///
    /// Requires the client to carry a bearer token
    /// (see [`ReadcastClient::with_token`]).
    pub async fn me(&self) -> Result<Account> {
        let url = format!("{}/api/auth/me", self.base_url());
        let response = self.request(Method::GET, &url).send().await?;

        self.handle_response(response).await
    }

    /// Invalidate the current session server-side
    pub async fn logout(&self) -> Result<()> {
        let url = format!("{}/api/auth/logout", self.base_url());
        let response = self.request(Method::POST, &url).send().await?;

        self.handle_empty_response(response).await
    }
}
