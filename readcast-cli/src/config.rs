//! Configuration module
//!
//! Handles CLI configuration including the backend URL and session token.

use readcast_client::ReadcastClient;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the backend service
    pub api_url: String,
    /// Bearer token, when logged in
    pub token: Option<String>,
}

impl Config {
    /// Build an API client from this configuration
    pub fn client(&self) -> ReadcastClient {
        let client = ReadcastClient::new(&self.api_url);
        match &self.token {
            Some(token) => client.with_token(token),
            None => client,
        }
    }
}
