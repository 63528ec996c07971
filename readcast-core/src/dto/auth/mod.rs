//! Auth DTOs
//!
//! Thin request/response shapes for the backend's token-based auth
//! endpoints. The client stores the access token in memory only; nothing
//! here implements retry or refresh policy.

use serde::{Deserialize, Serialize};

/// Request body of `POST /api/auth/register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// Request body of `POST /api/auth/login`.
///
/// The backend accepts either an email address or a username in the same
/// field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email_or_username: String,
    pub password: String,
}

/// Request body of `POST /api/auth/refresh`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Token pair returned by login, register, and refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<Account>,
}

/// User profile as returned by `GET /api/auth/me`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_without_refresh_token() {
        let session: Session =
            serde_json::from_str(r#"{"access_token":"tok"}"#).unwrap();
        assert_eq!(session.access_token, "tok");
        assert_eq!(session.refresh_token, None);
        assert!(session.user.is_none());
    }

    #[test]
    fn test_session_with_embedded_user() {
        let session: Session = serde_json::from_str(
            r#"{"access_token":"a","refresh_token":"r",
                "user":{"id":"u1","email":"x@y.z","username":"x"}}"#,
        )
        .unwrap();
        assert_eq!(session.user.unwrap().username, "x");
    }
}
