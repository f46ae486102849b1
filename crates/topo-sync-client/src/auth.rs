//! Bearer token client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use topo_sync_core::{AuthError, TokenProvider};

/// Account the job authenticates as
#[derive(Clone)]
pub struct Credentials {
    /// User name
    pub username: String,
    /// API key
    pub api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    username: &'a str,
    api_key: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: Option<String>,
}

/// Fetches bearer tokens from the auth endpoint
#[derive(Debug, Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    endpoint: String,
    credentials: Credentials,
}

impl AuthClient {
    /// Create client
    #[must_use]
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            credentials,
        }
    }

    fn request(&self) -> reqwest::RequestBuilder {
        self.http.post(&self.endpoint).json(&TokenRequest {
            username: &self.credentials.username,
            api_key: &self.credentials.api_key,
        })
    }
}

#[async_trait]
impl TokenProvider for AuthClient {
    async fn fetch_token(&self) -> Result<String, AuthError> {
        let response = self
            .request()
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        parse_token(&body)
    }
}

/// Token from an auth response body
pub fn parse_token(body: &[u8]) -> Result<String, AuthError> {
    let response: TokenResponse =
        serde_json::from_slice(body).map_err(|_| AuthError::MissingToken)?;
    response
        .token
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingToken)
}
