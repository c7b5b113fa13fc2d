//! REST API helpers for the same-origin auth and profile endpoints.
//!
//! All requests go through one `reqwest` client whose cookie jar plays the
//! role of the browser's: `Set-Cookie` from login/registration/logout lands
//! there and is sent back on later calls. Tabs of the same browser share a
//! jar via [`ApiClient::with_cookie_jar`].
//!
//! ERROR HANDLING
//! ==============
//! Transport, status and decode failures come back as [`ApiError`]. The
//! session check maps 401 (and any other non-success status) to `Ok(None)`
//! since "not signed in" is the common case.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::cookie::Jar;
use serde_json::Value;

use super::types::{Credentials, LoginResponse, ProfileUpdate, RegisterResponse, User};

const ME_PATH: &str = "/api/users/me";
const LOGOUT_PATH: &str = "/api/users/logout";
const LOGIN_PATH: &str = "/api/users/login";
const REGISTER_PATH: &str = "/api/users/register";
const UPDATE_PATH: &str = "/api/users/update";
const REQUEST_TIMEOUT_SECS: u64 = 30;
const CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Request(String),

    /// Non-success status; `message` is the server's `error`/`detail` text.
    #[error("{message} (status {status})")]
    Status { status: u16, message: String },

    #[error("response parse failed: {0}")]
    Decode(String),

    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),
}

/// Server-side session operations the session store depends on.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Who is signed in. `Ok(None)` when nobody is.
    async fn fetch_current_user(&self) -> Result<Option<User>, ApiError>;

    /// Invalidate the credential.
    async fn logout(&self) -> Result<(), ApiError>;

    /// Exchange credentials for a session.
    async fn login(&self, credentials: &Credentials) -> Result<User, ApiError>;

    /// Create an account; on success the new account is signed in.
    async fn register(&self, credentials: &Credentials) -> Result<(), ApiError>;

    /// Change profile fields. A new username changes the display name the
    /// next session check reports.
    async fn update_profile(&self, update: &ProfileUpdate) -> Result<(), ApiError>;
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Client with its own private cookie jar.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_cookie_jar(base_url, Arc::new(Jar::default()))
    }

    /// Client sharing `jar` with other clients (tabs of one browser).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_cookie_jar(base_url: &str, jar: Arc<Jar>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .cookie_provider(jar)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ApiError::ClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl SessionBackend for ApiClient {
    async fn fetch_current_user(&self) -> Result<Option<User>, ApiError> {
        let resp = self
            .http
            .get(self.endpoint(ME_PATH))
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;
        if !resp.status().is_success() {
            tracing::debug!(status = resp.status().as_u16(), "session check: not signed in");
            return Ok(None);
        }
        let user = resp.json::<User>().await.map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(Some(user))
    }

    async fn logout(&self) -> Result<(), ApiError> {
        let resp = self
            .http
            .post(self.endpoint(LOGOUT_PATH))
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;
        ensure_success(resp).await.map(|_| ())
    }

    async fn login(&self, credentials: &Credentials) -> Result<User, ApiError> {
        let resp = self
            .http
            .post(self.endpoint(LOGIN_PATH))
            .json(credentials)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;
        let resp = ensure_success(resp).await?;
        let body: LoginResponse = resp.json().await.map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(body.user)
    }

    async fn register(&self, credentials: &Credentials) -> Result<(), ApiError> {
        let resp = self
            .http
            .post(self.endpoint(REGISTER_PATH))
            .json(credentials)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;
        let resp = ensure_success(resp).await?;
        let body: RegisterResponse = resp.json().await.map_err(|e| ApiError::Decode(e.to_string()))?;
        tracing::debug!(uid = %body.uid, username = %body.username, "account registered");
        Ok(())
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> Result<(), ApiError> {
        let resp = self
            .http
            .put(self.endpoint(UPDATE_PATH))
            .json(update)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;
        ensure_success(resp).await.map(|_| ())
    }
}

async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = resp.status().as_u16();
    if resp.status().is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ApiError::Status { status, message: error_message(status, &body) })
}

/// `error` (our routes) or `detail` (backend passthrough), else a generic
/// message naming the status.
fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["error", "detail"]
                .iter()
                .find_map(|key| v.get(*key).and_then(Value::as_str).map(str::to_owned))
        })
        .unwrap_or_else(|| request_failed_message(status))
}

fn request_failed_message(status: u16) -> String {
    format!("request failed: {status}")
}
