//! HTTP client for the external music/matching backend.
//!
//! Thin reqwest wrapper. Response reshaping lives in pure helpers
//! (`parse_account`, `error_detail`) so route tests can cover it without a
//! live backend.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::BackendTimeouts;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Request(String),

    #[error("backend responded {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("backend response parse failed: {0}")]
    Decode(String),

    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),
}

/// Raw backend answer: the status plus whatever JSON body came back.
#[derive(Debug, Clone)]
pub struct BackendReply {
    pub status: u16,
    pub body: Value,
}

impl BackendReply {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Account fields the backend returns from login and registration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountRecord {
    pub uid: String,
    #[serde(default)]
    pub username: String,
}

#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Build a client for `base_url` (no trailing slash).
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(base_url: &str, timeouts: BackendTimeouts) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| BackendError::ClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /users/login` with the caller's JSON body, passed through as-is.
    pub async fn login(&self, body: &Value) -> Result<BackendReply, BackendError> {
        self.post_json("/users/login", body).await
    }

    /// `POST /users/register` with the caller's JSON body, passed through as-is.
    pub async fn register(&self, body: &Value) -> Result<BackendReply, BackendError> {
        self.post_json("/users/register", body).await
    }

    /// `GET /users/{uid}`. Non-success statuses become [`BackendError::Status`].
    pub async fn fetch_user(&self, uid: &str) -> Result<Value, BackendError> {
        let url = format!("{}/users/{uid}", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;
        expect_success(read_reply(response).await?, "Failed to fetch profile")
    }

    /// `PUT /users/{uid}` with the profile fields. Non-success statuses
    /// become [`BackendError::Status`].
    pub async fn update_user<T>(&self, uid: &str, fields: &T) -> Result<Value, BackendError>
    where
        T: Serialize + ?Sized,
    {
        let url = format!("{}/users/{uid}", self.base_url);
        let response = self
            .http
            .put(&url)
            .json(fields)
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;
        expect_success(read_reply(response).await?, "Failed to update profile")
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<BackendReply, BackendError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;
        read_reply(response).await
    }
}

async fn read_reply(response: reqwest::Response) -> Result<BackendReply, BackendError> {
    let status = response.status().as_u16();
    let text = response
        .text()
        .await
        .map_err(|e| BackendError::Request(e.to_string()))?;
    let body = parse_body(&text)?;
    Ok(BackendReply { status, body })
}

fn expect_success(reply: BackendReply, fallback: &str) -> Result<Value, BackendError> {
    if !reply.is_success() {
        return Err(BackendError::Status { status: reply.status, detail: error_detail(&reply.body, fallback) });
    }
    Ok(reply.body)
}

/// Empty bodies read as `null`; anything else must be JSON.
pub(crate) fn parse_body(text: &str) -> Result<Value, BackendError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(|e| BackendError::Decode(e.to_string()))
}

/// Pull `{uid, username}` out of a login/registration body.
pub(crate) fn parse_account(body: &Value) -> Result<AccountRecord, BackendError> {
    AccountRecord::deserialize(body).map_err(|e| BackendError::Decode(e.to_string()))
}

/// Backend errors carry a `detail` string; use `fallback` when it is absent.
pub(crate) fn error_detail(body: &Value, fallback: &str) -> String {
    body.get("detail")
        .and_then(Value::as_str)
        .map_or_else(|| fallback.to_owned(), str::to_owned)
}

#[cfg(test)]
#[path = "backend_test.rs"]
mod tests;
