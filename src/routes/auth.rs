//! Auth routes: session check, logout, and the login/registration proxies
//! that mint the credential cookies.

use axum::extract::State;
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::cookie::CookieJar;
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::services::backend::{self, BackendReply};
use crate::services::session::{self, SessionUser};
use crate::state::AppState;

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Current user resolved from the credential cookies.
/// Use as a handler parameter to require authentication.
pub struct AuthUser(pub SessionUser);

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        session::resolve(&jar)
            .map(Self)
            .ok_or_else(|| ApiError::Unauthorized("Not authenticated".into()))
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `GET /api/users/me`: 401 without `auth-token`, otherwise `{id, displayName}`.
pub async fn me(AuthUser(user): AuthUser) -> Json<SessionUser> {
    Json(user)
}

/// `POST /api/users/logout`: expire both cookies. Always succeeds.
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    if let Some(user) = session::resolve(&jar) {
        tracing::info!(user_id = %user.id, "user logged out");
    }
    (session::without_credential(jar), Json(json!({ "success": true })))
}

/// `POST /api/users/login`: forward to the backend; on 200 set the
/// credential cookies and answer `{success, user}`.
pub async fn login(State(state): State<AppState>, jar: CookieJar, Json(body): Json<Value>) -> Result<Response, ApiError> {
    let reply = state.backend.login(&body).await?;
    if reply.status != StatusCode::OK.as_u16() {
        return Ok(passthrough(reply));
    }

    let account = backend::parse_account(&reply.body)?;
    tracing::info!(user_id = %account.uid, "user logged in");
    let user = SessionUser { id: account.uid.clone(), display_name: account.username.clone() };
    let jar = session::with_credential(jar, &account, state.config.cookie_secure);
    Ok((jar, Json(json!({ "success": true, "user": user }))).into_response())
}

/// `POST /api/users/register`: forward to the backend; on 201 set the
/// credential cookies and echo the backend body.
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    let reply = state.backend.register(&body).await?;
    if reply.status != StatusCode::CREATED.as_u16() {
        return Ok(passthrough(reply));
    }

    let account = backend::parse_account(&reply.body)?;
    tracing::info!(user_id = %account.uid, "user registered");
    let jar = session::with_credential(jar, &account, state.config.cookie_secure);
    Ok((StatusCode::CREATED, jar, Json(reply.body)).into_response())
}

/// Relay a backend answer unchanged.
fn passthrough(reply: BackendReply) -> Response {
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::BAD_GATEWAY);
    (status, Json(reply.body)).into_response()
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
