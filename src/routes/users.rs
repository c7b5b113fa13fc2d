//! User profile proxy: read and update.

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::services::session::{self, SessionUser};
use crate::state::AppState;

const UID_REQUIRED: &str = "Unauthorized - User ID is required";

#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    uid: Option<String>,
}

/// Body of `PUT /api/users/update`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    uid: Option<String>,
    username: Option<String>,
    email: Option<String>,
    /// Number or numeric string; anything else is sent on as `null`.
    age: Option<Value>,
    country: Option<String>,
}

/// What the backend's `PUT /users/{uid}` receives.
#[derive(Debug, PartialEq, Eq, Serialize)]
struct BackendProfileFields<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    age: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    country: Option<&'a str>,
}

impl<'a> From<&'a ProfileUpdate> for BackendProfileFields<'a> {
    fn from(update: &'a ProfileUpdate) -> Self {
        Self {
            username: update.username.as_deref(),
            email: update.email.as_deref(),
            age: update.age.as_ref().and_then(parse_age),
            country: update.country.as_deref(),
        }
    }
}

/// `GET /api/users/profile[?uid=]`: the named user, or the session's user
/// when no `uid` is given.
pub async fn profile(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<ProfileQuery>,
) -> Result<Json<Value>, ApiError> {
    let uid = target_uid(query.uid, &jar).ok_or_else(|| ApiError::Unauthorized(UID_REQUIRED.into()))?;
    let profile = state.backend.fetch_user(&uid).await?;
    Ok(Json(profile))
}

/// `PUT /api/users/update`: forward the profile fields for `uid` (or the
/// session's user). A changed username re-issues the `username` cookie, so
/// the next session check reports the new display name.
pub async fn update(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(update): Json<ProfileUpdate>,
) -> Result<Response, ApiError> {
    let uid = target_uid(update.uid.clone(), &jar).ok_or_else(|| ApiError::Unauthorized(UID_REQUIRED.into()))?;
    let profile = state
        .backend
        .update_user(&uid, &BackendProfileFields::from(&update))
        .await?;

    let current = session::resolve(&jar);
    let jar = match renamed_to(&update, current.as_ref()) {
        Some(name) => {
            tracing::info!(user_id = %uid, "display name changed");
            session::with_display_name(jar, name, state.config.cookie_secure)
        }
        None => jar,
    };
    Ok((jar, Json(profile)).into_response())
}

/// Explicit non-empty `uid` wins over the session.
fn target_uid(explicit: Option<String>, jar: &CookieJar) -> Option<String> {
    explicit
        .filter(|uid| !uid.is_empty())
        .or_else(|| session::resolve(jar).map(|user| user.id))
}

/// New username, when the update carries one that differs from the signed-in
/// user's current display name.
fn renamed_to<'a>(update: &'a ProfileUpdate, current: Option<&SessionUser>) -> Option<&'a str> {
    let name = update.username.as_deref().filter(|n| !n.is_empty())?;
    let current = current?;
    (name != current.display_name).then_some(name)
}

/// Integer prefix of a number or numeric string. Zero, empty strings and
/// non-numeric input yield `None`.
fn parse_age(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => leading_int(&n.to_string()).filter(|age| *age != 0),
        Value::String(s) if !s.is_empty() => leading_int(s),
        _ => None,
    }
}

fn leading_int(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let digits_start = usize::from(text.starts_with(['+', '-']));
    let digits_len = text[digits_start..].bytes().take_while(u8::is_ascii_digit).count();
    text[..digits_start + digits_len].parse().ok()
}

#[cfg(test)]
#[path = "users_test.rs"]
mod tests;
