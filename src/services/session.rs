//! Credential cookies and session resolution.
//!
//! ARCHITECTURE
//! ============
//! The credential is two cookies: `auth-token` (HTTP-only, the backend user
//! id) and `username` (script-readable display name). Both are written on
//! login/registration and expired together on logout. A profile rename
//! re-issues `username` alone.
//!
//! TRADE-OFFS
//! ==========
//! Resolution trusts the cookie value; there is no server-side session
//! table. A forged `auth-token` resolves to whatever id it names.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use time::Duration;

use super::backend::AccountRecord;

pub const AUTH_COOKIE: &str = "auth-token";
pub const USERNAME_COOKIE: &str = "username";
pub const CREDENTIAL_MAX_AGE_DAYS: i64 = 7;

/// Resolved identity of the current request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    /// Backend user identifier (the `auth-token` value).
    pub id: String,
    /// Display name; empty when the `username` cookie is missing.
    pub display_name: String,
}

/// Non-empty `auth-token` value, if the request carries one.
#[must_use]
pub fn credential(jar: &CookieJar) -> Option<&str> {
    jar.get(AUTH_COOKIE).map(Cookie::value).filter(|v| !v.is_empty())
}

/// Resolve the request's cookies into a user. Absence is the common case,
/// not an error.
#[must_use]
pub fn resolve(jar: &CookieJar) -> Option<SessionUser> {
    let id = credential(jar)?;
    let display_name = jar.get(USERNAME_COOKIE).map(Cookie::value).unwrap_or_default();
    Some(SessionUser { id: id.to_owned(), display_name: display_name.to_owned() })
}

/// Both credential cookies for a freshly authenticated account.
#[must_use]
pub fn credential_cookies(account: &AccountRecord, secure: bool) -> [Cookie<'static>; 2] {
    let token = Cookie::build((AUTH_COOKIE, account.uid.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::days(CREDENTIAL_MAX_AGE_DAYS))
        .build();
    [token, display_name_cookie(&account.username, secure)]
}

/// Script-readable `username` cookie with the credential lifetime.
#[must_use]
pub fn display_name_cookie(name: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((USERNAME_COOKIE, name.to_owned()))
        .path("/")
        .http_only(false)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::days(CREDENTIAL_MAX_AGE_DAYS))
        .build()
}

/// Removal cookies for both credential parts.
#[must_use]
pub fn cleared_credential_cookies() -> [Cookie<'static>; 2] {
    [AUTH_COOKIE, USERNAME_COOKIE].map(|name| {
        Cookie::build((name, ""))
            .path("/")
            .max_age(Duration::ZERO)
            .expires(time::OffsetDateTime::UNIX_EPOCH)
            .build()
    })
}

/// Add both credential cookies to `jar`.
#[must_use]
pub fn with_credential(jar: CookieJar, account: &AccountRecord, secure: bool) -> CookieJar {
    let [token, username] = credential_cookies(account, secure);
    jar.add(token).add(username)
}

/// Re-issue only the `username` cookie after a rename.
#[must_use]
pub fn with_display_name(jar: CookieJar, name: &str, secure: bool) -> CookieJar {
    jar.add(display_name_cookie(name, secure))
}

/// Expire both credential cookies in `jar`.
#[must_use]
pub fn without_credential(jar: CookieJar) -> CookieJar {
    let [token, username] = cleared_credential_cookies();
    jar.add(token).add(username)
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
