//! Wire DTOs for the same-origin `/api/users/*` endpoints.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::{Deserialize, Serialize};

/// The signed-in user as reported by `GET /api/users/me`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Backend user identifier.
    pub id: String,
    /// Display name. Empty when the server has none.
    #[serde(default)]
    pub display_name: String,
}

/// Username/password pair for login and registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into() }
    }
}

/// Body of a successful `POST /api/users/login`.
#[derive(Clone, Debug, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub success: bool,
    pub user: User,
}

/// Body of a successful `POST /api/users/register` (the backend's record).
#[derive(Clone, Debug, Deserialize)]
pub struct RegisterResponse {
    pub uid: String,
    #[serde(default)]
    pub username: String,
}

/// Body of `PUT /api/users/update`. Unset fields are left out; the server
/// fills in the signed-in user when `uid` is absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl ProfileUpdate {
    /// Update that only renames the signed-in user.
    #[must_use]
    pub fn rename(username: impl Into<String>) -> Self {
        Self { username: Some(username.into()), ..Self::default() }
    }
}
