//! Shared fixtures for client tests: a stub same-origin server and an
//! in-memory [`SessionBackend`].

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::extract::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::net::api::{ApiError, SessionBackend};
use crate::net::types::{Credentials, ProfileUpdate, User};

// =============================================================================
// HTTP STUB
// =============================================================================

/// Serve `router` on an ephemeral port; returns its base URL.
pub async fn spawn_router(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
    let addr = listener.local_addr().expect("test listener addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{addr}")
}

/// Minimal cookie-backed auth endpoints: `alice`/`pw` signs in as `u1`;
/// an update carrying `username` rewrites the `username` cookie.
pub fn auth_router() -> Router {
    async fn me(jar: CookieJar) -> Response {
        match jar.get("auth-token").map(Cookie::value).filter(|v| !v.is_empty()) {
            Some(id) => {
                let name = jar.get("username").map(Cookie::value).unwrap_or_default();
                Json(json!({ "id": id, "displayName": name })).into_response()
            }
            None => (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Not authenticated" }))).into_response(),
        }
    }

    async fn login(jar: CookieJar, Json(body): Json<Value>) -> Response {
        if body["password"] != "pw" {
            return (StatusCode::UNAUTHORIZED, Json(json!({ "detail": "Invalid credentials" }))).into_response();
        }
        let name = body["username"].as_str().unwrap_or_default().to_owned();
        let jar = jar
            .add(Cookie::build(("auth-token", "u1")).path("/"))
            .add(Cookie::build(("username", name.clone())).path("/"));
        (jar, Json(json!({ "success": true, "user": { "id": "u1", "displayName": name } }))).into_response()
    }

    async fn logout(jar: CookieJar) -> Response {
        let jar = jar
            .remove(Cookie::build(("auth-token", "")).path("/"))
            .remove(Cookie::build(("username", "")).path("/"));
        (jar, Json(json!({ "success": true }))).into_response()
    }

    async fn update(jar: CookieJar, Json(body): Json<Value>) -> Response {
        if jar.get("auth-token").is_none() {
            return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized - User ID is required" })))
                .into_response();
        }
        let jar = match body["username"].as_str() {
            Some(name) => jar.add(Cookie::build(("username", name.to_owned())).path("/")),
            None => jar,
        };
        (jar, Json(json!({ "uid": "u1" }))).into_response()
    }

    Router::new()
        .route("/api/users/me", get(me))
        .route("/api/users/login", post(login))
        .route("/api/users/logout", post(logout))
        .route("/api/users/update", put(update))
}

/// Session check that rejects every request, cookie or not.
pub fn always_unauthorized_router() -> Router {
    Router::new().route(
        "/api/users/me",
        get(|| async { (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Not authenticated" }))) }),
    )
}

// =============================================================================
// IN-MEMORY BACKEND
// =============================================================================

/// Server-side truth shared by every store built on the same instance, the
/// way tabs share one cookie jar.
#[derive(Default)]
pub struct MockBackend {
    signed_in: Mutex<Option<User>>,
    fail_resolve: AtomicBool,
    fail_logout: AtomicBool,
    gates: Mutex<VecDeque<oneshot::Receiver<Option<User>>>>,
    resolve_delay: Mutex<Option<Duration>>,
    pub fetch_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
}

impl MockBackend {
    pub fn signed_in_as(user: &User) -> Self {
        let backend = Self::default();
        *backend.signed_in.lock().unwrap() = Some(user.clone());
        backend
    }

    pub fn current(&self) -> Option<User> {
        self.signed_in.lock().unwrap().clone()
    }

    pub fn fail_resolve(&self, fail: bool) {
        self.fail_resolve.store(fail, Ordering::SeqCst);
    }

    pub fn fail_logout(&self, fail: bool) {
        self.fail_logout.store(fail, Ordering::SeqCst);
    }

    pub fn set_resolve_delay(&self, delay: Duration) {
        *self.resolve_delay.lock().unwrap() = Some(delay);
    }

    /// The next session check blocks until the returned sender supplies its
    /// answer.
    pub fn gate_next_resolve(&self) -> oneshot::Sender<Option<User>> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().push_back(rx);
        tx
    }

    pub fn fetches(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionBackend for MockBackend {
    async fn fetch_current_user(&self) -> Result<Option<User>, ApiError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().unwrap().pop_front();
        if let Some(gate) = gate {
            return Ok(gate.await.unwrap_or(None));
        }
        let delay = *self.resolve_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_resolve.load(Ordering::SeqCst) {
            return Err(ApiError::Request("connection refused".into()));
        }
        Ok(self.current())
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_logout.load(Ordering::SeqCst) {
            return Err(ApiError::Request("connection reset".into()));
        }
        *self.signed_in.lock().unwrap() = None;
        Ok(())
    }

    async fn login(&self, credentials: &Credentials) -> Result<User, ApiError> {
        if credentials.password != "pw" {
            return Err(ApiError::Status { status: 401, message: "Invalid credentials".into() });
        }
        let user = User { id: "u1".into(), display_name: credentials.username.clone() };
        *self.signed_in.lock().unwrap() = Some(user.clone());
        Ok(user)
    }

    async fn register(&self, credentials: &Credentials) -> Result<(), ApiError> {
        if credentials.username == "taken" {
            return Err(ApiError::Status { status: 400, message: "Username already registered".into() });
        }
        let user = User { id: format!("uid-{}", credentials.username), display_name: credentials.username.clone() };
        *self.signed_in.lock().unwrap() = Some(user);
        Ok(())
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> Result<(), ApiError> {
        let mut signed_in = self.signed_in.lock().unwrap();
        let Some(user) = signed_in.as_mut() else {
            return Err(ApiError::Status { status: 401, message: "Unauthorized - User ID is required".into() });
        };
        match update.username.as_deref() {
            Some("taken") => Err(ApiError::Status { status: 400, message: "Username already taken".into() }),
            Some(name) => {
                user.display_name = name.to_owned();
                Ok(())
            }
            None => Ok(()),
        }
    }
}

pub fn alice() -> User {
    User { id: "u1".into(), display_name: "alice".into() }
}
