//! Route guard for pages that require a signed-in user.
//!
//! SYSTEM CONTEXT
//! ==============
//! Runs as router middleware ahead of every page request. Unauthenticated
//! requests for a protected prefix are sent to the sign-in page with a
//! `callbackUrl` pointing back at what they asked for.
//!
//! TRADE-OFFS
//! ==========
//! The check is presence-only: any non-empty `auth-token` passes, even one
//! the resolver would later reject. Validating here would cost a backend
//! round trip per navigation.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;

use crate::config::Config;
use crate::services::session;
use crate::state::AppState;

pub const CALLBACK_PARAM: &str = "callbackUrl";

/// Leading path text the guard never inspects: API routes, build assets
/// and icons. Matched against the path without its leading `/`.
const EXCLUDED_PREFIXES: &[&str] = &["api", "_next/static", "_next/image", "favicon.ico"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig {
    pub protected_prefixes: Vec<String>,
    pub signin_path: String,
    pub public_origin: Option<String>,
}

impl GuardConfig {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            protected_prefixes: config.protected_paths.clone(),
            signin_path: config.signin_path.clone(),
            public_origin: config.public_origin.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Pass,
    /// Redirect target (path + query on this origin).
    Redirect(String),
}

/// Whether the guard runs for `path` at all.
#[must_use]
pub fn guard_applies(path: &str) -> bool {
    let rest = path.trim_start_matches('/');
    !EXCLUDED_PREFIXES.iter().any(|prefix| rest.starts_with(prefix)) && !rest.contains(".svg")
}

/// Exact match or prefix followed by a path separator.
#[must_use]
pub fn is_protected(prefixes: &[String], path: &str) -> bool {
    prefixes.iter().any(|prefix| {
        let prefix = prefix.trim_end_matches('/');
        path == prefix || path.starts_with(&format!("{prefix}/"))
    })
}

/// Decide what to do with a request for `path`.
///
/// `original_url` is the full URL as requested; it is only used to build
/// the redirect.
#[must_use]
pub fn evaluate(config: &GuardConfig, path: &str, original_url: &str, has_credential: bool) -> GuardDecision {
    if has_credential || !guard_applies(path) || !is_protected(&config.protected_prefixes, path) {
        return GuardDecision::Pass;
    }
    GuardDecision::Redirect(signin_location(&config.signin_path, original_url))
}

/// `<signin_path>?callbackUrl=<encoded original>`.
#[must_use]
pub fn signin_location(signin_path: &str, original_url: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair(CALLBACK_PARAM, &encode_url(original_url))
        .finish();
    format!("{signin_path}?{query}")
}

/// Percent-encode `raw` the way a URL parser serializes it. Escapes already
/// present are kept as they are, so the callback decodes back to the exact
/// requested URL. Strings that do not parse as absolute URLs are returned
/// unchanged.
#[must_use]
pub fn encode_url(raw: &str) -> String {
    url::Url::parse(raw).map_or_else(|_| raw.to_owned(), String::from)
}

/// Rebuild the URL the client asked for.
fn original_url(config: &GuardConfig, request: &Request) -> String {
    let origin = config.public_origin.clone().unwrap_or_else(|| {
        let host = request
            .headers()
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("localhost");
        format!("http://{host}")
    });
    let path_and_query = request
        .uri()
        .path_and_query()
        .map_or_else(|| request.uri().path().to_owned(), ToString::to_string);
    format!("{origin}{path_and_query}")
}

/// Axum middleware wrapper around [`evaluate`].
pub async fn route_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let jar = CookieJar::from_headers(request.headers());
    let has_credential = session::credential(&jar).is_some();
    let path = request.uri().path().to_owned();
    let url = original_url(&state.guard, &request);

    match evaluate(&state.guard, &path, &url, has_credential) {
        GuardDecision::Pass => next.run(request).await,
        GuardDecision::Redirect(location) => {
            tracing::debug!(%path, %location, "unauthenticated request to protected page");
            Redirect::temporary(&location).into_response()
        }
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
