//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Same-origin `/api/users/*` endpoints sit in front of the external
//! backend; every other path is a static page from `SITE_DIR`. The route
//! guard wraps the whole router so it sees page requests before they are
//! served.

pub mod auth;
pub mod guard;
pub mod users;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, post, put};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Full application router.
pub fn app(state: AppState) -> Router {
    let site = ServeDir::new(&state.config.site_dir).append_index_html_on_directories(true);

    Router::new()
        .route("/api/users/me", get(auth::me))
        .route("/api/users/logout", post(auth::logout))
        .route("/api/users/login", post(auth::login))
        .route("/api/users/register", post(auth::register))
        .route("/api/users/profile", get(users::profile))
        .route("/api/users/update", put(users::update))
        .route("/healthz", get(healthz))
        .fallback_service(site)
        .layer(middleware::from_fn_with_state(state.clone(), guard::route_guard))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
