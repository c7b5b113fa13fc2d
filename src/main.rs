mod config;
mod error;
mod routes;
mod services;
mod state;

#[tokio::main]
async fn main() {
    // A missing .env file is normal outside local development.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = config::Config::from_env();
    let port = config.port;
    tracing::info!(
        site_dir = %config.site_dir.display(),
        protected = ?config.protected_paths,
        "configuration loaded"
    );

    let state = state::AppState::new(config).expect("backend client init failed");
    tracing::info!(backend = %state.backend.base_url(), "backend client ready");

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "tunematch listening");
    axum::serve(listener, app).await.expect("server failed");
}
