//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers and the route guard via the
//! `State` extractor. It is immutable after startup: config plus the
//! backend HTTP client.

use std::sync::Arc;

use crate::config::Config;
use crate::routes::guard::GuardConfig;
use crate::services::backend::{BackendClient, BackendError};

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; inner fields are Arc-wrapped or cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub backend: BackendClient,
    pub guard: Arc<GuardConfig>,
}

impl AppState {
    /// # Errors
    ///
    /// Returns an error if the backend HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self, BackendError> {
        let backend = BackendClient::new(&config.backend_url, config.backend_timeouts)?;
        let guard = GuardConfig::from_config(&config);
        Ok(Self { config: Arc::new(config), backend, guard: Arc::new(guard) })
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
