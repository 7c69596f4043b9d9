use axum::{extract::DefaultBodyLimit, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use services::{auth::SessionManager, store::Store};

// Application state
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub sessions: SessionManager,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn Store>) -> Self {
        let sessions = SessionManager::new(Duration::from_secs(config.token_ttl_hours * 3600));
        Self {
            config,
            store,
            sessions,
        }
    }
}

/// Builds the full router with middleware applied.
pub fn app(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_file_size;

    Router::new()
        .merge(routes::routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
