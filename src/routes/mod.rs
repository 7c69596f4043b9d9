use axum::{routing::get, Router};
use std::sync::Arc;

use crate::AppState;

pub mod analysis;
pub mod assistant;
pub mod auth;
pub mod datasets;
pub mod extract;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .merge(auth::routes())
        .merge(datasets::routes())
        .merge(analysis::routes())
        .merge(assistant::routes())
}

async fn health_check() -> &'static str {
    "OK"
}
