use anyhow::Result;
use std::sync::Arc;

use cortex_services::{app, config, logging, services::store, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging()?;

    let config = config::load_config()?;
    let store = store::from_config(&config)?;

    let addr = config.socket_addr();
    let state = Arc::new(AppState::new(config, store));
    let app = app(state);

    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
