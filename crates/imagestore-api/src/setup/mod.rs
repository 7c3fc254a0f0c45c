//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;

use std::sync::Arc;

use anyhow::{Context, Result};
use imagestore_core::Config;

use crate::state::AppState;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Fail fast on misconfiguration
    config
        .validate()
        .context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.log_format())?;
    tracing::info!(
        environment = %config.environment(),
        "Configuration loaded and validated successfully"
    );

    let index = database::setup_database(&config).await?;
    let store = storage::setup_storage(&config).await?;
    let state = services::initialize_services(&config, store, index);
    let router = routes::setup_routes(&config, state.clone());

    Ok((state, router))
}
