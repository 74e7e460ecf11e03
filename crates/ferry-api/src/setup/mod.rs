//! Application setup and initialization
//!
//! Everything main.rs needs to go from a loaded configuration to a running router,
//! split out so integration tests can assemble the same application.

pub mod routes;
pub mod server;
pub mod services;
pub mod storage;

use crate::rooms::InMemoryRoomLog;
use crate::state::AppState;
use anyhow::{Context, Result};
use ferry_core::FerryConfig;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: FerryConfig) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    config
        .validate()
        .context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.log_format())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment(),
        "Configuration loaded and validated successfully"
    );

    let storage = storage::setup_storage(&config).await?;

    let rooms = Arc::new(InMemoryRoomLog::new());
    let state = services::initialize_services(&config, storage, rooms);

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
