use ferry_api::setup;
use ferry_core::FerryConfig;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = FerryConfig::from_env()?;

    // Initialize the application (storage, upload core, routes)
    let (state, router) = setup::initialize_app(config.clone()).await?;

    let reaper = setup::services::start_background_tasks(&state);

    // Start the server
    setup::server::start_server(&config, router).await?;

    reaper.abort();
    let drained = state.uploads.store.drain().await;
    tracing::info!(drained_sessions = drained, "Upload sessions drained, exiting");

    Ok(())
}
