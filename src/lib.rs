pub mod ai_trigger; // External AI job runner hand-off
pub mod api;
pub mod assessment; // Assessment Submitter
pub mod config;
pub mod core_state;
pub mod db;
pub mod models;
pub mod notifications; // Toasts as an explicit context object
pub mod polling; // Status Poller
pub mod selection; // Recommendation Selector

use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Core(#[from] core_state::CoreError),
    #[error("{0}")]
    Server(String),
    #[error("Signal handler failed: {0}")]
    Signal(#[from] std::io::Error),
}

/// Install the fmt subscriber, filtered by `RUST_LOG` when set.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Serve the API until Ctrl-C.
pub async fn run(app_config: config::AppConfig) -> Result<(), StartupError> {
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let core = Arc::new(core_state::CoreState::from_config(&app_config)?);
    let server = api::start_api_server_on(core, app_config.bind_addr)
        .await
        .map_err(StartupError::Server)?;

    tracing::info!(url = %server.base_url(), "Listening");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Ctrl-C received, shutting down");
    server.stop().await;
    Ok(())
}
