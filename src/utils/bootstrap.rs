//! Bootstrap utilities for shopstream binaries.
//!
//! Shared initialization code for all binaries.

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, LOG_ENV_VAR};

/// Initialize tracing with the SHOPSTREAM_LOG environment variable.
///
/// Defaults to "info" level if SHOPSTREAM_LOG is not set.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize tracing and load configuration.
pub fn init(binary: &str) -> Result<Config, ::config::ConfigError> {
    init_tracing();
    let config = Config::load()?;
    info!(
        binary,
        messaging = ?config.messaging.messaging_type,
        storage = ?config.storage.storage_type,
        "Configuration loaded"
    );
    Ok(config)
}

/// Resolve when the process receives Ctrl-C.
///
/// A failure to install the handler is logged and the future never resolves.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
