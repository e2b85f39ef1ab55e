//! shopstream-replay-ui: Replay management web form
//!
//! Renders a form and forwards submissions to the replay API.
//!
//! ## Configuration
//! - SHOPSTREAM__UI__HOST: bind host (default: 0.0.0.0)
//! - SHOPSTREAM__UI__PORT: bind port (default: 5000)
//! - SHOPSTREAM__UI__REPLAY_API_URL: replay endpoint (default: http://localhost:8000/replay)

use std::sync::Arc;

use tracing::info;

use shopstream::ui::{self, ReplayClient, UiState};
use shopstream::utils::bootstrap::init;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = init("shopstream-replay-ui")?;

    let client = ReplayClient::new(&config.ui.replay_api_url);
    info!(replay_api_url = %client.url(), "Forwarding replay requests");

    let state = Arc::new(UiState::new(client)?);
    ui::serve(state, &config.ui.host, config.ui.port).await
}
