//! shopstream-replay-api: Stream replay REST API
//!
//! `POST /replay {"event_type": ..., "target_queue": ...}` reads the named
//! stream from the event store and sends every event to the target queue.
//!
//! ## Configuration
//! - SHOPSTREAM__API__HOST: bind host (default: 0.0.0.0)
//! - SHOPSTREAM__API__PORT: bind port (default: 8000)

use std::sync::Arc;

use shopstream::api;
use shopstream::bus::init_event_bus;
use shopstream::handlers::ReplayService;
use shopstream::storage::init_event_store;
use shopstream::utils::bootstrap::init;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = init("shopstream-replay-api")?;

    let store = init_event_store(&config.storage).await?;
    let bus = init_event_bus(&config.messaging).await?;
    let service = Arc::new(ReplayService::new(store, bus));

    api::serve(service, &config.api.host, config.api.port).await
}
