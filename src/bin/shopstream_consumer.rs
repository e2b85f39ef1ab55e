//! shopstream-consumer: Broker-to-store writer
//!
//! Consumes every event from the topic exchange (queue bound with `#`) and
//! appends it to the event store stream named by its routing key.
//!
//! ## Architecture
//! ```text
//! [ecommerce-exchange] --(#)--> [eventstore-writer-queue] --> [shopstream-consumer]
//!                                                                     |
//!                                                                     v
//!                                                         stream = routing key
//! ```

use tracing::info;

use shopstream::bus::init_event_bus;
use shopstream::handlers::StoreWriter;
use shopstream::storage::init_event_store;
use shopstream::utils::bootstrap::{init, shutdown_signal};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = init("shopstream-consumer")?;

    let store = init_event_store(&config.storage).await?;
    let bus = init_event_bus(&config.messaging).await?;

    bus.subscribe(Box::new(StoreWriter::new(store))).await?;

    info!(
        queue = %config.messaging.amqp.queue,
        exchange = %config.messaging.amqp.exchange,
        "Consuming events"
    );

    tokio::select! {
        result = bus.consume() => result?,
        _ = shutdown_signal() => info!("Event consumption stopped"),
    }

    Ok(())
}
