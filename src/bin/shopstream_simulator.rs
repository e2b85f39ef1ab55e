//! shopstream-simulator: Fake e-commerce traffic
//!
//! Generates random shop events and either appends them to the event store
//! (one stream per event category) or publishes them to the topic exchange
//! (routing key = event type).
//!
//! ## Configuration
//! - SHOPSTREAM__SIMULATOR__SINK: `store` (default) or `broker`
//! - SHOPSTREAM__SIMULATOR__INTERVAL_MIN_MS / INTERVAL_MAX_MS: pause window
//! - SHOPSTREAM__SIMULATOR__MAX_EVENTS: stop after N events (optional)

use std::sync::Arc;

use tracing::{error, info};

use shopstream::bus::{init_event_bus, EventBus};
use shopstream::event::ShopEvent;
use shopstream::simulator::{Catalog, EventSimulator, SinkType};
use shopstream::storage::{init_event_store, EventStore, NewEvent};
use shopstream::utils::bootstrap::{init, shutdown_signal};

/// Destination for generated events.
enum Sink {
    Store(Arc<dyn EventStore>),
    Broker(Arc<dyn EventBus>),
}

impl Sink {
    async fn write(&self, event: &ShopEvent) {
        match self {
            Sink::Store(store) => {
                let stream = event.event_type.category_stream();
                let result = match NewEvent::from_shop_event(event) {
                    Ok(new_event) => store.append(stream, new_event).await,
                    Err(e) => Err(e),
                };
                match result {
                    Ok(()) => info!(
                        stream,
                        event_type = %event.event_type,
                        event_id = %event.event_id,
                        "Event written"
                    ),
                    Err(e) => error!(stream, error = %e, "Error writing to event store"),
                }
            }
            Sink::Broker(bus) => {
                let routing_key = event.event_type.as_str();
                let result = match event.to_bytes() {
                    Ok(payload) => bus.publish(routing_key, &payload).await.map_err(|e| e.to_string()),
                    Err(e) => Err(e.to_string()),
                };
                match result {
                    Ok(()) => info!(
                        routing_key,
                        event_id = %event.event_id,
                        "Event published"
                    ),
                    Err(e) => error!(routing_key, error = %e, "Error publishing event"),
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = init("shopstream-simulator")?;
    let sim_config = config.simulator.clone();

    let sink = match sim_config.sink {
        SinkType::Store => Sink::Store(init_event_store(&config.storage).await?),
        SinkType::Broker => Sink::Broker(init_event_bus(&config.messaging).await?),
    };

    let mut simulator = EventSimulator::new(Catalog::sample(), &sim_config)?;

    info!(
        sink = ?sim_config.sink,
        max_events = ?sim_config.max_events,
        "shopstream-simulator started"
    );

    let run = async {
        let mut generated: u64 = 0;
        while sim_config.max_events.map_or(true, |max| generated < max) {
            let event = simulator.simulate();
            sink.write(&event).await;
            generated += 1;
            tokio::time::sleep(simulator.next_delay()).await;
        }
        generated
    };

    tokio::select! {
        generated = run => info!(generated, "Event generation finished"),
        _ = shutdown_signal() => info!("Event generation stopped"),
    }

    Ok(())
}
