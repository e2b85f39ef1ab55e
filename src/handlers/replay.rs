//! Stream replay.
//!
//! Reads a stream from the event store and sends every stored event, in
//! stream order, to a named queue.

use std::sync::Arc;

use tracing::{debug, info};

use crate::bus::{BusError, EventBus};
use crate::storage::{EventStore, StorageError};

/// Errors that can occur while replaying a stream.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Error reading from EventStoreDB: {0}")]
    Read(#[source] StorageError),

    #[error("No events found for event type '{0}'")]
    NotFound(String),

    #[error("Event at revision {revision} of '{stream}' is not valid JSON: {message}")]
    Decode {
        stream: String,
        revision: u64,
        message: String,
    },

    #[error("Replay to queue '{queue}' stopped after {replayed} events: {source}")]
    Publish {
        queue: String,
        replayed: usize,
        #[source]
        source: BusError,
    },
}

/// Replays event store streams onto broker queues.
pub struct ReplayService {
    store: Arc<dyn EventStore>,
    bus: Arc<dyn EventBus>,
}

impl ReplayService {
    pub fn new(store: Arc<dyn EventStore>, bus: Arc<dyn EventBus>) -> Self {
        Self { store, bus }
    }

    /// Send every event of `stream` to `target_queue`.
    ///
    /// Returns the number of events sent. Stops at the first failure.
    pub async fn replay(&self, stream: &str, target_queue: &str) -> Result<usize, ReplayError> {
        if stream.trim().is_empty() {
            return Err(ReplayError::InvalidRequest(
                "event_type must not be empty".to_string(),
            ));
        }
        if target_queue.trim().is_empty() {
            return Err(ReplayError::InvalidRequest(
                "target_queue must not be empty".to_string(),
            ));
        }

        let events = self
            .store
            .read_stream(stream)
            .await
            .map_err(ReplayError::Read)?;

        if events.is_empty() {
            return Err(ReplayError::NotFound(stream.to_string()));
        }

        let mut replayed = 0;
        for event in &events {
            let body = event.json().map_err(|e| ReplayError::Decode {
                stream: stream.to_string(),
                revision: event.revision,
                message: e.to_string(),
            })?;
            let payload = serde_json::to_vec(&body).map_err(|e| ReplayError::Decode {
                stream: stream.to_string(),
                revision: event.revision,
                message: e.to_string(),
            })?;

            self.bus
                .send_to_queue(target_queue, &payload)
                .await
                .map_err(|source| ReplayError::Publish {
                    queue: target_queue.to_string(),
                    replayed,
                    source,
                })?;

            debug!(queue = %target_queue, revision = event.revision, "Event replayed");
            replayed += 1;
        }

        info!(
            stream = %stream,
            queue = %target_queue,
            replayed,
            "Replay complete"
        );

        Ok(replayed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::mock::Destination;
    use crate::bus::MockEventBus;
    use crate::storage::{MockEventStore, NewEvent};
    use serde_json::json;
    use uuid::Uuid;

    async fn seeded_store(stream: &str, count: usize) -> Arc<MockEventStore> {
        let store = Arc::new(MockEventStore::new());
        for i in 0..count {
            store
                .append(
                    stream,
                    NewEvent::new(
                        Uuid::new_v4(),
                        "OrderPlaced",
                        json!({ "event_type": "OrderPlaced", "seq": i }),
                    ),
                )
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_replays_all_events_in_order() {
        let store = seeded_store("order-events-stream", 3).await;
        let bus = Arc::new(MockEventBus::new());
        let service = ReplayService::new(store, bus.clone());

        let count = service
            .replay("order-events-stream", "replay-q")
            .await
            .unwrap();
        assert_eq!(count, 3);

        let sent = bus.take_sent().await;
        assert_eq!(sent.len(), 3);
        for (i, message) in sent.iter().enumerate() {
            assert_eq!(message.destination, Destination::Queue("replay-q".into()));
            let body: serde_json::Value = serde_json::from_slice(&message.payload).unwrap();
            assert_eq!(body["seq"], i);
        }
    }

    #[tokio::test]
    async fn test_empty_stream_is_not_found() {
        let store = Arc::new(MockEventStore::new());
        let bus = Arc::new(MockEventBus::new());
        let service = ReplayService::new(store, bus.clone());

        let err = service.replay("OrderPlaced", "q").await.unwrap_err();
        assert!(matches!(err, ReplayError::NotFound(ref s) if s == "OrderPlaced"));
        assert_eq!(err.to_string(), "No events found for event type 'OrderPlaced'");
        assert_eq!(bus.sent_count().await, 0);
    }

    #[tokio::test]
    async fn test_read_failure() {
        let store = seeded_store("s", 1).await;
        store.set_fail_on_read(true).await;
        let service = ReplayService::new(store, Arc::new(MockEventBus::new()));

        let err = service.replay("s", "q").await.unwrap_err();
        assert!(matches!(err, ReplayError::Read(_)));
        assert!(err.to_string().starts_with("Error reading from EventStoreDB"));
    }

    #[tokio::test]
    async fn test_publish_failure_reports_progress() {
        let store = seeded_store("s", 5).await;
        let bus = Arc::new(MockEventBus::new());
        bus.set_fail_after(Some(2)).await;
        let service = ReplayService::new(store, bus.clone());

        let err = service.replay("s", "q").await.unwrap_err();
        assert!(matches!(err, ReplayError::Publish { replayed: 2, .. }));
        assert_eq!(bus.sent_count().await, 2);
    }

    #[tokio::test]
    async fn test_non_json_event_stops_replay() {
        let store = Arc::new(MockEventStore::new());
        store.append_raw("s", "Binary", vec![0xff, 0x00]).await;
        let service = ReplayService::new(store, Arc::new(MockEventBus::new()));

        let err = service.replay("s", "q").await.unwrap_err();
        assert!(matches!(err, ReplayError::Decode { revision: 0, .. }));
    }

    #[tokio::test]
    async fn test_blank_inputs_rejected() {
        let service = ReplayService::new(
            Arc::new(MockEventStore::new()),
            Arc::new(MockEventBus::new()),
        );
        assert!(matches!(
            service.replay(" ", "q").await,
            Err(ReplayError::InvalidRequest(_))
        ));
        assert!(matches!(
            service.replay("s", "").await,
            Err(ReplayError::InvalidRequest(_))
        ));
    }
}
