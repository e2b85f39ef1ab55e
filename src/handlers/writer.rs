//! Broker-to-store writer.
//!
//! Appends every consumed message to the event store stream named by the
//! message's routing key.

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{error, info};
use uuid::Uuid;

use crate::bus::{BusError, BusMessage, MessageHandler};
use crate::storage::{EventStore, NewEvent};

/// Message handler that writes consumed events to the event store.
#[derive(Clone)]
pub struct StoreWriter {
    store: Arc<dyn EventStore>,
}

impl StoreWriter {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Decode a message body into the event to append.
    ///
    /// The body must be a JSON object with a string `event_type`. Its
    /// `event_id` becomes the stored event id when it parses as a UUID.
    pub fn decode(payload: &[u8]) -> Result<NewEvent, BusError> {
        let data: serde_json::Value =
            serde_json::from_slice(payload).map_err(|e| BusError::Decode(e.to_string()))?;

        let object = data
            .as_object()
            .ok_or_else(|| BusError::Decode("expected a JSON object".to_string()))?;

        let event_type = object
            .get("event_type")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| BusError::Decode("missing event_type".to_string()))?
            .to_string();

        let id = object
            .get("event_id")
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        Ok(NewEvent::new(id, event_type, data))
    }

    /// Append one message to its routing-key stream.
    pub async fn write(&self, message: &BusMessage) -> Result<(), BusError> {
        let event = Self::decode(&message.payload)?;
        let stream = message.routing_key.as_str();

        if stream.is_empty() {
            return Err(BusError::Decode("empty routing key".to_string()));
        }

        let event_type = event.event_type.clone();
        self.store.append(stream, event).await.map_err(|e| {
            error!(stream = %stream, error = %e, "Error writing to event store");
            BusError::Handler(e.to_string())
        })?;

        info!(stream = %stream, event_type = %event_type, "Event written to event store");
        Ok(())
    }
}

impl MessageHandler for StoreWriter {
    fn handle(&self, message: Arc<BusMessage>) -> BoxFuture<'static, Result<(), BusError>> {
        let writer = self.clone();
        Box::pin(async move { writer.write(&message).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{EventBus, MockEventBus};
    use crate::storage::MockEventStore;
    use serde_json::json;

    #[test]
    fn test_decode_uses_event_id() {
        let id = Uuid::new_v4();
        let body = json!({ "event_id": id.to_string(), "event_type": "OrderShipped" });
        let event = StoreWriter::decode(body.to_string().as_bytes()).unwrap();
        assert_eq!(event.id, id);
        assert_eq!(event.event_type, "OrderShipped");
        assert_eq!(event.data, body);
    }

    #[test]
    fn test_decode_generates_id_when_missing() {
        let event = StoreWriter::decode(br#"{"event_type":"UserLoggedIn"}"#).unwrap();
        assert!(!event.id.is_nil());
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(matches!(
            StoreWriter::decode(b"not json"),
            Err(BusError::Decode(_))
        ));
        assert!(matches!(
            StoreWriter::decode(b"[1, 2]"),
            Err(BusError::Decode(_))
        ));
        assert!(matches!(
            StoreWriter::decode(br#"{"username":"bob"}"#),
            Err(BusError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_writes_to_routing_key_stream() {
        let store = Arc::new(MockEventStore::new());
        let writer = StoreWriter::new(store.clone());

        let message = BusMessage::new(
            "ProductViewed",
            br#"{"event_type":"ProductViewed","username":"bob"}"#.to_vec(),
        );
        writer.write(&message).await.unwrap();

        let events = store.read_stream("ProductViewed").await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "ProductViewed");
        assert_eq!(events[0].json().unwrap()["username"], "bob");
    }

    #[tokio::test]
    async fn test_store_failure_is_reported() {
        let store = Arc::new(MockEventStore::new());
        store.set_fail_on_append(true).await;
        let writer = StoreWriter::new(store);

        let message = BusMessage::new("OrderPlaced", br#"{"event_type":"OrderPlaced"}"#.to_vec());
        assert!(matches!(
            writer.write(&message).await,
            Err(BusError::Handler(_))
        ));
    }

    #[tokio::test]
    async fn test_consumer_keeps_going_after_bad_message() {
        let store = Arc::new(MockEventStore::new());
        let bus = MockEventBus::new();
        bus.subscribe(Box::new(StoreWriter::new(store.clone())))
            .await
            .unwrap();

        bus.inject(BusMessage::new("OrderPlaced", b"garbage".to_vec()))
            .await;
        bus.inject(BusMessage::new(
            "OrderPlaced",
            br#"{"event_type":"OrderPlaced"}"#.to_vec(),
        ))
        .await;
        bus.consume().await.unwrap();

        assert_eq!(store.stream_len("OrderPlaced").await, 1);
    }
}
