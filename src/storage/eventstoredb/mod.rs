//! EventStoreDB implementation of the event store.

use async_trait::async_trait;
use eventstore::{
    AppendToStreamOptions, Client, ClientSettings, EventData, ExpectedRevision, ReadStreamOptions,
    StreamPosition,
};
use tracing::debug;

use super::{EventStore, NewEvent, Result, StorageError, StoredEvent};

/// EventStoreDB implementation of EventStore.
///
/// Events are written as JSON with the caller's event id, so re-appending
/// the same event is deduplicated by the server.
pub struct EventStoreDbEventStore {
    client: Client,
}

impl EventStoreDbEventStore {
    /// Create a new EventStoreDB event store.
    pub async fn new(connection_string: &str) -> Result<Self> {
        let settings = connection_string
            .parse::<ClientSettings>()
            .map_err(|e| StorageError::EventStoreDb(e.to_string()))?;
        let client =
            Client::new(settings).map_err(|e| StorageError::EventStoreDb(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl EventStore for EventStoreDbEventStore {
    async fn append(&self, stream: &str, event: NewEvent) -> Result<()> {
        let data = EventData::json(event.event_type.as_str(), &event.data)?.id(event.id);

        let options = AppendToStreamOptions::default().expected_revision(ExpectedRevision::Any);

        self.client
            .append_to_stream(stream, &options, data)
            .await
            .map_err(|e| StorageError::EventStoreDb(e.to_string()))?;

        debug!(
            stream = %stream,
            event_type = %event.event_type,
            event_id = %event.id,
            "Appended event"
        );

        Ok(())
    }

    async fn read_stream(&self, stream: &str) -> Result<Vec<StoredEvent>> {
        let options = ReadStreamOptions::default()
            .position(StreamPosition::Start)
            .forwards();

        let mut stream_result = match self.client.read_stream(stream, &options).await {
            Ok(s) => s,
            Err(eventstore::Error::ResourceNotFound) => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::EventStoreDb(e.to_string())),
        };

        let mut events = Vec::new();
        loop {
            match stream_result.next().await {
                Ok(Some(resolved)) => {
                    let recorded = resolved.get_original_event();
                    events.push(StoredEvent {
                        id: recorded.id,
                        event_type: recorded.event_type.clone(),
                        revision: recorded.revision,
                        data: recorded.data.clone(),
                    });
                }
                Ok(None) => break,
                Err(eventstore::Error::ResourceNotFound) => break,
                Err(e) => return Err(StorageError::EventStoreDb(e.to_string())),
            }
        }

        Ok(events)
    }
}

/// Integration tests requiring a running EventStoreDB instance.
///
/// Run with: ESDB_URL=esdb://localhost:2113?tls=false cargo test eventstoredb -- --ignored
#[cfg(test)]
mod integration_tests {
    use super::*;
    use uuid::Uuid;

    fn esdb_url() -> String {
        std::env::var("ESDB_URL").unwrap_or_else(|_| "esdb://localhost:2113?tls=false".to_string())
    }

    #[tokio::test]
    #[ignore = "Requires EventStoreDB"]
    async fn test_append_and_read_back_in_order() {
        let store = EventStoreDbEventStore::new(&esdb_url())
            .await
            .expect("Failed to create store");
        let stream = format!("test-stream-{}", Uuid::new_v4());

        for i in 0..3 {
            let event = NewEvent::new(
                Uuid::new_v4(),
                "ProductViewed",
                serde_json::json!({ "event_type": "ProductViewed", "seq": i }),
            );
            store.append(&stream, event).await.expect("Failed to append");
        }

        let events = store.read_stream(&stream).await.expect("Failed to read");
        assert_eq!(events.len(), 3);
        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.revision, i as u64);
            assert_eq!(event.event_type, "ProductViewed");
            assert_eq!(event.json().unwrap()["seq"], i as u64);
        }
    }

    #[tokio::test]
    #[ignore = "Requires EventStoreDB"]
    async fn test_missing_stream_reads_empty() {
        let store = EventStoreDbEventStore::new(&esdb_url())
            .await
            .expect("Failed to create store");

        let events = store
            .read_stream(&format!("missing-{}", Uuid::new_v4()))
            .await
            .expect("Missing stream should not error");
        assert!(events.is_empty());
    }
}
