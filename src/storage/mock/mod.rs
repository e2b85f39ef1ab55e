//! Mock storage implementation for testing.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use super::{EventStore, NewEvent, Result, StorageError, StoredEvent};

/// Mock event store that keeps streams in memory.
#[derive(Default)]
pub struct MockEventStore {
    streams: RwLock<HashMap<String, Vec<StoredEvent>>>,
    fail_on_append: RwLock<bool>,
    fail_on_read: RwLock<bool>,
}

impl MockEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_append(&self, fail: bool) {
        *self.fail_on_append.write().await = fail;
    }

    pub async fn set_fail_on_read(&self, fail: bool) {
        *self.fail_on_read.write().await = fail;
    }

    /// Number of events in a stream.
    pub async fn stream_len(&self, stream: &str) -> usize {
        self.streams
            .read()
            .await
            .get(stream)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Names of all streams that hold at least one event.
    pub async fn stream_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.streams.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Store raw bytes, bypassing JSON encoding.
    pub async fn append_raw(&self, stream: &str, event_type: &str, data: impl Into<Bytes>) {
        let mut streams = self.streams.write().await;
        let events = streams.entry(stream.to_string()).or_default();
        let revision = events.len() as u64;
        events.push(StoredEvent {
            id: uuid::Uuid::new_v4(),
            event_type: event_type.to_string(),
            revision,
            data: data.into(),
        });
    }
}

#[async_trait]
impl EventStore for MockEventStore {
    async fn append(&self, stream: &str, event: NewEvent) -> Result<()> {
        if *self.fail_on_append.read().await {
            return Err(StorageError::Unavailable(stream.to_string()));
        }

        let data = Bytes::from(serde_json::to_vec(&event.data)?);
        let mut streams = self.streams.write().await;
        let events = streams.entry(stream.to_string()).or_default();
        let revision = events.len() as u64;
        events.push(StoredEvent {
            id: event.id,
            event_type: event.event_type,
            revision,
            data,
        });
        Ok(())
    }

    async fn read_stream(&self, stream: &str) -> Result<Vec<StoredEvent>> {
        if *self.fail_on_read.read().await {
            return Err(StorageError::Unavailable(stream.to_string()));
        }

        Ok(self
            .streams
            .read()
            .await
            .get(stream)
            .cloned()
            .unwrap_or_default())
    }
}
