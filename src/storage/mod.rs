//! Event store access.
//!
//! This module contains:
//! - `EventStore` trait: append to and read named streams
//! - Storage configuration types
//! - Implementations: EventStoreDB, Mock (in-memory)

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::event::ShopEvent;

#[cfg(feature = "eventstoredb")]
pub mod eventstoredb;
pub mod mock;

#[cfg(feature = "eventstoredb")]
pub use eventstoredb::EventStoreDbEventStore;
pub use mock::MockEventStore;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("EventStoreDB error: {0}")]
    EventStoreDb(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stream '{0}' is unavailable")]
    Unavailable(String),
}

/// Event to be appended to a stream.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    /// Event id recorded by the store.
    pub id: Uuid,
    /// Event type label.
    pub event_type: String,
    /// JSON body.
    pub data: serde_json::Value,
}

impl NewEvent {
    pub fn new(id: Uuid, event_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            id,
            event_type: event_type.into(),
            data,
        }
    }

    /// Wrap a simulated event, keeping its id as the store event id.
    pub fn from_shop_event(event: &ShopEvent) -> Result<Self> {
        Ok(Self {
            id: event.event_id,
            event_type: event.event_type.as_str().to_string(),
            data: event.to_json()?,
        })
    }
}

/// Event as read back from a stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEvent {
    pub id: Uuid,
    pub event_type: String,
    /// Zero-based position within the stream.
    pub revision: u64,
    /// Raw body as stored.
    pub data: Bytes,
}

impl StoredEvent {
    /// Parse the body as JSON.
    pub fn json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_slice(&self.data)?)
    }
}

/// Interface for append-only stream storage.
///
/// Implementations:
/// - `EventStoreDbEventStore`: EventStoreDB over gRPC
/// - `MockEventStore`: In-memory store for testing and local runs
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append one event to a stream, creating the stream if needed.
    ///
    /// Appends are unconditional: any current stream revision is accepted.
    async fn append(&self, stream: &str, event: NewEvent) -> Result<()>;

    /// Read a whole stream from the start, in order.
    ///
    /// A stream that does not exist reads as empty.
    async fn read_stream(&self, stream: &str) -> Result<Vec<StoredEvent>>;
}

// ============================================================================
// Configuration
// ============================================================================

/// Storage type discriminator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// EventStoreDB server.
    #[default]
    EventStoreDb,
    /// Process-local in-memory streams.
    Memory,
}

/// Storage configuration (discriminated union).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage type discriminator.
    #[serde(rename = "type")]
    pub storage_type: StorageType,
    /// EventStoreDB-specific configuration.
    pub eventstoredb: EventStoreDbConfig,
}

/// EventStoreDB-specific configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EventStoreDbConfig {
    /// Connection string (e.g., esdb://localhost:2113?tls=false).
    pub connection_string: String,
}

impl Default for EventStoreDbConfig {
    fn default() -> Self {
        Self {
            connection_string: "esdb://localhost:2113?tls=false".to_string(),
        }
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Initialize the event store based on configuration.
///
/// Requires the `eventstoredb` feature for the EventStoreDB backend
/// (included in default).
pub async fn init_event_store(
    config: &StorageConfig,
) -> std::result::Result<Arc<dyn EventStore>, Box<dyn std::error::Error + Send + Sync>> {
    match config.storage_type {
        StorageType::EventStoreDb => {
            #[cfg(feature = "eventstoredb")]
            {
                let store =
                    EventStoreDbEventStore::new(&config.eventstoredb.connection_string).await?;
                info!(storage_type = "eventstoredb", "Event store initialized");
                Ok(Arc::new(store))
            }

            #[cfg(not(feature = "eventstoredb"))]
            {
                Err("EventStoreDB support requires the 'eventstoredb' feature. Rebuild with --features eventstoredb".into())
            }
        }
        StorageType::Memory => {
            info!(storage_type = "memory", "Event store initialized");
            Ok(Arc::new(MockEventStore::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventDetails, EventType};
    use chrono::Utc;

    #[test]
    fn test_storage_config_default() {
        let config = StorageConfig::default();
        assert_eq!(config.storage_type, StorageType::EventStoreDb);
        assert_eq!(
            config.eventstoredb.connection_string,
            "esdb://localhost:2113?tls=false"
        );
    }

    #[test]
    fn test_new_event_keeps_shop_event_id() {
        let event = ShopEvent {
            event_id: Uuid::new_v4(),
            event_type: EventType::OrderShipped,
            timestamp: Utc::now(),
            user_id: Uuid::new_v4(),
            username: "ivy".to_string(),
            details: EventDetails::Fulfillment {
                order_id: Uuid::new_v4(),
            },
        };

        let new_event = NewEvent::from_shop_event(&event).unwrap();
        assert_eq!(new_event.id, event.event_id);
        assert_eq!(new_event.event_type, "OrderShipped");
        assert_eq!(new_event.data["username"], "ivy");
    }

    #[tokio::test]
    async fn test_init_memory_store() {
        let config = StorageConfig {
            storage_type: StorageType::Memory,
            ..Default::default()
        };
        let store = init_event_store(&config).await.unwrap();
        assert!(store.read_stream("anything").await.unwrap().is_empty());
    }
}
