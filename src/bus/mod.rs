//! Message broker access.
//!
//! This module contains:
//! - `EventBus` trait: publish to the topic exchange, send to a named queue,
//!   consume from the writer queue
//! - `MessageHandler` trait: for processing inbound messages
//! - Bus configuration types
//! - Implementations: AMQP (RabbitMQ), Mock

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::info;

#[cfg(feature = "amqp")]
pub mod amqp;
pub mod mock;

#[cfg(feature = "amqp")]
pub use amqp::{AmqpConfig, AmqpEventBus};
pub use mock::MockEventBus;

// ============================================================================
// Traits
// ============================================================================

/// Result type for bus operations.
pub type Result<T> = std::result::Result<T, BusError>;

/// Errors that can occur during bus operations.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Subscribe failed: {0}")]
    Subscribe(String),

    #[error("Consume failed: {0}")]
    Consume(String),

    #[error("Malformed message: {0}")]
    Decode(String),

    #[error("Handler failed: {0}")]
    Handler(String),
}

/// A message received from the broker.
#[derive(Debug, Clone, PartialEq)]
pub struct BusMessage {
    /// Routing key the message was published with.
    pub routing_key: String,
    /// Raw body.
    pub payload: Vec<u8>,
}

impl BusMessage {
    pub fn new(routing_key: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            routing_key: routing_key.into(),
            payload: payload.into(),
        }
    }
}

/// Handler for processing messages from the bus.
pub trait MessageHandler: Send + Sync {
    /// Process one message.
    fn handle(&self, message: Arc<BusMessage>) -> BoxFuture<'static, Result<()>>;
}

/// Interface for the broker.
///
/// Implementations:
/// - `AmqpEventBus`: RabbitMQ via AMQP
/// - `MockEventBus`: In-memory mock for testing
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish to the topic exchange.
    async fn publish(&self, routing_key: &str, payload: &[u8]) -> Result<()>;

    /// Send directly to a named queue, declaring it first.
    async fn send_to_queue(&self, queue: &str, payload: &[u8]) -> Result<()>;

    /// Register a handler for consumed messages.
    async fn subscribe(&self, handler: Box<dyn MessageHandler>) -> Result<()>;

    /// Consume from the configured queue until the delivery stream ends.
    ///
    /// Every registered handler sees every message. Handler failures are
    /// logged and do not stop consumption.
    async fn consume(&self) -> Result<()>;
}

// ============================================================================
// Configuration
// ============================================================================

/// Messaging type discriminator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessagingType {
    /// AMQP/RabbitMQ messaging.
    #[default]
    Amqp,
    /// In-process mock, for local runs without a broker.
    Memory,
}

/// Messaging configuration (discriminated union).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MessagingConfig {
    /// Messaging type discriminator.
    #[serde(rename = "type")]
    pub messaging_type: MessagingType,
    /// AMQP-specific configuration.
    pub amqp: AmqpBusConfig,
}

/// AMQP-specific configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AmqpBusConfig {
    /// AMQP connection URL.
    pub url: String,
    /// Topic exchange events are published to.
    pub exchange: String,
    /// Queue the store writer consumes from.
    pub queue: String,
    /// Binding key for the writer queue.
    pub binding_key: String,
    /// Declare exchange and queues as durable.
    pub durable: bool,
}

impl Default for AmqpBusConfig {
    fn default() -> Self {
        Self {
            url: "amqp://localhost:5672".to_string(),
            exchange: "ecommerce-exchange".to_string(),
            queue: "eventstore-writer-queue".to_string(),
            binding_key: "#".to_string(),
            durable: false,
        }
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Initialize the event bus based on configuration.
///
/// Requires the `amqp` feature for RabbitMQ (included in default).
pub async fn init_event_bus(
    config: &MessagingConfig,
) -> std::result::Result<Arc<dyn EventBus>, Box<dyn std::error::Error + Send + Sync>> {
    match config.messaging_type {
        MessagingType::Amqp => {
            #[cfg(feature = "amqp")]
            {
                let bus = AmqpEventBus::new(AmqpConfig::from(&config.amqp)).await?;
                info!(messaging_type = "amqp", "Event bus initialized");
                Ok(Arc::new(bus))
            }

            #[cfg(not(feature = "amqp"))]
            {
                Err("AMQP support requires the 'amqp' feature. Rebuild with --features amqp".into())
            }
        }
        MessagingType::Memory => {
            info!(messaging_type = "memory", "Event bus initialized");
            Ok(Arc::new(MockEventBus::new()))
        }
    }
}
