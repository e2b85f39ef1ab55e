//! AMQP (RabbitMQ) event bus implementation.
//!
//! Uses a topic exchange for routing events to consumers by event type.

use std::sync::Arc;

use async_trait::async_trait;
use deadpool_lapin::{Manager, Pool, PoolError};
use futures::StreamExt;
use lapin::{
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, BasicRejectOptions,
        ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
    },
    types::FieldTable,
    BasicProperties, Channel, ExchangeKind,
};
use tokio::sync::RwLock;
use tracing::{debug, error, info, Instrument};

use super::{AmqpBusConfig, BusError, BusMessage, EventBus, MessageHandler, Result};

/// Content type set on every published message.
const JSON_CONTENT_TYPE: &str = "application/json";

/// Consumer tag used by the store writer.
const CONSUMER_TAG: &str = "shopstream-consumer";

/// Configuration for AMQP connection.
#[derive(Clone, Debug)]
pub struct AmqpConfig {
    /// AMQP connection URL (e.g., amqp://localhost:5672).
    pub url: String,
    /// Topic exchange for publishing events.
    pub exchange: String,
    /// Queue name for consuming.
    pub queue: String,
    /// Routing key pattern for binding (e.g., "#").
    pub binding_key: String,
    /// Declare exchange and queues as durable.
    pub durable: bool,
}

impl AmqpConfig {
    /// Create config with the stock exchange and writer queue.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::from(&AmqpBusConfig::default())
        }
    }
}

impl From<&AmqpBusConfig> for AmqpConfig {
    fn from(config: &AmqpBusConfig) -> Self {
        Self {
            url: config.url.clone(),
            exchange: config.exchange.clone(),
            queue: config.queue.clone(),
            binding_key: config.binding_key.clone(),
            durable: config.durable,
        }
    }
}

/// AMQP event bus implementation using RabbitMQ.
///
/// Events are published to a topic exchange with the event type as routing
/// key. The writer queue binds with `#` to receive every event.
pub struct AmqpEventBus {
    pool: Pool,
    config: AmqpConfig,
    handlers: Arc<RwLock<Vec<Box<dyn MessageHandler>>>>,
}

impl AmqpEventBus {
    /// Create a new AMQP event bus.
    pub async fn new(config: AmqpConfig) -> Result<Self> {
        let manager = Manager::new(config.url.clone(), Default::default());
        let pool = Pool::builder(manager)
            .max_size(10)
            .build()
            .map_err(|e| BusError::Connection(format!("Failed to create pool: {}", e)))?;

        // Verify connection
        let conn = pool
            .get()
            .await
            .map_err(|e| BusError::Connection(format!("Failed to connect: {}", e)))?;

        // Create channel and declare exchange
        let channel = conn
            .create_channel()
            .await
            .map_err(|e| BusError::Connection(format!("Failed to create channel: {}", e)))?;

        channel
            .exchange_declare(
                &config.exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: config.durable,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| BusError::Connection(format!("Failed to declare exchange: {}", e)))?;

        info!(
            exchange = %config.exchange,
            url = %config.url,
            "Connected to AMQP"
        );

        Ok(Self {
            pool,
            config,
            handlers: Arc::new(RwLock::new(Vec::new())),
        })
    }

    /// Get a channel from the pool.
    async fn get_channel(&self) -> Result<Channel> {
        let conn = self.pool.get().await.map_err(|e: PoolError| {
            BusError::Connection(format!("Failed to get connection from pool: {}", e))
        })?;

        conn.create_channel()
            .await
            .map_err(|e| BusError::Connection(format!("Failed to create channel: {}", e)))
    }

    fn properties() -> BasicProperties {
        BasicProperties::default().with_content_type(JSON_CONTENT_TYPE.into())
    }

    async fn basic_publish(
        &self,
        channel: &Channel,
        exchange: &str,
        routing_key: &str,
        payload: &[u8],
    ) -> Result<()> {
        let confirm = channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                payload,
                Self::properties(),
            )
            .await
            .map_err(|e| BusError::Publish(format!("Failed to publish: {}", e)))?;

        confirm
            .await
            .map_err(|e| BusError::Publish(format!("Publish confirmation failed: {}", e)))?;

        Ok(())
    }

    /// Declare queue, bind to exchange, and start a consumer.
    async fn setup_consumer(&self) -> Result<lapin::Consumer> {
        let channel = self.get_channel().await?;

        channel
            .queue_declare(
                &self.config.queue,
                QueueDeclareOptions {
                    durable: self.config.durable,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| BusError::Subscribe(format!("Failed to declare queue: {}", e)))?;

        channel
            .queue_bind(
                &self.config.queue,
                &self.config.exchange,
                &self.config.binding_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| BusError::Subscribe(format!("Failed to bind queue: {}", e)))?;

        info!(
            queue = %self.config.queue,
            binding_key = %self.config.binding_key,
            "Bound queue to exchange"
        );

        channel
            .basic_consume(
                &self.config.queue,
                CONSUMER_TAG,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| BusError::Subscribe(format!("Failed to start consumer: {}", e)))
    }

    /// Process a single delivery from the consumer.
    async fn process_delivery(
        delivery: lapin::message::Delivery,
        handlers: &Arc<RwLock<Vec<Box<dyn MessageHandler>>>>,
    ) {
        if delivery.data.is_empty() {
            error!(routing_key = %delivery.routing_key, "Received empty message");
            // Reject message (don't requeue malformed messages)
            let _ = delivery.reject(BasicRejectOptions::default()).await;
            return;
        }

        let message = Arc::new(BusMessage {
            routing_key: delivery.routing_key.to_string(),
            payload: delivery.data.clone(),
        });

        debug!(routing_key = %message.routing_key, "Received message");

        let consume_span = tracing::info_span!("bus.consume", routing_key = %message.routing_key);

        async {
            let handlers_guard = handlers.read().await;
            for handler in handlers_guard.iter() {
                if let Err(e) = handler.handle(Arc::clone(&message)).await {
                    error!(error = %e, "Handler failed");
                }
            }
        }
        .instrument(consume_span)
        .await;

        if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
            error!(error = %e, "Failed to ack message");
        }
    }
}

#[async_trait]
impl EventBus for AmqpEventBus {
    #[tracing::instrument(name = "bus.publish", skip_all, fields(routing_key = %routing_key))]
    async fn publish(&self, routing_key: &str, payload: &[u8]) -> Result<()> {
        let channel = self.get_channel().await?;
        self.basic_publish(&channel, &self.config.exchange, routing_key, payload)
            .await?;

        debug!(
            exchange = %self.config.exchange,
            routing_key = %routing_key,
            "Published event"
        );
        Ok(())
    }

    #[tracing::instrument(name = "bus.send_to_queue", skip_all, fields(queue = %queue))]
    async fn send_to_queue(&self, queue: &str, payload: &[u8]) -> Result<()> {
        let channel = self.get_channel().await?;

        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: self.config.durable,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| BusError::Publish(format!("Failed to declare queue: {}", e)))?;

        // Default exchange routes by queue name
        self.basic_publish(&channel, "", queue, payload).await?;

        debug!(queue = %queue, "Sent message to queue");
        Ok(())
    }

    async fn subscribe(&self, handler: Box<dyn MessageHandler>) -> Result<()> {
        let mut handlers = self.handlers.write().await;
        handlers.push(handler);

        Ok(())
    }

    async fn consume(&self) -> Result<()> {
        let mut consumer = self.setup_consumer().await?;

        info!(queue = %self.config.queue, "Consuming events");

        while let Some(delivery) = consumer.next().await {
            match delivery {
                Ok(delivery) => Self::process_delivery(delivery, &self.handlers).await,
                Err(e) => {
                    error!(error = %e, "Consumer delivery error");
                    return Err(BusError::Consume(e.to_string()));
                }
            }
        }

        info!(queue = %self.config.queue, "Consumer stream ended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_bus_config() {
        let bus_config = AmqpBusConfig {
            url: "amqp://rabbit:5672".to_string(),
            durable: true,
            ..Default::default()
        };
        let config = AmqpConfig::from(&bus_config);
        assert_eq!(config.url, "amqp://rabbit:5672");
        assert_eq!(config.exchange, "ecommerce-exchange");
        assert_eq!(config.queue, "eventstore-writer-queue");
        assert!(config.durable);
    }

    #[test]
    fn test_new_config_uses_stock_topology() {
        let config = AmqpConfig::new("amqp://localhost:5672");
        assert_eq!(config.binding_key, "#");
        assert!(!config.durable);
    }

    #[test]
    fn test_properties_are_json() {
        let props = AmqpEventBus::properties();
        assert_eq!(
            props.content_type().as_ref().map(|s| s.as_str()),
            Some(JSON_CONTENT_TYPE)
        );
    }
}

/// Integration tests requiring a running RabbitMQ instance.
///
/// Run with: AMQP_URL=amqp://localhost:5672 cargo test amqp_integration -- --ignored
#[cfg(test)]
mod integration_tests {
    use super::*;
    use futures::future::BoxFuture;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn amqp_url() -> String {
        std::env::var("AMQP_URL").unwrap_or_else(|_| "amqp://localhost:5672".to_string())
    }

    fn isolated_config() -> AmqpConfig {
        let suffix = uuid::Uuid::new_v4();
        AmqpConfig {
            exchange: format!("test-exchange-{}", suffix),
            queue: format!("test-queue-{}", suffix),
            ..AmqpConfig::new(amqp_url())
        }
    }

    struct ForwardingHandler {
        tx: mpsc::Sender<BusMessage>,
    }

    impl MessageHandler for ForwardingHandler {
        fn handle(&self, message: Arc<BusMessage>) -> BoxFuture<'static, Result<()>> {
            let tx = self.tx.clone();
            let message = (*message).clone();
            Box::pin(async move {
                let _ = tx.send(message).await;
                Ok(())
            })
        }
    }

    #[tokio::test]
    #[ignore = "Requires RabbitMQ"]
    async fn test_publish_and_consume() {
        let bus = Arc::new(
            AmqpEventBus::new(isolated_config())
                .await
                .expect("Failed to create bus"),
        );

        let (tx, mut rx) = mpsc::channel(10);
        bus.subscribe(Box::new(ForwardingHandler { tx }))
            .await
            .expect("Failed to subscribe");

        let consumer = Arc::clone(&bus);
        tokio::spawn(async move {
            let _ = consumer.consume().await;
        });

        // Give consumer time to bind
        tokio::time::sleep(Duration::from_millis(200)).await;

        bus.publish("OrderPlaced", br#"{"event_type":"OrderPlaced"}"#)
            .await
            .expect("Failed to publish");

        let received = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("Timed out waiting for message")
            .expect("Channel closed");

        assert_eq!(received.routing_key, "OrderPlaced");
        assert_eq!(received.payload, br#"{"event_type":"OrderPlaced"}"#.to_vec());
    }

    #[tokio::test]
    #[ignore = "Requires RabbitMQ"]
    async fn test_send_to_queue_declares_queue() {
        let bus = AmqpEventBus::new(isolated_config())
            .await
            .expect("Failed to create bus");

        let queue = format!("replay-{}", uuid::Uuid::new_v4());
        bus.send_to_queue(&queue, b"{}")
            .await
            .expect("Send should succeed");
    }
}
