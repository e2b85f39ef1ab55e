//! Mock event bus implementation for testing.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::error;

use super::{BusError, BusMessage, EventBus, MessageHandler, Result};

/// Where a recorded message was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Topic exchange, with routing key.
    Exchange(String),
    /// Named queue via the default exchange.
    Queue(String),
}

/// Message captured by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub destination: Destination,
    pub payload: Vec<u8>,
}

/// Mock event bus for testing.
#[derive(Default)]
pub struct MockEventBus {
    sent: RwLock<Vec<SentMessage>>,
    inbound: RwLock<VecDeque<BusMessage>>,
    handlers: RwLock<Vec<Box<dyn MessageHandler>>>,
    fail_after: RwLock<Option<usize>>,
}

impl MockEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every send once `count` messages have been sent.
    pub async fn set_fail_after(&self, count: Option<usize>) {
        *self.fail_after.write().await = count;
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.read().await.len()
    }

    pub async fn take_sent(&self) -> Vec<SentMessage> {
        std::mem::take(&mut *self.sent.write().await)
    }

    /// Queue a message for the next `consume` call.
    pub async fn inject(&self, message: BusMessage) {
        self.inbound.write().await.push_back(message);
    }

    async fn record(&self, destination: Destination, payload: &[u8]) -> Result<()> {
        let mut sent = self.sent.write().await;
        if let Some(limit) = *self.fail_after.read().await {
            if sent.len() >= limit {
                return Err(BusError::Publish("Mock publish failure".to_string()));
            }
        }
        sent.push(SentMessage {
            destination,
            payload: payload.to_vec(),
        });
        Ok(())
    }
}

#[async_trait]
impl EventBus for MockEventBus {
    async fn publish(&self, routing_key: &str, payload: &[u8]) -> Result<()> {
        self.record(Destination::Exchange(routing_key.to_string()), payload)
            .await
    }

    async fn send_to_queue(&self, queue: &str, payload: &[u8]) -> Result<()> {
        self.record(Destination::Queue(queue.to_string()), payload)
            .await
    }

    async fn subscribe(&self, handler: Box<dyn MessageHandler>) -> Result<()> {
        self.handlers.write().await.push(handler);
        Ok(())
    }

    /// Deliver every injected message, then return.
    async fn consume(&self) -> Result<()> {
        loop {
            let next = self.inbound.write().await.pop_front();
            let Some(message) = next else {
                return Ok(());
            };

            let message = Arc::new(message);
            let handlers = self.handlers.read().await;
            for handler in handlers.iter() {
                if let Err(e) = handler.handle(Arc::clone(&message)).await {
                    error!(error = %e, "Handler failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        count: Arc<AtomicUsize>,
    }

    impl MessageHandler for CountingHandler {
        fn handle(&self, _message: Arc<BusMessage>) -> BoxFuture<'static, Result<()>> {
            let count = self.count.clone();
            Box::pin(async move {
                count.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn test_records_destinations() {
        let bus = MockEventBus::new();
        bus.publish("OrderPlaced", b"a").await.unwrap();
        bus.send_to_queue("replay-q", b"b").await.unwrap();

        let sent = bus.take_sent().await;
        assert_eq!(sent[0].destination, Destination::Exchange("OrderPlaced".into()));
        assert_eq!(sent[1].destination, Destination::Queue("replay-q".into()));
        assert_eq!(sent[1].payload, b"b".to_vec());
        assert_eq!(bus.sent_count().await, 0);
    }

    #[tokio::test]
    async fn test_fail_after_limit() {
        let bus = MockEventBus::new();
        bus.set_fail_after(Some(1)).await;
        bus.send_to_queue("q", b"1").await.unwrap();
        assert!(bus.send_to_queue("q", b"2").await.is_err());
        assert_eq!(bus.sent_count().await, 1);
    }

    #[tokio::test]
    async fn test_consume_drains_injected_messages() {
        let bus = MockEventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe(Box::new(CountingHandler {
            count: count.clone(),
        }))
        .await
        .unwrap();

        bus.inject(BusMessage::new("ProductViewed", b"{}".to_vec()))
            .await;
        bus.inject(BusMessage::new("OrderPlaced", b"{}".to_vec()))
            .await;
        bus.consume().await.unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
