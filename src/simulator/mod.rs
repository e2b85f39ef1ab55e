//! Fake e-commerce traffic generator.
//!
//! Draws a user, a product and an event type uniformly at random and builds
//! the matching [`ShopEvent`]. Identifiers for catalog entries are generated
//! once per [`Catalog`], so a single run reuses a stable set of users and
//! products.

use std::time::Duration;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use uuid::Uuid;

use crate::event::{EventDetails, EventType, OrderLine, PaymentStatus, ShopEvent};

const PRODUCTS: [(&str, u32); 10] = [
    ("Laptop", 1200),
    ("Smartphone", 800),
    ("Headphones", 150),
    ("Smartwatch", 250),
    ("Tablet", 600),
    ("Gaming Console", 400),
    ("Camera", 900),
    ("Wireless Charger", 50),
    ("Bluetooth Speaker", 120),
    ("Keyboard", 80),
];

const USERS: [&str; 10] = [
    "alice", "bob", "charlie", "diana", "edward", "frank", "georgia", "harry", "ivy", "jack",
];

/// Inclusive range for simulated payment amounts.
const PAYMENT_AMOUNT: std::ops::RangeInclusive<u32> = 500..=2000;

/// Maximum number of distinct products in one order.
const MAX_ORDER_LINES: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub product_id: Uuid,
    pub name: String,
    pub price: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub user_id: Uuid,
    pub username: String,
}

/// Users and products the simulator draws from.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub products: Vec<Product>,
    pub users: Vec<User>,
}

impl Catalog {
    /// Build the stock catalog with fresh identifiers.
    pub fn sample() -> Self {
        let products = PRODUCTS
            .iter()
            .map(|(name, price)| Product {
                product_id: Uuid::new_v4(),
                name: (*name).to_string(),
                price: *price,
            })
            .collect();

        let users = USERS
            .iter()
            .map(|name| User {
                user_id: Uuid::new_v4(),
                username: (*name).to_string(),
            })
            .collect();

        Self { products, users }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::sample()
    }
}

/// Simulator configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Where generated events go.
    pub sink: SinkType,
    /// Lower bound of the pause between events, in milliseconds.
    pub interval_min_ms: u64,
    /// Upper bound of the pause between events, in milliseconds.
    pub interval_max_ms: u64,
    /// Stop after this many events. None = run until interrupted.
    pub max_events: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            sink: SinkType::Store,
            interval_min_ms: 10,
            interval_max_ms: 100,
            max_events: None,
        }
    }
}

/// Destination for simulated events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkType {
    /// Append straight to the event store, one stream per category.
    #[default]
    Store,
    /// Publish to the topic exchange with the event type as routing key.
    Broker,
}

#[derive(Debug, thiserror::Error)]
pub enum SimulatorError {
    #[error("Catalog must contain at least one user and one product")]
    EmptyCatalog,

    #[error("Invalid interval: min {min_ms}ms is greater than max {max_ms}ms")]
    InvalidInterval { min_ms: u64, max_ms: u64 },
}

/// Random event generator.
pub struct EventSimulator<R = StdRng> {
    catalog: Catalog,
    interval: (Duration, Duration),
    rng: R,
}

impl EventSimulator<StdRng> {
    /// Create a simulator seeded from the operating system.
    pub fn new(catalog: Catalog, config: &SimulatorConfig) -> Result<Self, SimulatorError> {
        Self::with_rng(catalog, config, StdRng::from_os_rng())
    }
}

impl<R: Rng> EventSimulator<R> {
    pub fn with_rng(
        catalog: Catalog,
        config: &SimulatorConfig,
        rng: R,
    ) -> Result<Self, SimulatorError> {
        if catalog.users.is_empty() || catalog.products.is_empty() {
            return Err(SimulatorError::EmptyCatalog);
        }
        if config.interval_min_ms > config.interval_max_ms {
            return Err(SimulatorError::InvalidInterval {
                min_ms: config.interval_min_ms,
                max_ms: config.interval_max_ms,
            });
        }

        Ok(Self {
            catalog,
            interval: (
                Duration::from_millis(config.interval_min_ms),
                Duration::from_millis(config.interval_max_ms),
            ),
            rng,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Generate one event.
    pub fn simulate(&mut self) -> ShopEvent {
        let event_type = *EventType::ALL
            .choose(&mut self.rng)
            .unwrap_or(&EventType::UserRegistered);
        self.simulate_type(event_type)
    }

    /// Generate one event of the given type.
    pub fn simulate_type(&mut self, event_type: EventType) -> ShopEvent {
        // Non-empty catalog is checked at construction.
        let user = self.catalog.users.choose(&mut self.rng).cloned();
        let user = user.unwrap_or_else(|| User {
            user_id: Uuid::nil(),
            username: String::new(),
        });

        let details = self.details_for(event_type);

        ShopEvent {
            event_id: Uuid::new_v4(),
            event_type,
            timestamp: Utc::now(),
            user_id: user.user_id,
            username: user.username,
            details,
        }
    }

    fn details_for(&mut self, event_type: EventType) -> EventDetails {
        if event_type.is_product_event() {
            return match self.catalog.products.choose(&mut self.rng) {
                Some(p) => EventDetails::Product {
                    product_id: p.product_id,
                    product_name: p.name.clone(),
                    price: p.price,
                },
                None => EventDetails::None {},
            };
        }

        match event_type {
            EventType::OrderPlaced => {
                let max = MAX_ORDER_LINES.min(self.catalog.products.len());
                let count = self.rng.random_range(1..=max);
                let products: Vec<OrderLine> = self
                    .catalog
                    .products
                    .choose_multiple(&mut self.rng, count)
                    .map(|p| OrderLine {
                        product_id: p.product_id,
                        name: p.name.clone(),
                        price: p.price,
                    })
                    .collect();
                let total_price = products.iter().map(|p| p.price).sum();

                EventDetails::Order {
                    order_id: Uuid::new_v4(),
                    products,
                    total_price,
                }
            }
            EventType::PaymentProcessed => EventDetails::Payment {
                order_id: Uuid::new_v4(),
                amount: self.rng.random_range(PAYMENT_AMOUNT),
                payment_status: if self.rng.random_bool(0.5) {
                    PaymentStatus::Success
                } else {
                    PaymentStatus::Failed
                },
            },
            EventType::OrderShipped | EventType::OrderDelivered => EventDetails::Fulfillment {
                order_id: Uuid::new_v4(),
            },
            _ => EventDetails::None {},
        }
    }

    /// Pause to wait before the next event.
    pub fn next_delay(&mut self) -> Duration {
        let (min, max) = self.interval;
        if min == max {
            return min;
        }
        self.rng.random_range(min..=max)
    }
}
