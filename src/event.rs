//! E-commerce event records.
//!
//! A [`ShopEvent`] serializes to a flat JSON object: the common header
//! fields followed by the fields that depend on the event type.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Label of a simulated e-commerce action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    UserRegistered,
    ProductViewed,
    ProductAddedToCart,
    ProductRemovedFromCart,
    OrderPlaced,
    PaymentProcessed,
    OrderShipped,
    OrderDelivered,
    ProductReviewed,
    UserLoggedIn,
    UserLoggedOut,
    ProductWishlistAdded,
    ProductWishlistRemoved,
}

impl EventType {
    /// Every event type, in table order.
    pub const ALL: [EventType; 13] = [
        EventType::UserRegistered,
        EventType::ProductViewed,
        EventType::ProductAddedToCart,
        EventType::ProductRemovedFromCart,
        EventType::OrderPlaced,
        EventType::PaymentProcessed,
        EventType::OrderShipped,
        EventType::OrderDelivered,
        EventType::ProductReviewed,
        EventType::UserLoggedIn,
        EventType::UserLoggedOut,
        EventType::ProductWishlistAdded,
        EventType::ProductWishlistRemoved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::UserRegistered => "UserRegistered",
            EventType::ProductViewed => "ProductViewed",
            EventType::ProductAddedToCart => "ProductAddedToCart",
            EventType::ProductRemovedFromCart => "ProductRemovedFromCart",
            EventType::OrderPlaced => "OrderPlaced",
            EventType::PaymentProcessed => "PaymentProcessed",
            EventType::OrderShipped => "OrderShipped",
            EventType::OrderDelivered => "OrderDelivered",
            EventType::ProductReviewed => "ProductReviewed",
            EventType::UserLoggedIn => "UserLoggedIn",
            EventType::UserLoggedOut => "UserLoggedOut",
            EventType::ProductWishlistAdded => "ProductWishlistAdded",
            EventType::ProductWishlistRemoved => "ProductWishlistRemoved",
        }
    }

    /// Event store stream holding this type's category.
    pub fn category_stream(&self) -> &'static str {
        match self {
            EventType::UserRegistered => "user-events-stream",
            EventType::ProductViewed => "product-views-stream",
            EventType::ProductAddedToCart | EventType::ProductRemovedFromCart => {
                "cart-events-stream"
            }
            EventType::OrderPlaced => "order-events-stream",
            EventType::PaymentProcessed => "payment-events-stream",
            EventType::OrderShipped => "shipping-events-stream",
            EventType::OrderDelivered => "delivery-events-stream",
            EventType::ProductReviewed => "review-events-stream",
            EventType::UserLoggedIn | EventType::UserLoggedOut => "user-auth-stream",
            EventType::ProductWishlistAdded | EventType::ProductWishlistRemoved => {
                "wishlist-events-stream"
            }
        }
    }

    /// True for types that carry product details.
    pub fn is_product_event(&self) -> bool {
        matches!(
            self,
            EventType::ProductViewed
                | EventType::ProductAddedToCart
                | EventType::ProductRemovedFromCart
                | EventType::ProductReviewed
                | EventType::ProductWishlistAdded
                | EventType::ProductWishlistRemoved
        )
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown event type '{0}'")]
pub struct UnknownEventType(pub String);

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownEventType(s.to_string()))
    }
}

/// Outcome of a simulated payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Success,
    Failed,
}

/// One line of a placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: Uuid,
    pub name: String,
    pub price: u32,
}

/// Type-dependent fields, flattened into the event object.
///
/// Variant order matters for deserialization: the first variant whose
/// required fields are all present wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventDetails {
    Product {
        product_id: Uuid,
        product_name: String,
        price: u32,
    },
    Order {
        order_id: Uuid,
        products: Vec<OrderLine>,
        total_price: u32,
    },
    Payment {
        order_id: Uuid,
        amount: u32,
        payment_status: PaymentStatus,
    },
    Fulfillment {
        order_id: Uuid,
    },
    None {},
}

/// A single simulated e-commerce action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopEvent {
    pub event_id: Uuid,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub user_id: Uuid,
    pub username: String,
    #[serde(flatten)]
    pub details: EventDetails,
}

impl ShopEvent {
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
