//! Shopstream - e-commerce event plumbing
//!
//! Simulated shop traffic flows through a RabbitMQ topic exchange into
//! EventStoreDB streams, and can be replayed from any stream onto a queue
//! through a small REST API and its web form.

pub mod api;
pub mod bus;
pub mod config;
pub mod event;
pub mod handlers;
pub mod simulator;
pub mod storage;
pub mod ui;
pub mod utils;
