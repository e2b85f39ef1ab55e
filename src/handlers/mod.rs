//! Handlers wiring the bus and the event store together.

pub mod replay;
pub mod writer;

pub use replay::{ReplayError, ReplayService};
pub use writer::StoreWriter;
