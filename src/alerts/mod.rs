//! Alert fan-out module.
//!
//! Publishes engine output to observers:
//! - `PubSub` channel contract and topic names
//! - In-process channel hub backed by tokio broadcast channels
//! - Alert dispatcher for violations and resource alerts

pub mod dispatcher;
pub mod pubsub;

pub use dispatcher::*;
pub use pubsub::*;
