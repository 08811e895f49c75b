//! Telemetry broadcast module.
//!
//! Periodic tasks that snapshot live state and publish it:
//! - Fleet counts (`system-stats`)
//! - Vehicle positions (`location-updates`)
//! - Resource alerts (`resource-alerts`)
//! - Holding-area occupancy (`capacity-status`)

pub mod broadcaster;
pub mod schedule;

pub use broadcaster::*;
pub use schedule::*;
