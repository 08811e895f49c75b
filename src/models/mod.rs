//! Domain models.
//!
//! Typed structures for everything the engine stores, evaluates or
//! publishes:
//! - Positions and position history records
//! - Vehicles (tracked entities)
//! - Geofences and their schedules
//! - Violation events and telemetry snapshots

pub mod geofence;
pub mod position;
pub mod snapshot;
pub mod vehicle;
pub mod violation;

pub use geofence::*;
pub use position::*;
pub use snapshot::*;
pub use vehicle::*;
pub use violation::*;
