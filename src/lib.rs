//! Fleetwatch Core - Real-time vehicle tracking and geofence engine
//!
//! This crate tracks vehicle positions, evaluates each report against
//! configurable geofences, raises violation events and periodically
//! broadcasts live fleet state. The implementation prioritizes:
//!
//! 1. **Isolation** - Every failure is local; one bad report, fence or
//!    scheduled task never stops the others
//! 2. **Logging** - Every decision point logged with batch and vehicle context
//! 3. **Concurrency** - Per-key atomic updates, no global locks on hot paths
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `geo` - Great-circle distance, circle and polygon containment
//! - `models` - Positions, vehicles, geofences, events and snapshots
//! - `storage` - Store contracts plus in-memory implementations
//! - `validation` - Range checks on incoming position reports
//! - `geofence` - Fence evaluation and expiry sweep
//! - `pipeline` - Location ingest orchestrator
//! - `alerts` - Pub/sub topics and alert dispatch
//! - `telemetry` - Periodic snapshot broadcasting
//! - `ratelimit` - Fixed-window request throttling
//! - `capacity` - Bounded holding area
//! - `engine` - Facade wiring everything together
//! - `logging` - Structured logging with ingest context

pub mod alerts;
pub mod capacity;
pub mod config;
pub mod engine;
pub mod error;
pub mod geo;
pub mod geofence;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod ratelimit;
pub mod storage;
pub mod telemetry;
pub mod validation;

#[cfg(feature = "python")]
mod python;

pub use config::EngineConfig;
pub use engine::TrackingEngine;
pub use error::{CapacityError, ConfigError, GeofenceError, PublishError, StoreError, ValidationError};

/// Install the process logger.
///
/// Defaults to `Info` with millisecond timestamps; `RUST_LOG` overrides.
/// Safe to call more than once.
pub fn init_logger() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_millis()
        .try_init();
}
