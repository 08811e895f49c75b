//! Pipeline orchestration module.
//!
//! Location ingest pipeline that coordinates:
//! - Position validation
//! - Current-position update
//! - History append
//! - Geofence evaluation
//! - Violation dispatch

pub mod context;
pub mod ingestion;

pub use context::*;
pub use ingestion::*;
