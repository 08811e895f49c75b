//! Structured logging with ingest context.
//!
//! Provides a display context that puts batch_id and vehicle_id in front of
//! every log message for easy correlation.

pub mod structured;

pub use structured::*;
