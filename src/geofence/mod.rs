//! Geofence evaluation module.
//!
//! Decides, for a position and a set of fences:
//! - Horizontal containment (circle or polygon)
//! - Altitude band violations
//! - Inclusion/exclusion verdicts
//!
//! and keeps fence lifecycle current via the expiry sweep.

pub mod evaluator;
pub mod sweep;

pub use evaluator::*;
pub use sweep::*;
