//! Request throttling module.
//!
//! Fixed-window request counting per caller identifier:
//! - Role-based limit resolution
//! - Allow/deny decisions with reset time
//! - Read-only quota status
//! - Periodic purge of expired windows

pub mod limiter;
pub mod roles;

pub use limiter::*;
pub use roles::*;
