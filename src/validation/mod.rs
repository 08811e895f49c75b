//! Input validation module.
//!
//! Range checks applied to position reports before anything is written.

pub mod position;

pub use position::*;
