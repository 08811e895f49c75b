//! Storage module.
//!
//! Collaborator contracts for persistence plus in-memory implementations.
//! Production deployments back these traits with a relational store; the
//! in-memory versions serve embedded use and tests.

pub mod memory;
pub mod traits;

pub use memory::*;
pub use traits::*;
