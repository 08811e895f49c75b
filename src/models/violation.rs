//! Violation events produced by geofence evaluation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::geofence::BoundaryType;
use super::position::Position;

/// Transient record of a breached fence. Published downstream, not stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationEvent {
    pub event_id: Uuid,
    pub vehicle_id: String,
    pub geofence_id: Uuid,
    pub geofence_name: String,
    pub boundary_type: BoundaryType,
    pub is_inside: bool,
    pub altitude_violation: bool,
    pub priority_level: i32,
    pub violation_action: String,
    pub position: Position,
    pub timestamp: DateTime<Utc>,
}
