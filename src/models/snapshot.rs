//! Telemetry snapshot payloads.
//!
//! Concrete shapes published on the broadcast topics.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::position::PositionSource;

/// Fleet-wide counts for the `system-stats` topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetStats {
    pub total_vehicles: usize,
    pub authorized: usize,
    pub unauthorized: usize,
    /// Operational status name -> count.
    pub by_status: BTreeMap<String, usize>,
    pub tracked_with_position: usize,
    pub generated_at: DateTime<Utc>,
}

/// Flat per-vehicle projection for the `location-updates` topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehiclePositionView {
    pub vehicle_id: String,
    pub tag: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_meters: Option<f64>,
    pub position_timestamp: DateTime<Utc>,
    /// From the latest history record.
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    pub battery_level: Option<f64>,
    pub source: Option<PositionSource>,
    pub last_recorded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionBatch {
    pub positions: Vec<VehiclePositionView>,
    pub generated_at: DateTime<Utc>,
}

/// Resource conditions for the `resource-alerts` topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceAlert {
    pub low_battery: Vec<String>,
    pub critical_battery: Vec<String>,
    pub overheating: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl ResourceAlert {
    pub fn is_empty(&self) -> bool {
        self.low_battery.is_empty() && self.critical_battery.is_empty() && self.overheating.is_empty()
    }
}

/// Holding-area occupancy for the `capacity-status` topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityStatus {
    pub current: usize,
    pub max: usize,
    pub available: usize,
    pub vehicle_ids: Vec<String>,
    pub generated_at: DateTime<Utc>,
}
