//! Tracked vehicles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::position::Position;

/// Operational state of a vehicle, as counted in fleet snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationalStatus {
    #[default]
    Active,
    Idle,
    Charging,
    Maintenance,
    Hibernating,
    Offline,
}

impl OperationalStatus {
    pub fn as_str(&self) -> &str {
        match self {
            OperationalStatus::Active => "ACTIVE",
            OperationalStatus::Idle => "IDLE",
            OperationalStatus::Charging => "CHARGING",
            OperationalStatus::Maintenance => "MAINTENANCE",
            OperationalStatus::Hibernating => "HIBERNATING",
            OperationalStatus::Offline => "OFFLINE",
        }
    }
}

/// A tracked vehicle.
///
/// `current_position` is last-write-wins; history lives in the history store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: String,
    /// Human-facing identifier (plate, tail number, tag).
    pub tag: String,
    pub authorized: bool,
    pub operational_status: OperationalStatus,
    /// Percent, [0, 100].
    pub battery_level: Option<f64>,
    pub temperature_celsius: Option<f64>,
    /// Receives per-user violation alerts when set.
    pub owner_user_id: Option<String>,
    pub current_position: Option<Position>,
    pub updated_at: DateTime<Utc>,
}

impl Vehicle {
    pub fn new(id: &str, tag: &str) -> Self {
        Self {
            id: id.to_string(),
            tag: tag.to_string(),
            authorized: true,
            operational_status: OperationalStatus::Active,
            battery_level: None,
            temperature_celsius: None,
            owner_user_id: None,
            current_position: None,
            updated_at: Utc::now(),
        }
    }

    pub fn with_owner(mut self, user_id: &str) -> Self {
        self.owner_user_id = Some(user_id.to_string());
        self
    }

    pub fn with_authorized(mut self, authorized: bool) -> Self {
        self.authorized = authorized;
        self
    }

    pub fn with_battery(mut self, battery_level: f64) -> Self {
        self.battery_level = Some(battery_level);
        self
    }

    pub fn with_temperature(mut self, celsius: f64) -> Self {
        self.temperature_celsius = Some(celsius);
        self
    }

    pub fn with_status(mut self, status: OperationalStatus) -> Self {
        self.operational_status = status;
        self
    }
}
