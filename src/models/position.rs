//! Position reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// Where a position fix came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionSource {
    #[default]
    Gps,
    Manual,
    Estimated,
}

impl PositionSource {
    pub fn as_str(&self) -> &str {
        match self {
            PositionSource::Gps => "GPS",
            PositionSource::Manual => "MANUAL",
            PositionSource::Estimated => "ESTIMATED",
        }
    }
}

/// A validated position. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    /// Meters above ground. `None` disables altitude checks.
    pub altitude_meters: Option<f64>,
    pub timestamp: DateTime<Utc>,
    /// Meters per second.
    pub speed: Option<f64>,
    /// Degrees clockwise from true north, [0, 360).
    pub heading: Option<f64>,
    /// Percent, [0, 100].
    pub battery_level: Option<f64>,
    /// Horizontal accuracy in meters.
    pub accuracy: Option<f64>,
    /// Signal strength in dBm.
    pub signal_strength: Option<i32>,
    pub source: PositionSource,
}

impl Position {
    /// Minimal GPS position at `timestamp`.
    pub fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            altitude_meters: None,
            timestamp,
            speed: None,
            heading: None,
            battery_level: None,
            accuracy: None,
            signal_strength: None,
            source: PositionSource::Gps,
        }
    }

    pub fn with_altitude(mut self, altitude_meters: f64) -> Self {
        self.altitude_meters = Some(altitude_meters);
        self
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// Unvalidated position report as received from a caller.
///
/// Missing `timestamp` means "now"; missing `source` means GPS.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionInput {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude_meters: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub battery_level: Option<f64>,
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub signal_strength: Option<i32>,
    #[serde(default)]
    pub source: Option<PositionSource>,
}

impl PositionInput {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            ..Default::default()
        }
    }

    pub fn with_altitude(mut self, altitude_meters: f64) -> Self {
        self.altitude_meters = Some(altitude_meters);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_battery(mut self, battery_level: f64) -> Self {
        self.battery_level = Some(battery_level);
        self
    }
}

/// One entry of a vehicle's append-only position history.
///
/// `sequence` is assigned by the history store in arrival order and is the
/// ordering key; the position's own timestamp is informational.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub sequence: u64,
    pub vehicle_id: String,
    pub position: Position,
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_input_deserialize_defaults() {
        let input: PositionInput =
            serde_json::from_str(r#"{"latitude": 10.5, "longitude": -20.25}"#).unwrap();
        assert_eq!(input.latitude, 10.5);
        assert!(input.timestamp.is_none());
        assert!(input.source.is_none());
    }

    #[test]
    fn test_position_source_wire_names() {
        let json = serde_json::to_string(&PositionSource::Estimated).unwrap();
        assert_eq!(json, r#""ESTIMATED""#);
        assert_eq!(PositionSource::Manual.as_str(), "MANUAL");
    }
}
