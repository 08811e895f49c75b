//! Position report validation.
//!
//! Checks run in a fixed order and stop at the first violated constraint,
//! so the caller always gets a single, specific reason.

use chrono::{DateTime, Utc};

use crate::error::ValidationError;
use crate::models::{Position, PositionInput};

/// Validate a raw report and build the immutable `Position`.
///
/// A missing timestamp is filled with `now`; a missing source means GPS.
pub fn validate_position(
    input: &PositionInput,
    now: DateTime<Utc>,
) -> Result<Position, ValidationError> {
    if !(-90.0..=90.0).contains(&input.latitude) {
        return Err(ValidationError::Latitude(input.latitude));
    }
    if !(-180.0..=180.0).contains(&input.longitude) {
        return Err(ValidationError::Longitude(input.longitude));
    }
    if let Some(alt) = input.altitude_meters {
        if !(alt.is_finite() && alt >= 0.0) {
            return Err(ValidationError::Altitude(alt));
        }
    }
    if let Some(speed) = input.speed {
        if !(speed.is_finite() && speed >= 0.0) {
            return Err(ValidationError::Speed(speed));
        }
    }
    if let Some(heading) = input.heading {
        if !(0.0..360.0).contains(&heading) {
            return Err(ValidationError::Heading(heading));
        }
    }
    if let Some(battery) = input.battery_level {
        if !(0.0..=100.0).contains(&battery) {
            return Err(ValidationError::Battery(battery));
        }
    }
    if let Some(accuracy) = input.accuracy {
        if !(accuracy.is_finite() && accuracy >= 0.0) {
            return Err(ValidationError::Accuracy(accuracy));
        }
    }

    Ok(Position {
        latitude: input.latitude,
        longitude: input.longitude,
        altitude_meters: input.altitude_meters,
        timestamp: input.timestamp.unwrap_or(now),
        speed: input.speed,
        heading: input.heading,
        battery_level: input.battery_level,
        accuracy: input.accuracy,
        signal_strength: input.signal_strength,
        source: input.source.unwrap_or_default(),
    })
}
