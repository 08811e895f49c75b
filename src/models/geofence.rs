//! Geofence definitions.
//!
//! A geofence is a named boundary (circle or polygon) with inclusion or
//! exclusion semantics, an optional altitude band and an optional schedule
//! restricting when it is enforced.

use chrono::{DateTime, Datelike, NaiveTime, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GeofenceError;
use crate::geo::{GeoPoint, MIN_POLYGON_VERTICES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FenceType {
    Circular,
    Polygonal,
}

impl FenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FenceType::Circular => "CIRCULAR",
            FenceType::Polygonal => "POLYGONAL",
        }
    }
}

/// INCLUSION fences must be stayed inside; EXCLUSION fences must be avoided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoundaryType {
    Inclusion,
    Exclusion,
}

impl BoundaryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoundaryType::Inclusion => "INCLUSION",
            BoundaryType::Exclusion => "EXCLUSION",
        }
    }

    /// Whether horizontal insideness breaches this boundary.
    pub fn is_breached(&self, is_inside: bool) -> bool {
        match self {
            BoundaryType::Inclusion => !is_inside,
            BoundaryType::Exclusion => is_inside,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GeofenceStatus {
    Active,
    Inactive,
    Suspended,
    Expired,
}

impl GeofenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeofenceStatus::Active => "ACTIVE",
            GeofenceStatus::Inactive => "INACTIVE",
            GeofenceStatus::Suspended => "SUSPENDED",
            GeofenceStatus::Expired => "EXPIRED",
        }
    }

    /// EXPIRED is terminal; every other transition is allowed.
    pub fn can_transition_to(&self, next: GeofenceStatus) -> bool {
        *self != GeofenceStatus::Expired || next == GeofenceStatus::Expired
    }
}

/// Fence shape. Must agree with the fence's `fence_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FenceGeometry {
    Circle { center: GeoPoint, radius_meters: f64 },
    Polygon { vertices: Vec<GeoPoint> },
}

/// Optional altitude limits in meters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AltitudeBand {
    pub min_meters: Option<f64>,
    pub max_meters: Option<f64>,
}

impl AltitudeBand {
    pub fn is_set(&self) -> bool {
        self.min_meters.is_some() || self.max_meters.is_some()
    }

    /// True when `altitude` falls outside whichever bounds are set.
    pub fn is_violated_by(&self, altitude: f64) -> bool {
        self.min_meters.is_some_and(|min| altitude < min)
            || self.max_meters.is_some_and(|max| altitude > max)
    }
}

/// Weekly recurrence. Times are compared in UTC.
///
/// An empty `days` list matches every day. When `end_time` is earlier than
/// `start_time` the window wraps past midnight.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recurrence {
    #[serde(default)]
    pub days: Vec<Weekday>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
}

impl Recurrence {
    pub fn matches(&self, now: DateTime<Utc>) -> bool {
        let t = now.time().with_nanosecond(0).unwrap_or_else(|| now.time());

        // The after-midnight part of a wrapping window belongs to the day it
        // started on.
        let (in_window, day) = match (self.start_time, self.end_time) {
            (Some(start), Some(end)) if start <= end => (t >= start && t <= end, now.weekday()),
            (Some(start), Some(end)) if t <= end && t < start => (true, now.weekday().pred()),
            (Some(start), Some(_)) => (t >= start, now.weekday()),
            (Some(start), None) => (t >= start, now.weekday()),
            (None, Some(end)) => (t <= end, now.weekday()),
            (None, None) => (true, now.weekday()),
        };

        in_window && (self.days.is_empty() || self.days.contains(&day))
    }
}

/// When a fence is enforced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActiveWindow {
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub recurrence: Option<Recurrence>,
}

impl ActiveWindow {
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        if self.from.is_some_and(|from| now < from) {
            return false;
        }
        if self.until.is_some_and(|until| now > until) {
            return false;
        }
        self.recurrence.as_ref().map_or(true, |r| r.matches(now))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geofence {
    pub id: Uuid,
    pub name: String,
    pub fence_type: FenceType,
    pub boundary_type: BoundaryType,
    pub status: GeofenceStatus,
    /// Higher is more severe.
    pub priority_level: i32,
    pub geometry: FenceGeometry,
    pub altitude: AltitudeBand,
    pub window: ActiveWindow,
    /// Directive for downstream consumers, e.g. "ALERT" or "RETURN_TO_BASE".
    pub violation_action: String,
    pub total_violations: u64,
    pub last_violation_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Geofence {
    /// Build a circular fence. Requires a valid center and radius > 0.
    pub fn circular(
        name: &str,
        boundary_type: BoundaryType,
        center: GeoPoint,
        radius_meters: f64,
    ) -> Result<Self, GeofenceError> {
        Self::build(
            name,
            FenceType::Circular,
            boundary_type,
            FenceGeometry::Circle {
                center,
                radius_meters,
            },
        )
    }

    /// Build a polygonal fence. Requires at least 3 valid vertices.
    pub fn polygonal(
        name: &str,
        boundary_type: BoundaryType,
        vertices: Vec<GeoPoint>,
    ) -> Result<Self, GeofenceError> {
        Self::build(
            name,
            FenceType::Polygonal,
            boundary_type,
            FenceGeometry::Polygon { vertices },
        )
    }

    fn build(
        name: &str,
        fence_type: FenceType,
        boundary_type: BoundaryType,
        geometry: FenceGeometry,
    ) -> Result<Self, GeofenceError> {
        let now = Utc::now();
        let fence = Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            fence_type,
            boundary_type,
            status: GeofenceStatus::Active,
            priority_level: 1,
            geometry,
            altitude: AltitudeBand::default(),
            window: ActiveWindow::default(),
            violation_action: "ALERT".to_string(),
            total_violations: 0,
            last_violation_at: None,
            created_at: now,
            updated_at: now,
        };
        fence.validate()?;
        Ok(fence)
    }

    /// Check the construction invariants: non-empty name, geometry valid and
    /// matching the fence type, altitude band not inverted.
    ///
    /// Stores run this on every write, so a fence edited field by field
    /// cannot bypass the rules `circular` and `polygonal` enforce.
    pub fn validate(&self) -> Result<(), GeofenceError> {
        if self.name.trim().is_empty() {
            return Err(GeofenceError::EmptyName);
        }
        validate_geometry(self.fence_type, &self.geometry)?;
        validate_altitude_band(self.altitude.min_meters, self.altitude.max_meters)
    }

    pub fn with_altitude_band(
        mut self,
        min_meters: Option<f64>,
        max_meters: Option<f64>,
    ) -> Result<Self, GeofenceError> {
        validate_altitude_band(min_meters, max_meters)?;
        self.altitude = AltitudeBand {
            min_meters,
            max_meters,
        };
        Ok(self)
    }

    pub fn with_priority(mut self, priority_level: i32) -> Self {
        self.priority_level = priority_level;
        self
    }

    pub fn with_action(mut self, action: &str) -> Self {
        self.violation_action = action.to_string();
        self
    }

    pub fn with_window(mut self, window: ActiveWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_status(mut self, status: GeofenceStatus) -> Self {
        self.status = status;
        self
    }

    /// ACTIVE status and inside the active window, including recurrence.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == GeofenceStatus::Active && self.window.contains(now)
    }

    /// Past `active_until` and not yet marked expired.
    pub fn is_due_for_expiry(&self, now: DateTime<Utc>) -> bool {
        self.status != GeofenceStatus::Expired && self.window.until.is_some_and(|u| u < now)
    }
}

fn validate_geometry(fence_type: FenceType, geometry: &FenceGeometry) -> Result<(), GeofenceError> {
    match (fence_type, geometry) {
        (
            FenceType::Circular,
            FenceGeometry::Circle {
                center,
                radius_meters,
            },
        ) => {
            if !center.is_valid() {
                return Err(GeofenceError::InvalidCoordinate {
                    lat: center.latitude,
                    lon: center.longitude,
                });
            }
            if !(radius_meters.is_finite() && *radius_meters > 0.0) {
                return Err(GeofenceError::InvalidRadius(*radius_meters));
            }
            Ok(())
        }
        (FenceType::Polygonal, FenceGeometry::Polygon { vertices }) => {
            if vertices.len() < MIN_POLYGON_VERTICES {
                return Err(GeofenceError::TooFewVertices(vertices.len()));
            }
            match vertices.iter().find(|v| !v.is_valid()) {
                Some(bad) => Err(GeofenceError::InvalidCoordinate {
                    lat: bad.latitude,
                    lon: bad.longitude,
                }),
                None => Ok(()),
            }
        }
        (fence_type, _) => Err(GeofenceError::GeometryMismatch(fence_type.as_str())),
    }
}

fn validate_altitude_band(min_meters: Option<f64>, max_meters: Option<f64>) -> Result<(), GeofenceError> {
    match (min_meters, max_meters) {
        (Some(min), Some(max)) if min > max => Err(GeofenceError::InvertedAltitudeBand { min, max }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn circle() -> Geofence {
        Geofence::circular("depot", BoundaryType::Inclusion, GeoPoint::new(0.0, 0.0), 1000.0)
            .unwrap()
    }

    #[test]
    fn test_circular_requires_positive_radius() {
        let err = Geofence::circular("x", BoundaryType::Inclusion, GeoPoint::new(0.0, 0.0), 0.0)
            .unwrap_err();
        assert_eq!(err, GeofenceError::InvalidRadius(0.0));
    }

    #[test]
    fn test_polygonal_requires_three_vertices() {
        let err = Geofence::polygonal(
            "x",
            BoundaryType::Exclusion,
            vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 1.0)],
        )
        .unwrap_err();
        assert_eq!(err, GeofenceError::TooFewVertices(2));
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = Geofence::circular("  ", BoundaryType::Inclusion, GeoPoint::new(0.0, 0.0), 5.0)
            .unwrap_err();
        assert_eq!(err, GeofenceError::EmptyName);
    }

    #[test]
    fn test_inverted_altitude_band_rejected() {
        let err = circle().with_altitude_band(Some(100.0), Some(50.0)).unwrap_err();
        assert!(matches!(err, GeofenceError::InvertedAltitudeBand { .. }));
    }

    #[test]
    fn test_altitude_band() {
        let band = AltitudeBand {
            min_meters: Some(10.0),
            max_meters: Some(120.0),
        };
        assert!(band.is_violated_by(5.0));
        assert!(band.is_violated_by(121.0));
        assert!(!band.is_violated_by(120.0));
        assert!(!AltitudeBand::default().is_violated_by(10_000.0));
    }

    #[test]
    fn test_inactive_status_is_not_active() {
        let now = Utc::now();
        assert!(circle().is_active_at(now));
        assert!(!circle().with_status(GeofenceStatus::Suspended).is_active_at(now));
    }

    #[test]
    fn test_active_window_bounds() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        let fence = circle().with_window(ActiveWindow {
            from: Some(now - Duration::hours(1)),
            until: Some(now + Duration::hours(1)),
            recurrence: None,
        });
        assert!(fence.is_active_at(now));
        assert!(!fence.is_active_at(now + Duration::hours(2)));
        assert!(!fence.is_active_at(now - Duration::hours(2)));
        assert!(fence.is_due_for_expiry(now + Duration::hours(2)));
    }

    #[test]
    fn test_recurrence_days_and_wrapping_window() {
        // 2026-03-10 is a Tuesday
        let tuesday_late = Utc.with_ymd_and_hms(2026, 3, 10, 23, 30, 0).unwrap();
        let tuesday_noon = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        let wednesday_late = Utc.with_ymd_and_hms(2026, 3, 11, 23, 30, 0).unwrap();

        let night_shift = Recurrence {
            days: vec![Weekday::Mon, Weekday::Tue],
            start_time: NaiveTime::from_hms_opt(22, 0, 0),
            end_time: NaiveTime::from_hms_opt(6, 0, 0),
        };
        assert!(night_shift.matches(tuesday_late));
        assert!(!night_shift.matches(tuesday_noon));
        assert!(!night_shift.matches(wednesday_late));
    }

    #[test]
    fn test_wrapping_window_after_midnight_belongs_to_start_day() {
        let tuesday_night = Recurrence {
            days: vec![Weekday::Tue],
            start_time: NaiveTime::from_hms_opt(22, 0, 0),
            end_time: NaiveTime::from_hms_opt(6, 0, 0),
        };
        // 2026-03-10 is a Tuesday
        let tuesday_early = Utc.with_ymd_and_hms(2026, 3, 10, 2, 0, 0).unwrap();
        let wednesday_early = Utc.with_ymd_and_hms(2026, 3, 11, 2, 0, 0).unwrap();
        let wednesday_late = Utc.with_ymd_and_hms(2026, 3, 11, 22, 30, 0).unwrap();

        assert!(tuesday_night.matches(wednesday_early));
        assert!(!tuesday_night.matches(tuesday_early));
        assert!(!tuesday_night.matches(wednesday_late));

        let sunday_night = Recurrence {
            days: vec![Weekday::Sun],
            ..tuesday_night
        };
        // 2026-03-09 is a Monday
        let monday_early = Utc.with_ymd_and_hms(2026, 3, 9, 5, 59, 0).unwrap();
        assert!(sunday_night.matches(monday_early));
    }

    #[test]
    fn test_validate_catches_edited_fields() {
        let mut fence = circle();
        fence.geometry = FenceGeometry::Circle {
            center: GeoPoint::new(0.0, 0.0),
            radius_meters: -5.0,
        };
        assert_eq!(fence.validate(), Err(GeofenceError::InvalidRadius(-5.0)));

        let mut fence = circle();
        fence.geometry = FenceGeometry::Polygon { vertices: vec![] };
        assert_eq!(fence.validate(), Err(GeofenceError::GeometryMismatch("CIRCULAR")));

        let mut fence = circle();
        fence.altitude = AltitudeBand {
            min_meters: Some(200.0),
            max_meters: Some(100.0),
        };
        assert!(matches!(
            fence.validate(),
            Err(GeofenceError::InvertedAltitudeBand { .. })
        ));

        assert_eq!(circle().validate(), Ok(()));
    }

    #[test]
    fn test_expired_is_terminal() {
        assert!(!GeofenceStatus::Expired.can_transition_to(GeofenceStatus::Active));
        assert!(GeofenceStatus::Suspended.can_transition_to(GeofenceStatus::Active));
    }

    #[test]
    fn test_boundary_breach() {
        assert!(BoundaryType::Inclusion.is_breached(false));
        assert!(!BoundaryType::Inclusion.is_breached(true));
        assert!(BoundaryType::Exclusion.is_breached(true));
    }
}
