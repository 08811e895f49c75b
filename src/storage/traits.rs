//! Persistence collaborator contracts.
//!
//! All calls are expected to be fast and non-interactive. Implementations
//! must be safe to share across threads.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::geo::GeoPoint;
use crate::models::{Geofence, GeofenceStatus, OperationalStatus, Position, PositionRecord, Vehicle};

/// Result of a conditional current-position write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionWrite {
    Applied,
    /// Not written; the stored position is newer.
    Stale { current: DateTime<Utc> },
}

/// Vehicle records and their current-position projection.
pub trait VehicleStore: Send + Sync {
    fn get(&self, id: &str) -> Result<Option<Vehicle>, StoreError>;

    fn save(&self, vehicle: Vehicle) -> Result<(), StoreError>;

    fn list(&self) -> Result<Vec<Vehicle>, StoreError>;

    /// Overwrite the current position (last write wins).
    fn update_current_position(&self, id: &str, position: &Position) -> Result<(), StoreError>;

    fn set_status(&self, id: &str, status: OperationalStatus) -> Result<(), StoreError>;

    /// Overwrite the current position unless the stored one has a later
    /// timestamp.
    ///
    /// The default reads then writes, so two concurrent callers can both pass
    /// the comparison. Implementations should override it with a single
    /// guarded compare-and-write.
    fn update_current_position_if_newer(
        &self,
        id: &str,
        position: &Position,
    ) -> Result<PositionWrite, StoreError> {
        let current = self
            .get(id)?
            .and_then(|v| v.current_position)
            .map(|p| p.timestamp);
        if let Some(current) = current.filter(|c| position.timestamp < *c) {
            return Ok(PositionWrite::Stale { current });
        }
        self.update_current_position(id, position)?;
        Ok(PositionWrite::Applied)
    }

    /// Vehicles reporting a battery level strictly below `percent`.
    fn battery_below(&self, percent: f64) -> Result<Vec<Vehicle>, StoreError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|v| v.battery_level.is_some_and(|b| b < percent))
            .collect())
    }

    /// Vehicles reporting a temperature strictly above `celsius`.
    fn temperature_above(&self, celsius: f64) -> Result<Vec<Vehicle>, StoreError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|v| v.temperature_celsius.is_some_and(|t| t > celsius))
            .collect())
    }
}

/// Append-only per-vehicle position history.
pub trait HistoryStore: Send + Sync {
    /// Append a record; the store assigns the arrival sequence.
    fn append(&self, vehicle_id: &str, position: &Position) -> Result<PositionRecord, StoreError>;

    fn latest(&self, vehicle_id: &str) -> Result<Option<PositionRecord>, StoreError>;

    /// Full history in arrival order.
    fn history(&self, vehicle_id: &str) -> Result<Vec<PositionRecord>, StoreError>;

    /// Records whose position timestamp lies in `[from, until]`.
    fn in_range(
        &self,
        vehicle_id: &str,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<PositionRecord>, StoreError>;

    /// Records of any vehicle within `radius_meters` of `center`.
    fn within_area(
        &self,
        center: GeoPoint,
        radius_meters: f64,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<PositionRecord>, StoreError>;

    /// Retention cleanup by arrival time (`recorded_at`), not the reported
    /// position timestamp. Returns the number of removed records.
    fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError>;
}

/// Geofence CRUD and queries.
pub trait GeofenceStore: Send + Sync {
    /// Insert a new fence. Names are unique.
    fn create(&self, fence: Geofence) -> Result<Geofence, StoreError>;

    fn get(&self, id: Uuid) -> Result<Option<Geofence>, StoreError>;

    fn update(&self, fence: Geofence) -> Result<(), StoreError>;

    /// Hard delete, refused once the fence has recorded violations.
    fn delete(&self, id: Uuid) -> Result<(), StoreError>;

    fn list(&self) -> Result<Vec<Geofence>, StoreError>;

    fn set_status(&self, id: Uuid, status: GeofenceStatus) -> Result<Geofence, StoreError>;

    /// Fences currently active at `now`, highest priority first.
    fn active_as_of(&self, now: DateTime<Utc>) -> Result<Vec<Geofence>, StoreError>;

    /// Fences with at least one recorded violation.
    fn violating(&self) -> Result<Vec<Geofence>, StoreError>;

    /// Atomically increment the violation counter and stamp `at`.
    /// Returns the new total.
    fn record_violation(&self, id: Uuid, at: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Mark every fence past its `until` bound as EXPIRED.
    fn expire_due(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, StoreError>;
}
