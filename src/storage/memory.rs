//! In-memory store implementations.
//!
//! Each store uses `DashMap` so concurrent callers only contend on the shard
//! holding the key they touch. Per-key mutations happen under the shard's
//! write guard, which makes counter increments and history appends atomic.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::StoreError;
use crate::geo::{point_in_circle, GeoPoint};
use crate::models::{Geofence, GeofenceStatus, OperationalStatus, Position, PositionRecord, Vehicle};

use super::traits::{GeofenceStore, HistoryStore, PositionWrite, VehicleStore};

/// Vehicles keyed by id.
#[derive(Debug, Default)]
pub struct MemoryVehicleStore {
    vehicles: DashMap<String, Vehicle>,
}

impl MemoryVehicleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }
}

impl VehicleStore for MemoryVehicleStore {
    fn get(&self, id: &str) -> Result<Option<Vehicle>, StoreError> {
        Ok(self.vehicles.get(id).map(|v| v.clone()))
    }

    fn save(&self, vehicle: Vehicle) -> Result<(), StoreError> {
        self.vehicles.insert(vehicle.id.clone(), vehicle);
        Ok(())
    }

    fn list(&self) -> Result<Vec<Vehicle>, StoreError> {
        let mut vehicles: Vec<Vehicle> = self.vehicles.iter().map(|v| v.clone()).collect();
        vehicles.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(vehicles)
    }

    fn update_current_position(&self, id: &str, position: &Position) -> Result<(), StoreError> {
        let mut vehicle = self
            .vehicles
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("vehicle", id))?;
        vehicle.current_position = Some(position.clone());
        if let Some(battery) = position.battery_level {
            vehicle.battery_level = Some(battery);
        }
        vehicle.updated_at = Utc::now();
        Ok(())
    }

    fn set_status(&self, id: &str, status: OperationalStatus) -> Result<(), StoreError> {
        let mut vehicle = self
            .vehicles
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("vehicle", id))?;
        vehicle.operational_status = status;
        vehicle.updated_at = Utc::now();
        Ok(())
    }

    fn update_current_position_if_newer(
        &self,
        id: &str,
        position: &Position,
    ) -> Result<PositionWrite, StoreError> {
        let mut vehicle = self
            .vehicles
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("vehicle", id))?;
        // Compare and write under the same shard guard.
        if let Some(current) = vehicle
            .current_position
            .as_ref()
            .map(|p| p.timestamp)
            .filter(|c| position.timestamp < *c)
        {
            return Ok(PositionWrite::Stale { current });
        }
        vehicle.current_position = Some(position.clone());
        if let Some(battery) = position.battery_level {
            vehicle.battery_level = Some(battery);
        }
        vehicle.updated_at = Utc::now();
        Ok(PositionWrite::Applied)
    }
}

/// Per-vehicle history with a global arrival sequence.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    records: DashMap<String, Vec<PositionRecord>>,
    next_sequence: AtomicU64,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total records across all vehicles.
    pub fn record_count(&self) -> usize {
        self.records.iter().map(|r| r.len()).sum()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn append(&self, vehicle_id: &str, position: &Position) -> Result<PositionRecord, StoreError> {
        let mut entries = self.records.entry(vehicle_id.to_string()).or_default();
        // Sequence is taken under the vehicle's guard so per-vehicle order
        // always agrees with sequence order.
        let record = PositionRecord {
            sequence: self.next_sequence.fetch_add(1, Ordering::Relaxed),
            vehicle_id: vehicle_id.to_string(),
            position: position.clone(),
            recorded_at: Utc::now(),
        };
        entries.push(record.clone());
        Ok(record)
    }

    fn latest(&self, vehicle_id: &str) -> Result<Option<PositionRecord>, StoreError> {
        Ok(self
            .records
            .get(vehicle_id)
            .and_then(|r| r.last().cloned()))
    }

    fn history(&self, vehicle_id: &str) -> Result<Vec<PositionRecord>, StoreError> {
        Ok(self
            .records
            .get(vehicle_id)
            .map(|r| r.clone())
            .unwrap_or_default())
    }

    fn in_range(
        &self,
        vehicle_id: &str,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<PositionRecord>, StoreError> {
        Ok(self
            .records
            .get(vehicle_id)
            .map(|r| {
                r.iter()
                    .filter(|rec| rec.position.timestamp >= from && rec.position.timestamp <= until)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn within_area(
        &self,
        center: GeoPoint,
        radius_meters: f64,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<PositionRecord>, StoreError> {
        let mut found: Vec<PositionRecord> = self
            .records
            .iter()
            .flat_map(|r| r.value().clone())
            .filter(|rec| since.map_or(true, |s| rec.position.timestamp >= s))
            .filter(|rec| point_in_circle(rec.position.point(), center, radius_meters))
            .collect();
        found.sort_by_key(|rec| rec.sequence);
        Ok(found)
    }

    fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut removed = 0;
        self.records.retain(|_, entries| {
            let before = entries.len();
            entries.retain(|rec| rec.recorded_at >= cutoff);
            removed += before - entries.len();
            !entries.is_empty()
        });
        Ok(removed)
    }
}

/// Geofences keyed by id, with a unique name index.
#[derive(Debug, Default)]
pub struct MemoryGeofenceStore {
    fences: DashMap<Uuid, Geofence>,
    names: DashMap<String, Uuid>,
}

impl MemoryGeofenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted(mut fences: Vec<Geofence>) -> Vec<Geofence> {
        fences.sort_by(|a, b| {
            b.priority_level
                .cmp(&a.priority_level)
                .then_with(|| a.name.cmp(&b.name))
        });
        fences
    }
}

impl GeofenceStore for MemoryGeofenceStore {
    fn create(&self, fence: Geofence) -> Result<Geofence, StoreError> {
        fence.validate()?;
        match self.names.entry(fence.name.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!(
                "geofence name already exists: {}",
                fence.name
            ))),
            Entry::Vacant(slot) => {
                slot.insert(fence.id);
                self.fences.insert(fence.id, fence.clone());
                Ok(fence)
            }
        }
    }

    fn get(&self, id: Uuid) -> Result<Option<Geofence>, StoreError> {
        Ok(self.fences.get(&id).map(|f| f.clone()))
    }

    fn update(&self, mut fence: Geofence) -> Result<(), StoreError> {
        fence.validate()?;
        let (old_name, old_status) = self
            .fences
            .get(&fence.id)
            .map(|f| (f.name.clone(), f.status))
            .ok_or_else(|| StoreError::not_found("geofence", fence.id.to_string()))?;
        if !old_status.can_transition_to(fence.status) {
            return Err(transition_conflict(fence.id, old_status, fence.status));
        }

        if old_name != fence.name {
            match self.names.entry(fence.name.clone()) {
                Entry::Occupied(_) => {
                    return Err(StoreError::Conflict(format!(
                        "geofence name already exists: {}",
                        fence.name
                    )))
                }
                Entry::Vacant(slot) => {
                    slot.insert(fence.id);
                }
            }
            self.names.remove(&old_name);
        }

        let id = fence.id;
        let new_name = fence.name.clone();
        let written = match self.fences.get_mut(&id) {
            None => Err(StoreError::not_found("geofence", id.to_string())),
            // Re-check under the guard; the expiry sweep may have run meanwhile.
            Some(current) if !current.status.can_transition_to(fence.status) => {
                Err(transition_conflict(id, current.status, fence.status))
            }
            Some(mut current) => {
                // Counters are owned by record_violation; never overwrite them with a stale copy.
                fence.total_violations = current.total_violations;
                fence.last_violation_at = current.last_violation_at;
                fence.updated_at = Utc::now();
                *current = fence;
                Ok(())
            }
        };

        if written.is_err() && old_name != new_name {
            self.names.remove(&new_name);
            self.names.insert(old_name, id);
        }
        written
    }

    fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        match self.fences.remove_if(&id, |_, f| f.total_violations == 0) {
            Some((_, fence)) => {
                self.names.remove(&fence.name);
                Ok(())
            }
            None if self.fences.contains_key(&id) => Err(StoreError::Conflict(format!(
                "geofence {} has violation history; change its status instead",
                id
            ))),
            None => Err(StoreError::not_found("geofence", id.to_string())),
        }
    }

    fn list(&self) -> Result<Vec<Geofence>, StoreError> {
        Ok(Self::sorted(self.fences.iter().map(|f| f.clone()).collect()))
    }

    fn set_status(&self, id: Uuid, status: GeofenceStatus) -> Result<Geofence, StoreError> {
        let mut fence = self
            .fences
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("geofence", id.to_string()))?;
        if !fence.status.can_transition_to(status) {
            return Err(transition_conflict(id, fence.status, status));
        }
        fence.status = status;
        fence.updated_at = Utc::now();
        Ok(fence.clone())
    }

    fn active_as_of(&self, now: DateTime<Utc>) -> Result<Vec<Geofence>, StoreError> {
        Ok(Self::sorted(
            self.fences
                .iter()
                .filter(|f| f.is_active_at(now))
                .map(|f| f.clone())
                .collect(),
        ))
    }

    fn violating(&self) -> Result<Vec<Geofence>, StoreError> {
        Ok(Self::sorted(
            self.fences
                .iter()
                .filter(|f| f.total_violations > 0)
                .map(|f| f.clone())
                .collect(),
        ))
    }

    fn record_violation(&self, id: Uuid, at: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut fence = self
            .fences
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("geofence", id.to_string()))?;
        fence.total_violations += 1;
        fence.last_violation_at = Some(at);
        Ok(fence.total_violations)
    }

    fn expire_due(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, StoreError> {
        let mut expired = Vec::new();
        for mut fence in self.fences.iter_mut() {
            if fence.is_due_for_expiry(now) {
                fence.status = GeofenceStatus::Expired;
                fence.updated_at = now;
                expired.push(fence.id);
            }
        }
        Ok(expired)
    }
}

fn transition_conflict(id: Uuid, from: GeofenceStatus, to: GeofenceStatus) -> StoreError {
    StoreError::Conflict(format!(
        "geofence {} cannot move from {} to {}",
        id,
        from.as_str(),
        to.as_str()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeofenceError;
    use crate::models::{ActiveWindow, BoundaryType, FenceGeometry};
    use chrono::Duration;
    use std::sync::Arc;

    fn fence(name: &str) -> Geofence {
        Geofence::circular(name, BoundaryType::Inclusion, GeoPoint::new(0.0, 0.0), 500.0).unwrap()
    }

    #[test]
    fn test_geofence_name_unique() {
        let store = MemoryGeofenceStore::new();
        store.create(fence("yard")).unwrap();
        let err = store.create(fence("yard")).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn test_record_violation_is_atomic_across_threads() {
        let store = Arc::new(MemoryGeofenceStore::new());
        let id = store.create(fence("busy")).unwrap().id;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        store.record_violation(id, Utc::now()).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let stored = store.get(id).unwrap().unwrap();
        assert_eq!(stored.total_violations, 2000);
        assert!(stored.last_violation_at.is_some());
    }

    #[test]
    fn test_delete_refused_with_history() {
        let store = MemoryGeofenceStore::new();
        let id = store.create(fence("gate")).unwrap().id;
        store.record_violation(id, Utc::now()).unwrap();

        assert!(matches!(store.delete(id), Err(StoreError::Conflict(_))));

        let clean = store.create(fence("clean")).unwrap().id;
        store.delete(clean).unwrap();
        assert!(store.get(clean).unwrap().is_none());
        // Name is free again
        store.create(fence("clean")).unwrap();
    }

    #[test]
    fn test_update_keeps_violation_counter() {
        let store = MemoryGeofenceStore::new();
        let created = store.create(fence("lot")).unwrap();
        let id = created.id;
        store.record_violation(id, Utc::now()).unwrap();

        let renamed = Geofence {
            name: "lot-b".to_string(),
            ..created
        };
        store.update(renamed).unwrap();

        let stored = store.get(id).unwrap().unwrap();
        assert_eq!(stored.name, "lot-b");
        assert_eq!(stored.total_violations, 1);
        store.create(fence("lot")).unwrap();
    }

    #[test]
    fn test_update_cannot_revive_expired_fence() {
        let store = MemoryGeofenceStore::new();
        let created = store.create(fence("closed-road")).unwrap();
        let id = created.id;
        store.set_status(id, GeofenceStatus::Expired).unwrap();

        let revived = Geofence {
            name: "reopened-road".to_string(),
            status: GeofenceStatus::Active,
            ..created
        };
        assert!(matches!(store.update(revived), Err(StoreError::Conflict(_))));

        let stored = store.get(id).unwrap().unwrap();
        assert_eq!(stored.status, GeofenceStatus::Expired);
        assert_eq!(stored.name, "closed-road");
        // The rejected rename did not claim the new name
        store.create(fence("reopened-road")).unwrap();
        assert!(store.create(fence("closed-road")).is_err());
    }

    #[test]
    fn test_invalid_geometry_rejected_on_write() {
        let store = MemoryGeofenceStore::new();
        let created = store.create(fence("pad")).unwrap();
        let id = created.id;

        let shrunk = Geofence {
            geometry: FenceGeometry::Circle {
                center: GeoPoint::new(0.0, 0.0),
                radius_meters: -5.0,
            },
            ..created.clone()
        };
        assert_eq!(
            store.update(shrunk),
            Err(StoreError::Invalid(GeofenceError::InvalidRadius(-5.0)))
        );

        let mismatched = Geofence {
            geometry: FenceGeometry::Polygon {
                vertices: vec![GeoPoint::new(0.0, 0.0); 3],
            },
            ..created
        };
        assert_eq!(
            store.update(mismatched),
            Err(StoreError::Invalid(GeofenceError::GeometryMismatch("CIRCULAR")))
        );
        assert_eq!(
            store.get(id).unwrap().unwrap().geometry,
            FenceGeometry::Circle {
                center: GeoPoint::new(0.0, 0.0),
                radius_meters: 500.0
            }
        );

        let mut bad = fence("broken");
        bad.geometry = FenceGeometry::Polygon { vertices: vec![] };
        assert!(matches!(store.create(bad), Err(StoreError::Invalid(_))));
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_expire_due() {
        let store = MemoryGeofenceStore::new();
        let now = Utc::now();
        let past = fence("old").with_window(ActiveWindow {
            until: Some(now - Duration::minutes(5)),
            ..Default::default()
        });
        let past_id = store.create(past).unwrap().id;
        store.create(fence("open")).unwrap();

        let expired = store.expire_due(now).unwrap();
        assert_eq!(expired, vec![past_id]);
        assert_eq!(
            store.get(past_id).unwrap().unwrap().status,
            GeofenceStatus::Expired
        );
        assert!(store.expire_due(now).unwrap().is_empty());
        assert!(store.set_status(past_id, GeofenceStatus::Active).is_err());
    }

    #[test]
    fn test_active_as_of_orders_by_priority() {
        let store = MemoryGeofenceStore::new();
        store.create(fence("low").with_priority(1)).unwrap();
        store.create(fence("high").with_priority(9)).unwrap();
        store
            .create(fence("off").with_status(GeofenceStatus::Inactive))
            .unwrap();

        let names: Vec<String> = store
            .active_as_of(Utc::now())
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["high", "low"]);
    }

    #[test]
    fn test_history_append_order_and_queries() {
        let store = MemoryHistoryStore::new();
        let t0 = Utc::now();
        let p = Position::new(10.0, 10.0, t0);

        let first = store.append("v1", &p).unwrap();
        let second = store.append("v1", &p).unwrap();
        assert!(second.sequence > first.sequence);

        let history = store.history("v1").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(store.latest("v1").unwrap().unwrap().sequence, second.sequence);

        let in_range = store
            .in_range("v1", t0 - Duration::seconds(1), t0 + Duration::seconds(1))
            .unwrap();
        assert_eq!(in_range.len(), 2);

        let near = store.within_area(GeoPoint::new(10.0, 10.0), 100.0, None).unwrap();
        assert_eq!(near.len(), 2);
        let far = store.within_area(GeoPoint::new(20.0, 20.0), 100.0, None).unwrap();
        assert!(far.is_empty());
    }

    #[test]
    fn test_history_purge_uses_arrival_time() {
        let store = MemoryHistoryStore::new();
        let now = Utc::now();
        // Claimed timestamps far in the past and future; both arrived just now
        store
            .append("v1", &Position::new(0.0, 0.0, now - Duration::days(40)))
            .unwrap();
        store
            .append("v2", &Position::new(0.0, 0.0, now + Duration::days(400)))
            .unwrap();

        assert_eq!(store.purge_older_than(now - Duration::days(30)).unwrap(), 0);
        assert_eq!(store.record_count(), 2);

        let removed = store
            .purge_older_than(Utc::now() + Duration::seconds(1))
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.record_count(), 0);
        assert!(store.latest("v2").unwrap().is_none());
    }

    #[test]
    fn test_vehicle_current_position_update() {
        let store = MemoryVehicleStore::new();
        store.save(Vehicle::new("v1", "TAG-1")).unwrap();

        let p = Position::new(1.0, 2.0, Utc::now());
        store.update_current_position("v1", &p).unwrap();
        assert_eq!(store.get("v1").unwrap().unwrap().current_position, Some(p.clone()));

        assert!(matches!(
            store.update_current_position("missing", &p),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_conditional_position_write_keeps_newest_under_contention() {
        let store = Arc::new(MemoryVehicleStore::new());
        store.save(Vehicle::new("v1", "TAG-1")).unwrap();
        let base = Utc::now();

        // Each thread writes an older report after a newer one of its own
        let handles: Vec<_> = (0..8i64)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for j in [i + 8, i] {
                        let p = Position::new(j as f64, 0.0, base + Duration::seconds(j));
                        store.update_current_position_if_newer("v1", &p).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let current = store.get("v1").unwrap().unwrap().current_position.unwrap();
        assert_eq!(current.timestamp, base + Duration::seconds(15));

        let late = Position::new(0.0, 0.0, base);
        assert_eq!(
            store.update_current_position_if_newer("v1", &late).unwrap(),
            PositionWrite::Stale {
                current: base + Duration::seconds(15)
            }
        );
    }
}
