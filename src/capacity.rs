//! Holding area with bounded capacity.
//!
//! Vehicles parked in the holding area are marked `Hibernating` in the
//! vehicle store. The member list and the capacity check share one lock, so
//! the bound holds under concurrent admissions.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;

use crate::error::CapacityError;
use crate::models::{CapacityStatus, OperationalStatus};
use crate::storage::VehicleStore;

pub struct HoldingArea {
    capacity: usize,
    members: Mutex<Vec<String>>,
    vehicles: Arc<dyn VehicleStore>,
}

impl HoldingArea {
    pub fn new(capacity: usize, vehicles: Arc<dyn VehicleStore>) -> Self {
        Self {
            capacity,
            members: Mutex::new(Vec::new()),
            vehicles,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Admit a vehicle. Fails when full, already held, or unknown.
    pub fn admit(&self, vehicle_id: &str) -> Result<(), CapacityError> {
        let mut members = self.members.lock();

        if members.iter().any(|m| m == vehicle_id) {
            return Err(CapacityError::AlreadyHeld(vehicle_id.to_string()));
        }
        if members.len() >= self.capacity {
            log::warn!(
                "HOLDING_AREA_FULL vehicle={} capacity={}",
                vehicle_id,
                self.capacity
            );
            return Err(CapacityError::Full {
                capacity: self.capacity,
            });
        }

        self.vehicles
            .set_status(vehicle_id, OperationalStatus::Hibernating)?;
        members.push(vehicle_id.to_string());

        log::info!(
            "HOLDING_AREA_ADMIT vehicle={} occupancy={}/{}",
            vehicle_id,
            members.len(),
            self.capacity
        );
        Ok(())
    }

    /// Release a vehicle back to `Idle`.
    ///
    /// The vehicle leaves the holding area even if the status write fails;
    /// that failure is logged.
    pub fn release(&self, vehicle_id: &str) -> Result<(), CapacityError> {
        let mut members = self.members.lock();
        let index = members
            .iter()
            .position(|m| m == vehicle_id)
            .ok_or_else(|| CapacityError::NotHeld(vehicle_id.to_string()))?;
        members.remove(index);

        if let Err(e) = self.vehicles.set_status(vehicle_id, OperationalStatus::Idle) {
            log::warn!("HOLDING_AREA_RELEASE_STATUS_FAILED vehicle={} error={}", vehicle_id, e);
        }

        log::info!(
            "HOLDING_AREA_RELEASE vehicle={} occupancy={}/{}",
            vehicle_id,
            members.len(),
            self.capacity
        );
        Ok(())
    }

    pub fn contains(&self, vehicle_id: &str) -> bool {
        self.members.lock().iter().any(|m| m == vehicle_id)
    }

    pub fn status(&self) -> CapacityStatus {
        let members = self.members.lock();
        CapacityStatus {
            current: members.len(),
            max: self.capacity,
            available: self.capacity.saturating_sub(members.len()),
            vehicle_ids: members.clone(),
            generated_at: Utc::now(),
        }
    }
}
