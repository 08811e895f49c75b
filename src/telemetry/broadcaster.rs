//! Telemetry broadcaster.
//!
//! Four periodic tasks, each reading the stores and publishing one snapshot:
//!
//! | Task | Topic | Default interval |
//! |---|---|---|
//! | fleet | `system-stats` | 30s |
//! | positions | `location-updates` | 15s |
//! | resources | `resource-alerts` | 60s |
//! | capacity | `capacity-status` | 20s |
//!
//! Tasks share nothing mutable; each has its own schedule and error handling
//! so one failing data source never stalls the others.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::alerts::{topics, AlertDispatcher, Payload, PubSub};
use crate::capacity::HoldingArea;
use crate::config::{BroadcastSettings, ResourceSettings};
use crate::models::{FleetStats, PositionBatch, ResourceAlert, VehiclePositionView};
use crate::storage::{HistoryStore, VehicleStore};

use super::schedule::spawn_periodic;

pub struct TelemetryBroadcaster {
    vehicles: Arc<dyn VehicleStore>,
    history: Arc<dyn HistoryStore>,
    holding: Arc<HoldingArea>,
    pubsub: Arc<dyn PubSub>,
    dispatcher: Arc<AlertDispatcher>,
    resources: ResourceSettings,
    schedule: BroadcastSettings,
}

impl TelemetryBroadcaster {
    pub fn new(
        vehicles: Arc<dyn VehicleStore>,
        history: Arc<dyn HistoryStore>,
        holding: Arc<HoldingArea>,
        pubsub: Arc<dyn PubSub>,
        dispatcher: Arc<AlertDispatcher>,
    ) -> Self {
        Self {
            vehicles,
            history,
            holding,
            pubsub,
            dispatcher,
            resources: ResourceSettings::default(),
            schedule: BroadcastSettings::default(),
        }
    }

    pub fn with_resources(mut self, resources: ResourceSettings) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_schedule(mut self, schedule: BroadcastSettings) -> Self {
        self.schedule = schedule;
        self
    }

    /// Fleet-wide counts by authorization and operational status.
    pub fn fleet_snapshot(&self, now: DateTime<Utc>) -> anyhow::Result<FleetStats> {
        let vehicles = self.vehicles.list().context("listing vehicles")?;

        let mut by_status = BTreeMap::new();
        let mut authorized = 0;
        let mut tracked_with_position = 0;
        for vehicle in &vehicles {
            *by_status
                .entry(vehicle.operational_status.as_str().to_string())
                .or_insert(0) += 1;
            if vehicle.authorized {
                authorized += 1;
            }
            if vehicle.current_position.is_some() {
                tracked_with_position += 1;
            }
        }

        Ok(FleetStats {
            total_vehicles: vehicles.len(),
            authorized,
            unauthorized: vehicles.len() - authorized,
            by_status,
            tracked_with_position,
            generated_at: now,
        })
    }

    pub fn publish_fleet_snapshot(&self) -> anyhow::Result<()> {
        let stats = self.fleet_snapshot(Utc::now())?;
        log::debug!(
            "FLEET_SNAPSHOT total={} authorized={} tracked={}",
            stats.total_vehicles,
            stats.authorized,
            stats.tracked_with_position
        );
        self.pubsub
            .publish(topics::SYSTEM_STATS, Payload::FleetStats(stats))?;
        Ok(())
    }

    /// Flat projection of every vehicle with a known current position.
    ///
    /// Derived fields come from the latest history record; a history lookup
    /// failure for one vehicle drops only its derived fields.
    pub fn position_snapshot(&self, now: DateTime<Utc>) -> anyhow::Result<PositionBatch> {
        let vehicles = self.vehicles.list().context("listing vehicles")?;

        let positions = vehicles
            .into_iter()
            .filter_map(|vehicle| {
                let current = vehicle.current_position?;
                let latest = match self.history.latest(&vehicle.id) {
                    Ok(latest) => latest,
                    Err(e) => {
                        log::warn!(
                            "POSITION_SNAPSHOT_HISTORY_FAILED vehicle={} error={}",
                            vehicle.id,
                            e
                        );
                        None
                    }
                };
                let latest_position = latest.as_ref().map(|r| &r.position);

                Some(VehiclePositionView {
                    vehicle_id: vehicle.id,
                    tag: vehicle.tag,
                    latitude: current.latitude,
                    longitude: current.longitude,
                    altitude_meters: current.altitude_meters,
                    position_timestamp: current.timestamp,
                    speed: latest_position.and_then(|p| p.speed),
                    heading: latest_position.and_then(|p| p.heading),
                    battery_level: latest_position.and_then(|p| p.battery_level),
                    source: latest_position.map(|p| p.source),
                    last_recorded_at: latest.as_ref().map(|r| r.recorded_at),
                })
            })
            .collect();

        Ok(PositionBatch {
            positions,
            generated_at: now,
        })
    }

    pub fn publish_position_snapshot(&self) -> anyhow::Result<()> {
        let batch = self.position_snapshot(Utc::now())?;
        log::debug!("POSITION_SNAPSHOT vehicles={}", batch.positions.len());
        self.pubsub
            .publish(topics::LOCATION_UPDATES, Payload::Positions(batch))?;
        Ok(())
    }

    /// Vehicles with low or critical battery, or running hot.
    ///
    /// Critical is strictly below the critical threshold; low covers
    /// `[critical, low)`. A vehicle appears in at most one battery list.
    pub fn resource_alert(&self, now: DateTime<Utc>) -> anyhow::Result<ResourceAlert> {
        let drained = self
            .vehicles
            .battery_below(self.resources.low_battery_percent)
            .context("querying battery levels")?;
        let hot = self
            .vehicles
            .temperature_above(self.resources.overheat_celsius)
            .context("querying temperatures")?;

        let mut alert = ResourceAlert {
            generated_at: now,
            ..Default::default()
        };
        for vehicle in drained {
            match vehicle.battery_level {
                Some(level) if level < self.resources.critical_battery_percent => {
                    alert.critical_battery.push(vehicle.id)
                }
                Some(_) => alert.low_battery.push(vehicle.id),
                None => {}
            }
        }
        alert.overheating = hot.into_iter().map(|v| v.id).collect();
        Ok(alert)
    }

    pub fn publish_resource_alerts(&self) -> anyhow::Result<()> {
        let alert = self.resource_alert(Utc::now())?;
        self.dispatcher.publish_resource_alert(alert)?;
        Ok(())
    }

    pub fn publish_capacity_snapshot(&self) -> anyhow::Result<()> {
        let status = self.holding.status();
        log::debug!(
            "CAPACITY_SNAPSHOT current={} max={}",
            status.current,
            status.max
        );
        self.pubsub
            .publish(topics::CAPACITY_STATUS, Payload::Capacity(status))?;
        Ok(())
    }

    /// Start the four broadcast tasks. They stop when `cancellation` fires.
    pub fn spawn(self: &Arc<Self>, cancellation: &CancellationToken) -> Vec<JoinHandle<()>> {
        let fleet = Arc::clone(self);
        let positions = Arc::clone(self);
        let resources = Arc::clone(self);
        let capacity = Arc::clone(self);

        vec![
            spawn_periodic(
                "fleet-snapshot",
                self.schedule.fleet_interval(),
                cancellation.clone(),
                move || fleet.publish_fleet_snapshot(),
            ),
            spawn_periodic(
                "position-snapshot",
                self.schedule.position_interval(),
                cancellation.clone(),
                move || positions.publish_position_snapshot(),
            ),
            spawn_periodic(
                "resource-alerts",
                self.schedule.alert_interval(),
                cancellation.clone(),
                move || resources.publish_resource_alerts(),
            ),
            spawn_periodic(
                "capacity-snapshot",
                self.schedule.capacity_interval(),
                cancellation.clone(),
                move || capacity.publish_capacity_snapshot(),
            ),
        ]
    }
}
