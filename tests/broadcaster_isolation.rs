//! A failing data source in one broadcast task must not stop the others.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use fleetwatch_core::alerts::{topics, AlertDispatcher, ChannelHub, Payload};
use fleetwatch_core::capacity::HoldingArea;
use fleetwatch_core::config::BroadcastSettings;
use fleetwatch_core::models::{OperationalStatus, Position, Vehicle};
use fleetwatch_core::storage::{MemoryHistoryStore, MemoryVehicleStore, VehicleStore};
use fleetwatch_core::telemetry::TelemetryBroadcaster;
use fleetwatch_core::StoreError;

/// Vehicle store whose resource queries always fail.
struct FailingResourceQueries {
    inner: MemoryVehicleStore,
    failures: AtomicUsize,
}

impl VehicleStore for FailingResourceQueries {
    fn get(&self, id: &str) -> Result<Option<Vehicle>, StoreError> {
        self.inner.get(id)
    }

    fn save(&self, vehicle: Vehicle) -> Result<(), StoreError> {
        self.inner.save(vehicle)
    }

    fn list(&self) -> Result<Vec<Vehicle>, StoreError> {
        self.inner.list()
    }

    fn update_current_position(&self, id: &str, position: &Position) -> Result<(), StoreError> {
        self.inner.update_current_position(id, position)
    }

    fn set_status(&self, id: &str, status: OperationalStatus) -> Result<(), StoreError> {
        self.inner.set_status(id, status)
    }

    fn battery_below(&self, _percent: f64) -> Result<Vec<Vehicle>, StoreError> {
        self.failures.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unavailable("resource view offline".to_string()))
    }
}

#[tokio::test(start_paused = true)]
async fn test_position_snapshot_survives_failing_alert_task() {
    let vehicles = Arc::new(FailingResourceQueries {
        inner: MemoryVehicleStore::new(),
        failures: AtomicUsize::new(0),
    });
    vehicles.save(Vehicle::new("v1", "ALPHA").with_battery(5.0)).unwrap();
    vehicles
        .update_current_position("v1", &Position::new(47.6, -122.3, Utc::now()))
        .unwrap();

    let hub = Arc::new(ChannelHub::default());
    let mut positions = hub.subscribe(topics::LOCATION_UPDATES);
    let mut alerts = hub.subscribe(topics::RESOURCE_ALERTS);

    let broadcaster = Arc::new(
        TelemetryBroadcaster::new(
            vehicles.clone(),
            Arc::new(MemoryHistoryStore::new()),
            Arc::new(HoldingArea::new(2, vehicles.clone())),
            hub.clone(),
            Arc::new(AlertDispatcher::new(hub.clone())),
        )
        .with_schedule(BroadcastSettings {
            position_interval_secs: 15,
            alert_interval_secs: 5,
            ..Default::default()
        }),
    );

    let cancel = CancellationToken::new();
    let handles = broadcaster.spawn(&cancel);

    // Alert task fails at 5s and 10s before the first position run at 15s
    tokio::time::sleep(Duration::from_secs(16)).await;
    assert!(vehicles.failures.load(Ordering::SeqCst) >= 2);
    match positions.try_recv() {
        Ok(Payload::Positions(batch)) => {
            assert_eq!(batch.positions.len(), 1);
            assert_eq!(batch.positions[0].vehicle_id, "v1");
        }
        other => panic!("expected a position batch, got {:?}", other),
    }

    // Failures keep coming and so do the position snapshots
    tokio::time::sleep(Duration::from_secs(15)).await;
    assert!(vehicles.failures.load(Ordering::SeqCst) >= 5);
    assert!(matches!(positions.try_recv(), Ok(Payload::Positions(_))));
    assert!(alerts.try_recv().is_err());

    cancel.cancel();
    for handle in handles {
        handle.await.unwrap();
    }
}
