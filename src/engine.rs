//! Tracking engine facade.
//!
//! Wires the stores, evaluator, ingestor, rate limiter, holding area and
//! broadcaster together from one `EngineConfig`, and exposes the calls
//! collaborators make: ingest, evaluate, check point, allow and status.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::alerts::{AlertDispatcher, ChannelHub, PubSub};
use crate::capacity::HoldingArea;
use crate::config::EngineConfig;
use crate::error::{CapacityError, StoreError};
use crate::geo::GeoPoint;
use crate::geofence::{evaluate, expire_geofences, GeofenceEvaluator, Verdict};
use crate::models::{
    CapacityStatus, Geofence, GeofenceStatus, Position, PositionInput, PositionRecord, Vehicle,
};
use crate::pipeline::{BatchContext, BatchResult, IngestOptions, IngestOutcome, LocationIngestor};
use crate::ratelimit::{RateLimitDecision, RateLimitStatus, RateLimiter, RoleLimits};
use crate::storage::{
    GeofenceStore, HistoryStore, MemoryGeofenceStore, MemoryHistoryStore, MemoryVehicleStore,
    VehicleStore,
};
use crate::telemetry::{spawn_periodic, TelemetryBroadcaster};

pub struct TrackingEngine {
    config: EngineConfig,
    vehicles: Arc<dyn VehicleStore>,
    history: Arc<dyn HistoryStore>,
    geofences: Arc<dyn GeofenceStore>,
    evaluator: Arc<GeofenceEvaluator>,
    ingestor: LocationIngestor,
    limiter: Arc<RateLimiter>,
    holding: Arc<HoldingArea>,
    broadcaster: Arc<TelemetryBroadcaster>,
}

impl TrackingEngine {
    pub fn new(
        config: EngineConfig,
        vehicles: Arc<dyn VehicleStore>,
        history: Arc<dyn HistoryStore>,
        geofences: Arc<dyn GeofenceStore>,
        pubsub: Arc<dyn PubSub>,
    ) -> Self {
        let evaluator = Arc::new(GeofenceEvaluator::new(geofences.clone()));
        let dispatcher = Arc::new(AlertDispatcher::new(pubsub.clone()));
        let ingestor = LocationIngestor::new(
            vehicles.clone(),
            history.clone(),
            evaluator.clone(),
            dispatcher.clone(),
        )
        .with_options(IngestOptions {
            reject_stale_positions: config.ingest.reject_stale_positions,
        });
        let limiter = Arc::new(RateLimiter::new(RoleLimits::from_settings(
            &config.rate_limit,
        )));
        let holding = Arc::new(HoldingArea::new(
            config.capacity.holding_area_max,
            vehicles.clone(),
        ));
        let broadcaster = Arc::new(
            TelemetryBroadcaster::new(
                vehicles.clone(),
                history.clone(),
                holding.clone(),
                pubsub,
                dispatcher,
            )
            .with_resources(config.resources.clone())
            .with_schedule(config.broadcast.clone()),
        );

        log::info!(
            "ENGINE_READY holding_max={} default_limit={} window_secs={} stale_guard={}",
            config.capacity.holding_area_max,
            config.rate_limit.default_limit,
            config.rate_limit.window_secs,
            config.ingest.reject_stale_positions
        );

        Self {
            config,
            vehicles,
            history,
            geofences,
            evaluator,
            ingestor,
            limiter,
            holding,
            broadcaster,
        }
    }

    /// Engine over in-memory stores, publishing to the returned hub.
    pub fn in_memory(config: EngineConfig) -> (Self, Arc<ChannelHub>) {
        let hub = Arc::new(ChannelHub::default());
        let engine = Self::new(
            config,
            Arc::new(MemoryVehicleStore::new()),
            Arc::new(MemoryHistoryStore::new()),
            Arc::new(MemoryGeofenceStore::new()),
            hub.clone(),
        );
        (engine, hub)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn broadcaster(&self) -> &Arc<TelemetryBroadcaster> {
        &self.broadcaster
    }

    // --- Vehicles and ingest ---

    pub fn register_vehicle(&self, vehicle: Vehicle) -> Result<(), StoreError> {
        self.vehicles.save(vehicle)
    }

    pub fn vehicle(&self, id: &str) -> Result<Option<Vehicle>, StoreError> {
        self.vehicles.get(id)
    }

    pub fn ingest(&self, vehicle_id: &str, input: &PositionInput) -> IngestOutcome {
        self.ingestor.ingest(vehicle_id, input)
    }

    pub fn ingest_batch(
        &self,
        source: Option<&str>,
        items: &[(String, PositionInput)],
    ) -> BatchResult {
        let ctx = BatchContext::new(source);
        log::info!(
            "{} BATCH_RECEIVED items={}",
            ctx.log_context(),
            items.len()
        );
        self.ingestor.ingest_batch(&ctx, items)
    }

    // --- Evaluation ---

    /// Evaluate a position against a caller-supplied fence set.
    pub fn evaluate(&self, position: &Position, fences: &[Geofence]) -> Vec<Verdict> {
        evaluate(position, fences, Utc::now())
    }

    /// Evaluate against every currently active fence without recording
    /// anything.
    pub fn check_point(&self, position: &Position) -> anyhow::Result<Vec<Verdict>> {
        self.evaluator.check(position, Utc::now())
    }

    // --- Rate limiting ---

    pub fn allow(&self, identifier: &str, role: Option<&str>) -> bool {
        self.limiter.allow_role(identifier, role)
    }

    /// Like `allow`, also returning the quota so a denied caller can back off.
    pub fn check(&self, identifier: &str, role: Option<&str>) -> RateLimitDecision {
        self.limiter.check_role_at(identifier, role, Utc::now())
    }

    pub fn status(&self, identifier: &str, role: Option<&str>) -> RateLimitStatus {
        self.limiter.status(identifier, role)
    }

    // --- Geofences ---

    pub fn create_geofence(&self, fence: Geofence) -> Result<Geofence, StoreError> {
        let created = self.geofences.create(fence)?;
        log::info!(
            "GEOFENCE_CREATED id={} name={} type={} boundary={} priority={}",
            created.id,
            created.name,
            created.fence_type.as_str(),
            created.boundary_type.as_str(),
            created.priority_level
        );
        Ok(created)
    }

    pub fn update_geofence(&self, fence: Geofence) -> Result<(), StoreError> {
        self.geofences.update(fence)
    }

    pub fn delete_geofence(&self, id: Uuid) -> Result<(), StoreError> {
        self.geofences.delete(id)?;
        log::info!("GEOFENCE_DELETED id={}", id);
        Ok(())
    }

    pub fn set_geofence_status(
        &self,
        id: Uuid,
        status: GeofenceStatus,
    ) -> Result<Geofence, StoreError> {
        let fence = self.geofences.set_status(id, status)?;
        log::info!("GEOFENCE_STATUS id={} status={}", id, status.as_str());
        Ok(fence)
    }

    pub fn geofence(&self, id: Uuid) -> Result<Option<Geofence>, StoreError> {
        self.geofences.get(id)
    }

    pub fn geofences(&self) -> Result<Vec<Geofence>, StoreError> {
        self.geofences.list()
    }

    pub fn active_geofences(&self) -> Result<Vec<Geofence>, StoreError> {
        self.geofences.active_as_of(Utc::now())
    }

    pub fn violating_geofences(&self) -> Result<Vec<Geofence>, StoreError> {
        self.geofences.violating()
    }

    // --- History ---

    pub fn history(&self, vehicle_id: &str) -> Result<Vec<PositionRecord>, StoreError> {
        self.history.history(vehicle_id)
    }

    pub fn history_in_range(
        &self,
        vehicle_id: &str,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<PositionRecord>, StoreError> {
        self.history.in_range(vehicle_id, from, until)
    }

    pub fn positions_within(
        &self,
        center: GeoPoint,
        radius_meters: f64,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<PositionRecord>, StoreError> {
        self.history.within_area(center, radius_meters, since)
    }

    // --- Holding area ---

    pub fn admit_to_holding(&self, vehicle_id: &str) -> Result<(), CapacityError> {
        self.holding.admit(vehicle_id)
    }

    pub fn release_from_holding(&self, vehicle_id: &str) -> Result<(), CapacityError> {
        self.holding.release(vehicle_id)
    }

    pub fn capacity_status(&self) -> CapacityStatus {
        self.holding.status()
    }

    // --- Background tasks ---

    /// Start the broadcast tasks and the maintenance sweeps (rate-limit
    /// purge, geofence expiry, history retention). All stop on `cancellation`.
    pub fn spawn_background(&self, cancellation: &CancellationToken) -> Vec<JoinHandle<()>> {
        let mut handles = self.broadcaster.spawn(cancellation);

        let limiter = Arc::clone(&self.limiter);
        handles.push(spawn_periodic(
            "rate-limit-sweep",
            self.config.rate_limit.sweep_interval(),
            cancellation.clone(),
            move || {
                limiter.sweep(Utc::now());
                Ok(())
            },
        ));

        let geofences = Arc::clone(&self.geofences);
        handles.push(spawn_periodic(
            "geofence-expiry",
            self.config.retention.expiry_sweep_interval(),
            cancellation.clone(),
            move || expire_geofences(geofences.as_ref(), Utc::now()).map(|_| ()),
        ));

        let history = Arc::clone(&self.history);
        let retention = self.config.retention.clone();
        handles.push(spawn_periodic(
            "history-purge",
            retention.purge_interval(),
            cancellation.clone(),
            move || {
                let cutoff = retention.history_cutoff(Utc::now());
                let removed = history.purge_older_than(cutoff)?;
                log::info!(
                    "HISTORY_PURGE removed={} cutoff={}",
                    removed,
                    cutoff.to_rfc3339()
                );
                Ok(())
            },
        ));

        log::info!("BACKGROUND_TASKS_STARTED tasks={}", handles.len());
        handles
    }
}
