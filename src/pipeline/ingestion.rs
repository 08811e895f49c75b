//! Main location ingest pipeline.
//!
//! Coordinates the full position-report workflow:
//! 1. Validation (ranges, vehicle known)
//! 2. Current-position overwrite (optional staleness guard)
//! 3. History append
//! 4. Geofence evaluation against active fences
//! 5. Violation recording and dispatch
//!
//! Steps 2, 3 and 5 are independent writes. A failure in one is logged and
//! reported in the outcome; it neither rolls back nor blocks the others.

use std::sync::Arc;

use chrono::Utc;

use crate::alerts::AlertDispatcher;
use crate::error::ValidationError;
use crate::geofence::GeofenceEvaluator;
use crate::logging::structured::LogContext;
use crate::models::{Position, PositionInput, ViolationEvent};
use crate::storage::{HistoryStore, PositionWrite, VehicleStore};
use crate::validation::validate_position;

use super::context::BatchContext;

/// Write that failed during an otherwise accepted ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStage {
    CurrentPosition,
    History,
}

impl WriteStage {
    pub fn as_str(&self) -> &str {
        match self {
            WriteStage::CurrentPosition => "current_position",
            WriteStage::History => "history",
        }
    }
}

/// Result of ingesting a single position report.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub vehicle_id: String,
    pub accepted: bool,
    pub rejection_reason: Option<String>,
    /// History sequence, when the append succeeded.
    pub sequence: Option<u64>,
    pub violations: Vec<ViolationEvent>,
    pub degraded: Vec<WriteStage>,
}

impl IngestOutcome {
    fn rejected(vehicle_id: &str, err: &ValidationError) -> Self {
        Self {
            vehicle_id: vehicle_id.to_string(),
            accepted: false,
            rejection_reason: Some(err.to_string()),
            sequence: None,
            violations: Vec::new(),
            degraded: Vec::new(),
        }
    }
}

/// Result of ingesting a batch.
#[derive(Debug)]
pub struct BatchResult {
    pub batch_id: String,
    pub received_count: usize,
    pub accepted_count: usize,
    pub rejected_count: usize,
    pub results: Vec<IngestOutcome>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions {
    /// Reject reports older than the vehicle's current position. The
    /// comparison happens inside the store's current-position write, before
    /// history is appended.
    pub reject_stale_positions: bool,
}

pub struct LocationIngestor {
    vehicles: Arc<dyn VehicleStore>,
    history: Arc<dyn HistoryStore>,
    evaluator: Arc<GeofenceEvaluator>,
    dispatcher: Arc<AlertDispatcher>,
    options: IngestOptions,
}

impl LocationIngestor {
    pub fn new(
        vehicles: Arc<dyn VehicleStore>,
        history: Arc<dyn HistoryStore>,
        evaluator: Arc<GeofenceEvaluator>,
        dispatcher: Arc<AlertDispatcher>,
    ) -> Self {
        Self {
            vehicles,
            history,
            evaluator,
            dispatcher,
            options: IngestOptions::default(),
        }
    }

    pub fn with_options(mut self, options: IngestOptions) -> Self {
        self.options = options;
        self
    }

    /// Ingest one report under a fresh batch context.
    pub fn ingest(&self, vehicle_id: &str, input: &PositionInput) -> IngestOutcome {
        let ctx = BatchContext::new(None);
        self.ingest_in(&ctx, vehicle_id, input)
    }

    /// Ingest a batch. Each item is independent; one rejection never
    /// aborts the rest.
    pub fn ingest_batch(&self, ctx: &BatchContext, items: &[(String, PositionInput)]) -> BatchResult {
        let mut results = Vec::with_capacity(items.len());
        let mut accepted = 0;
        let mut rejected = 0;

        for (vehicle_id, input) in items {
            let result = self.ingest_in(ctx, vehicle_id, input);

            if result.accepted {
                accepted += 1;
            } else {
                rejected += 1;
            }

            results.push(result);
        }

        log::info!(
            "{} BATCH_COMPLETE received={} accepted={} rejected={}",
            ctx.log_context(),
            items.len(),
            accepted,
            rejected
        );

        BatchResult {
            batch_id: ctx.batch_id.clone(),
            received_count: items.len(),
            accepted_count: accepted,
            rejected_count: rejected,
            results,
        }
    }

    /// Ingest one report within `ctx`.
    pub fn ingest_in(
        &self,
        ctx: &BatchContext,
        vehicle_id: &str,
        input: &PositionInput,
    ) -> IngestOutcome {
        let log_ctx = ctx.vehicle_context(vehicle_id);
        let now = Utc::now();

        log::debug!("{} INGEST_START", log_ctx);

        // [1] VALIDATION
        let (position, owner) = match self.validate(vehicle_id, input, now, &log_ctx) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("{} INGEST_REJECTED reason={}", log_ctx, e);
                return IngestOutcome::rejected(vehicle_id, &e);
            }
        };

        let mut degraded = Vec::new();

        // [2] CURRENT POSITION (staleness compared inside the store write)
        let write = if self.options.reject_stale_positions {
            self.vehicles
                .update_current_position_if_newer(vehicle_id, &position)
        } else {
            self.vehicles
                .update_current_position(vehicle_id, &position)
                .map(|()| PositionWrite::Applied)
        };
        match write {
            Ok(PositionWrite::Applied) => {}
            Ok(PositionWrite::Stale { current }) => {
                let e = ValidationError::StalePosition {
                    reported: position.timestamp.to_rfc3339(),
                    current: current.to_rfc3339(),
                };
                log::warn!("{} INGEST_REJECTED reason={}", log_ctx, e);
                return IngestOutcome::rejected(vehicle_id, &e);
            }
            Err(e) => {
                log::warn!("{} CURRENT_POSITION_UPDATE_FAILED error={}", log_ctx, e);
                degraded.push(WriteStage::CurrentPosition);
            }
        }

        // [3] HISTORY
        let sequence = match self.history.append(vehicle_id, &position) {
            Ok(record) => Some(record.sequence),
            Err(e) => {
                log::warn!("{} HISTORY_APPEND_FAILED error={}", log_ctx, e);
                degraded.push(WriteStage::History);
                None
            }
        };

        // [4] GEOFENCE EVALUATION + [5] DISPATCH
        let violations = self.evaluator.process(vehicle_id, &position, now, &log_ctx);
        for event in &violations {
            self.dispatcher
                .publish_violation(event, owner.as_deref(), &log_ctx);
        }

        log::info!(
            "{} INGEST_ACCEPTED lat={:.6} lon={:.6} sequence={:?} violations={} degraded={:?}",
            log_ctx,
            position.latitude,
            position.longitude,
            sequence,
            violations.len(),
            degraded.iter().map(|s| s.as_str()).collect::<Vec<_>>()
        );

        IngestOutcome {
            vehicle_id: vehicle_id.to_string(),
            accepted: true,
            rejection_reason: None,
            sequence,
            violations,
            degraded,
        }
    }

    /// Returns the validated position and the vehicle owner, if any.
    fn validate(
        &self,
        vehicle_id: &str,
        input: &PositionInput,
        now: chrono::DateTime<Utc>,
        log_ctx: &LogContext,
    ) -> Result<(Position, Option<String>), ValidationError> {
        if vehicle_id.trim().is_empty() {
            return Err(ValidationError::EmptyVehicleId);
        }

        let position = validate_position(input, now)?;

        match self.vehicles.get(vehicle_id) {
            Ok(Some(vehicle)) => Ok((position, vehicle.owner_user_id)),
            Ok(None) => Err(ValidationError::UnknownVehicle(vehicle_id.to_string())),
            Err(e) => {
                // Lookup is best effort; the writes below report their own failures.
                log::warn!("{} VEHICLE_LOOKUP_FAILED error={}", log_ctx, e);
                Ok((position, None))
            }
        }
    }
}
