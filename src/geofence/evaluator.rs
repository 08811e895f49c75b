//! Geofence evaluation.
//!
//! Verdicts come back in the order fences were supplied. Fences that are not
//! currently active, or whose geometry cannot be evaluated, are skipped and
//! produce no verdict.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::geo::{is_valid_polygon, point_in_circle, point_in_polygon};
use crate::logging::structured::LogContext;
use crate::models::{FenceGeometry, FenceType, Geofence, Position, ViolationEvent};
use crate::storage::GeofenceStore;

/// Outcome of checking one position against one fence.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub fence: Geofence,
    pub is_inside: bool,
    pub altitude_violation: bool,
    pub is_violation: bool,
}

/// Why a fence produced no verdict.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Geometry missing, invalid, or inconsistent with the fence type.
    Malformed(String),
}

/// Evaluate a single fence, ignoring its schedule.
pub fn evaluate_fence(position: &Position, fence: &Geofence) -> Result<Verdict, SkipReason> {
    let point = position.point();

    let is_inside = match (&fence.fence_type, &fence.geometry) {
        (
            FenceType::Circular,
            FenceGeometry::Circle {
                center,
                radius_meters,
            },
        ) => {
            if !center.is_valid() || !(radius_meters.is_finite() && *radius_meters > 0.0) {
                return Err(SkipReason::Malformed(format!(
                    "circle center=({}, {}) radius={}",
                    center.latitude, center.longitude, radius_meters
                )));
            }
            point_in_circle(point, *center, *radius_meters)
        }
        (FenceType::Polygonal, FenceGeometry::Polygon { vertices }) => {
            if !is_valid_polygon(vertices) {
                return Err(SkipReason::Malformed(format!(
                    "polygon vertices={}",
                    vertices.len()
                )));
            }
            point_in_polygon(point, vertices)
        }
        (fence_type, _) => {
            return Err(SkipReason::Malformed(format!(
                "geometry does not match {}",
                fence_type.as_str()
            )))
        }
    };

    // No altitude reported means no altitude check at all.
    let altitude_violation = position
        .altitude_meters
        .is_some_and(|alt| fence.altitude.is_violated_by(alt));

    let is_violation = fence.boundary_type.is_breached(is_inside) || altitude_violation;

    Ok(Verdict {
        fence: fence.clone(),
        is_inside,
        altitude_violation,
        is_violation,
    })
}

/// Evaluate `position` against every fence active at `now`.
pub fn evaluate(position: &Position, fences: &[Geofence], now: DateTime<Utc>) -> Vec<Verdict> {
    fences
        .iter()
        .filter_map(|fence| {
            if !fence.is_active_at(now) {
                log::debug!(
                    "GEOFENCE_SKIPPED geofence={} reason=not_active status={}",
                    fence.id,
                    fence.status.as_str()
                );
                return None;
            }
            match evaluate_fence(position, fence) {
                Ok(verdict) => Some(verdict),
                Err(SkipReason::Malformed(detail)) => {
                    log::warn!(
                        "GEOFENCE_SKIPPED geofence={} name={} reason=malformed detail={}",
                        fence.id,
                        fence.name,
                        detail
                    );
                    None
                }
            }
        })
        .collect()
}

/// The violating verdict with the highest priority, if any.
///
/// Ties keep the earliest verdict.
pub fn most_severe(verdicts: &[Verdict]) -> Option<&Verdict> {
    verdicts
        .iter()
        .filter(|v| v.is_violation)
        .fold(None, |best: Option<&Verdict>, v| match best {
            Some(b) if b.fence.priority_level >= v.fence.priority_level => Some(b),
            _ => Some(v),
        })
}

impl ViolationEvent {
    pub fn from_verdict(
        vehicle_id: &str,
        verdict: &Verdict,
        position: &Position,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            vehicle_id: vehicle_id.to_string(),
            geofence_id: verdict.fence.id,
            geofence_name: verdict.fence.name.clone(),
            boundary_type: verdict.fence.boundary_type,
            is_inside: verdict.is_inside,
            altitude_violation: verdict.altitude_violation,
            priority_level: verdict.fence.priority_level,
            violation_action: verdict.fence.violation_action.clone(),
            position: position.clone(),
            timestamp: at,
        }
    }
}

/// Evaluates positions against the fence store and records violations.
pub struct GeofenceEvaluator {
    store: Arc<dyn GeofenceStore>,
}

impl GeofenceEvaluator {
    pub fn new(store: Arc<dyn GeofenceStore>) -> Self {
        Self { store }
    }

    /// Side-effect free check against the currently active fences.
    pub fn check(&self, position: &Position, now: DateTime<Utc>) -> anyhow::Result<Vec<Verdict>> {
        let fences = self.store.active_as_of(now)?;
        Ok(evaluate(position, &fences, now))
    }

    /// Evaluate against active fences, record each violation on its fence
    /// and return the violation events.
    ///
    /// A failed counter update is logged; the event is still returned.
    pub fn process(
        &self,
        vehicle_id: &str,
        position: &Position,
        now: DateTime<Utc>,
        ctx: &LogContext,
    ) -> Vec<ViolationEvent> {
        let fences = match self.store.active_as_of(now) {
            Ok(fences) => fences,
            Err(e) => {
                log::warn!("{} ACTIVE_FENCES_UNAVAILABLE error={}", ctx, e);
                return Vec::new();
            }
        };

        let verdicts = evaluate(position, &fences, now);
        log::debug!(
            "{} GEOFENCE_EVALUATED fences={} verdicts={} violations={}",
            ctx,
            fences.len(),
            verdicts.len(),
            verdicts.iter().filter(|v| v.is_violation).count()
        );

        verdicts
            .iter()
            .filter(|v| v.is_violation)
            .map(|verdict| {
                match self.store.record_violation(verdict.fence.id, now) {
                    Ok(total) => log::info!(
                        "{} VIOLATION_RECORDED geofence={} total={}",
                        ctx,
                        verdict.fence.id,
                        total
                    ),
                    Err(e) => log::warn!(
                        "{} VIOLATION_RECORD_FAILED geofence={} error={}",
                        ctx,
                        verdict.fence.id,
                        e
                    ),
                }
                ViolationEvent::from_verdict(vehicle_id, verdict, position, now)
            })
            .collect()
    }
}
