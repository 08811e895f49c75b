//! Alert dispatch.
//!
//! Wraps violation events and resource alerts into payloads and fans them
//! out to the broadcast topics and, for violations, the owner's channel.

use std::sync::Arc;

use crate::logging::structured::LogContext;
use crate::models::{ResourceAlert, ViolationEvent};

use super::pubsub::{topics, Payload, PubSub};

/// Delivery summary for one dispatch call.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DispatchOutcome {
    pub broadcast: bool,
    pub user: Option<bool>,
}

pub struct AlertDispatcher {
    pubsub: Arc<dyn PubSub>,
}

impl AlertDispatcher {
    pub fn new(pubsub: Arc<dyn PubSub>) -> Self {
        Self { pubsub }
    }

    /// Publish a violation to `geofence-violations` and, when the vehicle
    /// has an owner, to that user's channel. Failures are logged only.
    pub fn publish_violation(
        &self,
        event: &ViolationEvent,
        owner_user_id: Option<&str>,
        ctx: &LogContext,
    ) -> DispatchOutcome {
        let payload = Payload::Violation(event.clone());

        let broadcast = match self
            .pubsub
            .publish(topics::GEOFENCE_VIOLATIONS, payload.clone())
        {
            Ok(()) => true,
            Err(e) => {
                log::warn!(
                    "{} VIOLATION_PUBLISH_FAILED geofence={} error={}",
                    ctx,
                    event.geofence_id,
                    e
                );
                false
            }
        };

        let user = owner_user_id.map(|user_id| match self.pubsub.publish_to_user(user_id, payload) {
            Ok(()) => true,
            Err(e) => {
                log::warn!(
                    "{} USER_ALERT_FAILED user={} geofence={} error={}",
                    ctx,
                    user_id,
                    event.geofence_id,
                    e
                );
                false
            }
        });

        log::info!(
            "{} VIOLATION_DISPATCHED geofence={} name={} boundary={} inside={} altitude={} priority={} action={}",
            ctx,
            event.geofence_id,
            event.geofence_name,
            event.boundary_type.as_str(),
            event.is_inside,
            event.altitude_violation,
            event.priority_level,
            event.violation_action
        );

        DispatchOutcome { broadcast, user }
    }

    /// Publish a resource alert. Empty alerts are suppressed; returns
    /// whether anything was sent.
    pub fn publish_resource_alert(&self, alert: ResourceAlert) -> anyhow::Result<bool> {
        if alert.is_empty() {
            log::debug!("RESOURCE_ALERT_SUPPRESSED reason=empty");
            return Ok(false);
        }

        log::info!(
            "RESOURCE_ALERT low={} critical={} overheating={}",
            alert.low_battery.len(),
            alert.critical_battery.len(),
            alert.overheating.len()
        );
        self.pubsub
            .publish(topics::RESOURCE_ALERTS, Payload::ResourceAlert(alert))?;
        Ok(true)
    }
}
