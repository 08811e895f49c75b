//! Pub/sub channel abstraction.
//!
//! Payloads are typed; transport layers (HTTP, WebSocket, ...) serialize
//! them with serde as they see fit.

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::error::PublishError;
use crate::models::{CapacityStatus, FleetStats, PositionBatch, ResourceAlert, ViolationEvent};

/// Topic names other subsystems bind to.
pub mod topics {
    pub const SYSTEM_STATS: &str = "system-stats";
    pub const LOCATION_UPDATES: &str = "location-updates";
    pub const RESOURCE_ALERTS: &str = "resource-alerts";
    pub const CAPACITY_STATUS: &str = "capacity-status";
    pub const GEOFENCE_VIOLATIONS: &str = "geofence-violations";
}

/// Messages carried on broadcast topics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Payload {
    FleetStats(FleetStats),
    Positions(PositionBatch),
    ResourceAlert(ResourceAlert),
    Capacity(CapacityStatus),
    Violation(ViolationEvent),
}

impl Payload {
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::FleetStats(_) => "fleet_stats",
            Payload::Positions(_) => "positions",
            Payload::ResourceAlert(_) => "resource_alert",
            Payload::Capacity(_) => "capacity",
            Payload::Violation(_) => "violation",
        }
    }

    pub fn to_json(&self) -> Result<String, PublishError> {
        serde_json::to_string(self).map_err(|e| PublishError::Encoding(e.to_string()))
    }
}

/// Channel contract consumed by the engine.
pub trait PubSub: Send + Sync {
    fn publish(&self, topic: &str, payload: Payload) -> Result<(), PublishError>;

    /// Deliver to a single user's private channel.
    fn publish_to_user(&self, user_id: &str, payload: Payload) -> Result<(), PublishError>;
}

/// Default per-topic buffer. Slow subscribers lag rather than block publishers.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// In-process pub/sub over tokio broadcast channels, one per topic.
///
/// Publishing to a topic nobody subscribed to is not an error.
#[derive(Debug)]
pub struct ChannelHub {
    channels: DashMap<String, broadcast::Sender<Payload>>,
    capacity: usize,
}

impl Default for ChannelHub {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl ChannelHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn subscribe(&self, topic: &str) -> broadcast::Receiver<Payload> {
        self.channels
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    pub fn subscribe_user(&self, user_id: &str) -> broadcast::Receiver<Payload> {
        self.subscribe(&user_topic(user_id))
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.channels
            .get(topic)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    fn send(&self, topic: &str, payload: Payload) {
        if let Some(tx) = self.channels.get(topic) {
            // Err only means there are no live receivers right now.
            let delivered = tx.send(payload).unwrap_or(0);
            log::debug!("PUBLISH topic={} receivers={}", topic, delivered);
        } else {
            log::debug!("PUBLISH_NO_SUBSCRIBERS topic={}", topic);
        }
    }
}

impl PubSub for ChannelHub {
    fn publish(&self, topic: &str, payload: Payload) -> Result<(), PublishError> {
        self.send(topic, payload);
        Ok(())
    }

    fn publish_to_user(&self, user_id: &str, payload: Payload) -> Result<(), PublishError> {
        self.send(&user_topic(user_id), payload);
        Ok(())
    }
}

/// Private channel name for a user.
pub fn user_topic(user_id: &str) -> String {
    format!("user:{}", user_id)
}
