//! Pipeline context management.
//!
//! Provides batch context for logging and state tracking.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::logging::structured::LogContext;

/// Context for one ingest call or batch of calls.
#[derive(Debug, Clone)]
pub struct BatchContext {
    pub batch_id: String,
    pub received_at: DateTime<Utc>,
    /// Caller identifier, when known (gateway, device bridge, ...).
    pub source: Option<String>,
}

impl BatchContext {
    pub fn new(source: Option<&str>) -> Self {
        let batch_id = format!("batch-{}", &Uuid::new_v4().to_string()[..8]);

        Self {
            batch_id,
            received_at: Utc::now(),
            source: source.map(|s| s.to_string()),
        }
    }

    pub fn log_context(&self) -> LogContext {
        LogContext::new(&self.batch_id)
    }

    /// Log context for a single vehicle within this batch.
    pub fn vehicle_context(&self, vehicle_id: &str) -> LogContext {
        LogContext::new(&self.batch_id).with_vehicle(vehicle_id)
    }
}
