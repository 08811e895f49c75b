//! Structured logging utilities.
//!
//! Provides context-aware logging with batch_id and vehicle_id included
//! in every log message.

use std::fmt;

/// Logging context for an ingest batch or a scheduled task run.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub batch_id: String,
    pub vehicle_id: Option<String>,
}

impl LogContext {
    pub fn new(batch_id: &str) -> Self {
        Self {
            batch_id: batch_id.to_string(),
            vehicle_id: None,
        }
    }

    pub fn with_vehicle(&self, vehicle_id: &str) -> Self {
        Self {
            batch_id: self.batch_id.clone(),
            vehicle_id: Some(vehicle_id.to_string()),
        }
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.vehicle_id {
            Some(vid) => write!(f, "[batch={}] [vehicle={}]", self.batch_id, vid),
            None => write!(f, "[batch={}]", self.batch_id),
        }
    }
}
