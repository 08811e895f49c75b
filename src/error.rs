//! Error types.
//!
//! Every failure path in the engine is local and recoverable; these types
//! carry enough context for the caller to log or back off.

use thiserror::Error;

/// Failure reported by a persistence collaborator.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("invalid geofence: {0}")]
    Invalid(#[from] GeofenceError),
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

/// Reason a position report was rejected at the ingest boundary.
///
/// The `Display` output is the reason string handed back to callers.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("latitude {0} out of range [-90, 90]")]
    Latitude(f64),

    #[error("longitude {0} out of range [-180, 180]")]
    Longitude(f64),

    #[error("altitude {0} must be >= 0")]
    Altitude(f64),

    #[error("speed {0} must be >= 0")]
    Speed(f64),

    #[error("heading {0} out of range [0, 360)")]
    Heading(f64),

    #[error("battery level {0} out of range [0, 100]")]
    Battery(f64),

    #[error("accuracy {0} must be >= 0")]
    Accuracy(f64),

    #[error("vehicle id must not be empty")]
    EmptyVehicleId,

    #[error("unknown vehicle: {0}")]
    UnknownVehicle(String),

    #[error("stale position: reported {reported} is older than current {current}")]
    StalePosition { reported: String, current: String },
}

/// Geofence construction invariant failures.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GeofenceError {
    #[error("geofence name must not be empty")]
    EmptyName,

    #[error("circular geofence requires radius > 0, got {0}")]
    InvalidRadius(f64),

    #[error("polygonal geofence requires at least 3 vertices, got {0}")]
    TooFewVertices(usize),

    #[error("invalid coordinate ({lat}, {lon})")]
    InvalidCoordinate { lat: f64, lon: f64 },

    #[error("altitude band min {min} exceeds max {max}")]
    InvertedAltitudeBand { min: f64, max: f64 },

    #[error("geometry does not match fence type {0}")]
    GeometryMismatch(&'static str),
}

/// Holding-area admission failures.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CapacityError {
    #[error("holding area full (capacity {capacity})")]
    Full { capacity: usize },

    #[error("vehicle {0} is not in the holding area")]
    NotHeld(String),

    #[error("vehicle {0} is already in the holding area")]
    AlreadyHeld(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Pub/sub delivery failures.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PublishError {
    #[error("payload encoding failed: {0}")]
    Encoding(String),
}

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
