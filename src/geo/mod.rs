//! Geographic math.
//!
//! Pure functions over latitude/longitude points:
//! - Great-circle (haversine) distance
//! - Point-in-circle
//! - Point-in-polygon (ray casting)

pub mod distance;
pub mod polygon;

use serde::{Deserialize, Serialize};

pub use distance::*;
pub use polygon::*;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// True when both components are finite and inside their ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}
