//! Geofence expiry sweep.

use chrono::{DateTime, Utc};

use crate::storage::GeofenceStore;

/// Mark every fence past its `until` bound as EXPIRED.
///
/// Returns the number of fences expired by this pass.
pub fn expire_geofences(store: &dyn GeofenceStore, now: DateTime<Utc>) -> anyhow::Result<usize> {
    let expired = store.expire_due(now)?;
    if expired.is_empty() {
        log::debug!("GEOFENCE_EXPIRY_SWEEP expired=0");
    } else {
        log::info!(
            "GEOFENCE_EXPIRY_SWEEP expired={} ids={:?}",
            expired.len(),
            expired
        );
    }
    Ok(expired.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;
    use crate::models::{ActiveWindow, BoundaryType, Geofence};
    use crate::storage::MemoryGeofenceStore;
    use chrono::Duration;

    #[test]
    fn test_expire_geofences_counts() {
        let store = MemoryGeofenceStore::new();
        let now = Utc::now();
        for (i, hours) in [-2i64, -1, 3].iter().enumerate() {
            let fence = Geofence::circular(
                &format!("f{}", i),
                BoundaryType::Inclusion,
                GeoPoint::new(0.0, 0.0),
                10.0,
            )
            .unwrap()
            .with_window(ActiveWindow {
                until: Some(now + Duration::hours(*hours)),
                ..Default::default()
            });
            store.create(fence).unwrap();
        }

        assert_eq!(expire_geofences(&store, now).unwrap(), 2);
        assert_eq!(expire_geofences(&store, now).unwrap(), 0);
    }
}
