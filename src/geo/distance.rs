//! Great-circle distance.

use super::GeoPoint;

/// Mean earth radius used for all distance calculations, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Haversine great-circle distance between two points, in meters.
///
/// Identical points yield 0 and antipodal points yield `π·R`. The
/// intermediate term is clamped so rounding never produces NaN.
pub fn distance_meters(from: GeoPoint, to: GeoPoint) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let dlat = (to.latitude - from.latitude).to_radians();
    let dlon = (to.longitude - from.longitude).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// True iff `point` lies within `radius_meters` of `center`, boundary included.
pub fn point_in_circle(point: GeoPoint, center: GeoPoint, radius_meters: f64) -> bool {
    distance_meters(point, center) <= radius_meters
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f64::consts::PI;

    #[test]
    fn test_self_distance_is_zero() {
        let p = GeoPoint::new(48.8566, 2.3522);
        assert_eq!(distance_meters(p, p), 0.0);
    }

    #[test]
    fn test_one_degree_latitude() {
        let d = distance_meters(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 0.0));
        // 1 degree of arc on a 6371 km sphere
        assert!((d - 111_194.9).abs() < 1.0, "got {}", d);
    }

    #[test]
    fn test_antipodal_distance() {
        let d = distance_meters(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 180.0));
        assert!((d - PI * EARTH_RADIUS_METERS).abs() < 1e-3);

        let poles = distance_meters(GeoPoint::new(90.0, 0.0), GeoPoint::new(-90.0, 0.0));
        assert!((poles - PI * EARTH_RADIUS_METERS).abs() < 1e-3);
    }

    #[test]
    fn test_circle_boundary_is_inside() {
        let center = GeoPoint::new(0.0, 0.0);
        let point = GeoPoint::new(0.0, 0.01);
        let radius = distance_meters(point, center);

        assert!(point_in_circle(point, center, radius));
        assert!(!point_in_circle(point, center, radius - 0.001));
    }

    #[test]
    fn test_point_well_inside_circle() {
        let center = GeoPoint::new(51.5, -0.12);
        let point = GeoPoint::new(51.501, -0.121);
        assert!(point_in_circle(point, center, 1_000.0));
        assert!(!point_in_circle(point, center, 50.0));
    }

    fn any_point() -> impl Strategy<Value = GeoPoint> {
        (-90.0f64..=90.0, -180.0f64..=180.0).prop_map(|(lat, lon)| GeoPoint::new(lat, lon))
    }

    proptest! {
        #[test]
        fn prop_distance_is_symmetric(a in any_point(), b in any_point()) {
            let ab = distance_meters(a, b);
            let ba = distance_meters(b, a);
            prop_assert!((ab - ba).abs() < 1e-6);
        }

        #[test]
        fn prop_distance_is_bounded(a in any_point(), b in any_point()) {
            let d = distance_meters(a, b);
            prop_assert!(d.is_finite());
            prop_assert!(d >= 0.0);
            prop_assert!(d <= PI * EARTH_RADIUS_METERS + 1e-6);
        }

        #[test]
        fn prop_self_distance_is_zero(a in any_point()) {
            prop_assert_eq!(distance_meters(a, a), 0.0);
        }
    }
}
