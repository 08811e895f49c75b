//! Point-in-polygon containment.
//!
//! Vertices are treated as a simple polygon in planar lat/lon space, with
//! longitude as x and latitude as y. The ring is closed implicitly.

use super::GeoPoint;

/// Minimum number of vertices for a polygon to enclose any area.
pub const MIN_POLYGON_VERTICES: usize = 3;

/// Ray-casting containment test.
///
/// Casts a ray from `point` towards +x and counts edge crossings; an odd
/// count means inside. Fewer than 3 vertices always returns false.
pub fn point_in_polygon(point: GeoPoint, vertices: &[GeoPoint]) -> bool {
    if vertices.len() < MIN_POLYGON_VERTICES {
        return false;
    }

    let (x, y) = (point.longitude, point.latitude);
    let mut inside = false;
    let mut j = vertices.len() - 1;

    for i in 0..vertices.len() {
        let (xi, yi) = (vertices[i].longitude, vertices[i].latitude);
        let (xj, yj) = (vertices[j].longitude, vertices[j].latitude);

        if (yi > y) != (yj > y) {
            let x_cross = (xj - xi) * (y - yi) / (yj - yi) + xi;
            if x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }

    inside
}

/// True when the ring has enough finite, in-range vertices to evaluate.
pub fn is_valid_polygon(vertices: &[GeoPoint]) -> bool {
    vertices.len() >= MIN_POLYGON_VERTICES && vertices.iter().all(GeoPoint::is_valid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<GeoPoint> {
        vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 1.0),
            GeoPoint::new(1.0, 1.0),
            GeoPoint::new(1.0, 0.0),
        ]
    }

    #[test]
    fn test_point_inside_square() {
        assert!(point_in_polygon(GeoPoint::new(0.5, 0.5), &square()));
    }

    #[test]
    fn test_point_outside_square() {
        assert!(!point_in_polygon(GeoPoint::new(1.5, 0.5), &square()));
        assert!(!point_in_polygon(GeoPoint::new(0.5, -0.1), &square()));
    }

    #[test]
    fn test_concave_polygon() {
        // U shape opening to the north
        let u = vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 3.0),
            GeoPoint::new(3.0, 3.0),
            GeoPoint::new(3.0, 2.0),
            GeoPoint::new(1.0, 2.0),
            GeoPoint::new(1.0, 1.0),
            GeoPoint::new(3.0, 1.0),
            GeoPoint::new(3.0, 0.0),
        ];
        assert!(point_in_polygon(GeoPoint::new(2.0, 0.5), &u));
        assert!(!point_in_polygon(GeoPoint::new(2.0, 1.5), &u));
        assert!(point_in_polygon(GeoPoint::new(0.5, 1.5), &u));
    }

    #[test]
    fn test_degenerate_polygon_is_never_inside() {
        let line = vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 1.0)];
        assert!(!point_in_polygon(GeoPoint::new(0.5, 0.5), &line));
        assert!(!point_in_polygon(GeoPoint::new(0.0, 0.0), &[]));
    }

    #[test]
    fn test_polygon_validity() {
        assert!(is_valid_polygon(&square()));
        assert!(!is_valid_polygon(&square()[..2]));

        let mut bad = square();
        bad[1] = GeoPoint::new(f64::NAN, 0.0);
        assert!(!is_valid_polygon(&bad));
    }
}
