//! Geodesic helpers over lat/lon coordinates

use geo::{ChamberlainDuquetteArea, HaversineDistance, LineString, Polygon};

use super::fix::LatLon;

/// Great-circle distance between two positions, in meters
pub fn distance(a: &LatLon, b: &LatLon) -> f64 {
    if a == b {
        return 0.0;
    }

    a.to_point().haversine_distance(&b.to_point())
}

/// Spherical area enclosed by an open ring, in square meters.
///
/// The ring is closed implicitly and the winding direction is ignored.
/// Fewer than 3 vertices enclose nothing.
pub fn polygon_area(ring: &[LatLon]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }

    let exterior: LineString = ring.iter().map(|p| (p.lon, p.lat)).collect();

    Polygon::new(exterior, vec![]).chamberlain_duquette_unsigned_area()
}

/// Sum of the distances between consecutive positions
pub fn path_length(path: &[LatLon]) -> f64 {
    path.windows(2).map(|w| distance(&w[0], &w[1])).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_north_ten_meters() {
        let a = LatLon::new(45.0, -63.0);
        let b = LatLon::new(45.00009, -63.0);

        let d = distance(&a, &b);
        assert!((d - 10.0).abs() < 0.1, "got {}", d);
    }

    #[test]
    fn distance_is_commutative() {
        let a = LatLon::new(-26.31832, -48.8702222);
        let b = LatLon::new(-26.3185919, -48.8619776);

        assert_eq!(distance(&a, &b), distance(&b, &a));
        assert!(distance(&a, &b) > 800.0);
    }

    #[test]
    fn distance_zero_only_for_same_position() {
        let a = LatLon::new(45.0, -63.0);

        assert_eq!(0.0, distance(&a, &a));
        assert!(distance(&a, &LatLon::new(45.000001, -63.0)) > 0.0);
    }

    #[test]
    fn area_of_degenerate_rings() {
        assert_eq!(0.0, polygon_area(&[]));
        assert_eq!(0.0, polygon_area(&[LatLon::new(0.0, 0.0)]));
        assert_eq!(
            0.0,
            polygon_area(&[LatLon::new(0.0, 0.0), LatLon::new(1.0, 1.0)])
        );
    }

    #[test]
    fn area_ignores_winding() {
        let ring = vec![
            LatLon::new(0.0, 0.0),
            LatLon::new(0.0, 1.0),
            LatLon::new(1.0, 1.0),
            LatLon::new(1.0, 0.0),
        ];
        let mut reversed = ring.clone();
        reversed.reverse();

        let area = polygon_area(&ring);
        // one degree square at the equator, about 12 391 km2
        assert!((area - 1.2391e10).abs() < 1.0e8, "got {}", area);
        assert!((area - polygon_area(&reversed)).abs() < 1.0e-3);
    }

    #[test]
    fn path_length_sums_legs() {
        let path = vec![
            LatLon::new(45.0, -63.0),
            LatLon::new(45.00009, -63.0),
            LatLon::new(45.00018, -63.0),
        ];

        let expected = distance(&path[0], &path[1]) + distance(&path[1], &path[2]);
        assert_eq!(expected, path_length(&path));
        assert_eq!(0.0, path_length(&path[..1]));
    }
}
