/// Mean Earth radius in meters, matching the WGS84-adjacent value used
/// throughout mapping tooling.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters between two `(lat, lon)` points in degrees.
pub fn haversine_m(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lat1, lon1) = a;
    let (lat2, lon2) = b;

    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_identical_points() {
        assert_eq!(haversine_m((45.0, 45.0), (45.0, 45.0)), 0.0);
    }

    #[test]
    fn one_degree_of_longitude_at_equator_is_about_111km() {
        let d = haversine_m((0.0, 0.0), (0.0, 1.0));
        assert!((d - 111_195.0).abs() < 500.0, "got {d}");
    }
}
