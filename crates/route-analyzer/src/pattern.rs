use route_models::{PatternTag, RoutePoint};

use crate::haversine::haversine_m;

/// Classifies a route's geometry from centroid spread, closure distance
/// (start-to-end), angular coverage around the centroid, and elevation
/// balance. Returns the tag plus a normalized confidence in `[0, 1]`.
pub fn classify_pattern(
    points: &[RoutePoint],
    elevation_gain_m: f64,
    elevation_loss_m: f64,
) -> (PatternTag, f64) {
    if points.len() < 2 {
        return (PatternTag::Unknown, 0.0);
    }

    let centroid_lat = points.iter().map(|p| p.lat).sum::<f64>() / points.len() as f64;
    let centroid_lon = points.iter().map(|p| p.lon).sum::<f64>() / points.len() as f64;

    let start = points.first().unwrap();
    let end = points.last().unwrap();
    let closure_m = haversine_m((start.lat, start.lon), (end.lat, end.lon));

    let spread_m = points
        .iter()
        .map(|p| haversine_m((centroid_lat, centroid_lon), (p.lat, p.lon)))
        .sum::<f64>()
        / points.len() as f64;

    let loopness = if spread_m > 0.0 {
        (1.0 - (closure_m / (spread_m * 2.0)).min(1.0)).max(0.0)
    } else {
        0.0
    };

    let angular_coverage = angular_coverage_fraction(points, centroid_lat, centroid_lon);

    if loopness > 0.5 {
        if angular_coverage > 1.5 {
            return (PatternTag::MultiLap, loopness.min(1.0));
        }
        if angular_coverage > 0.6 {
            return (PatternTag::Loop, loopness.min(1.0));
        }
        return (PatternTag::FigureEight, loopness.min(1.0));
    }

    if elevation_gain_m > 0.0 && elevation_loss_m < elevation_gain_m * 0.3 {
        let confidence = elevation_gain_m / (elevation_gain_m + elevation_loss_m + 1.0);
        return (PatternTag::PointToPoint, confidence.min(1.0));
    }

    if closure_m < spread_m * 0.2 {
        return (PatternTag::OutAndBack, (1.0 - loopness).min(1.0));
    }

    (PatternTag::Unknown, 0.3)
}

/// Fraction of a full turn (`2*pi`) swept by the points' bearings from the
/// centroid, used as a proxy for how much of a loop the route traces.
fn angular_coverage_fraction(points: &[RoutePoint], centroid_lat: f64, centroid_lon: f64) -> f64 {
    let mut angles: Vec<f64> = points
        .iter()
        .map(|p| (p.lat - centroid_lat).atan2(p.lon - centroid_lon))
        .collect();
    angles.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let mut total_turn = 0.0;
    for window in angles.windows(2) {
        let mut delta = window[1] - window[0];
        if delta < 0.0 {
            delta += std::f64::consts::TAU;
        }
        total_turn += delta;
    }
    total_turn / std::f64::consts::TAU
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lon: f64) -> RoutePoint {
        RoutePoint::new(lat, lon)
    }

    #[test]
    fn a_closed_square_classifies_as_a_loop() {
        let points = vec![
            point(0.0, 0.0),
            point(0.0, 0.01),
            point(0.01, 0.01),
            point(0.01, 0.0),
            point(0.0, 0.0),
        ];
        let (tag, confidence) = classify_pattern(&points, 0.0, 0.0);
        assert_eq!(tag, PatternTag::Loop);
        assert!(confidence > 0.5);
    }

    #[test]
    fn a_straight_line_with_net_climb_is_point_to_point() {
        let mut points = Vec::new();
        for i in 0..10 {
            points.push(point(0.0, i as f64 * 0.001).with_elevation(i as f64 * 10.0));
        }
        let (tag, _) = classify_pattern(&points, 90.0, 5.0);
        assert_eq!(tag, PatternTag::PointToPoint);
    }
}
