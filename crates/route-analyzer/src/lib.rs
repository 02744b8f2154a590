#![deny(unreachable_patterns)]

//! Parses route files into analyzed, immutable [`RouteProfile`] values.

pub mod error;
mod gpx;
mod haversine;
mod kml;
mod overlay;
mod pattern;

use std::path::Path;

use route_models::{RouteProfile, RoutePoint, TimestampQuality};

pub use error::{AnalyzerError, AnalyzerResult};
pub use haversine::haversine_m;

const WALKING_SPEED_MPS: f64 = 1.39;
const MAX_PLAUSIBLE_SPEED_MPS: f64 = 50.0;
const MIN_TIMESTAMPED_DURATION_S: f64 = 60.0;
const IMPLAUSIBLE_SEGMENT_FRACTION_LIMIT: f64 = 0.1;
const TOO_SHORT_DISTANCE_M: f64 = 1.0;

/// Parses a route file (`.gpx` or `.kml`) and produces its analyzed profile.
pub fn analyze_route(path: &Path) -> AnalyzerResult<RouteProfile> {
    let contents = std::fs::read_to_string(path)?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    let points = match extension.as_str() {
        "gpx" => gpx::parse_gpx(&contents)?,
        "kml" => kml::parse_kml(&contents)?,
        other => return Err(AnalyzerError::UnsupportedFormat(other.to_string())),
    };

    analyze_points(points)
}

/// Builds a [`RouteProfile`] from an already-parsed point sequence. Kept
/// separate from [`analyze_route`] so callers with in-memory points (tests,
/// alternate ingestion paths) don't need to round-trip through a file.
pub fn analyze_points(points: Vec<RoutePoint>) -> AnalyzerResult<RouteProfile> {
    if points.len() < 2 {
        return Err(AnalyzerError::EmptyRoute);
    }

    let mut distance_m = 0.0;
    let mut elevation_gain_m = 0.0;
    let mut elevation_loss_m = 0.0;
    let mut fast_segments = 0usize;
    let mut total_segments = 0usize;
    let mut timestamps_present = true;
    let mut timestamps_monotonic = true;

    for window in points.windows(2) {
        let a = window[0];
        let b = window[1];
        let segment_m = haversine_m((a.lat, a.lon), (b.lat, b.lon));
        distance_m += segment_m;

        if let (Some(ea), Some(eb)) = (a.elevation_m, b.elevation_m) {
            let delta = eb - ea;
            if delta > 0.0 {
                elevation_gain_m += delta;
            } else {
                elevation_loss_m += -delta;
            }
        }

        total_segments += 1;
        match (a.timestamp, b.timestamp) {
            (Some(ta), Some(tb)) => {
                if tb < ta {
                    timestamps_monotonic = false;
                }
                let dt_s = (tb - ta).num_milliseconds() as f64 / 1000.0;
                if dt_s > 0.0 && segment_m / dt_s > MAX_PLAUSIBLE_SPEED_MPS {
                    fast_segments += 1;
                }
            }
            _ => timestamps_present = false,
        }
    }

    let span_s = match (
        points.first().unwrap().timestamp,
        points.last().unwrap().timestamp,
    ) {
        (Some(first), Some(last)) => (last - first).num_milliseconds() as f64 / 1000.0,
        _ => 0.0,
    };

    let implausible_fraction = if total_segments > 0 {
        fast_segments as f64 / total_segments as f64
    } else {
        0.0
    };

    let timestamp_quality = if timestamps_present
        && timestamps_monotonic
        && span_s >= MIN_TIMESTAMPED_DURATION_S
        && implausible_fraction <= IMPLAUSIBLE_SEGMENT_FRACTION_LIMIT
    {
        TimestampQuality::Valid
    } else {
        TimestampQuality::Invalid
    };

    let duration_s = match timestamp_quality {
        TimestampQuality::Valid => span_s,
        TimestampQuality::Invalid => distance_m / WALKING_SPEED_MPS,
    };

    if distance_m < TOO_SHORT_DISTANCE_M {
        tracing::warn!(distance_m, "route distance is unusually short");
    }

    let (pattern_tag, pattern_confidence) =
        pattern::classify_pattern(&points, elevation_gain_m, elevation_loss_m);
    let overlay_hooks = overlay::build_overlay_hooks(&points, pattern_tag);

    Ok(RouteProfile {
        points,
        distance_m,
        elevation_gain_m,
        elevation_loss_m,
        duration_s,
        timestamp_quality,
        pattern_tag,
        pattern_confidence,
        overlay_hooks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use chrono::Utc;

    fn point(lat: f64, lon: f64) -> RoutePoint {
        RoutePoint::new(lat, lon)
    }

    #[test]
    fn rejects_routes_with_fewer_than_two_points() {
        let err = analyze_points(vec![point(0.0, 0.0)]).unwrap_err();
        assert!(matches!(err, AnalyzerError::EmptyRoute));
    }

    #[test]
    fn falls_back_to_walking_speed_without_timestamps() {
        let profile = analyze_points(vec![point(0.0, 0.0), point(0.0, 0.01)]).unwrap();
        assert_eq!(profile.timestamp_quality, TimestampQuality::Invalid);
        assert!((profile.duration_s - profile.distance_m / WALKING_SPEED_MPS).abs() < 1e-6);
    }

    #[test]
    fn uses_timestamp_span_when_quality_is_valid() {
        let t0 = Utc::now();
        let mut points = Vec::new();
        for i in 0..10 {
            points.push(
                point(0.0, i as f64 * 0.0005).with_timestamp(t0 + Duration::seconds(i * 10)),
            );
        }
        let profile = analyze_points(points).unwrap();
        assert_eq!(profile.timestamp_quality, TimestampQuality::Valid);
        assert!((profile.duration_s - 90.0).abs() < 1e-6);
    }

    #[test]
    fn marks_timestamps_invalid_when_segments_are_implausibly_fast() {
        let t0 = Utc::now();
        let points = vec![
            point(0.0, 0.0).with_timestamp(t0),
            point(10.0, 10.0).with_timestamp(t0 + Duration::seconds(1)),
        ];
        let profile = analyze_points(points).unwrap();
        assert_eq!(profile.timestamp_quality, TimestampQuality::Invalid);
    }
}
