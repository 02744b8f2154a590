use route_models::{OverlayHook, PatternTag, RoutePoint};

/// Deterministically derives a small, finite set of overlay annotations
/// (peak elevation, steepest climb, turnaround point) from the analyzed
/// point sequence.
pub fn build_overlay_hooks(points: &[RoutePoint], pattern_tag: PatternTag) -> Vec<OverlayHook> {
    let mut hooks = Vec::new();
    if points.is_empty() {
        return hooks;
    }
    let last_idx = points.len().saturating_sub(1).max(1);

    if let Some((idx, point)) = points.iter().enumerate().max_by(|(_, a), (_, b)| {
        a.elevation_m
            .unwrap_or(f64::MIN)
            .partial_cmp(&b.elevation_m.unwrap_or(f64::MIN))
            .unwrap()
    }) {
        if point.elevation_m.is_some() {
            hooks.push(OverlayHook {
                progress: idx as f64 / last_idx as f64,
                kind: "peak".into(),
                label: "Highest point".into(),
            });
        }
    }

    if points.len() >= 2 {
        if let Some((idx, _)) = points.windows(2).enumerate().max_by(|(_, a), (_, b)| {
            let climb_a = a[1].elevation_m.unwrap_or(0.0) - a[0].elevation_m.unwrap_or(0.0);
            let climb_b = b[1].elevation_m.unwrap_or(0.0) - b[0].elevation_m.unwrap_or(0.0);
            climb_a.partial_cmp(&climb_b).unwrap()
        }) {
            hooks.push(OverlayHook {
                progress: idx as f64 / last_idx as f64,
                kind: "steepest-climb".into(),
                label: "Steepest climb".into(),
            });
        }
    }

    if matches!(pattern_tag, PatternTag::OutAndBack) {
        let mid = last_idx / 2;
        hooks.push(OverlayHook {
            progress: mid as f64 / last_idx as f64,
            kind: "turnaround".into(),
            label: "Turnaround".into(),
        });
    }

    hooks.sort_by(|a, b| a.progress.partial_cmp(&b.progress).unwrap());
    hooks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_the_highest_elevation_point() {
        let points = vec![
            RoutePoint::new(0.0, 0.0).with_elevation(10.0),
            RoutePoint::new(0.0, 0.001).with_elevation(50.0),
            RoutePoint::new(0.0, 0.002).with_elevation(20.0),
        ];
        let hooks = build_overlay_hooks(&points, PatternTag::PointToPoint);
        let peak = hooks.iter().find(|h| h.kind == "peak").unwrap();
        assert!((peak.progress - 0.5).abs() < 1e-9);
    }

    #[test]
    fn empty_route_produces_no_hooks() {
        assert!(build_overlay_hooks(&[], PatternTag::Unknown).is_empty());
    }
}
