use route_models::{RationaleTag, RouteProfile, SpeedPlan};
use route_models::settings::AnimationSettings;

/// Fixed intro/outro buffer added to every computed video duration.
const DURATION_BUFFER_S: u64 = 19;

/// Computes the animation speed multiplier and resulting expected video
/// duration for a route under the given settings.
pub fn plan_speed(profile: &RouteProfile, settings: &AnimationSettings) -> SpeedPlan {
    if !settings.adaptive_enabled {
        let video_duration_s = expected_duration_s(profile.duration_s, settings.default_speed);
        return SpeedPlan {
            multiplier: settings.default_speed,
            video_duration_s,
            rationale_tag: RationaleTag::Fixed,
        };
    }

    let max_video_s = settings.max_video_minutes * 60.0;
    let duration_minutes = profile.duration_minutes();
    let usable_minutes = (settings.max_video_minutes - 0.5).max(0.01);
    let required = (duration_minutes / usable_minutes).ceil().max(0.0) as u32;

    let multiplier = required
        .max(settings.default_speed)
        .clamp(settings.min_speed, settings.max_speed);

    let video_duration_s = expected_duration_s(profile.duration_s, multiplier);

    let rationale_tag = if (video_duration_s as f64) > max_video_s + DURATION_BUFFER_S as f64 {
        RationaleTag::CappedExceeds
    } else {
        RationaleTag::Adaptive
    };

    SpeedPlan {
        multiplier,
        video_duration_s,
        rationale_tag,
    }
}

fn expected_duration_s(duration_s: f64, multiplier: u32) -> u64 {
    let multiplier = multiplier.max(1) as f64;
    (duration_s / multiplier).ceil() as u64 + DURATION_BUFFER_S
}

#[cfg(test)]
mod tests {
    use super::*;
    use route_models::{PatternTag, TimestampQuality};

    fn profile_with_duration(duration_s: f64) -> RouteProfile {
        RouteProfile {
            points: Vec::new(),
            distance_m: 0.0,
            elevation_gain_m: 0.0,
            elevation_loss_m: 0.0,
            duration_s,
            timestamp_quality: TimestampQuality::Valid,
            pattern_tag: PatternTag::Unknown,
            pattern_confidence: 0.0,
            overlay_hooks: Vec::new(),
        }
    }

    #[test]
    fn sixty_minute_route_with_ten_minute_cap_yields_multiplier_seven() {
        let settings = AnimationSettings {
            default_speed: 2,
            min_speed: 1,
            max_speed: 100,
            max_video_minutes: 10.0,
            adaptive_enabled: true,
        };
        let profile = profile_with_duration(3600.0);
        let plan = plan_speed(&profile, &settings);
        assert_eq!(plan.multiplier, 7);
        assert_eq!(plan.video_duration_s, 534);
    }

    #[test]
    fn fixed_mode_always_uses_default_speed() {
        let settings = AnimationSettings {
            adaptive_enabled: false,
            default_speed: 4,
            ..AnimationSettings::default()
        };
        let profile = profile_with_duration(1000.0);
        let plan = plan_speed(&profile, &settings);
        assert_eq!(plan.multiplier, 4);
        assert_eq!(plan.rationale_tag, RationaleTag::Fixed);
    }

    #[test]
    fn flags_capped_exceeds_when_max_speed_is_not_enough() {
        let settings = AnimationSettings {
            default_speed: 2,
            min_speed: 1,
            max_speed: 3,
            max_video_minutes: 1.0,
            adaptive_enabled: true,
        };
        let profile = profile_with_duration(36000.0);
        let plan = plan_speed(&profile, &settings);
        assert_eq!(plan.multiplier, 3);
        assert_eq!(plan.rationale_tag, RationaleTag::CappedExceeds);
    }
}
