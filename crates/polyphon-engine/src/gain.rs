//! Gain and pan model
//!
//! Pure geometry-to-gain functions shared by admission and the per-frame
//! refresh: the parametric attenuation curve, the four-radius distance
//! model built from it, and the listener-space pan projection.

use glam::{Vec2, Vec3};
use polyphon_core::SoundCollectionDef;

/// Directions shorter than this (squared) pan to center.
const PAN_EPSILON: f32 = 1e-4;

/// Parametric ease curve through (lower, 0) and (upper, 1).
///
/// `curve_factor` of 1 is linear; above 1 eases out (slow, then fast),
/// between 0 and 1 eases in (fast, then slow). Monotone non-decreasing
/// over the domain. Out-of-domain points clamp (and trip a debug assert,
/// since callers are expected to stay in range).
pub fn attenuation_curve(point: f32, lower_bound: f32, upper_bound: f32, curve_factor: f32) -> f32 {
    debug_assert!(lower_bound <= point && point <= upper_bound);
    debug_assert!(curve_factor > 0.0);
    let range = upper_bound - lower_bound;
    if range <= 0.0 {
        return 1.0;
    }
    let distance = (point.clamp(lower_bound, upper_bound)) - lower_bound;
    distance / ((range - distance) * (curve_factor - 1.0) + range)
}

/// Distance attenuation for a positional collection.
///
/// Silent inside `min_audible_radius` and beyond `max_audible_radius`;
/// rolls in between min and `roll_in_radius`, holds 1 through the
/// plateau, and rolls off between `roll_out_radius` and max.
pub fn distance_attenuation(distance_squared: f32, def: &SoundCollectionDef) -> f32 {
    let min_squared = def.min_audible_radius * def.min_audible_radius;
    let max_squared = def.max_audible_radius * def.max_audible_radius;
    if distance_squared < min_squared || distance_squared > max_squared {
        return 0.0;
    }
    let distance = distance_squared.sqrt();
    if distance < def.roll_in_radius {
        attenuation_curve(
            distance,
            def.min_audible_radius,
            def.roll_in_radius,
            def.roll_in_curve_factor,
        )
    } else if distance > def.roll_out_radius {
        1.0 - attenuation_curve(
            distance,
            def.roll_out_radius,
            def.max_audible_radius,
            def.roll_out_curve_factor,
        )
    } else {
        1.0
    }
}

/// Stereo pan from a listener-space direction.
///
/// Returns (right, forward) components of the normalized direction, a
/// point in the unit disc. Near-zero directions return center rather
/// than a NaN-ridden normalization.
pub fn pan_from_listener_space(direction: Vec3) -> Vec2 {
    if direction.length_squared() <= PAN_EPSILON {
        return Vec2::ZERO;
    }
    let n = direction.normalize();
    Vec2::new(n.x, n.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 0.001;

    fn positional_def() -> SoundCollectionDef {
        SoundCollectionDef {
            min_audible_radius: 1.0,
            roll_in_radius: 2.0,
            roll_out_radius: 8.0,
            max_audible_radius: 10.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_curve_endpoints() {
        for factor in [0.25, 1.0, 4.0] {
            assert!((attenuation_curve(2.0, 2.0, 10.0, factor)).abs() < EPSILON);
            assert!((attenuation_curve(10.0, 2.0, 10.0, factor) - 1.0).abs() < EPSILON);
        }
    }

    #[test]
    fn test_curve_linear() {
        // Factor 1 reduces to (p - lo) / (hi - lo).
        assert!((attenuation_curve(5.0, 0.0, 10.0, 1.0) - 0.5).abs() < EPSILON);
        assert!((attenuation_curve(2.5, 0.0, 10.0, 1.0) - 0.25).abs() < EPSILON);
    }

    #[test]
    fn test_curve_ease_out_stays_below_linear() {
        // Ease-out (factor > 1) trails the linear curve mid-domain.
        let eased = attenuation_curve(5.0, 0.0, 10.0, 3.0);
        assert!(eased < 0.5);
        assert!(eased > 0.0);
    }

    #[test]
    fn test_curve_ease_in_stays_above_linear() {
        let eased = attenuation_curve(5.0, 0.0, 10.0, 0.25);
        assert!(eased > 0.5);
        assert!(eased < 1.0);
    }

    #[test]
    fn test_curve_is_monotone() {
        for factor in [0.1, 0.5, 1.0, 2.0, 10.0] {
            let mut previous = 0.0;
            for step in 0..=20 {
                let p = step as f32 * 0.5;
                let value = attenuation_curve(p, 0.0, 10.0, factor);
                assert!(
                    value + EPSILON >= previous,
                    "curve decreased at p={p} factor={factor}"
                );
                previous = value;
            }
        }
    }

    #[test]
    fn test_attenuation_silent_outside_audible_band() {
        let def = positional_def();
        // Too close.
        assert_eq!(distance_attenuation(0.25, &def), 0.0);
        // Too far.
        assert_eq!(distance_attenuation(11.0 * 11.0, &def), 0.0);
    }

    #[test]
    fn test_attenuation_full_gain_on_plateau() {
        let def = positional_def();
        for distance in [2.0_f32, 5.0, 8.0] {
            let gain = distance_attenuation(distance * distance, &def);
            assert!((gain - 1.0).abs() < EPSILON, "distance {distance}");
        }
    }

    #[test]
    fn test_attenuation_rolls_in_and_out() {
        let def = positional_def();
        // Midway through the roll-in band, linear factor: halfway up.
        let rolling_in = distance_attenuation(1.5 * 1.5, &def);
        assert!((rolling_in - 0.5).abs() < EPSILON);
        // Midway through the roll-out band: halfway down.
        let rolling_out = distance_attenuation(9.0 * 9.0, &def);
        assert!((rolling_out - 0.5).abs() < EPSILON);
    }

    #[test]
    fn test_pan_identities() {
        // Right of the listener.
        let right = pan_from_listener_space(Vec3::new(1.0, 0.0, 0.0));
        assert!(right.x > 0.0);
        assert!(right.y.abs() < EPSILON);
        // Straight ahead.
        let ahead = pan_from_listener_space(Vec3::new(0.0, 0.0, 1.0));
        assert!(ahead.x.abs() < EPSILON);
        assert!((ahead.y - 1.0).abs() < EPSILON);
        // Left.
        let left = pan_from_listener_space(Vec3::new(-1.0, 0.0, 0.0));
        assert!(left.x < 0.0);
    }

    #[test]
    fn test_pan_zero_vector_is_centered() {
        assert_eq!(pan_from_listener_space(Vec3::ZERO), Vec2::ZERO);
    }

    #[test]
    fn test_pan_lies_in_unit_disc() {
        let pan = pan_from_listener_space(Vec3::new(3.0, 4.0, 5.0));
        assert!(pan.length() <= 1.0 + EPSILON);
    }
}
