//! Energy estimation
//!
//! Two independent primitives:
//! - an intensity-tier MET model for the calories of a session
//! - a Harris-Benedict basal metabolic rate from body metrics
//!
//! The pipeline reports both but never mixes them.

use crate::types::{Biometrics, Gender, IntensityTier};

/// Fraction of max heart rate at or below which a session counts as low intensity
pub const MODERATE_FRACTION: f64 = 0.65;
/// Fraction of max heart rate above which a session counts as high intensity
pub const HIGH_FRACTION: f64 = 0.85;

/// Age-predicted maximum heart rate (220 - age)
pub fn max_heart_rate(age: u32) -> f64 {
    220.0 - age as f64
}

/// Heart-rate thresholds `(moderate, high)` for an age
pub fn intensity_thresholds(age: u32) -> (f64, f64) {
    let max_hr = max_heart_rate(age);
    (max_hr * MODERATE_FRACTION, max_hr * HIGH_FRACTION)
}

/// Classify a session by its average heart rate.
///
/// Without heart rate data the session is treated as moderate.
pub fn classify_intensity(avg_heart_rate: Option<f64>, age: u32) -> IntensityTier {
    let Some(hr) = avg_heart_rate else {
        return IntensityTier::Moderate;
    };
    let (moderate, high) = intensity_thresholds(age);

    if hr <= moderate {
        IntensityTier::Low
    } else if hr <= high {
        IntensityTier::Moderate
    } else {
        IntensityTier::High
    }
}

/// Calories (kcal) for a session: MET x weight x hours
pub fn estimate_total_calories(tier: IntensityTier, weight_kg: f64, duration_minutes: f64) -> f64 {
    tier.met() * weight_kg * (duration_minutes / 60.0)
}

/// Basal metabolic rate (kcal/day), original Harris-Benedict equations.
///
/// Anything other than male uses the female equation.
pub fn calculate_bmr(gender: Gender, weight_kg: f64, height_cm: f64, age: u32) -> f64 {
    let age = age as f64;
    match gender {
        Gender::Male => 66.5 + 13.75 * weight_kg + 5.003 * height_cm - 6.755 * age,
        Gender::Female | Gender::Other => {
            655.1 + 9.563 * weight_kg + 1.850 * height_cm - 4.676 * age
        }
    }
}

/// BMR for a set of biometrics
pub fn bmr_for(biometrics: &Biometrics) -> f64 {
    calculate_bmr(
        biometrics.gender,
        biometrics.weight_kg,
        biometrics.height_cm,
        biometrics.age,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_for_age_30() {
        let (moderate, high) = intensity_thresholds(30);
        assert_eq!(max_heart_rate(30), 190.0);
        assert!((moderate - 123.5).abs() < 1e-9);
        assert!((high - 161.5).abs() < 1e-9);
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(classify_intensity(Some(120.0), 30), IntensityTier::Low);
        assert_eq!(classify_intensity(Some(140.0), 30), IntensityTier::Moderate);
        assert_eq!(classify_intensity(Some(170.0), 30), IntensityTier::High);
        assert_eq!(classify_intensity(None, 30), IntensityTier::Moderate);

        // boundaries are inclusive on the lower tier
        let (moderate, high) = intensity_thresholds(30);
        assert_eq!(classify_intensity(Some(moderate), 30), IntensityTier::Low);
        assert_eq!(classify_intensity(Some(high), 30), IntensityTier::Moderate);
    }

    #[test]
    fn test_calories_moderate_half_hour() {
        let kcal = estimate_total_calories(IntensityTier::Moderate, 70.0, 30.0);
        assert!((kcal - 210.0).abs() < 1e-9);

        let kcal = estimate_total_calories(IntensityTier::Low, 70.0, 60.0);
        assert!((kcal - 245.0).abs() < 1e-9);
    }

    #[test]
    fn test_bmr_by_gender() {
        let male = calculate_bmr(Gender::Male, 80.0, 180.0, 30);
        // 66.5 + 1100 + 900.54 - 202.65
        assert!((male - 1864.39).abs() < 1e-6);

        let female = calculate_bmr(Gender::Female, 60.0, 165.0, 30);
        // 655.1 + 573.78 + 305.25 - 140.28
        assert!((female - 1393.85).abs() < 1e-6);

        assert_eq!(
            calculate_bmr(Gender::Other, 60.0, 165.0, 30),
            calculate_bmr(Gender::Female, 60.0, 165.0, 30)
        );
    }
}
