//! Natural-language session summary
//!
//! Builds the prompt handed to a recommendation service. Metrics appear in a
//! fixed order and absent ones are left out entirely.

use serde::{Deserialize, Serialize};

use crate::types::{Biometrics, Gender, SessionStats};

/// Closing request appended to every summary
pub const SUGGESTION_REQUEST: &str =
    "Based on this performance and training history, suggest the next workout.";

/// Athlete profile and training preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingProfile {
    pub biometrics: Biometrics,
    /// e.g. "beginner", "intermediate"
    pub fitness_level: Option<String>,
    /// e.g. "lose weight", "build endurance"
    pub fitness_goal: Option<String>,
    /// e.g. "endurance", "strength"
    pub target_focus: Option<String>,
    /// e.g. "outdoor", "short and intense"
    pub workout_preference: Option<String>,
    /// Training days per week
    pub weekly_availability: Option<u32>,
    /// Minutes per session
    pub time_per_session: Option<u32>,
    /// Injury or limitation to respect
    pub injury: Option<String>,
}

impl TrainingProfile {
    /// Profile with biometrics only
    pub fn new(biometrics: Biometrics) -> Self {
        Self {
            biometrics,
            fitness_level: None,
            fitness_goal: None,
            target_focus: None,
            workout_preference: None,
            weekly_availability: None,
            time_per_session: None,
            injury: None,
        }
    }
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

/// Format session statistics and the athlete profile for an AI model
pub fn format_stats_for_ai(stats: &SessionStats, profile: &TrainingProfile) -> String {
    let mut summary = String::new();

    if let Some(level) = present(&profile.fitness_level) {
        summary.push_str(&format!("User profile: {} level. ", level));
    }
    if let Some(goal) = present(&profile.fitness_goal) {
        summary.push_str(&format!("Your goal is to {}. ", goal));
    }
    if let Some(focus) = present(&profile.target_focus) {
        summary.push_str(&format!("Focus area: {}. ", focus));
    }
    if let Some(pref) = present(&profile.workout_preference) {
        summary.push_str(&format!("Prefers {} workouts. ", pref));
    }
    match (profile.weekly_availability, profile.time_per_session) {
        (Some(days), Some(minutes)) => {
            summary.push_str(&format!(
                "Available {} days/week for {} minutes per session. ",
                days, minutes
            ));
        }
        (Some(days), None) => {
            summary.push_str(&format!("Available {} days/week. ", days));
        }
        (None, Some(minutes)) => {
            summary.push_str(&format!("Sessions last up to {} minutes. ", minutes));
        }
        (None, None) => {}
    }

    if let Some(kind) = present(&stats.workout_type) {
        summary.push_str(&format!("This was a {} workout. ", kind));
    }

    let bio = &profile.biometrics;
    match bio.gender {
        Gender::Male | Gender::Female => {
            summary.push_str(&format!(
                "You are a {} and you are {} years old. ",
                bio.gender, bio.age
            ));
        }
        Gender::Other => {
            summary.push_str(&format!("You are {} years old. ", bio.age));
        }
    }
    summary.push_str(&format!(
        "You weigh {} kg and are {} cm tall. ",
        bio.weight_kg, bio.height_cm
    ));

    summary.push_str(&format!(
        "In the last workout, you covered {:.2} km in {:.1} minutes. ",
        stats.total_distance / 1000.0,
        stats.workout_duration
    ));
    if let Some(hr) = stats.avg_heart_rate {
        summary.push_str(&format!("Your average heart rate was {:.0} bpm. ", hr));
    }
    if let Some(cadence) = stats.avg_cadence {
        summary.push_str(&format!("Your average cadence was {:.0} steps/min. ", cadence));
    }
    if let Some(power) = stats.avg_power {
        summary.push_str(&format!("Your average power output was {:.0} watts. ", power));
    }
    summary.push_str(&format!("You burned around {:.0} kcal. ", stats.total_calories));
    if let Some(elevation) = stats.avg_elevation {
        summary.push_str(&format!(
            "You worked out at an average elevation of {:.0} m. ",
            elevation
        ));
    }
    if let Some(gain) = stats.elevation_gain {
        summary.push_str(&format!(
            "During your workout, your elevation gain was {:.2} m. ",
            gain
        ));
    }

    if let Some(injury) = profile
        .injury
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        summary.push_str(&format!(
            "Note: the user has the following injury or limitation: {}. ",
            injury
        ));
    }

    summary.push_str(SUGGESTION_REQUEST);
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Gender;

    fn stats() -> SessionStats {
        SessionStats {
            total_distance: 5230.0,
            workout_duration: 31.5,
            avg_heart_rate: Some(151.4),
            avg_cadence: Some(168.2),
            avg_power: Some(245.6),
            avg_elevation: Some(42.3),
            elevation_gain: Some(18.25),
            total_calories: 220.49,
            workout_type: Some("Running".to_string()),
        }
    }

    fn profile() -> TrainingProfile {
        TrainingProfile {
            fitness_level: Some("Intermediate".to_string()),
            fitness_goal: Some("Build Endurance".to_string()),
            weekly_availability: Some(4),
            time_per_session: Some(45),
            ..TrainingProfile::new(Biometrics {
                gender: Gender::Female,
                weight_kg: 62.0,
                height_cm: 168.0,
                age: 34,
            })
        }
    }

    #[test]
    fn test_full_summary_order() {
        let summary = format_stats_for_ai(&stats(), &profile());

        let order = [
            "User profile: intermediate level.",
            "Your goal is to build endurance.",
            "Available 4 days/week for 45 minutes per session.",
            "This was a running workout.",
            "You are a female and you are 34 years old.",
            "covered 5.23 km in 31.5 minutes",
            "heart rate was 151 bpm",
            "cadence was 168 steps/min",
            "power output was 246 watts",
            "burned around 220 kcal",
            "average elevation of 42 m",
            "elevation gain was 18.25 m",
            SUGGESTION_REQUEST,
        ];
        let mut last = 0;
        for fragment in order {
            let pos = summary
                .find(fragment)
                .unwrap_or_else(|| panic!("missing '{fragment}' in: {summary}"));
            assert!(pos >= last, "'{fragment}' out of order");
            last = pos;
        }
        assert!(summary.ends_with(SUGGESTION_REQUEST));
    }

    #[test]
    fn test_absent_metrics_are_omitted() {
        let mut s = stats();
        s.avg_heart_rate = None;
        s.avg_cadence = None;
        s.avg_power = None;
        s.avg_elevation = None;
        s.elevation_gain = None;
        s.workout_type = None;

        let summary = format_stats_for_ai(&s, &TrainingProfile::new(profile().biometrics));
        assert!(!summary.contains("heart rate"));
        assert!(!summary.contains("cadence"));
        assert!(!summary.contains("power"));
        assert!(!summary.contains("elevation"));
        assert!(!summary.contains("N/A"));
        assert!(!summary.contains("User profile"));
        assert!(!summary.contains("This was a"));
        assert!(summary.contains("burned around 220 kcal"));
    }

    #[test]
    fn test_injury_note_and_other_gender() {
        let mut p = profile();
        p.injury = Some("sore left knee".to_string());
        p.biometrics.gender = Gender::Other;

        let summary = format_stats_for_ai(&stats(), &p);
        assert!(summary.contains("injury or limitation: sore left knee."));
        assert!(summary.contains("You are 34 years old."));
        assert!(!summary.contains("You are a other"));
    }
}
