//! Core types for the workout-flux pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: normalized point records, the normalization report, biometric
//! inputs, and the aggregate session statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ComputeError;

/// Semantic field a source column can be reconciled to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Timestamp,
    Date,
    Iso8601,
    HeartRate,
    Power,
    Cadence,
    Latitude,
    Longitude,
    Elevation,
    Distance,
    Lap,
    SinceStart,
}

impl Field {
    /// All fields, in the order columns are reported
    pub const ALL: [Field; 12] = [
        Field::Timestamp,
        Field::Date,
        Field::Iso8601,
        Field::HeartRate,
        Field::Power,
        Field::Cadence,
        Field::Latitude,
        Field::Longitude,
        Field::Elevation,
        Field::Distance,
        Field::Lap,
        Field::SinceStart,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Timestamp => "timestamp",
            Field::Date => "date",
            Field::Iso8601 => "iso8601",
            Field::HeartRate => "heart_rate",
            Field::Power => "power",
            Field::Cadence => "cadence",
            Field::Latitude => "latitude",
            Field::Longitude => "longitude",
            Field::Elevation => "elevation",
            Field::Distance => "distance",
            Field::Lap => "lap",
            Field::SinceStart => "since_start",
        }
    }

    /// Whether the field carries raw text rather than a number
    pub fn is_textual(&self) -> bool {
        matches!(self, Field::Timestamp | Field::Date | Field::Iso8601)
    }

    /// Whether values of this field are commonly exported with a decimal comma
    pub fn accepts_decimal_comma(&self) -> bool {
        matches!(
            self,
            Field::Latitude | Field::Longitude | Field::Elevation | Field::Distance
        )
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One sampled instant in a workout.
///
/// Absent or non-numeric source values are `None`; nothing is ever filled in
/// with zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    /// Raw timestamp text (wall-clock time, date-time, or epoch)
    pub timestamp: Option<String>,
    /// Raw date or date-time text
    pub date: Option<String>,
    /// Raw ISO-8601 date-time text
    pub iso8601: Option<String>,
    /// Heart rate (bpm)
    pub heart_rate: Option<f64>,
    /// Power (watts)
    pub power: Option<f64>,
    /// Cadence (rpm or steps/min)
    pub cadence: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Elevation (meters)
    pub elevation: Option<f64>,
    /// Cumulative distance (meters)
    pub distance: Option<f64>,
    pub lap: Option<f64>,
    /// Elapsed time since session start, in the export's own unit
    pub since_start: Option<f64>,
}

impl PointRecord {
    /// Numeric value for a field, `None` for textual fields
    pub fn numeric(&self, field: Field) -> Option<f64> {
        match field {
            Field::HeartRate => self.heart_rate,
            Field::Power => self.power,
            Field::Cadence => self.cadence,
            Field::Latitude => self.latitude,
            Field::Longitude => self.longitude,
            Field::Elevation => self.elevation,
            Field::Distance => self.distance,
            Field::Lap => self.lap,
            Field::SinceStart => self.since_start,
            Field::Timestamp | Field::Date | Field::Iso8601 => None,
        }
    }

    pub(crate) fn set_numeric(&mut self, field: Field, value: Option<f64>) {
        match field {
            Field::HeartRate => self.heart_rate = value,
            Field::Power => self.power = value,
            Field::Cadence => self.cadence = value,
            Field::Latitude => self.latitude = value,
            Field::Longitude => self.longitude = value,
            Field::Elevation => self.elevation = value,
            Field::Distance => self.distance = value,
            Field::Lap => self.lap = value,
            Field::SinceStart => self.since_start = value,
            Field::Timestamp | Field::Date | Field::Iso8601 => {}
        }
    }

    pub(crate) fn set_text(&mut self, field: Field, value: Option<String>) {
        match field {
            Field::Timestamp => self.timestamp = value,
            Field::Date => self.date = value,
            Field::Iso8601 => self.iso8601 = value,
            _ => {}
        }
    }
}

/// A row skipped during normalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRow {
    /// 1-based line number in the source file
    pub line: u64,
    pub reason: String,
}

/// Diagnostics for one normalization pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizeReport {
    /// Delimiter used to split fields
    pub delimiter: char,
    /// Data rows encountered (excluding the header)
    pub rows_read: usize,
    /// Rows turned into point records
    pub rows_kept: usize,
    /// Rows dropped for structural problems
    pub skipped_rows: Vec<SkippedRow>,
    /// Candidate source columns per field, in priority order
    pub columns: BTreeMap<Field, Vec<String>>,
    /// Number of values per field that came from a non-primary column
    pub fallback_counts: BTreeMap<Field, usize>,
}

impl NormalizeReport {
    /// Total number of values resolved through a fallback column
    pub fn total_fallbacks(&self) -> usize {
        self.fallback_counts.values().sum()
    }
}

/// Biological sex used by the BMR formula
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // numeric codes: 0 male, 1 female
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" | "man" | "0" => Ok(Gender::Male),
            "female" | "f" | "woman" | "1" => Ok(Gender::Female),
            "other" | "x" | "diverse" => Ok(Gender::Other),
            other => Err(ComputeError::InvalidBiometrics(format!(
                "unknown gender '{}'",
                other
            ))),
        }
    }
}

/// User biometric inputs for calorie and BMR estimation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Biometrics {
    pub gender: Gender,
    pub weight_kg: f64,
    pub height_cm: f64,
    /// Age in years
    pub age: u32,
}

impl Biometrics {
    /// Reject inputs that would make the estimates meaningless
    pub fn validate(&self) -> Result<(), ComputeError> {
        if !(self.weight_kg.is_finite() && self.weight_kg > 0.0) {
            return Err(ComputeError::InvalidBiometrics(format!(
                "weight must be positive, got {}",
                self.weight_kg
            )));
        }
        if !(self.height_cm.is_finite() && self.height_cm > 0.0) {
            return Err(ComputeError::InvalidBiometrics(format!(
                "height must be positive, got {}",
                self.height_cm
            )));
        }
        // max HR is 220 - age and has to stay positive
        if self.age == 0 || self.age >= 220 {
            return Err(ComputeError::InvalidBiometrics(format!(
                "age must be between 1 and 219, got {}",
                self.age
            )));
        }
        Ok(())
    }
}

/// Coarse workout intensity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntensityTier {
    Low,
    Moderate,
    High,
}

impl IntensityTier {
    /// MET value for the tier
    pub fn met(&self) -> f64 {
        match self {
            // walking or light cycling
            IntensityTier::Low => 3.5,
            // jogging, steady cycling
            IntensityTier::Moderate => 6.0,
            // running, intense cardio
            IntensityTier::High => 8.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IntensityTier::Low => "low",
            IntensityTier::Moderate => "moderate",
            IntensityTier::High => "high",
        }
    }
}

/// Aggregate statistics for one workout file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Maximum cumulative distance (meters), 0.0 without a distance column
    pub total_distance: f64,
    /// Elapsed time between first and last instants (minutes)
    pub workout_duration: f64,
    pub avg_heart_rate: Option<f64>,
    pub avg_cadence: Option<f64>,
    pub avg_power: Option<f64>,
    pub avg_elevation: Option<f64>,
    /// max(elevation) - min(elevation) (meters)
    pub elevation_gain: Option<f64>,
    /// MET-based estimate (kcal), unrounded
    pub total_calories: f64,
    pub workout_type: Option<String>,
}

/// Everything one pipeline run produces for a file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionAnalysis {
    pub stats: SessionStats,
    /// Instant of the first timed record
    pub started_at: DateTime<Utc>,
    /// Tier the calorie estimate was based on
    pub intensity: IntensityTier,
    /// Harris-Benedict basal metabolic rate (kcal/day), never part of total_calories
    pub bmr_kcal_per_day: f64,
    pub report: NormalizeReport,
}
