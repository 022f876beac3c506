//! Statistics derivation
//!
//! This module reduces a normalized point sequence to one [`SessionStats`]:
//! - Distance as the maximum of the cumulative column
//! - Duration from the first and last resolvable instants
//! - Means over present samples only
//! - Elevation gain and the MET-tier calorie estimate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::energy::{classify_intensity, estimate_total_calories};
use crate::error::ComputeError;
use crate::timestamp::resolve_instant;
use crate::types::{Biometrics, IntensityTier, PointRecord, SessionStats};

/// How the deriver treats records whose instants are not chronological
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderPolicy {
    /// Use input order; fail if the last instant precedes the first
    #[default]
    Reject,
    /// Use the earliest and latest instants regardless of row order
    Sort,
}

/// Session statistics plus the context they were computed with
#[derive(Debug, Clone, PartialEq)]
pub struct Derivation {
    pub stats: SessionStats,
    /// Instant the session started at
    pub started_at: DateTime<Utc>,
    /// Tier the calorie estimate used
    pub intensity: IntensityTier,
}

/// Deriver for computing session statistics from point records
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsDeriver {
    order: OrderPolicy,
}

impl StatsDeriver {
    pub fn new(order: OrderPolicy) -> Self {
        Self { order }
    }

    /// Derive session statistics
    pub fn derive(
        &self,
        points: &[PointRecord],
        biometrics: &Biometrics,
    ) -> Result<SessionStats, ComputeError> {
        self.derive_with_context(points, biometrics).map(|d| d.stats)
    }

    /// Derive session statistics and keep the start instant and intensity tier
    pub fn derive_with_context(
        &self,
        points: &[PointRecord],
        biometrics: &Biometrics,
    ) -> Result<Derivation, ComputeError> {
        if points.is_empty() {
            return Err(ComputeError::EmptyInput);
        }
        biometrics.validate()?;

        let total_distance = max_of(points.iter().map(|p| p.distance)).unwrap_or(0.0);
        let (started_at, workout_duration) = self.compute_duration(points)?;

        let avg_heart_rate = mean_of(points.iter().map(|p| p.heart_rate));
        let avg_cadence = mean_of(points.iter().map(|p| p.cadence));
        let avg_power = mean_of(points.iter().map(|p| p.power));
        let avg_elevation = mean_of(points.iter().map(|p| p.elevation));
        let elevation_gain = compute_elevation_gain(points);

        let intensity = classify_intensity(avg_heart_rate, biometrics.age);
        let total_calories =
            estimate_total_calories(intensity, biometrics.weight_kg, workout_duration);

        debug!(
            points = points.len(),
            duration_min = workout_duration,
            intensity = intensity.as_str(),
            "derived session statistics"
        );

        Ok(Derivation {
            stats: SessionStats {
                total_distance,
                workout_duration,
                avg_heart_rate,
                avg_cadence,
                avg_power,
                avg_elevation,
                elevation_gain,
                total_calories,
                workout_type: None,
            },
            started_at,
            intensity,
        })
    }

    /// Start instant and elapsed minutes
    fn compute_duration(
        &self,
        points: &[PointRecord],
    ) -> Result<(DateTime<Utc>, f64), ComputeError> {
        let timed: Vec<(usize, DateTime<Utc>)> = points
            .iter()
            .enumerate()
            .filter_map(|(idx, p)| resolve_instant(p).map(|t| (idx, t)))
            .collect();

        let (Some(&(first_idx, first)), Some(&(last_idx, last))) = (timed.first(), timed.last())
        else {
            return Err(ComputeError::UnparseableTimestamp(format!(
                "{} records, none with a usable date, timestamp or ISO8601 value",
                points.len()
            )));
        };

        let (start, end) = match self.order {
            OrderPolicy::Reject => {
                if last < first {
                    return Err(ComputeError::OutOfOrderTimestamps {
                        first_row: first_idx + 1,
                        last_row: last_idx + 1,
                    });
                }
                (first, last)
            }
            OrderPolicy::Sort => {
                let start = timed.iter().map(|(_, t)| *t).min().unwrap_or(first);
                let end = timed.iter().map(|(_, t)| *t).max().unwrap_or(last);
                (start, end)
            }
        };

        let minutes = (end - start).num_milliseconds() as f64 / 60_000.0;
        Ok((start, minutes))
    }
}

/// Arithmetic mean over present values
fn mean_of(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let mut sum = 0.0;
    let mut cnt = 0usize;
    for v in values.flatten() {
        sum += v;
        cnt += 1;
    }
    if cnt == 0 {
        None
    } else {
        Some(sum / cnt as f64)
    }
}

fn max_of(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    values.flatten().reduce(f64::max)
}

fn min_of(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    values.flatten().reduce(f64::min)
}

/// Elevation range over the session
fn compute_elevation_gain(points: &[PointRecord]) -> Option<f64> {
    let max = max_of(points.iter().map(|p| p.elevation))?;
    let min = min_of(points.iter().map(|p| p.elevation))?;
    Some(max - min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Gender;
    use pretty_assertions::assert_eq;

    fn biometrics() -> Biometrics {
        Biometrics {
            gender: Gender::Male,
            weight_kg: 70.0,
            height_cm: 178.0,
            age: 30,
        }
    }

    fn point_at(minute: u32) -> PointRecord {
        PointRecord {
            date: Some(format!("2024-05-01 07:{:02}:00", minute)),
            ..Default::default()
        }
    }

    fn session(minutes: &[u32]) -> Vec<PointRecord> {
        minutes.iter().map(|m| point_at(*m)).collect()
    }

    #[test]
    fn test_empty_input_fails() {
        let result = StatsDeriver::default().derive(&[], &biometrics());
        assert!(matches!(result, Err(ComputeError::EmptyInput)));
    }

    #[test]
    fn test_distance_is_max_not_sum() {
        let mut points = session(&[0, 1, 2, 3, 4]);
        for (p, d) in points.iter_mut().zip([0.0, 500.0, 1200.0, 1200.0, 3000.0]) {
            p.distance = Some(d);
        }
        let stats = StatsDeriver::default().derive(&points, &biometrics()).unwrap();
        assert_eq!(stats.total_distance, 3000.0);
    }

    #[test]
    fn test_distance_tolerates_regressions_and_absence() {
        let mut points = session(&[0, 1, 2]);
        points[0].distance = Some(100.0);
        points[1].distance = Some(2500.0);
        points[2].distance = Some(2400.0);
        let stats = StatsDeriver::default().derive(&points, &biometrics()).unwrap();
        assert_eq!(stats.total_distance, 2500.0);

        let stats = StatsDeriver::default()
            .derive(&session(&[0, 1]), &biometrics())
            .unwrap();
        assert_eq!(stats.total_distance, 0.0);
    }

    #[test]
    fn test_mean_over_sparse_data() {
        let mut points = session(&[0, 1, 2]);
        points[0].heart_rate = Some(100.0);
        points[2].heart_rate = Some(140.0);

        let stats = StatsDeriver::default().derive(&points, &biometrics()).unwrap();
        assert_eq!(stats.avg_heart_rate, Some(120.0));
        assert_eq!(stats.avg_cadence, None);
        assert_eq!(stats.avg_power, None);
    }

    #[test]
    fn test_elevation_gain() {
        let mut points = session(&[0, 1, 2, 3]);
        for (p, e) in points.iter_mut().zip([100.0, 150.0, 90.0, 200.0]) {
            p.elevation = Some(e);
        }
        let stats = StatsDeriver::default().derive(&points, &biometrics()).unwrap();
        assert_eq!(stats.elevation_gain, Some(110.0));
        assert_eq!(stats.avg_elevation, Some(135.0));

        let stats = StatsDeriver::default()
            .derive(&session(&[0, 1]), &biometrics())
            .unwrap();
        assert_eq!(stats.elevation_gain, None);
        assert_eq!(stats.avg_elevation, None);
    }

    #[test]
    fn test_duration_and_calories() {
        let mut points = session(&[0, 10, 30]);
        for p in points.iter_mut() {
            p.heart_rate = Some(140.0);
        }

        let derivation = StatsDeriver::default()
            .derive_with_context(&points, &biometrics())
            .unwrap();
        assert_eq!(derivation.stats.workout_duration, 30.0);
        assert_eq!(derivation.intensity, IntensityTier::Moderate);
        assert!((derivation.stats.total_calories - 210.0).abs() < 1e-9);
        assert_eq!(derivation.started_at, resolve_instant(&points[0]).unwrap());
    }

    #[test]
    fn test_calories_follow_tier() {
        let mut points = session(&[0, 30]);
        points[0].heart_rate = Some(170.0);
        points[1].heart_rate = Some(170.0);
        let stats = StatsDeriver::default().derive(&points, &biometrics()).unwrap();
        assert!((stats.total_calories - 8.0 * 70.0 * 0.5).abs() < 1e-9);

        points[0].heart_rate = Some(120.0);
        points[1].heart_rate = Some(120.0);
        let stats = StatsDeriver::default().derive(&points, &biometrics()).unwrap();
        assert!((stats.total_calories - 3.5 * 70.0 * 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_duration_skips_untimed_edges() {
        let mut points = session(&[5, 20]);
        points.insert(0, PointRecord::default());
        points.push(PointRecord {
            date: Some("garbage".to_string()),
            ..Default::default()
        });

        let stats = StatsDeriver::default().derive(&points, &biometrics()).unwrap();
        assert_eq!(stats.workout_duration, 15.0);
    }

    #[test]
    fn test_unparseable_timestamps_fail() {
        let points = vec![
            PointRecord {
                heart_rate: Some(130.0),
                ..Default::default()
            },
            PointRecord {
                date: Some("not a date".to_string()),
                ..Default::default()
            },
        ];
        let result = StatsDeriver::default().derive(&points, &biometrics());
        assert!(matches!(result, Err(ComputeError::UnparseableTimestamp(_))));
    }

    #[test]
    fn test_out_of_order_policy() {
        let points = session(&[30, 10, 0]);

        let result = StatsDeriver::new(OrderPolicy::Reject).derive(&points, &biometrics());
        assert!(matches!(
            result,
            Err(ComputeError::OutOfOrderTimestamps {
                first_row: 1,
                last_row: 3
            })
        ));

        let stats = StatsDeriver::new(OrderPolicy::Sort)
            .derive(&points, &biometrics())
            .unwrap();
        assert_eq!(stats.workout_duration, 30.0);
    }

    #[test]
    fn test_sample_counter_is_not_a_clock() {
        let points: Vec<PointRecord> = [("1", 120.0), ("1800", 140.0)]
            .into_iter()
            .map(|(counter, hr)| PointRecord {
                date: Some("2024-05-01".to_string()),
                timestamp: Some(counter.to_string()),
                heart_rate: Some(hr),
                ..Default::default()
            })
            .collect();

        let derivation = StatsDeriver::default()
            .derive_with_context(&points, &biometrics())
            .unwrap();
        assert_eq!(derivation.stats.workout_duration, 0.0);
        assert_eq!(derivation.stats.total_calories, 0.0);
        assert_eq!(
            derivation.started_at.format("%Y-%m-%d %H:%M").to_string(),
            "2024-05-01 00:00"
        );
    }

    #[test]
    fn test_duplicate_timestamps_are_tolerated() {
        let points = session(&[0, 0, 5, 5]);
        let stats = StatsDeriver::default().derive(&points, &biometrics()).unwrap();
        assert_eq!(stats.workout_duration, 5.0);
    }

    #[test]
    fn test_invalid_biometrics_fail() {
        let mut bio = biometrics();
        bio.weight_kg = -1.0;
        let result = StatsDeriver::default().derive(&session(&[0, 1]), &bio);
        assert!(matches!(result, Err(ComputeError::InvalidBiometrics(_))));
    }
}
