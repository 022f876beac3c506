//! Pipeline orchestration
//!
//! This module provides the public API for workout-flux.
//! It runs one export through normalization and derivation, and wires the
//! results to the workout log and the recommendation backend.

use chrono::{Local, NaiveDate};
use std::path::Path;
use tracing::{debug, info};

use crate::config::FluxConfig;
use crate::deriver::StatsDeriver;
use crate::energy::bmr_for;
use crate::error::ComputeError;
use crate::normalizer::{NormalizedExport, RecordNormalizer};
use crate::recommend::Recommender;
use crate::store::{SqliteStore, WorkoutLogEntry, WorkoutStore};
use crate::summary::{format_stats_for_ai, TrainingProfile};
use crate::types::{Biometrics, SessionAnalysis};

/// File-name words per workout type, matched as whole tokens
const WORKOUT_KEYWORDS: &[(&str, &[&str])] = &[
    ("Running", &["run", "runs", "running", "jog", "jogs", "jogging", "trailrun"]),
    (
        "Cycling",
        &["ride", "rides", "riding", "bike", "bikes", "biking", "cycle", "cycling", "mtb"],
    ),
    ("Swimming", &["swim", "swims", "swimming"]),
    ("Walking", &["walk", "walks", "walking"]),
    ("Hiking", &["hike", "hikes", "hiking"]),
    ("Rowing", &["row", "rows", "rowing", "erg"]),
];

/// Analyze a workout export with default settings.
///
/// # Arguments
/// * `path` - Delimited export file
/// * `biometrics` - Athlete biometrics used for calories and BMR
///
/// # Example
/// ```ignore
/// let analysis = analyze_file(Path::new("morning_run.csv"), &biometrics)?;
/// println!("{:.1} min", analysis.stats.workout_duration);
/// ```
pub fn analyze_file(path: &Path, biometrics: &Biometrics) -> Result<SessionAnalysis, ComputeError> {
    let export = RecordNormalizer::new().normalize_path(path)?;
    let workout_type = file_name_of(path).and_then(infer_workout_type);
    analyze_export(&StatsDeriver::default(), export, biometrics, workout_type)
}

/// Guess the workout type from an export's file name
pub fn infer_workout_type(file_name: &str) -> Option<&'static str> {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name)
        .to_lowercase();

    stem.split(|c: char| !c.is_ascii_alphabetic())
        .filter(|token| !token.is_empty())
        .find_map(|token| {
            WORKOUT_KEYWORDS
                .iter()
                .find(|(_, keys)| keys.iter().any(|k| *k == token))
                .map(|(kind, _)| *kind)
        })
}

fn file_name_of(path: &Path) -> Option<&str> {
    path.file_name().and_then(|s| s.to_str())
}

/// Derive statistics for a normalized export.
///
/// Stages after normalization:
/// 1. StatsDeriver - Aggregate metrics, duration and calories
/// 2. BMR - Reported next to the stats, never added to calories
fn analyze_export(
    deriver: &StatsDeriver,
    export: NormalizedExport,
    biometrics: &Biometrics,
    workout_type: Option<&str>,
) -> Result<SessionAnalysis, ComputeError> {
    let NormalizedExport { points, report } = export;

    let derivation = deriver.derive_with_context(&points, biometrics)?;
    let mut stats = derivation.stats;
    stats.workout_type = workout_type.map(str::to_string);

    info!(
        rows = report.rows_kept,
        skipped = report.skipped_rows.len(),
        fallbacks = report.total_fallbacks(),
        "analyzed workout export"
    );

    Ok(SessionAnalysis {
        stats,
        started_at: derivation.started_at,
        intensity: derivation.intensity,
        bmr_kcal_per_day: bmr_for(biometrics),
        report,
    })
}

/// Stateful processor bound to a workout log.
///
/// Use this when results should be persisted or turned into recommendations.
pub struct SessionProcessor {
    normalizer: RecordNormalizer,
    deriver: StatsDeriver,
    store: Box<dyn WorkoutStore>,
}

impl SessionProcessor {
    /// Create a processor with default parsing over the given store
    pub fn new(store: Box<dyn WorkoutStore>) -> Self {
        Self::with_parts(RecordNormalizer::new(), StatsDeriver::default(), store)
    }

    pub fn with_parts(
        normalizer: RecordNormalizer,
        deriver: StatsDeriver,
        store: Box<dyn WorkoutStore>,
    ) -> Self {
        Self {
            normalizer,
            deriver,
            store,
        }
    }

    /// Create a processor from configuration, logging to the configured database
    pub fn from_config(config: &FluxConfig) -> Result<Self, ComputeError> {
        let normalizer = config.parsing.normalizer()?;
        let deriver = StatsDeriver::new(config.parsing.order_policy);
        let log_path = config.log_path()?;
        debug!(path = %log_path.display(), "using workout log");
        Ok(Self::with_parts(
            normalizer,
            deriver,
            Box::new(SqliteStore::open(log_path)?),
        ))
    }

    /// Normalize an export without deriving statistics
    pub fn normalize(&self, path: &Path) -> Result<NormalizedExport, ComputeError> {
        self.normalizer.normalize_path(path)
    }

    /// Analyze an export. A caller-supplied workout type wins over the one
    /// inferred from the file name.
    pub fn analyze(
        &self,
        path: &Path,
        biometrics: &Biometrics,
        workout_type: Option<&str>,
    ) -> Result<SessionAnalysis, ComputeError> {
        let export = self.normalizer.normalize_path(path)?;
        let workout_type = workout_type.or_else(|| file_name_of(path).and_then(infer_workout_type));
        analyze_export(&self.deriver, export, biometrics, workout_type)
    }

    /// Append an analysis to the log under the given date
    pub fn log(
        &mut self,
        analysis: &SessionAnalysis,
        file_name: &str,
        date: NaiveDate,
    ) -> Result<Vec<WorkoutLogEntry>, ComputeError> {
        let entry = WorkoutLogEntry::from_stats(
            &analysis.stats,
            &date.format("%Y-%m-%d").to_string(),
            file_name,
            None,
        );
        self.store.append(entry)
    }

    /// Analyze an export and log it under today's date
    pub fn analyze_and_log(
        &mut self,
        path: &Path,
        biometrics: &Biometrics,
        workout_type: Option<&str>,
    ) -> Result<(SessionAnalysis, Vec<WorkoutLogEntry>), ComputeError> {
        let analysis = self.analyze(path, biometrics, workout_type)?;
        let file_name = file_name_of(path).unwrap_or_default();
        let history = self.log(&analysis, file_name, Local::now().date_naive())?;
        Ok((analysis, history))
    }

    /// Full workout log, newest first
    pub fn history(&self) -> Result<Vec<WorkoutLogEntry>, ComputeError> {
        self.store.history()
    }

    /// Summary string for a recommendation backend
    pub fn summary_for(&self, analysis: &SessionAnalysis, profile: &TrainingProfile) -> String {
        format_stats_for_ai(&analysis.stats, profile)
    }

    /// Ask a recommendation backend for the next workout
    pub fn suggest(
        &self,
        analysis: &SessionAnalysis,
        profile: &TrainingProfile,
        recommender: &dyn Recommender,
    ) -> Result<String, ComputeError> {
        recommender.suggest(&self.summary_for(analysis, profile))
    }
}
