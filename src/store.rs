//! Workout log persistence
//!
//! The log is an append-only history of analyzed sessions. Reads return every
//! entry, newest date first. The database location is always injected; nothing
//! in this module knows a default path.

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use crate::error::ComputeError;
use crate::types::SessionStats;

/// One persisted session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutLogEntry {
    pub id: Uuid,
    /// ISO-8601 date (YYYY-MM-DD)
    pub date: String,
    pub file_name: String,
    /// Empty when unknown
    pub workout_type: String,
    /// Meters, rounded to 2 decimals
    pub total_distance: f64,
    /// Minutes, rounded to 1 decimal
    pub duration_min: f64,
    pub avg_heart_rate: f64,
    pub avg_cadence: f64,
    pub avg_power: f64,
    pub avg_elevation: f64,
    pub elevation_gain: f64,
    pub total_calories: f64,
}

impl WorkoutLogEntry {
    /// Build a log entry from session statistics.
    ///
    /// The log format has no missing marker, so absent metrics are stored as 0.
    /// This is lossy: a stored 0 cannot be told apart from a real zero.
    pub fn from_stats(
        stats: &SessionStats,
        date: &str,
        file_name: &str,
        workout_type: Option<&str>,
    ) -> Self {
        let workout_type = workout_type
            .or(stats.workout_type.as_deref())
            .unwrap_or_default()
            .to_string();

        Self {
            id: Uuid::new_v4(),
            date: date.to_string(),
            file_name: file_name.to_string(),
            workout_type,
            total_distance: round_to(stats.total_distance, 2),
            duration_min: round_to(stats.workout_duration, 1),
            avg_heart_rate: or_zero("avg_heart_rate", stats.avg_heart_rate),
            avg_cadence: or_zero("avg_cadence", stats.avg_cadence),
            avg_power: or_zero("avg_power", stats.avg_power),
            avg_elevation: or_zero("avg_elevation", stats.avg_elevation),
            elevation_gain: or_zero("elevation_gain", stats.elevation_gain),
            total_calories: stats.total_calories,
        }
    }
}

fn or_zero(name: &str, value: Option<f64>) -> f64 {
    value.unwrap_or_else(|| {
        debug!(field = name, "absent metric stored as 0");
        0.0
    })
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Newest first; entries on the same date keep insertion order
fn sort_newest_first(entries: &mut [WorkoutLogEntry]) {
    entries.sort_by(|a, b| b.date.cmp(&a.date));
}

/// Trait for workout log backends
pub trait WorkoutStore {
    /// Append an entry and return the full history, newest first
    fn append(&mut self, entry: WorkoutLogEntry) -> Result<Vec<WorkoutLogEntry>, ComputeError>;

    /// Full history, newest first
    fn history(&self) -> Result<Vec<WorkoutLogEntry>, ComputeError>;
}

/// In-memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Vec<WorkoutLogEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkoutStore for MemoryStore {
    fn append(&mut self, entry: WorkoutLogEntry) -> Result<Vec<WorkoutLogEntry>, ComputeError> {
        self.entries.push(entry);
        self.history()
    }

    fn history(&self) -> Result<Vec<WorkoutLogEntry>, ComputeError> {
        let mut entries = self.entries.clone();
        sort_newest_first(&mut entries);
        Ok(entries)
    }
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS workouts (
    id BLOB PRIMARY KEY,
    date TEXT NOT NULL,
    file_name TEXT NOT NULL,
    workout_type TEXT NOT NULL DEFAULT '',
    total_distance REAL NOT NULL,
    duration_min REAL NOT NULL,
    avg_heart_rate REAL NOT NULL,
    avg_cadence REAL NOT NULL,
    avg_power REAL NOT NULL,
    avg_elevation REAL NOT NULL,
    elevation_gain REAL NOT NULL,
    total_calories REAL NOT NULL
);
CREATE INDEX IF NOT EXISTS workouts_date ON workouts (date);
";

const INSERT_WORKOUT: &str = "
INSERT INTO workouts (id, date, file_name, workout_type, total_distance, duration_min,
    avg_heart_rate, avg_cadence, avg_power, avg_elevation, elevation_gain, total_calories)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
";

// rowid keeps insertion order among entries sharing a date
const SELECT_HISTORY: &str = "
SELECT id, date, file_name, workout_type, total_distance, duration_min,
    avg_heart_rate, avg_cadence, avg_power, avg_elevation, elevation_gain, total_calories
FROM workouts
ORDER BY date DESC, rowid ASC
";

fn db_error(context: &str, e: rusqlite::Error) -> ComputeError {
    ComputeError::StorageError(format!("{}: {}", context, e))
}

/// Store backed by an SQLite database with a single `workouts` table
pub struct SqliteStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`, creating parent directories
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ComputeError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                ComputeError::StorageError(format!(
                    "cannot create '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let conn = Connection::open(&path)
            .map_err(|e| db_error(&format!("cannot open '{}'", path.display()), e))?;
        debug!(path = %path.display(), "opened workout log");
        Self::init(conn, Some(path))
    }

    /// Database that lives only as long as the store
    pub fn open_in_memory() -> Result<Self, ComputeError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| db_error("cannot open in-memory database", e))?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self, ComputeError> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| db_error("cannot create workouts table", e))?;
        Ok(Self { conn, path })
    }

    /// Database file, `None` for an in-memory store
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl WorkoutStore for SqliteStore {
    fn append(&mut self, entry: WorkoutLogEntry) -> Result<Vec<WorkoutLogEntry>, ComputeError> {
        self.conn
            .execute(
                INSERT_WORKOUT,
                params![
                    entry.id,
                    entry.date,
                    entry.file_name,
                    entry.workout_type,
                    entry.total_distance,
                    entry.duration_min,
                    entry.avg_heart_rate,
                    entry.avg_cadence,
                    entry.avg_power,
                    entry.avg_elevation,
                    entry.elevation_gain,
                    entry.total_calories,
                ],
            )
            .map_err(|e| db_error("cannot insert workout", e))?;

        debug!(id = %entry.id, date = %entry.date, "logged workout");
        self.history()
    }

    fn history(&self) -> Result<Vec<WorkoutLogEntry>, ComputeError> {
        let mut stmt = self
            .conn
            .prepare(SELECT_HISTORY)
            .map_err(|e| db_error("cannot read workouts", e))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(WorkoutLogEntry {
                    id: row.get(0)?,
                    date: row.get(1)?,
                    file_name: row.get(2)?,
                    workout_type: row.get(3)?,
                    total_distance: row.get(4)?,
                    duration_min: row.get(5)?,
                    avg_heart_rate: row.get(6)?,
                    avg_cadence: row.get(7)?,
                    avg_power: row.get(8)?,
                    avg_elevation: row.get(9)?,
                    elevation_gain: row.get(10)?,
                    total_calories: row.get(11)?,
                })
            })
            .map_err(|e| db_error("cannot read workouts", e))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| db_error("cannot decode workout row", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn stats() -> SessionStats {
        SessionStats {
            total_distance: 5234.5678,
            workout_duration: 31.26,
            avg_heart_rate: Some(148.0),
            avg_cadence: None,
            avg_power: None,
            avg_elevation: Some(35.0),
            elevation_gain: None,
            total_calories: 218.82,
            workout_type: Some("Running".to_string()),
        }
    }

    fn entry(date: &str, file: &str) -> WorkoutLogEntry {
        WorkoutLogEntry::from_stats(&stats(), date, file, None)
    }

    #[test]
    fn test_from_stats_coerces_and_rounds() {
        let e = entry("2024-05-01", "run.csv");
        assert_eq!(e.total_distance, 5234.57);
        assert_eq!(e.duration_min, 31.3);
        assert_eq!(e.avg_heart_rate, 148.0);
        assert_eq!(e.avg_cadence, 0.0);
        assert_eq!(e.avg_power, 0.0);
        assert_eq!(e.elevation_gain, 0.0);
        assert_eq!(e.total_calories, 218.82);
        assert_eq!(e.workout_type, "Running");

        let e = WorkoutLogEntry::from_stats(&stats(), "2024-05-01", "run.csv", Some("Trail"));
        assert_eq!(e.workout_type, "Trail");
    }

    #[test]
    fn test_memory_store_orders_by_date_desc() {
        let mut store = MemoryStore::new();
        store.append(entry("2024-05-01", "a.csv")).unwrap();
        store.append(entry("2024-06-01", "b.csv")).unwrap();
        let history = store.append(entry("2024-05-15", "c.csv")).unwrap();

        let files: Vec<&str> = history.iter().map(|e| e.file_name.as_str()).collect();
        assert_eq!(files, vec!["b.csv", "c.csv", "a.csv"]);
    }

    #[test]
    fn test_sqlite_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("workouts.db");
        let mut store = SqliteStore::open(&path).unwrap();

        assert!(store.history().unwrap().is_empty());
        assert_eq!(store.path(), Some(path.as_path()));

        let first = entry("2024-05-01", "a.csv");
        store.append(first.clone()).unwrap();
        let history = store.append(entry("2024-05-03", "b.csv")).unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].file_name, "b.csv");
        assert_eq!(history[1], first);

        drop(store);
        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.history().unwrap().len(), 2);
    }

    #[test]
    fn test_sqlite_store_orders_like_memory_store() {
        let mut sqlite = SqliteStore::open_in_memory().unwrap();
        let mut memory = MemoryStore::new();

        for (date, file) in [
            ("2024-05-01", "a.csv"),
            ("2024-06-01", "b.csv"),
            ("2024-05-01", "c.csv"),
            ("2024-05-15", "d.csv"),
        ] {
            let e = entry(date, file);
            sqlite.append(e.clone()).unwrap();
            memory.append(e).unwrap();
        }

        let files: Vec<String> = sqlite
            .history()
            .unwrap()
            .into_iter()
            .map(|e| e.file_name)
            .collect();
        assert_eq!(files, vec!["b.csv", "d.csv", "a.csv", "c.csv"]);
        assert_eq!(sqlite.history().unwrap(), memory.history().unwrap());
        assert!(sqlite.path().is_none());
    }

    #[test]
    fn test_duplicate_id_is_storage_error() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let e = entry("2024-05-01", "a.csv");
        store.append(e.clone()).unwrap();
        assert!(matches!(
            store.append(e),
            Err(ComputeError::StorageError(_))
        ));
    }
}
