//! workout-flux - Workout export normalization and session statistics
//!
//! Flux turns heterogeneous workout CSV exports into one summary per session
//! through a deterministic pipeline: delimiter detection → column reconciliation
//! → per-row normalization → statistics derivation.
//!
//! ## Modules
//!
//! - **Core pipeline**: [`normalizer`], [`columns`], [`timestamp`], [`deriver`], [`energy`]
//! - **Collaborators**: [`store`] (workout log), [`summary`] and [`recommend`]
//!   (next-workout suggestions), [`config`]

pub mod columns;
pub mod config;
pub mod deriver;
pub mod energy;
pub mod error;
pub mod normalizer;
pub mod pipeline;
pub mod recommend;
pub mod store;
pub mod summary;
pub mod timestamp;
pub mod types;

pub use config::FluxConfig;
pub use deriver::{OrderPolicy, StatsDeriver};
pub use error::ComputeError;
pub use normalizer::{NormalizedExport, RecordNormalizer};
pub use pipeline::{analyze_file, infer_workout_type, SessionProcessor};
pub use store::{MemoryStore, SqliteStore, WorkoutLogEntry, WorkoutStore};
pub use summary::{format_stats_for_ai, TrainingProfile};
pub use types::{Biometrics, Gender, PointRecord, SessionAnalysis, SessionStats};

// Recommendation exports
pub use recommend::{extract_text_after_tag, Recommender};
#[cfg(feature = "llm")]
pub use recommend::LocalLlmClient;

/// Flux version reported by the CLI
pub const FLUX_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name
pub const PRODUCER_NAME: &str = "workout-flux";
