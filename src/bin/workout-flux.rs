//! workout-flux CLI - Command-line interface for workout-flux
//!
//! Commands:
//! - analyze: Derive session statistics for an export, optionally log it and ask for a suggestion
//! - history: Print the workout log, newest first
//! - columns: Show how an export's columns were resolved
//! - prompt: Print the AI summary for an export

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use workout_flux::normalizer::NormalizedExport;
use workout_flux::types::{Field, SessionAnalysis};
use workout_flux::{
    Biometrics, ComputeError, FluxConfig, Gender, LocalLlmClient, OrderPolicy, SessionProcessor,
    TrainingProfile, WorkoutLogEntry, FLUX_VERSION,
};

/// workout-flux - Normalize workout exports and derive session statistics
#[derive(Parser)]
#[command(name = "workout-flux")]
#[command(version = FLUX_VERSION)]
#[command(about = "Turn workout CSV exports into session statistics", long_about = None)]
struct Cli {
    /// Config file (defaults to the platform config dir or $FLUX_WORKOUT_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Workout log file, overriding the configured one
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Field delimiter, overriding detection
    #[arg(long, global = true)]
    delimiter: Option<char>,

    /// How to treat timestamps that run backwards
    #[arg(long, global = true)]
    order: Option<OrderArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive session statistics for an export
    Analyze {
        /// Export file
        file: PathBuf,

        #[command(flatten)]
        athlete: AthleteArgs,

        /// Workout type, overriding the one inferred from the file name
        #[arg(long)]
        workout_type: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Append the result to the workout log
        #[arg(long)]
        log: bool,

        /// Ask the recommendation server for the next workout
        #[arg(long)]
        suggest: bool,
    },

    /// Print the workout log, newest first
    History {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show delimiter, column resolution and skipped rows for an export
    Columns {
        /// Export file
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the AI summary for an export
    Prompt {
        /// Export file
        file: PathBuf,

        #[command(flatten)]
        athlete: AthleteArgs,

        /// Workout type, overriding the one inferred from the file name
        #[arg(long)]
        workout_type: Option<String>,
    },
}

#[derive(Args)]
struct AthleteArgs {
    /// Gender (male, female, other)
    #[arg(long, value_parser = parse_gender)]
    gender: Gender,

    /// Body weight in kg
    #[arg(long)]
    weight: f64,

    /// Height in cm
    #[arg(long)]
    height: f64,

    /// Age in years
    #[arg(long)]
    age: u32,

    /// Fitness level (e.g. beginner, intermediate, advanced)
    #[arg(long)]
    fitness_level: Option<String>,

    /// Fitness goal (e.g. "build endurance")
    #[arg(long)]
    goal: Option<String>,

    /// Focus area (e.g. endurance, strength)
    #[arg(long)]
    focus: Option<String>,

    /// Preferred kind of workout
    #[arg(long)]
    preference: Option<String>,

    /// Training days per week
    #[arg(long)]
    days_per_week: Option<u32>,

    /// Minutes per session
    #[arg(long)]
    minutes_per_session: Option<u32>,

    /// Injury or limitation to respect
    #[arg(long)]
    injury: Option<String>,
}

impl AthleteArgs {
    fn biometrics(&self) -> Biometrics {
        Biometrics {
            gender: self.gender,
            weight_kg: self.weight,
            height_cm: self.height,
            age: self.age,
        }
    }

    fn profile(&self) -> TrainingProfile {
        TrainingProfile {
            fitness_level: self.fitness_level.clone(),
            fitness_goal: self.goal.clone(),
            target_focus: self.focus.clone(),
            workout_preference: self.preference.clone(),
            weekly_availability: self.days_per_week,
            time_per_session: self.minutes_per_session,
            injury: self.injury.clone(),
            ..TrainingProfile::new(self.biometrics())
        }
    }
}

fn parse_gender(s: &str) -> Result<Gender, String> {
    s.parse::<Gender>().map_err(|e| e.to_string())
}

#[derive(Clone, Copy, ValueEnum)]
enum OrderArg {
    /// Fail when the last timestamp precedes the first
    Reject,
    /// Use the earliest and latest timestamps
    Sort,
}

impl From<OrderArg> for OrderPolicy {
    fn from(arg: OrderArg) -> Self {
        match arg {
            OrderArg::Reject => OrderPolicy::Reject,
            OrderArg::Sort => OrderPolicy::Sort,
        }
    }
}

fn main() -> ExitCode {
    // stdout carries results, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), FluxCliError> {
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Analyze {
            file,
            athlete,
            workout_type,
            json,
            log,
            suggest,
        } => cmd_analyze(
            &config,
            &file,
            &athlete,
            workout_type.as_deref(),
            json,
            log,
            suggest,
        ),
        Commands::History { json } => cmd_history(&config, json),
        Commands::Columns { file, json } => cmd_columns(&config, &file, json),
        Commands::Prompt {
            file,
            athlete,
            workout_type,
        } => cmd_prompt(&config, &file, &athlete, workout_type.as_deref()),
    }
}

fn load_config(cli: &Cli) -> Result<FluxConfig, FluxCliError> {
    let mut config = match &cli.config {
        Some(path) => FluxConfig::load_from(path)?,
        None => FluxConfig::load()?,
    };
    if let Some(path) = &cli.log_file {
        config.storage.log_path = Some(path.clone());
    }
    if let Some(delimiter) = cli.delimiter {
        config.parsing.delimiter = Some(delimiter);
    }
    if let Some(order) = cli.order {
        config.parsing.order_policy = order.into();
    }
    Ok(config)
}

#[derive(Serialize)]
struct AnalyzeOutput<'a> {
    producer: &'static str,
    version: &'static str,
    file: String,
    analysis: &'a SessionAnalysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    logged: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestion: Option<String>,
}

fn cmd_analyze(
    config: &FluxConfig,
    file: &Path,
    athlete: &AthleteArgs,
    workout_type: Option<&str>,
    json: bool,
    log: bool,
    suggest: bool,
) -> Result<(), FluxCliError> {
    let mut processor = SessionProcessor::from_config(config)?;
    let biometrics = athlete.biometrics();

    let (analysis, logged) = if log {
        let (analysis, history) = processor.analyze_and_log(file, &biometrics, workout_type)?;
        (analysis, Some(history.len()))
    } else {
        (processor.analyze(file, &biometrics, workout_type)?, None)
    };

    let suggestion = if suggest {
        let client = LocalLlmClient::new(config.recommender.clone());
        Some(processor.suggest(&analysis, &athlete.profile(), &client)?)
    } else {
        None
    };

    if json {
        let output = AnalyzeOutput {
            producer: workout_flux::PRODUCER_NAME,
            version: FLUX_VERSION,
            file: display_name(file),
            analysis: &analysis,
            logged,
            suggestion,
        };
        return write_json(&output);
    }

    let mut out = io::stdout().lock();
    write_analysis(&mut out, file, &analysis)?;
    if let Some(count) = logged {
        writeln!(out, "\nLogged ({} workouts in history)", count)?;
    }
    if let Some(text) = suggestion {
        writeln!(out, "\nSuggested next workout:\n{}", text)?;
    }
    Ok(())
}

fn cmd_history(config: &FluxConfig, json: bool) -> Result<(), FluxCliError> {
    let processor = SessionProcessor::from_config(config)?;
    let history = processor.history()?;

    if json {
        return write_json(&history);
    }

    let mut out = io::stdout().lock();
    if history.is_empty() {
        writeln!(out, "No workouts logged yet")?;
        return Ok(());
    }
    writeln!(
        out,
        "{:<10}  {:<24}  {:<10}  {:>8}  {:>7}  {:>6}  {:>6}",
        "date", "file", "type", "km", "min", "bpm", "kcal"
    )?;
    for entry in &history {
        write_history_row(&mut out, entry)?;
    }
    Ok(())
}

fn write_history_row(out: &mut impl Write, entry: &WorkoutLogEntry) -> io::Result<()> {
    writeln!(
        out,
        "{:<10}  {:<24}  {:<10}  {:>8.2}  {:>7.1}  {:>6.0}  {:>6.0}",
        entry.date,
        truncate(&entry.file_name, 24),
        truncate(&entry.workout_type, 10),
        entry.total_distance / 1000.0,
        entry.duration_min,
        entry.avg_heart_rate,
        entry.total_calories
    )
}

fn cmd_columns(config: &FluxConfig, file: &Path, json: bool) -> Result<(), FluxCliError> {
    let processor = SessionProcessor::from_config(config)?;
    let NormalizedExport { report, .. } = processor.normalize(file)?;

    if json {
        return write_json(&report);
    }

    let mut out = io::stdout().lock();
    writeln!(out, "File:      {}", file.display())?;
    writeln!(out, "Delimiter: {}", report.delimiter.escape_default())?;
    writeln!(
        out,
        "Rows:      {} read, {} kept, {} skipped",
        report.rows_read,
        report.rows_kept,
        report.skipped_rows.len()
    )?;
    writeln!(out, "\nColumns:")?;
    for field in Field::ALL {
        let sources = report
            .columns
            .get(&field)
            .map(|cols| cols.join(" > "))
            .unwrap_or_else(|| "-".to_string());
        let fallbacks = report.fallback_counts.get(&field).copied().unwrap_or(0);
        if fallbacks > 0 {
            writeln!(
                out,
                "  {:<12} {}  ({} from fallback)",
                field.as_str(),
                sources,
                fallbacks
            )?;
        } else {
            writeln!(out, "  {:<12} {}", field.as_str(), sources)?;
        }
    }
    if !report.skipped_rows.is_empty() {
        writeln!(out, "\nSkipped rows:")?;
        for row in &report.skipped_rows {
            writeln!(out, "  line {}: {}", row.line, row.reason)?;
        }
    }
    Ok(())
}

fn cmd_prompt(
    config: &FluxConfig,
    file: &Path,
    athlete: &AthleteArgs,
    workout_type: Option<&str>,
) -> Result<(), FluxCliError> {
    let processor = SessionProcessor::from_config(config)?;
    let analysis = processor.analyze(file, &athlete.biometrics(), workout_type)?;
    let summary = processor.summary_for(&analysis, &athlete.profile());
    writeln!(io::stdout().lock(), "{}", summary)?;
    Ok(())
}

fn write_analysis(
    out: &mut impl Write,
    file: &Path,
    analysis: &SessionAnalysis,
) -> io::Result<()> {
    let stats = &analysis.stats;
    let report = &analysis.report;

    match &stats.workout_type {
        Some(kind) => writeln!(out, "Workout:        {} ({})", display_name(file), kind)?,
        None => writeln!(out, "Workout:        {}", display_name(file))?,
    }
    writeln!(
        out,
        "Started:        {}",
        analysis.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(out, "Distance:       {:.2} km", stats.total_distance / 1000.0)?;
    writeln!(out, "Duration:       {:.1} min", stats.workout_duration)?;
    writeln!(out, "Avg heart rate: {}", metric(stats.avg_heart_rate, "bpm", 0))?;
    writeln!(out, "Avg cadence:    {}", metric(stats.avg_cadence, "spm", 0))?;
    writeln!(out, "Avg power:      {}", metric(stats.avg_power, "W", 0))?;
    writeln!(out, "Avg elevation:  {}", metric(stats.avg_elevation, "m", 0))?;
    writeln!(out, "Elevation gain: {}", metric(stats.elevation_gain, "m", 2))?;
    writeln!(
        out,
        "Calories:       {:.0} kcal ({} intensity)",
        stats.total_calories,
        analysis.intensity.as_str()
    )?;
    writeln!(out, "BMR:            {:.0} kcal/day", analysis.bmr_kcal_per_day)?;
    writeln!(
        out,
        "Rows:           {} kept, {} skipped, {} fallback values",
        report.rows_kept,
        report.skipped_rows.len(),
        report.total_fallbacks()
    )
}

fn metric(value: Option<f64>, unit: &str, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*} {}", decimals, v, unit),
        None => "-".to_string(),
    }
}

fn display_name(file: &Path) -> String {
    file.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut cut: String = s.chars().take(max.saturating_sub(1)).collect();
        cut.push('~');
        cut
    }
}

/// Pretty JSON on a terminal, compact JSON when piped
fn write_json<T: Serialize + ?Sized>(value: &T) -> Result<(), FluxCliError> {
    let json = if atty::is(atty::Stream::Stdout) {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    writeln!(io::stdout().lock(), "{}", json)?;
    Ok(())
}

enum FluxCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
}

impl From<io::Error> for FluxCliError {
    fn from(e: io::Error) -> Self {
        FluxCliError::Io(e)
    }
}

impl From<ComputeError> for FluxCliError {
    fn from(e: ComputeError) -> Self {
        FluxCliError::Compute(e)
    }
}

impl From<serde_json::Error> for FluxCliError {
    fn from(e: serde_json::Error) -> Self {
        FluxCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(code: &str, message: String, hint: Option<&str>) -> Self {
        CliError {
            code: code.to_string(),
            message,
            hint: hint.map(str::to_string),
        }
    }
}

impl From<FluxCliError> for CliError {
    fn from(e: FluxCliError) -> Self {
        match e {
            FluxCliError::Io(e) => CliError::new(
                "IO_ERROR",
                e.to_string(),
                Some("Check file paths and permissions"),
            ),
            FluxCliError::Json(e) => CliError::new("JSON_ERROR", e.to_string(), None),
            FluxCliError::Compute(e) => {
                let message = e.to_string();
                match e {
                    ComputeError::ParseError(_) | ComputeError::Csv(_) => CliError::new(
                        "PARSE_ERROR",
                        message,
                        Some("Run 'workout-flux columns <file>' to inspect the export"),
                    ),
                    ComputeError::Io(_) => CliError::new(
                        "IO_ERROR",
                        message,
                        Some("Check file paths and permissions"),
                    ),
                    ComputeError::JsonError(_) => CliError::new("JSON_ERROR", message, None),
                    ComputeError::EmptyInput => CliError::new(
                        "EMPTY_INPUT",
                        message,
                        Some("Ensure the export contains data rows"),
                    ),
                    ComputeError::UnparseableTimestamp(_) => CliError::new(
                        "TIMESTAMP_ERROR",
                        message,
                        Some("The export needs a date, timestamp or ISO8601 column"),
                    ),
                    ComputeError::OutOfOrderTimestamps { .. } => CliError::new(
                        "OUT_OF_ORDER",
                        message,
                        Some("Pass --order sort to use the earliest and latest timestamps"),
                    ),
                    ComputeError::InvalidBiometrics(_) => CliError::new(
                        "INVALID_BIOMETRICS",
                        message,
                        Some("Check --weight, --height and --age"),
                    ),
                    ComputeError::StorageError(_) => CliError::new(
                        "STORAGE_ERROR",
                        message,
                        Some("Check the workout log path (--log-file or storage.log_path)"),
                    ),
                    ComputeError::ConfigError(_) => CliError::new(
                        "CONFIG_ERROR",
                        message,
                        Some("Fix or remove the config file"),
                    ),
                    ComputeError::RecommendationError(_) => CliError::new(
                        "RECOMMENDATION_ERROR",
                        message,
                        Some("Is the local model server running? See recommender.endpoint"),
                    ),
                }
            }
        }
    }
}
