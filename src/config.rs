//! Configuration
//!
//! Settings live in a TOML file (`~/.config/workout-flux/config.toml` on Linux,
//! the platform config dir elsewhere). Every key has a default, so a missing
//! file or a partial one is fine.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::deriver::OrderPolicy;
use crate::error::ComputeError;
use crate::normalizer::RecordNormalizer;

/// Environment variable overriding the config file location
pub const CONFIG_ENV_VAR: &str = "FLUX_WORKOUT_CONFIG";

const APP_DIR: &str = "workout-flux";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FluxConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub parsing: ParsingConfig,

    #[serde(default)]
    pub recommender: RecommenderConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Workout log database; defaults to the platform data dir
    #[serde(default)]
    pub log_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsingConfig {
    /// Fixed field delimiter; detected from the header when unset
    #[serde(default)]
    pub delimiter: Option<char>,

    #[serde(default)]
    pub order_policy: OrderPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommenderConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

// Default value functions
fn default_endpoint() -> String {
    "http://127.0.0.1:1234/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "local-model".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    512
}

fn default_timeout() -> u64 {
    60
}

fn default_system_prompt() -> String {
    "You are a personal fitness coach.".to_string()
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_seconds: default_timeout(),
            system_prompt: default_system_prompt(),
        }
    }
}

impl ParsingConfig {
    /// Normalizer honoring the configured delimiter
    pub fn normalizer(&self) -> Result<RecordNormalizer, ComputeError> {
        match self.delimiter {
            None => Ok(RecordNormalizer::new()),
            Some(c) if c.is_ascii() => Ok(RecordNormalizer::with_delimiter(c as u8)),
            Some(c) => Err(ComputeError::ConfigError(format!(
                "delimiter must be a single ASCII character, got '{}'",
                c
            ))),
        }
    }
}

impl FluxConfig {
    /// Default config file path, honoring the env override
    pub fn config_file() -> Result<PathBuf, ComputeError> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Ok(PathBuf::from(path));
        }
        let dir = dirs::config_dir()
            .ok_or_else(|| ComputeError::ConfigError("could not find config directory".into()))?;
        Ok(dir.join(APP_DIR).join("config.toml"))
    }

    /// Default workout log location
    pub fn default_log_path() -> Result<PathBuf, ComputeError> {
        let dir = dirs::data_dir()
            .ok_or_else(|| ComputeError::ConfigError("could not find data directory".into()))?;
        Ok(dir.join(APP_DIR).join("workouts.db"))
    }

    /// Load from the default location
    pub fn load() -> Result<Self, ComputeError> {
        Self::load_from(&Self::config_file()?)
    }

    /// Load from a file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self, ComputeError> {
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            ComputeError::ConfigError(format!("cannot read '{}': {}", path.display(), e))
        })?;
        toml::from_str(&contents).map_err(|e| {
            ComputeError::ConfigError(format!("cannot parse '{}': {}", path.display(), e))
        })
    }

    /// Save to a file, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), ComputeError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                ComputeError::ConfigError(format!("cannot create '{}': {}", parent.display(), e))
            })?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ComputeError::ConfigError(format!("cannot serialize config: {}", e)))?;
        fs::write(path, contents).map_err(|e| {
            ComputeError::ConfigError(format!("cannot write '{}': {}", path.display(), e))
        })
    }

    /// Configured log path, or the platform default
    pub fn log_path(&self) -> Result<PathBuf, ComputeError> {
        match &self.storage.log_path {
            Some(path) => Ok(path.clone()),
            None => Self::default_log_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = FluxConfig::default();
        assert_eq!(
            config.recommender.endpoint,
            "http://127.0.0.1:1234/v1/chat/completions"
        );
        assert_eq!(config.recommender.max_tokens, 512);
        assert_eq!(config.parsing.order_policy, OrderPolicy::Reject);
        assert!(config.parsing.delimiter.is_none());
        assert!(config.storage.log_path.is_none());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: FluxConfig = toml::from_str(
            r#"
            [parsing]
            delimiter = ","
            order_policy = "sort"

            [recommender]
            model = "coach-7b"
            "#,
        )
        .unwrap();

        assert_eq!(config.parsing.delimiter, Some(','));
        assert_eq!(config.parsing.order_policy, OrderPolicy::Sort);
        assert_eq!(config.recommender.model, "coach-7b");
        assert_eq!(config.recommender.temperature, 0.7);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg").join("config.toml");

        let mut config = FluxConfig::default();
        config.storage.log_path = Some(dir.path().join("workouts.db"));
        config.parsing.delimiter = Some('\t');
        config.save_to(&path).unwrap();

        let loaded = FluxConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.log_path().unwrap(), dir.path().join("workouts.db"));
    }

    #[test]
    fn test_missing_file_and_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = FluxConfig::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(missing, FluxConfig::default());

        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "[parsing\n").unwrap();
        assert!(matches!(
            FluxConfig::load_from(&bad),
            Err(ComputeError::ConfigError(_))
        ));
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        let parsing = ParsingConfig {
            delimiter: Some('§'),
            ..Default::default()
        };
        assert!(parsing.normalizer().is_err());
        assert!(ParsingConfig::default().normalizer().is_ok());
    }
}
