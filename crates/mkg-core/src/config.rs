//! MKG Configuration Management
//!
//! Handles configuration from environment variables, config files,
//! and command-line arguments with sensible defaults for local runs.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Corpus locations
    pub input: InputConfig,

    /// Output table locations
    pub output: OutputConfig,

    /// Synthesis behaviour
    pub synthesis: SynthesisConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Input
        if let Ok(path) = std::env::var("MKG_CLEANED_DATA") {
            config.input.cleaned_data = path.into();
        }
        if let Ok(path) = std::env::var("MKG_LABELED_DATA") {
            config.input.labeled_data = path.into();
        }
        if let Ok(path) = std::env::var("MKG_PREDICTED_DATA") {
            config.input.predicted_data = Some(path.into());
        }

        // Output
        if let Ok(dir) = std::env::var("MKG_OUTPUT_DIR") {
            config.output.dir = dir.into();
        }

        // Synthesis
        if let Ok(threads) = std::env::var("MKG_THREADS") {
            config.synthesis.threads =
                Some(threads.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "MKG_THREADS".to_string(),
                    value: threads,
                })?);
        }

        // Logging
        if let Ok(level) = std::env::var("MKG_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(json) = std::env::var("MKG_LOG_JSON") {
            config.logging.json_format = parse_bool("MKG_LOG_JSON", &json)?;
        }

        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        let env_config = Self::from_env()?;
        let defaults = Self::default();

        // Only override if env values differ from defaults
        if env_config.input.cleaned_data != defaults.input.cleaned_data {
            self.input.cleaned_data = env_config.input.cleaned_data;
        }
        if env_config.input.labeled_data != defaults.input.labeled_data {
            self.input.labeled_data = env_config.input.labeled_data;
        }
        if env_config.input.predicted_data.is_some() {
            self.input.predicted_data = env_config.input.predicted_data;
        }
        if env_config.output.dir != defaults.output.dir {
            self.output.dir = env_config.output.dir;
        }
        if env_config.synthesis.threads.is_some() {
            self.synthesis.threads = env_config.synthesis.threads;
        }
        if env_config.logging.level != defaults.logging.level {
            self.logging.level = env_config.logging.level;
        }
        if env_config.logging.json_format {
            self.logging.json_format = true;
        }

        Ok(self)
    }

    /// Check that every required input is set
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input.cleaned_data.as_os_str().is_empty() {
            return Err(ConfigError::MissingRequired("input.cleaned_data".to_string()));
        }
        if self.input.labeled_data.as_os_str().is_empty() {
            return Err(ConfigError::MissingRequired("input.labeled_data".to_string()));
        }
        if self.synthesis.threads == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "synthesis.threads".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Corpus locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Cleaned leaflet records (JSON lines), source of raw attributes
    pub cleaned_data: PathBuf,

    /// Hand-labeled documents (JSON lines)
    pub labeled_data: PathBuf,

    /// Model-predicted documents (JSON lines)
    pub predicted_data: Option<PathBuf>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            cleaned_data: PathBuf::from("b_data/cleaned.json"),
            labeled_data: PathBuf::from("b_data/extracted.json"),
            predicted_data: Some(PathBuf::from("b_data/parsed_re.json")),
        }
    }
}

/// Output table locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory the tables are written to
    pub dir: PathBuf,

    /// Entity table file name
    pub entity_file: String,

    /// Relation table file name
    pub relation_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("b_data"),
            entity_file: "entity.csv".to_string(),
            relation_file: "relation.csv".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn entity_path(&self) -> PathBuf {
        self.dir.join(&self.entity_file)
    }

    pub fn relation_path(&self) -> PathBuf {
        self.dir.join(&self.relation_file)
    }
}

/// Synthesis behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Match documents and normalize quantities on a worker pool
    pub parallel: bool,

    /// Worker count (defaults to the number of cores)
    pub threads: Option<usize>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,

    /// Include file/line in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
