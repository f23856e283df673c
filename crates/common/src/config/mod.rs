//! Configuration management for QuizForge tools
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml, config/local.toml)
//! - Default values

use crate::errors::{AppError, Result};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Question generation configuration
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Retry policy for storage calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Primary database URL (for writes)
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Read replica URL (optional, falls back to primary)
    pub read_url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

/// How topics are matched when resolving a chapter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicKeyMode {
    /// Match on subject and topic name
    #[default]
    SubjectChapter,
    /// Match on topic name alone; "Chapter 1" is shared by every subject
    ChapterName,
}

/// One taxonomy row: a subject and how many chapters it has
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SubjectEntry {
    pub name: String,
    pub chapters: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneratorConfig {
    /// Questions per set; also spreads sets over a subject's chapters
    #[serde(default = "default_set_size")]
    pub set_size: usize,

    /// Stop once this many sets have been numbered
    #[serde(default = "default_total_sets_target")]
    pub total_sets_target: u32,

    /// Maximum records per insert call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// RNG seed for generic question text; unseeded runs are not reproducible
    pub seed: Option<u64>,

    /// Skip sets already present in storage
    #[serde(default = "default_resume")]
    pub resume: bool,

    /// Topic matching mode
    #[serde(default)]
    pub topic_key: TopicKeyMode,

    /// Class level stamped on new topics
    #[serde(default = "default_class_level")]
    pub class_level: String,

    /// Reference books stamped on new topics
    #[serde(default = "default_reference_books")]
    pub reference_books: Vec<String>,

    /// Subject taxonomy override (defaults to the NEET syllabus)
    #[serde(default)]
    pub taxonomy: Option<Vec<SubjectEntry>>,

    /// Curated template file replacing the built-in set
    pub templates_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    /// First delay after a transient failure, in milliseconds
    #[serde(default = "default_initial_interval")]
    pub initial_interval_ms: u64,

    /// Upper bound for a single delay, in milliseconds
    #[serde(default = "default_max_interval")]
    pub max_interval_ms: u64,

    /// Give up after this much total time, in milliseconds
    #[serde(default = "default_max_elapsed")]
    pub max_elapsed_ms: u64,

    /// Delay growth factor
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Prometheus exporter port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Recorded on the root span of every run
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_database_url() -> String { "postgres://localhost/quizforge".to_string() }
fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 1 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_set_size() -> usize { crate::DEFAULT_SET_SIZE }
fn default_total_sets_target() -> u32 { 500 }
fn default_batch_size() -> usize { crate::DEFAULT_BATCH_SIZE }
fn default_resume() -> bool { true }
fn default_class_level() -> String { "Class XI-XII".to_string() }
fn default_reference_books() -> Vec<String> {
    vec!["NCERT".to_string(), "Reference Books".to_string()]
}
fn default_initial_interval() -> u64 { 200 }
fn default_max_interval() -> u64 { 5_000 }
fn default_max_elapsed() -> u64 { 30_000 }
fn default_multiplier() -> f64 { 2.0 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { false }
fn default_metrics_port() -> u16 { 0 }
fn default_service_name() -> String { "quizforge".to_string() }

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            read_url: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            set_size: default_set_size(),
            total_sets_target: default_total_sets_target(),
            batch_size: default_batch_size(),
            seed: None,
            resume: default_resume(),
            topic_key: TopicKeyMode::default(),
            class_level: default_class_level(),
            reference_books: default_reference_books(),
            taxonomy: None,
            templates_path: None,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_interval_ms: default_initial_interval(),
            max_interval_ms: default_max_interval(),
            max_elapsed_ms: default_max_elapsed(),
            multiplier: default_multiplier(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> std::result::Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__GENERATOR__TOTAL_SETS_TARGET=10
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> std::result::Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Reject settings the generator cannot run with
    pub fn validate(&self) -> Result<()> {
        let generator = &self.generator;

        if generator.set_size == 0 {
            return Err(invalid("generator.set_size", "must be greater than zero"));
        }
        if generator.total_sets_target == 0 {
            return Err(invalid("generator.total_sets_target", "must be greater than zero"));
        }
        if generator.batch_size == 0 {
            return Err(invalid("generator.batch_size", "must be greater than zero"));
        }
        if let Some(ref taxonomy) = generator.taxonomy {
            if taxonomy.is_empty() {
                return Err(invalid("generator.taxonomy", "must list at least one subject"));
            }
            if let Some(entry) = taxonomy.iter().find(|e| e.chapters == 0) {
                return Err(invalid(
                    "generator.taxonomy",
                    &format!("subject {} has no chapters", entry.name),
                ));
            }
        }
        if self.retry.multiplier < 1.0 {
            return Err(invalid("retry.multiplier", "must be at least 1.0"));
        }

        Ok(())
    }
}

impl RetryConfig {
    pub fn initial_interval(&self) -> Duration {
        Duration::from_millis(self.initial_interval_ms)
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_interval_ms)
    }

    pub fn max_elapsed(&self) -> Duration {
        Duration::from_millis(self.max_elapsed_ms)
    }
}

fn invalid(field: &str, reason: &str) -> AppError {
    AppError::Configuration {
        message: format!("{}: {}", field, reason),
    }
}
