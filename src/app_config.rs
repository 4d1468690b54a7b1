use std::path::Path;

use anyhow::{anyhow, Context, Result};
use log::warn;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::captions::CaptionConfig;
use crate::compute::OperationComputerConfig;
use crate::split::AlignmentConfig;
use crate::subtitle::{PersistentIdAllocator, PersistentIdConfig};

/// Default configuration file name
pub const DEFAULT_CONFIG_PATH: &str = "stsync.json";

/// Application configuration module
/// This module handles loading, validating and saving the settings of every
/// pipeline component.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Language code of the primary texts
    #[serde(default = "default_primary_language")]
    pub primary_language: String,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Caption extraction
    #[serde(default)]
    pub captions: CaptionConfig,

    /// Operation computer thresholds
    #[serde(default)]
    pub operations: OperationComputerConfig,

    /// Sentence alignment scoring
    #[serde(default)]
    pub alignment: AlignmentConfig,

    /// Persistent id pool and inventory
    #[serde(default)]
    pub persistent_ids: PersistentIdConfig,

    /// Repository layout
    #[serde(default)]
    pub repository: RepositoryConfig,
}

/// Where content and marker files live in a repository
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RepositoryConfig {
    /// Repository name, defaults to the directory name
    #[serde(default)]
    pub name: Option<String>,

    /// Regex over repository-relative paths selecting content files
    #[serde(default = "default_content_file_pattern")]
    pub content_file_pattern: String,

    /// Replaces the content file extension to name its marker file
    #[serde(default = "default_marker_file_extension")]
    pub marker_file_extension: String,

    /// Replaces the content file extension to name its subtitle import (timing) file
    #[serde(default = "default_import_file_extension")]
    pub import_file_extension: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            name: None,
            content_file_pattern: default_content_file_pattern(),
            marker_file_extension: default_marker_file_extension(),
            import_file_extension: default_import_file_extension(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_primary_language() -> String {
    "en".to_string()
}

fn default_content_file_pattern() -> String {
    r"^content/.+\d{4}\.at$".to_string()
}

fn default_marker_file_extension() -> String {
    ".subtitle_markers.csv".to_string()
}

fn default_import_file_extension() -> String {
    ".subtitle_import.csv".to_string()
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let threshold = self.operations.confidence_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(anyhow!(
                "Operation confidence threshold must be in (0, 1], got {}",
                threshold
            ));
        }

        if self.alignment.gap_penalty >= 0.0 {
            return Err(anyhow!(
                "Alignment gap penalty must be negative, got {}",
                self.alignment.gap_penalty
            ));
        }
        if self.alignment.lexical_weight < 0.0 || self.alignment.structural_weight < 0.0 {
            return Err(anyhow!("Alignment weights must not be negative"));
        }

        PersistentIdAllocator::new(&self.persistent_ids).context("Invalid persistent id configuration")?;

        Regex::new(&self.repository.content_file_pattern).with_context(|| {
            format!(
                "Invalid content file pattern: {}",
                self.repository.content_file_pattern
            )
        })?;

        Ok(())
    }

    /// Read a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Load the configuration, writing the default one first if the file doesn't exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load(path);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Self::default();
        config.save(path)?;
        Ok(config)
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            primary_language: default_primary_language(),
            log_level: LogLevel::default(),
            captions: CaptionConfig::default(),
            operations: OperationComputerConfig::default(),
            alignment: AlignmentConfig::default(),
            persistent_ids: PersistentIdConfig::default(),
            repository: RepositoryConfig::default(),
        }
    }
}
