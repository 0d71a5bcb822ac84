//! Configuration for flashcard trainer.

use flashcard_core::stats::DEFAULT_HEATMAP_DAYS;
use flashcard_core::StudyMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub study: StudyConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Load the config file, falling back to defaults.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "invalid config, using defaults");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    fn dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("", "", "flashcard-trainer")
    }

    pub fn config_path() -> Option<PathBuf> {
        Self::dirs().map(|d| d.config_dir().join("config.toml"))
    }

    pub fn db_path() -> Option<PathBuf> {
        Self::dirs().map(|d| d.data_dir().join("flashcards.db"))
    }

    pub fn log_path() -> Option<PathBuf> {
        Self::dirs().map(|d| d.data_dir().join("flashcard-trainer.log"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyConfig {
    #[serde(default)]
    pub default_mode: StudyMode,
    #[serde(default = "default_feedback_delay")]
    pub feedback_delay_ms: u64,
}

fn default_feedback_delay() -> u64 { 500 }

impl StudyConfig {
    pub fn feedback_delay(&self) -> Duration {
        Duration::from_millis(self.feedback_delay_ms)
    }
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            default_mode: StudyMode::Sequential,
            feedback_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_true")]
    pub show_xp_bar: bool,
    #[serde(default = "default_heatmap_days")]
    pub heatmap_days: u32,
}

fn default_true() -> bool { true }
fn default_heatmap_days() -> u32 { DEFAULT_HEATMAP_DAYS }

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_xp_bar: true,
            heatmap_days: DEFAULT_HEATMAP_DAYS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String { "info".to_string() }

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: default_level() }
    }
}
