//! Compile options — metre and tempo bounds, loaded from ~/.trackc/options.yaml.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Options that shape the generated Program IR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompileOptions {
    #[serde(default = "default_beats_per_bar")]
    pub beats_per_bar: u32,
    #[serde(default = "default_steps_per_beat")]
    pub steps_per_beat: u32,
    #[serde(default)]
    pub tempo: TempoOptions,
}

/// Tempo used when a track sets none, and the range every tempo is clamped to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoOptions {
    #[serde(default = "default_tempo")]
    pub default: f64,
    #[serde(default = "default_minimum_tempo")]
    pub minimum: f64,
    #[serde(default = "default_maximum_tempo")]
    pub maximum: f64,
}

fn default_beats_per_bar() -> u32 {
    4
}

fn default_steps_per_beat() -> u32 {
    4
}

fn default_tempo() -> f64 {
    120.0
}

fn default_minimum_tempo() -> f64 {
    1.0
}

fn default_maximum_tempo() -> f64 {
    300.0
}

impl Default for TempoOptions {
    fn default() -> Self {
        Self {
            default: default_tempo(),
            minimum: default_minimum_tempo(),
            maximum: default_maximum_tempo(),
        }
    }
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            beats_per_bar: default_beats_per_bar(),
            steps_per_beat: default_steps_per_beat(),
            tempo: TempoOptions::default(),
        }
    }
}

impl CompileOptions {
    /// The standard options path, `~/.trackc/options.yaml`.
    pub fn default_path() -> Option<PathBuf> {
        let home = dirs::home_dir()?;
        Some(home.join(".trackc").join("options.yaml"))
    }

    /// Load options from the standard path.
    /// Returns None if the file doesn't exist or can't be parsed.
    pub fn load() -> Option<Self> {
        Self::load_from(Self::default_path()?)
    }

    /// Load options from `path`, or None if it is missing or invalid.
    pub fn load_from(path: impl AsRef<Path>) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        serde_yaml::from_str(&content).ok()
    }

    /// Load options from an explicit YAML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Clamp `bpm` into `[minimum, maximum]`. If the bounds are inverted the
    /// minimum wins.
    pub fn clamp_tempo(&self, bpm: f64) -> f64 {
        bpm.min(self.tempo.maximum).max(self.tempo.minimum)
    }
}

/// Failure to read an options file.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Io { path: PathBuf, message: String },
    Parse { path: PathBuf, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, message } => {
                write!(f, "cannot read {}: {message}", path.display())
            }
            ConfigError::Parse { path, message } => {
                write!(f, "invalid options in {}: {message}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {}
