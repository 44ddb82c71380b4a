//! Configuration structures for a cross-validation run.
//!
//! Configuration is read from a TOML file. Every section has defaults that
//! reproduce the conventional project layout, so a partial file (or none at
//! all) is enough to start a run.

use super::error::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure loaded from `config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Input tables
    pub data: DataConfig,
    /// Column names inside the input tables
    pub columns: ColumnsConfig,
    /// Parameter grid files
    pub grid: GridConfig,
    /// Where results go
    pub output: OutputConfig,
    /// Sample sizes for `--test` runs
    pub test_mode: TestModeConfig,
    /// Seed for shuffling and sampling; entropy when unset
    pub seed: Option<u64>,
}

/// Input table locations.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// CSV of already-screened documents
    pub labelled_path: PathBuf,
    /// CSV of candidate documents (OpenAlex export)
    pub candidate_path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            labelled_path: PathBuf::from("data/labelled_data.csv"),
            candidate_path: PathBuf::from("data/openalex_data.csv"),
        }
    }
}

/// Column names. Label columns are discovered by prefix, not listed here.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColumnsConfig {
    /// Feature text
    pub text: String,
    /// Title used for deduplication
    pub title: String,
    /// Candidate identifier, written to the prediction table
    pub id: String,
    /// Seen flag of the labelled table
    pub seen: String,
    /// Inclusion flag restricting the labelled rows of multilabel runs
    pub include: String,
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        ColumnsConfig {
            text: "abstract".to_string(),
            title: "title".to_string(),
            id: "id".to_string(),
            seen: "seen".to_string(),
            include: "INCLUDE".to_string(),
        }
    }
}

impl ColumnsConfig {
    /// Columns that describe a document rather than a label.
    pub fn is_structural(&self, name: &str) -> bool {
        name == self.text || name == self.title || name == self.id || name == self.seen
    }
}

/// Parameter grid files, one per target kind.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub binary_path: PathBuf,
    pub multilabel_path: PathBuf,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            binary_path: PathBuf::from("parameter_space.json"),
            multilabel_path: PathBuf::from("parameter_space_multilabel.json"),
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Results land in `<root>/<y_prefix>/`
    pub root: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            root: PathBuf::from("cv_data"),
        }
    }
}

/// Reduced sizes used by `--test` smoke runs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TestModeConfig {
    /// Labelled documents kept
    pub labelled_sample: usize,
    /// Candidate documents kept
    pub candidate_sample: usize,
    /// Parameter combinations kept
    pub param_sample: usize,
}

impl Default for TestModeConfig {
    fn default() -> Self {
        TestModeConfig {
            labelled_sample: 500,
            candidate_sample: 100,
            param_sample: 5,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::warn!(path = %path.display(), "config file not found, using defaults");
            Ok(Config::default())
        }
    }
}
