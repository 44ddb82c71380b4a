//! Error types for the nested cross-validation run.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can abort a run.
///
/// A prefix that matches no label column is not an error: it is reported as
/// [`RunOutcome::NoTarget`](super::run::RunOutcome::NoTarget) before anything
/// is computed.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read or write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Config file could not be parsed
    #[error("config error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required column is absent from an input table
    #[error("column '{column}' not found in {path}")]
    MissingColumn {
        /// Column that was looked up
        column: String,
        /// File that was read
        path: PathBuf,
    },

    /// A labelled row has no value for a target column
    #[error("labelled row {row} has no value for target column '{column}'")]
    MissingLabel {
        /// Dataset row
        row: usize,
        /// Target column
        column: String,
    },

    /// A label cell could not be read as 0/1
    #[error("cannot read '{value}' in column '{column}' as a label")]
    InvalidLabel {
        /// Offending column
        column: String,
        /// Raw cell contents
        value: String,
    },

    /// The target prefix is not a valid pattern
    #[error("invalid target prefix '{prefix}': {source}")]
    InvalidPrefix {
        /// Prefix as given on the command line
        prefix: String,
        /// Regex compile error
        #[source]
        source: regex::Error,
    },

    /// The parameter grid failed validation
    #[error("invalid parameter grid: {0}")]
    InvalidGrid(String),

    /// Fold count does not fit the number of rows
    #[error("cannot split {n_samples} rows into {n_splits} folds")]
    InvalidFolds {
        /// Requested fold count
        n_splits: usize,
        /// Rows available
        n_samples: usize,
    },

    /// The vectorizer kept no terms
    #[error("empty vocabulary: {0}")]
    EmptyVocabulary(String),

    /// A score record lacks the metric used for selection
    #[error("score record has no metric '{0}'")]
    MissingMetric(String),

    /// A score record has no parameter id
    #[error("score record has no param_id")]
    MissingParamId,

    /// A fitted model returned predictions shaped unlike the ground truth
    #[error("predictions shaped {found} do not match labels shaped {expected}")]
    PredictionShape {
        /// Ground truth kind and rows x labels
        expected: String,
        /// Prediction kind and rows x labels
        found: String,
    },

    /// Selection was asked to pick from nothing
    #[error("no score records to select from")]
    NoScores,
}
