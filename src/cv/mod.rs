//! Nested cross-validation for abstract screening.
//!
//! This module tunes, evaluates and applies a text classifier that decides
//! which candidate documents belong in a review. Documents are represented by
//! their abstracts; the classifier is a pipeline of:
//!
//! - **TF-IDF** features over word n-grams
//! - **C-SVC** (linear or RBF kernel) with class-balanced weights and Platt
//!   scaled probabilities, wrapped one-vs-rest for multilabel targets
//!
//! ## Procedure
//!
//! For each of N outer folds over the labelled documents:
//!
//! 1. every parameter set is scored on N inner folds of the outer-training rows
//! 2. the best inner parameter set is refit and scored on the outer-test rows
//! 3. every parameter set is also scored on the outer split
//!
//! The parameter set with the best mean outer score fits the final model,
//! which then scores every unlabelled candidate.
//!
//! ## Targets
//!
//! The target is chosen by a column prefix. A single matching label column
//! makes a binary problem ranked by `f1_score`; several make a multilabel
//! problem ranked by `f1_score_macro` and trained only on rows with
//! `INCLUDE == 1`.
//!
//! ## Usage
//!
//! ```bash
//! nestcv INCLUDE 5
//! nestcv "ecosystem\." 3 --test --seed 42
//! ```
//!
//! Results land in `cv_data/<prefix>/`.
//!
//! ## Module Structure
//!
//! - `config`: TOML configuration
//! - `data`: CSV loading, title deduplication, dataset assembly
//! - `target`: target resolution and label arrays
//! - `grid`: typed parameter grids
//! - `tfidf`: TF-IDF vectorizer
//! - `svm`: C-SVC solver with probability estimates
//! - `pipeline`: estimator traits and the TF-IDF + SVC pipeline
//! - `metrics`: f1, precision and recall
//! - `kfold`: sequential k-fold splits
//! - `evaluate`: fit/evaluate unit and score records
//! - `select`: best parameter selection
//! - `nested`: nested cross-validation loops
//! - `predict`: final fit and prediction export
//! - `save`: output paths and JSON writers
//! - `run`: one complete run
//! - `cli`: command-line interface

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod evaluate;
pub mod grid;
pub mod kfold;
pub mod metrics;
pub mod nested;
pub mod pipeline;
pub mod predict;
pub mod run;
pub mod save;
pub mod select;
pub mod svm;
pub mod target;
pub mod tfidf;

pub use config::Config;
pub use error::{Error, Result};
pub use evaluate::{fit_eval_model, ScoreRecord};
pub use grid::{ParameterGrid, ParameterSet};
pub use nested::{NestedCv, NestedCvOutcome};
pub use pipeline::{Estimator, FittedModel, TfidfSvc};
pub use run::{run, RunOptions, RunOutcome};
pub use select::get_best_param;
pub use target::{Labels, TargetKind, TargetSpec};
