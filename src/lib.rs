//! # nestcv - Nested Cross-Validation for Abstract Screening
//!
//! Tune, evaluate and apply a TF-IDF + SVM text classifier that screens
//! candidate documents for a literature review, in pure Rust.
//!
//! ## Features
//!
//! - **Nested cross-validation**: inner folds tune, outer folds evaluate
//! - **Binary and multilabel targets**: chosen by a label column prefix
//! - **Typed parameter grids**: JSON grids validated at load time
//! - **Probability export**: Platt-scaled scores for every candidate
//!
//! ## Quick Start
//!
//! ```no_run
//! use nestcv::cv::{run, Config, RunOptions, RunOutcome};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_or_default("config.toml")?;
//!     let options = RunOptions {
//!         y_prefix: "INCLUDE".to_string(),
//!         n_splits: 5,
//!         test: false,
//!     };
//!
//!     match run(&config, &options)? {
//!         RunOutcome::Completed { cv, predictions, .. } => {
//!             println!("best parameter set: {}", cv.best_param_id);
//!             println!("predictions: {}", predictions.display());
//!         }
//!         RunOutcome::NoTarget { prefix } => eprintln!("no column matches {prefix}"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Using the pieces directly
//!
//! ```no_run
//! # use nestcv::cv::{Estimator, FittedModel, Labels, ParameterSet, TargetKind, TfidfSvc};
//! # use ndarray::Array1;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let texts = ["coral reef decline", "reef bleaching events", "urban traffic", "traffic models"];
//! let labels = Labels::Binary(Array1::from(vec![true, true, false, false]));
//!
//! let model = TfidfSvc::new(TargetKind::Binary).fit(&ParameterSet::default(), &texts, &labels)?;
//! let proba = model.predict_proba(&["reef monitoring"]);
//! println!("p(include) = {:.3}", proba[[0, 0]]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Cargo Features
//!
//! | Feature | Description | Default |
//! |---------|-------------|---------|
//! | `cli` | Include CLI binary | ✓ |
//!
//! ```toml
//! # Library only
//! nestcv = { version = "0.1", default-features = false }
//! ```
//!
//! ## Input Files
//!
//! - `data/labelled_data.csv`: screened documents with `abstract`, `title`,
//!   `seen` and one column per label
//! - `data/openalex_data.csv`: candidates with `id`, `title`, `abstract`
//! - `parameter_space.json` / `parameter_space_multilabel.json`: grids
//!
//! All paths can be changed in `config.toml`.

pub mod cv;
