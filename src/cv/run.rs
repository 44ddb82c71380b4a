//! One batch run: data, target, grid, nested CV, predictions.

use super::config::Config;
use super::data::{load_data, Sampling};
use super::error::Result;
use super::grid::sample_combinations;
use super::metrics::Metric;
use super::nested::{NestedCv, NestedCvOutcome};
use super::pipeline::for_target;
use super::predict::predict;
use super::save::{write_json, OutputLayout};
use super::target::TargetSpec;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

/// Per-invocation options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Pattern matched against the start of each label column name
    pub y_prefix: String,
    pub n_splits: usize,
    /// Sample the data and the grid down for a quick smoke run
    pub test: bool,
}

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    Completed {
        target: TargetSpec,
        /// Number of parameter sets searched
        n_combinations: usize,
        cv: NestedCvOutcome,
        predictions: PathBuf,
        n_predictions: usize,
    },
    /// No label column matched the prefix. Nothing was written.
    NoTarget { prefix: String },
}

/// Run nested cross-validation for one target and predict the candidates.
///
/// # Arguments
///
/// * `config` - Input paths, column names, grids and output root
/// * `options` - Target prefix, fold count and test mode
///
/// # Returns
///
/// `RunOutcome::NoTarget` when no column matches the prefix. Nothing is
/// written in that case.
pub fn run(config: &Config, options: &RunOptions) -> Result<RunOutcome> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let sampling = options.test.then(|| Sampling {
        labelled: config.test_mode.labelled_sample,
        candidates: config.test_mode.candidate_sample,
    });
    let dataset = load_data(
        &config.data.labelled_path,
        &config.data.candidate_path,
        &config.columns,
        sampling,
        &mut rng,
    )?;

    let Some(target) = TargetSpec::resolve(&options.y_prefix, &dataset.label_columns)? else {
        tracing::error!(prefix = %options.y_prefix, "no label column matches the target prefix");
        return Ok(RunOutcome::NoTarget {
            prefix: options.y_prefix.clone(),
        });
    };
    tracing::info!(columns = ?target.columns(), "resolved target");

    let (estimator, grid) = for_target(&target, &config.grid)?;
    let mut combinations = grid.expand();
    if options.test {
        combinations = sample_combinations(combinations, config.test_mode.param_sample, &mut rng);
    }
    tracing::info!(n_combinations = combinations.len(), "expanded parameter grid");

    let layout = OutputLayout::new(&config.output.root, &options.y_prefix, options.n_splits);
    layout.create()?;
    write_json(&layout.parameter_combinations(), &combinations)?;

    let rows = target.labelled_rows(&dataset, &config.columns.include)?;
    let labels = target.labels(&dataset, &rows)?;
    let texts = dataset.texts(&rows);
    tracing::info!(labelled = rows.len(), "starting nested cross-validation");

    let cv = NestedCv {
        estimator: &estimator,
        combinations: &combinations,
        metrics: &Metric::ALL,
        scorer: target.kind().primary_scorer(),
        n_splits: options.n_splits,
    }
    .run(&texts, &labels, &layout)?;

    let candidates = dataset.unseen_rows();
    let predictions = layout.predictions();
    let n_predictions = predict(
        &estimator,
        &combinations[cv.best_param_id],
        &target,
        &texts,
        &labels,
        &dataset.ids(&candidates),
        &dataset.texts(&candidates),
        &predictions,
    )?;

    Ok(RunOutcome::Completed {
        target,
        n_combinations: combinations.len(),
        cv,
        predictions,
        n_predictions,
    })
}
