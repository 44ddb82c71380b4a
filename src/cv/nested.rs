//! Nested cross-validation.
//!
//! For every outer fold:
//!
//! 1. **Tune**: split the outer-training rows into inner folds and score every
//!    parameter set on every inner fold.
//! 2. **Evaluate**: refit the best inner parameter set on the outer-training
//!    rows and score it on the outer-test rows.
//! 3. **Search**: score every parameter set on the outer split as well. These
//!    records pick the parameter set for the final model.
//!
//! Inner records are written after each outer fold; the outer evaluation and
//! search records are written once all folds are done.

use super::error::{Error, Result};
use super::evaluate::{fit_eval_model, ScoreRecord};
use super::grid::ParameterSet;
use super::kfold::KFold;
use super::metrics::Metric;
use super::pipeline::Estimator;
use super::save::{write_json, OutputLayout};
use super::select::get_best_param;
use super::target::Labels;
use std::collections::BTreeMap;
use std::time::Instant;

/// Settings for one nested cross-validation run.
pub struct NestedCv<'a, E: Estimator> {
    pub estimator: &'a E,
    /// Candidate parameter sets; a set's id is its position
    pub combinations: &'a [ParameterSet],
    pub metrics: &'a [Metric],
    /// Metric name used to rank parameter sets
    pub scorer: &'a str,
    /// Fold count for both the outer and the inner loop
    pub n_splits: usize,
}

/// Everything a nested run produces.
#[derive(Debug, Clone, Default)]
pub struct NestedCvOutcome {
    /// Inner tuning records, one list per outer fold
    pub inner_results: Vec<Vec<ScoreRecord>>,
    /// One record per outer fold for the tuned model
    pub outer_results: Vec<ScoreRecord>,
    /// One record per (outer fold, parameter set)
    pub outer_search_results: Vec<ScoreRecord>,
    /// Winner of the outer search
    pub best_param_id: usize,
}

impl<E: Estimator> NestedCv<'_, E> {
    /// Run the nested loops and write the per-fold result files.
    ///
    /// # Arguments
    ///
    /// * `texts` - Labelled documents only, in dataset order
    /// * `labels` - Labels aligned with `texts`
    /// * `layout` - Output directory; must already exist
    pub fn run(&self, texts: &[String], labels: &Labels, layout: &OutputLayout) -> Result<NestedCvOutcome> {
        if self.combinations.is_empty() {
            return Err(Error::InvalidGrid("no parameter combinations".into()));
        }
        let splitter = KFold::new(self.n_splits);
        let outer_folds = splitter.split(labels.len())?;
        let mut outcome = NestedCvOutcome::default();

        for (i, outer) in outer_folds.iter().enumerate() {
            let fold_start = Instant::now();

            // Tune
            let mut inner_results = Vec::new();
            for inner in splitter.split(outer.train.len())? {
                let train: Vec<usize> = inner.train.iter().map(|&p| outer.train[p]).collect();
                let val: Vec<usize> = inner.test.iter().map(|&p| outer.train[p]).collect();
                for (k, params) in self.combinations.iter().enumerate() {
                    let record = fit_eval_model(self.estimator, params, texts, labels, &train, &val, self.metrics)?;
                    inner_results.push(record.with_param_id(k));
                }
            }
            write_json(&layout.inner_results(i), &inner_results)?;

            // Evaluate
            let best = get_best_param(&inner_results, self.scorer)?;
            let record = fit_eval_model(
                self.estimator,
                &self.combinations[best],
                texts,
                labels,
                &outer.train,
                &outer.test,
                self.metrics,
            )?;
            tracing::info!(
                fold = i,
                best_param_id = best,
                score = record.get(self.scorer),
                scorer = self.scorer,
                "outer fold evaluated"
            );
            outcome.outer_results.push(record.with_param_id(best));

            // Search
            for (k, params) in self.combinations.iter().enumerate() {
                let record = fit_eval_model(
                    self.estimator,
                    params,
                    texts,
                    labels,
                    &outer.train,
                    &outer.test,
                    self.metrics,
                )?;
                outcome.outer_search_results.push(record.with_param_id(k));
            }

            tracing::info!(
                fold = i,
                n_splits = self.n_splits,
                elapsed_s = fold_start.elapsed().as_secs_f64(),
                "outer fold complete"
            );
            outcome.inner_results.push(inner_results);
        }

        write_json(&layout.outer_results(), &outcome.outer_results)?;
        write_json(&layout.outer_param_search(), &outcome.outer_search_results)?;

        for (metric, (mean, std)) in summarize(&outcome.outer_results) {
            tracing::info!(%metric, mean, std, "outer evaluation");
        }

        outcome.best_param_id = get_best_param(&outcome.outer_search_results, self.scorer)?;
        tracing::info!(best_param_id = outcome.best_param_id, "selected final parameters");
        Ok(outcome)
    }
}

/// Mean and population standard deviation of every metric across records.
pub fn summarize(records: &[ScoreRecord]) -> BTreeMap<String, (f64, f64)> {
    let mut values: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for record in records {
        for (name, &value) in &record.scores {
            values.entry(name).or_default().push(value);
        }
    }
    values
        .into_iter()
        .map(|(name, vs)| {
            let n = vs.len() as f64;
            let mean = vs.iter().sum::<f64>() / n;
            let var = vs.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            (name.to_string(), (mean, var.sqrt()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cv::grid::Setting;
    use crate::cv::pipeline::FittedModel;
    use ndarray::{Array1, Array2};
    use std::cell::RefCell;

    /// Predicts a constant label picked by the `C` parameter and logs every
    /// training set it sees.
    struct Fixed {
        fits: RefCell<Vec<Vec<String>>>,
    }

    struct FixedModel(bool);

    impl Estimator for Fixed {
        type Model = FixedModel;

        fn fit(&self, params: &ParameterSet, texts: &[&str], _: &Labels) -> Result<FixedModel> {
            self.fits
                .borrow_mut()
                .push(texts.iter().map(|t| t.to_string()).collect());
            Ok(FixedModel(params.svc_params().c > 1.0))
        }
    }

    impl FittedModel for FixedModel {
        fn predict(&self, texts: &[&str]) -> Labels {
            Labels::Binary(Array1::from_elem(texts.len(), self.0))
        }

        fn predict_proba(&self, texts: &[&str]) -> Array2<f64> {
            Array2::from_elem((texts.len(), 1), if self.0 { 1.0 } else { 0.0 })
        }
    }

    fn combos() -> Vec<ParameterSet> {
        [0.5, 2.0]
            .into_iter()
            .map(|c| ParameterSet::new(vec![("clf__C".into(), Setting::C(c))]))
            .collect()
    }

    #[test]
    fn test_record_counts_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path(), "y", 3);
        layout.create().unwrap();

        let texts: Vec<String> = (0..9).map(|i| format!("doc{i}")).collect();
        let labels = Labels::Binary(Array1::from_elem(9, true));
        let estimator = Fixed {
            fits: RefCell::new(Vec::new()),
        };
        let combinations = combos();
        let cv = NestedCv {
            estimator: &estimator,
            combinations: &combinations,
            metrics: &Metric::ALL,
            scorer: "f1_score",
            n_splits: 3,
        };
        let outcome = cv.run(&texts, &labels, &layout).unwrap();

        assert_eq!(outcome.inner_results.len(), 3);
        assert!(outcome.inner_results.iter().all(|r| r.len() == 3 * 2));
        assert_eq!(outcome.outer_results.len(), 3);
        assert_eq!(outcome.outer_search_results.len(), 3 * 2);
        // Predicting all-positive wins when every label is positive
        assert_eq!(outcome.best_param_id, 1);
        assert!(outcome.outer_results.iter().all(|r| r.param_id == Some(1)));

        // inner fits + 1 refit + 2 search fits per outer fold
        assert_eq!(estimator.fits.borrow().len(), 3 * (3 * 2 + 1 + 2));

        for i in 0..3 {
            assert!(layout.inner_results(i).exists());
        }
        let search: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(layout.outer_param_search()).unwrap()).unwrap();
        assert_eq!(search.as_array().unwrap().len(), 6);
    }

    #[test]
    fn test_inner_training_stays_inside_outer_training() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path(), "y", 2);
        layout.create().unwrap();

        let texts: Vec<String> = (0..8).map(|i| format!("doc{i}")).collect();
        let labels = Labels::Binary(Array1::from_elem(8, false));
        let estimator = Fixed {
            fits: RefCell::new(Vec::new()),
        };
        let combinations = combos()[..1].to_vec();
        NestedCv {
            estimator: &estimator,
            combinations: &combinations,
            metrics: &[Metric::F1],
            scorer: "f1_score",
            n_splits: 2,
        }
        .run(&texts, &labels, &layout)
        .unwrap();

        let fits = estimator.fits.borrow();
        // Outer fold 0 tests on doc0..doc3; its inner fits only see doc4..doc7
        assert_eq!(fits[0], vec!["doc6", "doc7"]);
        assert_eq!(fits[1], vec!["doc4", "doc5"]);
        assert_eq!(fits[2], vec!["doc4", "doc5", "doc6", "doc7"]);
    }

    #[test]
    fn test_summarize() {
        let mut a = ScoreRecord::default();
        a.scores.insert("f1_score".into(), 0.4);
        let mut b = ScoreRecord::default();
        b.scores.insert("f1_score".into(), 0.8);
        let summary = summarize(&[a, b]);
        let (mean, std) = summary["f1_score"];
        assert!((mean - 0.6).abs() < 1e-12);
        assert!((std - 0.2).abs() < 1e-12);
    }
}
