//! Fit/evaluate unit and score records.

use super::error::{Error, Result};
use super::grid::ParameterSet;
use super::metrics::{Average, Metric};
use super::pipeline::{Estimator, FittedModel};
use super::target::Labels;
use serde::Serialize;
use std::collections::BTreeMap;

/// Scores from one fit, keyed by metric name, optionally tagged with the id
/// of the parameter set that produced them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreRecord {
    #[serde(flatten)]
    pub scores: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param_id: Option<usize>,
}

impl ScoreRecord {
    pub fn with_param_id(mut self, id: usize) -> Self {
        self.param_id = Some(id);
        self
    }

    pub fn get(&self, metric: &str) -> Option<f64> {
        self.scores.get(metric).copied()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

fn shape(labels: &Labels) -> String {
    format!("{:?} {}x{}", labels.kind(), labels.len(), labels.n_labels())
}

/// Score predictions against ground truth.
///
/// Binary targets produce one entry per metric. Multilabel targets produce
/// `<metric>_micro`, `<metric>_macro`, `<metric>_weighted` and one
/// `<metric>_<c>` per label column.
///
/// # Errors
///
/// Returns [`Error::PredictionShape`] when `y_pred` is not the same variant
/// and shape as `y_true`.
pub fn score(y_true: &Labels, y_pred: &Labels, metrics: &[Metric]) -> Result<ScoreRecord> {
    if y_true.kind() != y_pred.kind()
        || y_true.len() != y_pred.len()
        || y_true.n_labels() != y_pred.n_labels()
    {
        return Err(Error::PredictionShape {
            expected: shape(y_true),
            found: shape(y_pred),
        });
    }

    let mut scores = BTreeMap::new();
    match (y_true, y_pred) {
        (Labels::Binary(t), Labels::Binary(p)) => {
            for metric in metrics {
                scores.insert(metric.name().to_string(), metric.score(t.view(), p.view()));
            }
        }
        (Labels::Multilabel(t), Labels::Multilabel(p)) => {
            for metric in metrics {
                for average in Average::ALL {
                    scores.insert(
                        format!("{}_{}", metric.name(), average.name()),
                        metric.score_averaged(t, p, average),
                    );
                }
                for c in 0..t.ncols() {
                    scores.insert(
                        format!("{}_{c}", metric.name()),
                        metric.score(t.column(c), p.column(c)),
                    );
                }
            }
        }
        _ => {
            return Err(Error::PredictionShape {
                expected: shape(y_true),
                found: shape(y_pred),
            })
        }
    }
    Ok(ScoreRecord {
        scores,
        param_id: None,
    })
}

/// Fit `estimator` on the `train` rows and score it on the `val` rows.
///
/// `texts` and `labels` are only read; row subsets are copied out.
///
/// # Arguments
///
/// * `estimator` - Pipeline to fit
/// * `params` - Parameter set applied before fitting
/// * `texts` - Feature text of every labelled row
/// * `labels` - Ground truth of every labelled row
/// * `train` - Rows to fit on
/// * `val` - Rows to score on
/// * `metrics` - Metrics to compute
pub fn fit_eval_model<E: Estimator>(
    estimator: &E,
    params: &ParameterSet,
    texts: &[String],
    labels: &Labels,
    train: &[usize],
    val: &[usize],
    metrics: &[Metric],
) -> Result<ScoreRecord> {
    let train_texts: Vec<&str> = train.iter().map(|&i| texts[i].as_str()).collect();
    let val_texts: Vec<&str> = val.iter().map(|&i| texts[i].as_str()).collect();

    let model = estimator.fit(params, &train_texts, &labels.select(train))?;
    let y_pred = model.predict(&val_texts);
    score(&labels.select(val), &y_pred, metrics)
}
