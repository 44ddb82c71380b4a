//! Text classification pipelines.
//!
//! Every pipeline is a TF-IDF vectorizer followed by a classifier. A binary
//! target gets a single SVC. A multilabel target gets one SVC per label
//! column, all sharing the vectorizer. The orchestrator only talks to the
//! [`Estimator`] and [`FittedModel`] traits, so any other text classifier can
//! be plugged in.

use super::config::GridConfig;
use super::error::Result;
use super::grid::{ParameterGrid, ParameterSet};
use super::svm::Svc;
use super::target::{Labels, TargetKind, TargetSpec};
use super::tfidf::TfidfVectorizer;
use ndarray::{Array1, Array2, Axis};

/// Something that can be fitted to labelled texts under a parameter set.
pub trait Estimator {
    type Model: FittedModel;

    fn fit(&self, params: &ParameterSet, texts: &[&str], labels: &Labels) -> Result<Self::Model>;
}

/// A fitted text classifier.
pub trait FittedModel {
    /// Hard predictions: one row per text, with the same [`Labels`] variant
    /// and label count as the training labels. Anything else makes scoring
    /// fail with [`Error::PredictionShape`](super::error::Error::PredictionShape).
    fn predict(&self, texts: &[&str]) -> Labels;

    /// Positive-class probability, one column per label.
    fn predict_proba(&self, texts: &[&str]) -> Array2<f64>;
}

/// TF-IDF + SVC pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TfidfSvc {
    pub kind: TargetKind,
}

impl TfidfSvc {
    pub fn new(kind: TargetKind) -> Self {
        TfidfSvc { kind }
    }
}

/// Build the pipeline for `target` and load the matching parameter grid.
pub fn for_target(target: &TargetSpec, grids: &GridConfig) -> Result<(TfidfSvc, ParameterGrid)> {
    let kind = target.kind();
    let path = match kind {
        TargetKind::Binary => &grids.binary_path,
        TargetKind::Multilabel => &grids.multilabel_path,
    };
    tracing::info!(?kind, grid = %path.display(), "building pipeline");
    let grid = ParameterGrid::load(path, kind)?;
    Ok((TfidfSvc::new(kind), grid))
}

#[derive(Debug, Clone)]
enum Classifier {
    Binary(Svc),
    OneVsRest(Vec<Svc>),
}

/// A fitted [`TfidfSvc`].
#[derive(Debug, Clone)]
pub struct FittedTfidfSvc {
    vectorizer: TfidfVectorizer,
    classifier: Classifier,
}

impl Estimator for TfidfSvc {
    type Model = FittedTfidfSvc;

    fn fit(&self, params: &ParameterSet, texts: &[&str], labels: &Labels) -> Result<FittedTfidfSvc> {
        debug_assert_eq!(labels.kind(), self.kind, "labels do not match the pipeline");
        let mut vectorizer = TfidfVectorizer::new(params.tfidf_params());
        let x = vectorizer.fit_transform(texts)?;
        let n_features = vectorizer.n_features();
        let svc_params = params.svc_params();

        let classifier = match labels {
            Labels::Binary(y) => Classifier::Binary(Svc::fit(&svc_params, &x, y.view(), n_features)),
            Labels::Multilabel(y) => Classifier::OneVsRest(
                y.axis_iter(Axis(1))
                    .map(|column| Svc::fit(&svc_params, &x, column, n_features))
                    .collect(),
            ),
        };
        Ok(FittedTfidfSvc {
            vectorizer,
            classifier,
        })
    }
}

impl FittedModel for FittedTfidfSvc {
    fn predict(&self, texts: &[&str]) -> Labels {
        let x = self.vectorizer.transform_all(texts);
        match &self.classifier {
            Classifier::Binary(svc) => Labels::Binary(x.iter().map(|xi| svc.predict(xi)).collect::<Array1<bool>>()),
            Classifier::OneVsRest(svcs) => {
                Labels::Multilabel(Array2::from_shape_fn((x.len(), svcs.len()), |(i, c)| {
                    svcs[c].predict(&x[i])
                }))
            }
        }
    }

    fn predict_proba(&self, texts: &[&str]) -> Array2<f64> {
        let x = self.vectorizer.transform_all(texts);
        let svcs: &[Svc] = match &self.classifier {
            Classifier::Binary(svc) => std::slice::from_ref(svc),
            Classifier::OneVsRest(svcs) => svcs,
        };
        Array2::from_shape_fn((x.len(), svcs.len()), |(i, c)| svcs[c].predict_proba(&x[i]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cv::grid::Setting;
    use crate::cv::svm::Kernel;
    use ndarray::array;

    const TEXTS: [&str; 8] = [
        "protein folding molecular dynamics",
        "molecular protein structure simulation",
        "protein binding affinity molecular",
        "structure of protein complexes",
        "stock market volatility forecasting",
        "market prices and volatility",
        "forecasting stock returns market",
        "volatility of asset prices",
    ];

    fn linear() -> ParameterSet {
        ParameterSet::new(vec![("clf__kernel".into(), Setting::Kernel(Kernel::Linear))])
    }

    #[test]
    fn test_binary_pipeline_learns_topics() {
        let labels = Labels::Binary(Array1::from(vec![true, true, true, true, false, false, false, false]));
        let model = TfidfSvc::new(TargetKind::Binary)
            .fit(&linear(), &TEXTS, &labels)
            .unwrap();

        let queries = ["molecular protein", "stock volatility"];
        assert_eq!(
            model.predict(&queries),
            Labels::Binary(Array1::from(vec![true, false]))
        );
        let proba = model.predict_proba(&queries);
        assert_eq!(proba.dim(), (2, 1));
        assert!(proba[[0, 0]] > proba[[1, 0]]);
    }

    #[test]
    fn test_one_vs_rest_shapes() {
        let labels = Labels::Multilabel(array![
            [true, false],
            [true, false],
            [true, true],
            [true, false],
            [false, true],
            [false, true],
            [false, false],
            [false, true],
        ]);
        let model = TfidfSvc::new(TargetKind::Multilabel)
            .fit(&linear(), &TEXTS, &labels)
            .unwrap();

        let queries = ["protein", "market", "unrelated words"];
        match model.predict(&queries) {
            Labels::Multilabel(y) => assert_eq!(y.dim(), (3, 2)),
            other => panic!("expected multilabel predictions, got {other:?}"),
        }
        let proba = model.predict_proba(&queries);
        assert_eq!(proba.dim(), (3, 2));
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_constant_label_column_is_handled() {
        let labels = Labels::Multilabel(Array2::from_shape_fn((8, 2), |(i, c)| c == 0 && i < 4));
        let model = TfidfSvc::new(TargetKind::Multilabel)
            .fit(&ParameterSet::default(), &TEXTS, &labels)
            .unwrap();
        let proba = model.predict_proba(&["protein"]);
        assert!(proba[[0, 1]] < 0.5);
    }
}
