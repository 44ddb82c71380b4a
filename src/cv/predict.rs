//! Final model fit and candidate scoring.

use super::error::Result;
use super::grid::ParameterSet;
use super::pipeline::{Estimator, FittedModel};
use super::target::{Labels, TargetSpec};
use std::path::Path;

/// Fit `estimator` on all labelled rows and write positive-class
/// probabilities for every candidate row to `path`.
///
/// Binary targets get an `OA_id,prediction` table. Multilabel targets get one
/// `prediction_<label>` column per label, in target order.
///
/// # Arguments
///
/// * `estimator` - Pipeline to fit, matching `target`'s kind
/// * `params` - Winning parameter set of the outer search
/// * `target` - Resolved target, names the prediction columns
/// * `train_texts` / `train_labels` - All labelled rows, aligned
/// * `candidate_ids` / `candidate_texts` - Candidate pool, aligned
/// * `path` - Output CSV, usually `OutputLayout::predictions`
///
/// # Returns
///
/// The number of rows written.
#[allow(clippy::too_many_arguments)]
pub fn predict<E: Estimator>(
    estimator: &E,
    params: &ParameterSet,
    target: &TargetSpec,
    train_texts: &[String],
    train_labels: &Labels,
    candidate_ids: &[String],
    candidate_texts: &[String],
    path: &Path,
) -> Result<usize> {
    let train: Vec<&str> = train_texts.iter().map(String::as_str).collect();
    let candidates: Vec<&str> = candidate_texts.iter().map(String::as_str).collect();

    tracing::info!(train = train.len(), candidates = candidates.len(), "fitting final model");
    let model = estimator.fit(params, &train, train_labels)?;
    let proba = model.predict_proba(&candidates);

    let mut writer = csv::Writer::from_path(path)?;
    let mut header = vec!["OA_id".to_string()];
    match target {
        TargetSpec::Binary(_) => header.push("prediction".to_string()),
        TargetSpec::Multilabel(columns) => {
            header.extend(columns.iter().map(|c| format!("prediction_{c}")))
        }
    }
    writer.write_record(&header)?;

    for (id, row) in candidate_ids.iter().zip(proba.rows()) {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(id.clone());
        record.extend(row.iter().map(|p| p.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;

    tracing::info!(path = %path.display(), rows = candidate_ids.len(), "wrote predictions");
    Ok(candidate_ids.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cv::grid::Setting;
    use crate::cv::pipeline::TfidfSvc;
    use crate::cv::svm::Kernel;
    use crate::cv::target::TargetKind;
    use ndarray::{array, Array1};

    fn docs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn linear() -> ParameterSet {
        ParameterSet::new(vec![("clf__kernel".into(), Setting::Kernel(Kernel::Linear))])
    }

    #[test]
    fn test_binary_prediction_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predictions.csv");
        let texts = docs(&[
            "graph neural networks",
            "neural networks for graphs",
            "deep neural models",
            "soil erosion in rivers",
            "river sediment and soil",
            "erosion of river banks",
        ]);
        let labels = Labels::Binary(Array1::from(vec![true, true, true, false, false, false]));

        let rows = predict(
            &TfidfSvc::new(TargetKind::Binary),
            &linear(),
            &TargetSpec::Binary("y".into()),
            &texts,
            &labels,
            &docs(&["W1", "W2"]),
            &docs(&["neural graphs", "soil rivers"]),
            &path,
        )
        .unwrap();
        assert_eq!(rows, 2);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(reader.headers().unwrap(), vec!["OA_id", "prediction"]);
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(&records[0][0], "W1");
        let p: Vec<f64> = records.iter().map(|r| r[1].parse().unwrap()).collect();
        assert!(p.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(p[0] > p[1]);
    }

    #[test]
    fn test_multilabel_prediction_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predictions.csv");
        let texts = docs(&["a1 alpha", "b1 beta", "alpha beta", "gamma delta"]);
        let labels = Labels::Multilabel(array![[true, false], [false, true], [true, true], [false, false]]);

        predict(
            &TfidfSvc::new(TargetKind::Multilabel),
            &linear(),
            &TargetSpec::Multilabel(vec!["ecosystem.1".into(), "ecosystem.2".into()]),
            &texts,
            &labels,
            &docs(&["W9"]),
            &docs(&["alpha"]),
            &path,
        )
        .unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(
            reader.headers().unwrap(),
            vec!["OA_id", "prediction_ecosystem.1", "prediction_ecosystem.2"]
        );
        assert_eq!(reader.records().count(), 1);
    }
}
