//! Typed hyperparameter grids.
//!
//! A grid file maps pipeline parameter names to lists of candidate values:
//!
//! ```json
//! {
//!   "vect__ngram_range": [[1, 1], [1, 2]],
//!   "vect__min_df": [1, 0.01],
//!   "clf__C": [0.1, 1, 10],
//!   "clf__kernel": ["linear", "rbf"]
//! }
//! ```
//!
//! A list of such objects is also accepted; each object is expanded on its
//! own and the results are concatenated. Keys are checked against the
//! pipeline kind when the file is loaded: binary pipelines address the
//! classifier as `clf__<name>`, multilabel pipelines as
//! `clf__estimator__<name>`.

use super::error::{Error, Result};
use super::svm::{Gamma, Kernel, SvcParams};
use super::target::TargetKind;
use super::tfidf::{DocFreq, TfidfParams};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// One typed hyperparameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Setting {
    NgramRange(usize, usize),
    MinDf(DocFreq),
    MaxDf(DocFreq),
    MaxFeatures(Option<usize>),
    SublinearTf(bool),
    UseIdf(bool),
    Lowercase(bool),
    C(f64),
    Kernel(Kernel),
    Gamma(Gamma),
    Tol(f64),
    /// `None` means no iteration cap
    MaxIter(Option<usize>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Vectorizer,
    Classifier,
}

fn split_key(key: &str, kind: TargetKind) -> Option<(Step, &str)> {
    let classifier_prefix = match kind {
        TargetKind::Binary => "clf__",
        TargetKind::Multilabel => "clf__estimator__",
    };
    if let Some(name) = key.strip_prefix("vect__") {
        Some((Step::Vectorizer, name))
    } else if let Some(name) = key.strip_prefix(classifier_prefix) {
        // clf__estimator__C must not parse as a binary key named "estimator__C"
        (!name.contains("__")).then_some((Step::Classifier, name))
    } else {
        None
    }
}

fn positive_f64(value: &Value) -> Option<f64> {
    value.as_f64().filter(|v| *v > 0.0 && v.is_finite())
}

fn doc_freq(value: &Value) -> Option<DocFreq> {
    if let Some(n) = value.as_u64() {
        return Some(DocFreq::Count(n as usize));
    }
    value
        .as_f64()
        .filter(|v| (0.0..=1.0).contains(v))
        .map(DocFreq::Proportion)
}

impl Setting {
    fn parse(step: Step, name: &str, value: &Value) -> std::result::Result<Self, String> {
        let bad = || format!("invalid value {value} for '{name}'");
        let setting = match (step, name) {
            (Step::Vectorizer, "ngram_range") => {
                let pair = value.as_array().filter(|a| a.len() == 2).ok_or_else(bad)?;
                let lo = pair[0].as_u64().ok_or_else(bad)? as usize;
                let hi = pair[1].as_u64().ok_or_else(bad)? as usize;
                if lo == 0 || lo > hi {
                    return Err(bad());
                }
                Setting::NgramRange(lo, hi)
            }
            (Step::Vectorizer, "min_df") => Setting::MinDf(doc_freq(value).ok_or_else(bad)?),
            (Step::Vectorizer, "max_df") => Setting::MaxDf(doc_freq(value).ok_or_else(bad)?),
            (Step::Vectorizer, "max_features") => match value {
                Value::Null => Setting::MaxFeatures(None),
                v => Setting::MaxFeatures(Some(
                    v.as_u64().filter(|n| *n > 0).ok_or_else(bad)? as usize,
                )),
            },
            (Step::Vectorizer, "sublinear_tf") => Setting::SublinearTf(value.as_bool().ok_or_else(bad)?),
            (Step::Vectorizer, "use_idf") => Setting::UseIdf(value.as_bool().ok_or_else(bad)?),
            (Step::Vectorizer, "lowercase") => Setting::Lowercase(value.as_bool().ok_or_else(bad)?),
            (Step::Classifier, "C") => Setting::C(positive_f64(value).ok_or_else(bad)?),
            (Step::Classifier, "kernel") => Setting::Kernel(match value.as_str() {
                Some("linear") => Kernel::Linear,
                Some("rbf") => Kernel::Rbf,
                _ => return Err(bad()),
            }),
            (Step::Classifier, "gamma") => Setting::Gamma(match value {
                Value::String(s) if s == "scale" => Gamma::Scale,
                Value::String(s) if s == "auto" => Gamma::Auto,
                v => Gamma::Value(positive_f64(v).ok_or_else(bad)?),
            }),
            (Step::Classifier, "tol") => Setting::Tol(positive_f64(value).ok_or_else(bad)?),
            (Step::Classifier, "max_iter") => match value.as_i64() {
                Some(-1) => Setting::MaxIter(None),
                Some(n) if n > 0 => Setting::MaxIter(Some(n as usize)),
                _ => return Err(bad()),
            },
            _ => return Err(format!("unknown parameter '{name}'")),
        };
        Ok(setting)
    }

    /// The value as it appears in a grid file.
    pub fn to_json(&self) -> Value {
        fn df(v: &DocFreq) -> Value {
            match v {
                DocFreq::Count(n) => json!(n),
                DocFreq::Proportion(p) => json!(p),
            }
        }
        match self {
            Setting::NgramRange(lo, hi) => json!([lo, hi]),
            Setting::MinDf(v) | Setting::MaxDf(v) => df(v),
            Setting::MaxFeatures(n) => json!(n),
            Setting::SublinearTf(b) | Setting::UseIdf(b) | Setting::Lowercase(b) => json!(b),
            Setting::C(c) => json!(c),
            Setting::Kernel(Kernel::Linear) => json!("linear"),
            Setting::Kernel(Kernel::Rbf) => json!("rbf"),
            Setting::Gamma(Gamma::Scale) => json!("scale"),
            Setting::Gamma(Gamma::Auto) => json!("auto"),
            Setting::Gamma(Gamma::Value(g)) => json!(g),
            Setting::Tol(t) => json!(t),
            Setting::MaxIter(n) => json!(n.map_or(-1, |n| n as i64)),
        }
    }
}

/// One concrete assignment of hyperparameters.
///
/// Parameters not mentioned keep their estimator defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    entries: Vec<(String, Setting)>,
}

impl ParameterSet {
    pub fn new(entries: Vec<(String, Setting)>) -> Self {
        ParameterSet { entries }
    }

    pub fn entries(&self) -> &[(String, Setting)] {
        &self.entries
    }

    /// Vectorizer configuration with this set's overrides applied.
    pub fn tfidf_params(&self) -> TfidfParams {
        let mut params = TfidfParams::default();
        for (_, setting) in &self.entries {
            match *setting {
                Setting::NgramRange(lo, hi) => params.ngram_range = (lo, hi),
                Setting::MinDf(v) => params.min_df = v,
                Setting::MaxDf(v) => params.max_df = v,
                Setting::MaxFeatures(n) => params.max_features = n,
                Setting::SublinearTf(b) => params.sublinear_tf = b,
                Setting::UseIdf(b) => params.use_idf = b,
                Setting::Lowercase(b) => params.lowercase = b,
                _ => {}
            }
        }
        params
    }

    /// Classifier configuration with this set's overrides applied.
    pub fn svc_params(&self) -> SvcParams {
        let mut params = SvcParams::default();
        for (_, setting) in &self.entries {
            match *setting {
                Setting::C(c) => params.c = c,
                Setting::Kernel(k) => params.kernel = k,
                Setting::Gamma(g) => params.gamma = g,
                Setting::Tol(t) => params.tol = t,
                Setting::MaxIter(n) => params.max_iter = n,
                _ => {}
            }
        }
        params
    }
}

impl Serialize for ParameterSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, setting) in &self.entries {
            map.serialize_entry(name, &setting.to_json())?;
        }
        map.end()
    }
}

/// A validated parameter grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterGrid {
    /// Each sub-grid maps names (sorted) to candidate values
    grids: Vec<BTreeMap<String, Vec<Setting>>>,
}

impl ParameterGrid {
    /// Load and validate a grid file for the given target kind.
    pub fn load(path: impl AsRef<Path>, kind: TargetKind) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)?;
        Self::from_json(&value, kind)
    }

    pub fn from_json(value: &Value, kind: TargetKind) -> Result<Self> {
        let objects: Vec<&serde_json::Map<String, Value>> = match value {
            Value::Object(map) => vec![map],
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_object()
                        .ok_or_else(|| Error::InvalidGrid("grid list entries must be objects".into()))
                })
                .collect::<Result<_>>()?,
            _ => return Err(Error::InvalidGrid("grid must be an object or a list of objects".into())),
        };

        let grids = objects
            .into_iter()
            .map(|object| {
                object
                    .iter()
                    .map(|(key, values)| {
                        let (step, name) = split_key(key, kind).ok_or_else(|| {
                            Error::InvalidGrid(format!("'{key}' is not a {kind:?} pipeline parameter"))
                        })?;
                        let values = values
                            .as_array()
                            .filter(|v| !v.is_empty())
                            .ok_or_else(|| {
                                Error::InvalidGrid(format!("'{key}' needs a non-empty list of values"))
                            })?;
                        let settings = values
                            .iter()
                            .map(|v| Setting::parse(step, name, v).map_err(Error::InvalidGrid))
                            .collect::<Result<Vec<_>>>()?;
                        Ok((key.clone(), settings))
                    })
                    .collect::<Result<BTreeMap<_, _>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ParameterGrid { grids })
    }

    /// Every combination, keys in sorted order with the last key varying
    /// fastest. A position in the returned list is the combination's id.
    pub fn expand(&self) -> Vec<ParameterSet> {
        let mut out = Vec::new();
        for grid in &self.grids {
            let mut combos: Vec<Vec<(String, Setting)>> = vec![Vec::new()];
            for (key, values) in grid {
                combos = combos
                    .into_iter()
                    .flat_map(|prefix| {
                        values.iter().map(move |value| {
                            let mut next = prefix.clone();
                            next.push((key.clone(), value.clone()));
                            next
                        })
                    })
                    .collect();
            }
            out.extend(combos.into_iter().map(ParameterSet::new));
        }
        out
    }
}

/// Keep at most `k` combinations, chosen at random without replacement.
pub fn sample_combinations<R: Rng + ?Sized>(
    combinations: Vec<ParameterSet>,
    k: usize,
    rng: &mut R,
) -> Vec<ParameterSet> {
    if combinations.len() <= k {
        return combinations;
    }
    combinations.choose_multiple(rng, k).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_expand_order() {
        let grid = ParameterGrid::from_json(
            &json!({
                "vect__ngram_range": [[1, 1], [1, 2]],
                "clf__C": [0.1, 1.0, 10.0]
            }),
            TargetKind::Binary,
        )
        .unwrap();
        let combos = grid.expand();
        assert_eq!(combos.len(), 6);
        // "clf__C" sorts first; "vect__ngram_range" varies fastest
        assert_eq!(combos[0].svc_params().c, 0.1);
        assert_eq!(combos[0].tfidf_params().ngram_range, (1, 1));
        assert_eq!(combos[1].tfidf_params().ngram_range, (1, 2));
        assert_eq!(combos[2].svc_params().c, 1.0);
    }

    #[test]
    fn test_list_of_grids_concatenates() {
        let grid = ParameterGrid::from_json(
            &json!([
                {"clf__kernel": ["linear"]},
                {"clf__kernel": ["rbf"], "clf__gamma": ["scale", 0.5]}
            ]),
            TargetKind::Binary,
        )
        .unwrap();
        let combos = grid.expand();
        assert_eq!(combos.len(), 3);
        assert_eq!(combos[2].svc_params().gamma, Gamma::Value(0.5));
    }

    #[test]
    fn test_multilabel_prefix() {
        let ok = ParameterGrid::from_json(
            &json!({"clf__estimator__C": [1.0]}),
            TargetKind::Multilabel,
        );
        assert!(ok.is_ok());

        let wrong_mode = ParameterGrid::from_json(&json!({"clf__C": [1.0]}), TargetKind::Multilabel);
        assert!(matches!(wrong_mode, Err(Error::InvalidGrid(_))));

        let nested = ParameterGrid::from_json(
            &json!({"clf__estimator__C": [1.0]}),
            TargetKind::Binary,
        );
        assert!(matches!(nested, Err(Error::InvalidGrid(_))));
    }

    #[test]
    fn test_rejects_bad_values() {
        for bad in [
            json!({"clf__C": [-1.0]}),
            json!({"clf__kernel": ["poly"]}),
            json!({"vect__ngram_range": [[2, 1]]}),
            json!({"vect__min_df": [1.5]}),
            json!({"vect__alpha": [1]}),
            json!({"clf__C": []}),
        ] {
            assert!(
                ParameterGrid::from_json(&bad, TargetKind::Binary).is_err(),
                "accepted {bad}"
            );
        }
    }

    #[test]
    fn test_serialize_round_trips_names() {
        let grid = ParameterGrid::from_json(
            &json!({"vect__max_features": [null], "clf__max_iter": [-1], "vect__min_df": [2]}),
            TargetKind::Binary,
        )
        .unwrap();
        let combos = grid.expand();
        let value = serde_json::to_value(&combos[0]).unwrap();
        assert_eq!(
            value,
            json!({"clf__max_iter": -1, "vect__max_features": null, "vect__min_df": 2})
        );
    }

    #[test]
    fn test_sample_without_replacement() {
        let grid = ParameterGrid::from_json(&json!({"clf__C": [1, 2, 3, 4, 5, 6]}), TargetKind::Binary)
            .unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let picked = sample_combinations(grid.expand(), 4, &mut rng);
        assert_eq!(picked.len(), 4);
        let mut cs: Vec<f64> = picked.iter().map(|p| p.svc_params().c).collect();
        cs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        cs.dedup();
        assert_eq!(cs.len(), 4);

        let few = sample_combinations(grid.expand()[..2].to_vec(), 5, &mut rng);
        assert_eq!(few.len(), 2);
    }
}
