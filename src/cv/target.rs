//! Target resolution and label arrays.
//!
//! The run's target is chosen by a column prefix. One matching column makes a
//! binary problem, several make a multilabel one. This is resolved once, up
//! front, into a [`TargetSpec`]; nothing downstream inspects column names
//! again.

use super::data::Dataset;
use super::error::{Error, Result};
use ndarray::{Array1, Array2, Axis};
use regex::Regex;

/// Binary or multilabel, without the column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Binary,
    Multilabel,
}

impl TargetKind {
    /// Metric used to rank parameter sets.
    pub fn primary_scorer(self) -> &'static str {
        match self {
            TargetKind::Binary => "f1_score",
            TargetKind::Multilabel => "f1_score_macro",
        }
    }
}

/// The resolved target columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSpec {
    Binary(String),
    /// Two or more columns, in header order
    Multilabel(Vec<String>),
}

impl TargetSpec {
    /// Match `prefix` (a pattern anchored at the start of the name) against
    /// the label columns. Returns `None` when nothing matches.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPrefix`] if the prefix is not a valid pattern.
    pub fn resolve(prefix: &str, label_columns: &[String]) -> Result<Option<Self>> {
        let pattern = Regex::new(&format!("^(?:{prefix})")).map_err(|source| Error::InvalidPrefix {
            prefix: prefix.to_string(),
            source,
        })?;
        let mut matched: Vec<String> = label_columns
            .iter()
            .filter(|name| pattern.is_match(name))
            .cloned()
            .collect();

        Ok(match matched.len() {
            0 => None,
            1 => matched.pop().map(TargetSpec::Binary),
            _ => Some(TargetSpec::Multilabel(matched)),
        })
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            TargetSpec::Binary(_) => TargetKind::Binary,
            TargetSpec::Multilabel(_) => TargetKind::Multilabel,
        }
    }

    pub fn columns(&self) -> Vec<&str> {
        match self {
            TargetSpec::Binary(column) => vec![column.as_str()],
            TargetSpec::Multilabel(columns) => columns.iter().map(String::as_str).collect(),
        }
    }

    /// Rows used for cross-validation and final fitting.
    ///
    /// Binary targets train on every seen row. Multilabel targets only train
    /// on seen rows that were marked for inclusion.
    ///
    /// # Arguments
    ///
    /// * `dataset` - The merged dataset
    /// * `include_column` - Inclusion flag column, read for multilabel targets only
    pub fn labelled_rows(&self, dataset: &Dataset, include_column: &str) -> Result<Vec<usize>> {
        match self {
            TargetSpec::Binary(_) => Ok(dataset.seen_rows()),
            TargetSpec::Multilabel(_) => {
                let include = dataset.label_column(include_column).ok_or_else(|| {
                    Error::MissingColumn {
                        column: include_column.to_string(),
                        path: "labelled table".into(),
                    }
                })?;
                let mut rows = Vec::new();
                for row in dataset.seen_rows() {
                    if dataset.label(row, include)? == Some(1.0) {
                        rows.push(row);
                    }
                }
                Ok(rows)
            }
        }
    }

    /// Build the label array for `rows`. Every row must have a value in every
    /// target column. Only the target columns are parsed.
    pub fn labels(&self, dataset: &Dataset, rows: &[usize]) -> Result<Labels> {
        let columns = self
            .columns()
            .into_iter()
            .map(|name| {
                dataset
                    .label_column(name)
                    .map(|idx| (idx, name))
                    .ok_or_else(|| Error::MissingColumn {
                        column: name.to_string(),
                        path: "labelled table".into(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut values = Array2::from_elem((rows.len(), columns.len()), false);
        for (i, &row) in rows.iter().enumerate() {
            for (j, &(idx, name)) in columns.iter().enumerate() {
                let value = dataset.label(row, idx)?.ok_or_else(|| Error::MissingLabel {
                    row,
                    column: name.to_string(),
                })?;
                values[[i, j]] = value != 0.0;
            }
        }

        Ok(match self {
            TargetSpec::Binary(_) => Labels::Binary(values.column(0).to_owned()),
            TargetSpec::Multilabel(_) => Labels::Multilabel(values),
        })
    }
}

/// Ground truth or predictions for a set of rows.
#[derive(Debug, Clone, PartialEq)]
pub enum Labels {
    Binary(Array1<bool>),
    /// Rows by label columns
    Multilabel(Array2<bool>),
}

impl Labels {
    pub fn len(&self) -> usize {
        match self {
            Labels::Binary(y) => y.len(),
            Labels::Multilabel(y) => y.nrows(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            Labels::Binary(_) => TargetKind::Binary,
            Labels::Multilabel(_) => TargetKind::Multilabel,
        }
    }

    /// Number of label columns; 1 for binary targets.
    pub fn n_labels(&self) -> usize {
        match self {
            Labels::Binary(_) => 1,
            Labels::Multilabel(y) => y.ncols(),
        }
    }

    /// Copy out the given rows.
    pub fn select(&self, rows: &[usize]) -> Labels {
        match self {
            Labels::Binary(y) => Labels::Binary(y.select(Axis(0), rows)),
            Labels::Multilabel(y) => Labels::Multilabel(y.select(Axis(0), rows)),
        }
    }

    /// One label column as a binary vector.
    pub fn column(&self, c: usize) -> Array1<bool> {
        match self {
            Labels::Binary(y) => y.clone(),
            Labels::Multilabel(y) => y.column(c).to_owned(),
        }
    }
}
