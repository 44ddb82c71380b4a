//! Classification metrics for binary and multilabel predictions.
//!
//! Scores follow the usual confusion-matrix definitions. A zero denominator
//! yields 0.0 rather than NaN so that degenerate folds still aggregate.

use ndarray::{Array2, ArrayView1, Axis};

/// A scoring function over true and predicted labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    F1,
    Precision,
    Recall,
}

impl Metric {
    /// The metric set reported for every fit.
    pub const ALL: [Metric; 3] = [Metric::F1, Metric::Precision, Metric::Recall];

    /// Name used as the key in score records.
    pub fn name(self) -> &'static str {
        match self {
            Metric::F1 => "f1_score",
            Metric::Precision => "precision_score",
            Metric::Recall => "recall_score",
        }
    }

    fn from_counts(self, c: Counts) -> f64 {
        let precision = ratio(c.tp, c.tp + c.fp);
        let recall = ratio(c.tp, c.tp + c.fn_count);
        match self {
            Metric::Precision => precision,
            Metric::Recall => recall,
            Metric::F1 => {
                if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                }
            }
        }
    }

    /// Score a single binary label vector.
    pub fn score(self, y_true: ArrayView1<bool>, y_pred: ArrayView1<bool>) -> f64 {
        self.from_counts(Counts::tally(y_true, y_pred))
    }

    /// Score a multilabel prediction with the given averaging mode.
    pub fn score_averaged(self, y_true: &Array2<bool>, y_pred: &Array2<bool>, average: Average) -> f64 {
        let per_label: Vec<Counts> = y_true
            .axis_iter(Axis(1))
            .zip(y_pred.axis_iter(Axis(1)))
            .map(|(t, p)| Counts::tally(t, p))
            .collect();
        if per_label.is_empty() {
            return 0.0;
        }

        match average {
            Average::Micro => {
                let total = per_label.iter().fold(Counts::default(), |acc, c| acc + *c);
                self.from_counts(total)
            }
            Average::Macro => {
                per_label.iter().map(|c| self.from_counts(*c)).sum::<f64>() / per_label.len() as f64
            }
            Average::Weighted => {
                let support: usize = per_label.iter().map(|c| c.support()).sum();
                if support == 0 {
                    return 0.0;
                }
                per_label
                    .iter()
                    .map(|c| self.from_counts(*c) * c.support() as f64)
                    .sum::<f64>()
                    / support as f64
            }
        }
    }
}

/// How per-label scores are combined for multilabel targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Average {
    /// Pool the confusion counts of all labels
    Micro,
    /// Unweighted mean of per-label scores
    Macro,
    /// Mean of per-label scores weighted by true-positive support
    Weighted,
}

impl Average {
    pub const ALL: [Average; 3] = [Average::Micro, Average::Macro, Average::Weighted];

    pub fn name(self) -> &'static str {
        match self {
            Average::Micro => "micro",
            Average::Macro => "macro",
            Average::Weighted => "weighted",
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Counts {
    tp: usize,
    fp: usize,
    fn_count: usize,
}

impl Counts {
    fn tally(y_true: ArrayView1<bool>, y_pred: ArrayView1<bool>) -> Self {
        let mut c = Counts::default();
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            match (p, t) {
                (true, true) => c.tp += 1,
                (true, false) => c.fp += 1,
                (false, true) => c.fn_count += 1,
                (false, false) => {}
            }
        }
        c
    }

    fn support(&self) -> usize {
        self.tp + self.fn_count
    }
}

impl std::ops::Add for Counts {
    type Output = Counts;

    fn add(self, rhs: Counts) -> Counts {
        Counts {
            tp: self.tp + rhs.tp,
            fp: self.fp + rhs.fp,
            fn_count: self.fn_count + rhs.fn_count,
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den > 0 {
        num as f64 / den as f64
    } else {
        0.0
    }
}
