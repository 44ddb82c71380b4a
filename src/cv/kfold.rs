//! Sequential k-fold splitting.

use super::error::{Error, Result};

/// One train/test split, as positions into the split sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// K-fold splitter without shuffling.
///
/// Test folds are contiguous. With `n` samples and `k` folds the first
/// `n % k` folds hold `n / k + 1` samples and the rest hold `n / k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KFold {
    pub n_splits: usize,
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        KFold { n_splits }
    }

    /// Split positions `0..n_samples`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFolds`] for fewer than two folds or more folds
    /// than samples.
    pub fn split(&self, n_samples: usize) -> Result<Vec<Fold>> {
        if self.n_splits < 2 || self.n_splits > n_samples {
            return Err(Error::InvalidFolds {
                n_splits: self.n_splits,
                n_samples,
            });
        }

        let base = n_samples / self.n_splits;
        let extra = n_samples % self.n_splits;
        let mut folds = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for i in 0..self.n_splits {
            let size = base + usize::from(i < extra);
            let stop = start + size;
            folds.push(Fold {
                train: (0..start).chain(stop..n_samples).collect(),
                test: (start..stop).collect(),
            });
            start = stop;
        }
        Ok(folds)
    }
}
