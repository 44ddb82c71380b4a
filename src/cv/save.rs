//! Result files for one run.
//!
//! Everything a run writes lives under `<root>/<y_prefix>/`. Paths are
//! computed here and passed explicitly to each writer.
//!
//! The prefix is a regex, so it is turned into a single safe directory
//! name first: characters other than ASCII letters, digits, `_`, `-` and
//! `.` become `_`, and a name made only of dots is replaced entirely.
//! `ecosystem\.` is written to `<root>/ecosystem_./`.

use super::error::Result;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// File layout of one run's output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    dir: PathBuf,
    n_splits: usize,
}

impl OutputLayout {
    /// Lay out the output files of one run.
    ///
    /// # Arguments
    ///
    /// * `root` - Directory holding one subdirectory per target prefix
    /// * `y_prefix` - Target prefix; sanitized into one path component
    /// * `n_splits` - Fold count, part of every result file name
    pub fn new(root: impl AsRef<Path>, y_prefix: &str, n_splits: usize) -> Self {
        OutputLayout {
            dir: root.as_ref().join(dir_name(y_prefix)),
            n_splits,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the output directory if needed.
    pub fn create(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    pub fn parameter_combinations(&self) -> PathBuf {
        self.dir.join("parameter_combinations.json")
    }

    pub fn inner_results(&self, outer_fold: usize) -> PathBuf {
        self.dir.join(format!(
            "inner_results_{outer_fold}_from_{}_splits.json",
            self.n_splits
        ))
    }

    pub fn outer_results(&self) -> PathBuf {
        self.dir
            .join(format!("outer_results_{}_splits.json", self.n_splits))
    }

    pub fn outer_param_search(&self) -> PathBuf {
        self.dir
            .join(format!("outer_param_search_{}_splits.json", self.n_splits))
    }

    pub fn predictions(&self) -> PathBuf {
        self.dir
            .join(format!("predictions_{}_splits.csv", self.n_splits))
    }
}

/// Directory name for a target prefix. Never a separator, `.` or `..`.
fn dir_name(y_prefix: &str) -> String {
    let name: String = y_prefix
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.chars().all(|c| c == '.') {
        "_".repeat(name.len().max(1))
    } else {
        name
    }
}

/// Write `value` as indented JSON.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    tracing::debug!(path = %path.display(), "wrote results");
    Ok(())
}
