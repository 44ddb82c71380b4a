//! Best-parameter selection over score records.

use super::error::{Error, Result};
use super::evaluate::ScoreRecord;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Mean of `scorer` per parameter id, in id order.
pub fn mean_scores(records: &[ScoreRecord], scorer: &str) -> Result<BTreeMap<usize, f64>> {
    let mut sums: BTreeMap<usize, (f64, usize)> = BTreeMap::new();
    for record in records {
        let id = record.param_id.ok_or(Error::MissingParamId)?;
        let value = record
            .get(scorer)
            .ok_or_else(|| Error::MissingMetric(scorer.to_string()))?;
        let entry = sums.entry(id).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }
    Ok(sums
        .into_iter()
        .map(|(id, (sum, n))| (id, sum / n as f64))
        .collect())
}

/// Parameter id with the highest mean `scorer` value.
///
/// Ties go to the lowest id; NaN means rank below every number.
///
/// # Errors
///
/// Fails if `records` is empty or if any record lacks `scorer` or a
/// parameter id.
pub fn get_best_param(records: &[ScoreRecord], scorer: &str) -> Result<usize> {
    let means = mean_scores(records, scorer)?;
    means
        .into_iter()
        .max_by(|(id_a, a), (id_b, b)| rank(*a, *b).then_with(|| id_b.cmp(id_a)))
        .map(|(id, _)| id)
        .ok_or(Error::NoScores)
}

fn rank(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}
