//! TF-IDF (Term Frequency-Inverse Document Frequency) vectorizer.
//!
//! Converts text documents into L2-normalized sparse feature vectors. Tokens
//! are runs of two or more word characters; optional word n-grams are joined
//! with a single space. IDF is smoothed as `ln((1 + n) / (1 + df)) + 1`.

use super::error::{Error, Result};
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

static TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("valid regex"));

/// A document-frequency bound: an absolute count or a share of documents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DocFreq {
    Count(usize),
    Proportion(f64),
}

impl DocFreq {
    fn threshold(self, n_docs: usize) -> f64 {
        match self {
            DocFreq::Count(n) => n as f64,
            DocFreq::Proportion(p) => p * n_docs as f64,
        }
    }
}

/// Vectorizer hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TfidfParams {
    /// Smallest and largest n-gram length
    pub ngram_range: (usize, usize),
    /// Drop terms appearing in fewer documents
    pub min_df: DocFreq,
    /// Drop terms appearing in more documents
    pub max_df: DocFreq,
    /// Keep only the most frequent terms
    pub max_features: Option<usize>,
    /// Use `1 + ln(tf)` instead of raw counts
    pub sublinear_tf: bool,
    pub use_idf: bool,
    pub lowercase: bool,
}

impl Default for TfidfParams {
    fn default() -> Self {
        TfidfParams {
            ngram_range: (1, 1),
            min_df: DocFreq::Count(1),
            max_df: DocFreq::Proportion(1.0),
            max_features: None,
            sublinear_tf: false,
            use_idf: true,
            lowercase: true,
        }
    }
}

/// Sparse feature vector with strictly increasing indices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
}

impl SparseVector {
    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j, mut sum) = (0, 0, 0.0);
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    pub fn norm_sq(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum()
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }
}

/// TF-IDF vectorizer for converting text to numerical features.
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    pub params: TfidfParams,
    /// Term to feature index mapping; indices follow term order
    pub vocabulary: HashMap<String, usize>,
    /// Inverse document frequency for each feature
    pub idf: Vec<f64>,
}

impl TfidfVectorizer {
    pub fn new(params: TfidfParams) -> Self {
        TfidfVectorizer {
            params,
            vocabulary: HashMap::new(),
            idf: Vec::new(),
        }
    }

    pub fn n_features(&self) -> usize {
        self.vocabulary.len()
    }

    fn terms(&self, document: &str) -> Vec<String> {
        let text = if self.params.lowercase {
            document.to_lowercase()
        } else {
            document.to_string()
        };
        let words: Vec<&str> = TOKEN.find_iter(&text).map(|m| m.as_str()).collect();

        let (lo, hi) = self.params.ngram_range;
        let mut terms = Vec::new();
        for n in lo..=hi {
            if n == 1 {
                terms.extend(words.iter().map(|w| w.to_string()));
            } else {
                terms.extend(words.windows(n).map(|w| w.join(" ")));
            }
        }
        terms
    }

    /// Fit the vectorizer on a collection of documents.
    ///
    /// This builds the vocabulary and calculates IDF values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyVocabulary`] if the frequency bounds are
    /// inconsistent or leave no terms.
    pub fn fit(&mut self, documents: &[&str]) -> Result<()> {
        let n_docs = documents.len();
        let mut doc_count: BTreeMap<String, usize> = BTreeMap::new();
        let mut term_count: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let terms = self.terms(doc);
            let unique: HashSet<&String> = terms.iter().collect();
            for term in unique {
                *doc_count.entry(term.clone()).or_insert(0) += 1;
            }
            for term in terms {
                *term_count.entry(term).or_insert(0) += 1;
            }
        }
        if doc_count.is_empty() {
            return Err(Error::EmptyVocabulary(
                "documents contain no tokens".to_string(),
            ));
        }

        let min_df = self.params.min_df.threshold(n_docs);
        let max_df = self.params.max_df.threshold(n_docs);
        if max_df < min_df {
            return Err(Error::EmptyVocabulary(
                "max_df corresponds to fewer documents than min_df".to_string(),
            ));
        }

        // BTreeMap iteration keeps terms sorted
        let mut kept: Vec<(String, usize)> = doc_count
            .into_iter()
            .filter(|(_, df)| (*df as f64) >= min_df && (*df as f64) <= max_df)
            .collect();
        if kept.is_empty() {
            return Err(Error::EmptyVocabulary(
                "no terms remain after pruning; try a lower min_df or a higher max_df".to_string(),
            ));
        }

        if let Some(limit) = self.params.max_features {
            if kept.len() > limit {
                // Most frequent first, ties by term
                kept.sort_by(|a, b| term_count[&b.0].cmp(&term_count[&a.0]).then_with(|| a.0.cmp(&b.0)));
                kept.truncate(limit);
                kept.sort_by(|a, b| a.0.cmp(&b.0));
            }
        }

        self.vocabulary.clear();
        self.idf = Vec::with_capacity(kept.len());
        for (idx, (term, df)) in kept.into_iter().enumerate() {
            self.idf
                .push(((1.0 + n_docs as f64) / (1.0 + df as f64)).ln() + 1.0);
            self.vocabulary.insert(term, idx);
        }
        Ok(())
    }

    /// Transform a document into a normalized TF-IDF vector.
    pub fn transform(&self, document: &str) -> SparseVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for term in self.terms(document) {
            if let Some(&idx) = self.vocabulary.get(&term) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let mut vector = SparseVector {
            indices: Vec::with_capacity(counts.len()),
            values: Vec::with_capacity(counts.len()),
        };
        for (idx, tf) in counts {
            let tf = if self.params.sublinear_tf { 1.0 + tf.ln() } else { tf };
            let weight = if self.params.use_idf { tf * self.idf[idx] } else { tf };
            vector.indices.push(idx);
            vector.values.push(weight);
        }

        let norm = vector.norm_sq().sqrt();
        if norm > 0.0 {
            for val in &mut vector.values {
                *val /= norm;
            }
        }
        vector
    }

    pub fn transform_all(&self, documents: &[&str]) -> Vec<SparseVector> {
        documents.iter().map(|doc| self.transform(doc)).collect()
    }

    pub fn fit_transform(&mut self, documents: &[&str]) -> Result<Vec<SparseVector>> {
        self.fit(documents)?;
        Ok(self.transform_all(documents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fitted(params: TfidfParams, docs: &[&str]) -> TfidfVectorizer {
        let mut v = TfidfVectorizer::new(params);
        v.fit(docs).unwrap();
        v
    }

    #[test]
    fn test_vocabulary_is_sorted_and_skips_short_tokens() {
        let v = fitted(TfidfParams::default(), &["The cat sat", "a dog sat"]);
        let mut terms: Vec<(&String, &usize)> = v.vocabulary.iter().collect();
        terms.sort_by_key(|(_, idx)| **idx);
        let terms: Vec<&str> = terms.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(terms, vec!["cat", "dog", "sat", "the"]);
    }

    #[test]
    fn test_smooth_idf() {
        let v = fitted(TfidfParams::default(), &["alpha beta", "alpha gamma"]);
        let alpha = v.idf[v.vocabulary["alpha"]];
        let beta = v.idf[v.vocabulary["beta"]];
        assert!((alpha - 1.0).abs() < 1e-12);
        assert!((beta - ((3.0f64 / 2.0).ln() + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_transform_is_unit_length() {
        let v = fitted(TfidfParams::default(), &["alpha beta beta", "alpha gamma"]);
        let x = v.transform("beta beta alpha unknown");
        assert_eq!(x.nnz(), 2);
        assert!((x.norm_sq() - 1.0).abs() < 1e-12);
        assert_eq!(v.transform("nothing known here").nnz(), 0);
    }

    #[test]
    fn test_bigrams() {
        let params = TfidfParams {
            ngram_range: (1, 2),
            ..TfidfParams::default()
        };
        let v = fitted(params, &["new york city"]);
        assert!(v.vocabulary.contains_key("new york"));
        assert!(v.vocabulary.contains_key("york city"));
        assert_eq!(v.n_features(), 5);
    }

    #[test]
    fn test_document_frequency_bounds() {
        let docs = ["common rare", "common other", "common"];
        let params = TfidfParams {
            max_df: DocFreq::Proportion(0.9),
            ..TfidfParams::default()
        };
        let v = fitted(params, &docs);
        assert!(!v.vocabulary.contains_key("common"));

        let params = TfidfParams {
            min_df: DocFreq::Count(2),
            ..TfidfParams::default()
        };
        let v = fitted(params, &docs);
        assert_eq!(v.n_features(), 1);

        let params = TfidfParams {
            min_df: DocFreq::Count(4),
            ..TfidfParams::default()
        };
        let mut v = TfidfVectorizer::new(params);
        assert!(matches!(v.fit(&docs), Err(Error::EmptyVocabulary(_))));
    }

    #[test]
    fn test_max_features_keeps_most_frequent() {
        let params = TfidfParams {
            max_features: Some(2),
            ..TfidfParams::default()
        };
        let v = fitted(params, &["zeta zeta zeta alpha", "beta beta beta"]);
        assert!(!v.vocabulary.contains_key("alpha"));
        assert_eq!(v.vocabulary["beta"], 0);
        assert_eq!(v.vocabulary["zeta"], 1);
    }

    #[test]
    fn test_sparse_dot() {
        let a = SparseVector {
            indices: vec![0, 2, 5],
            values: vec![1.0, 2.0, 3.0],
        };
        let b = SparseVector {
            indices: vec![2, 3, 5],
            values: vec![4.0, 1.0, 0.5],
        };
        assert!((a.dot(&b) - 9.5).abs() < 1e-12);
    }
}
