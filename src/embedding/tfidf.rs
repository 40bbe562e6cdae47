//! Term weighting: n-gram counts scaled by smoothed inverse document frequency.
//!
//! Documents are expected to be normalized already (see
//! [`crate::catalog::normalize`]). Tokens are whitespace-separated runs of at
//! least two characters; stop words are removed before n-grams are formed.

use std::collections::{BTreeMap, HashMap};

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::stop_words::is_stop_word;
use crate::error::{DscvrError, Result};

/// Row-sparse matrix: each row holds `(column, value)` pairs sorted by column.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseRows {
    pub n_cols: usize,
    pub rows: Vec<Vec<(usize, f64)>>,
}

impl SparseRows {
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// `self · m` where `m` is `n_cols × k`.
    pub fn dot(&self, m: &Array2<f64>) -> Array2<f64> {
        debug_assert_eq!(m.nrows(), self.n_cols);
        let mut out = Array2::<f64>::zeros((self.n_rows(), m.ncols()));
        for (i, row) in self.rows.iter().enumerate() {
            let mut target = out.row_mut(i);
            for &(j, v) in row {
                target.scaled_add(v, &m.row(j));
            }
        }
        out
    }

    /// `selfᵀ · m` where `m` is `n_rows × k`.
    pub fn t_dot(&self, m: &Array2<f64>) -> Array2<f64> {
        debug_assert_eq!(m.nrows(), self.n_rows());
        let mut out = Array2::<f64>::zeros((self.n_cols, m.ncols()));
        for (i, row) in self.rows.iter().enumerate() {
            let source = m.row(i);
            for &(j, v) in row {
                out.row_mut(j).scaled_add(v, &source);
            }
        }
        out
    }

    /// Sum of the per-column population variances.
    pub fn total_variance(&self) -> f64 {
        let n = self.n_rows() as f64;
        if n == 0.0 {
            return 0.0;
        }
        let mut sum = vec![0.0f64; self.n_cols];
        let mut sum_sq = vec![0.0f64; self.n_cols];
        for row in &self.rows {
            for &(j, v) in row {
                sum[j] += v;
                sum_sq[j] += v * v;
            }
        }
        sum.iter()
            .zip(&sum_sq)
            .map(|(s, sq)| (sq / n - (s / n).powi(2)).max(0.0))
            .sum()
    }
}

/// Fitted vocabulary and IDF weights.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TfidfModel {
    /// term → column, columns assigned in lexicographic term order.
    pub vocabulary: BTreeMap<String, usize>,
    pub idf: Vec<f64>,
    pub ngram_max: usize,
}

/// Split a normalized document into its unigram..=`ngram_max` terms.
pub fn analyze(doc: &str, ngram_max: usize) -> Vec<String> {
    let tokens: Vec<&str> = doc
        .split_whitespace()
        .filter(|t| t.chars().count() >= 2)
        .filter(|t| !is_stop_word(t))
        .collect();

    let mut terms = Vec::new();
    for n in 1..=ngram_max.max(1) {
        if n > tokens.len() {
            break;
        }
        terms.extend(tokens.windows(n).map(|w| w.join(" ")));
    }
    terms
}

fn count_terms(doc: &str, ngram_max: usize) -> HashMap<String, u32> {
    let mut counts = HashMap::new();
    for term in analyze(doc, ngram_max) {
        *counts.entry(term).or_insert(0) += 1;
    }
    counts
}

impl TfidfModel {
    /// Learn vocabulary and IDF from `docs`, returning the weighted matrix of
    /// the same documents.
    ///
    /// A term is kept when it occurs in at least `min_df` documents and in no
    /// more than `max_df * docs.len()` documents.
    pub fn fit_transform(
        docs: &[String],
        min_df: usize,
        max_df: f64,
        ngram_max: usize,
    ) -> Result<(Self, SparseRows)> {
        let n_docs = docs.len();
        if n_docs == 0 {
            return Err(DscvrError::data("cannot fit term weights on an empty corpus"));
        }

        let max_doc_count = max_df * n_docs as f64;
        if max_doc_count < min_df as f64 {
            return Err(DscvrError::data(format!(
                "max_df={max_df} allows at most {max_doc_count:.2} documents, fewer than min_df={min_df}"
            )));
        }

        let counts: Vec<HashMap<String, u32>> =
            docs.iter().map(|d| count_terms(d, ngram_max)).collect();

        let mut doc_freq: BTreeMap<&str, usize> = BTreeMap::new();
        for doc in &counts {
            for term in doc.keys() {
                *doc_freq.entry(term.as_str()).or_insert(0) += 1;
            }
        }

        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::new();
        for (term, df) in doc_freq {
            if df < min_df || df as f64 > max_doc_count {
                continue;
            }
            vocabulary.insert(term.to_string(), idf.len());
            idf.push(((1.0 + n_docs as f64) / (1.0 + df as f64)).ln() + 1.0);
        }

        if vocabulary.is_empty() {
            return Err(DscvrError::data(format!(
                "vocabulary pruning (min_df={min_df}, max_df={max_df}) left zero terms over {n_docs} documents"
            )));
        }

        let model = Self {
            vocabulary,
            idf,
            ngram_max,
        };
        let rows = counts.iter().map(|c| model.weigh(c)).collect();
        let matrix = SparseRows {
            n_cols: model.n_terms(),
            rows,
        };
        Ok((model, matrix))
    }

    pub fn n_terms(&self) -> usize {
        self.idf.len()
    }

    /// Weight unseen documents with the fitted vocabulary. Out-of-vocabulary
    /// terms are ignored; a document with none left becomes an empty row.
    pub fn transform(&self, docs: &[String]) -> SparseRows {
        let rows = docs
            .iter()
            .map(|d| self.weigh(&count_terms(d, self.ngram_max)))
            .collect();
        SparseRows {
            n_cols: self.n_terms(),
            rows,
        }
    }

    fn weigh(&self, counts: &HashMap<String, u32>) -> Vec<(usize, f64)> {
        let mut row: Vec<(usize, f64)> = counts
            .iter()
            .filter_map(|(term, &tf)| {
                self.vocabulary
                    .get(term)
                    .map(|&j| (j, tf as f64 * self.idf[j]))
            })
            .collect();
        row.sort_by_key(|&(j, _)| j);

        let norm = row.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, v) in &mut row {
                *v /= norm;
            }
        }
        row
    }
}
