//! Item-to-item recommendations over the embedding matrix.
//!
//! [`CosineEngine`] scores every row against the query row by cosine
//! similarity, orders by score (ties by ascending row index), and takes rows
//! greedily while capping how many come from one artist.

use std::collections::HashMap;
use std::sync::Arc;

use ndarray::{ArrayView1, Axis};
use serde::Serialize;

use crate::catalog::IdMap;
use crate::embedding::EmbeddingMatrix;
use crate::error::{DscvrError, Result};

/// Score given to the query row so it can never be selected.
const SELF_SENTINEL: f32 = f32::NEG_INFINITY;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Recommendation {
    pub row_index: usize,
    pub title: String,
    pub artist: String,
    pub score: f32,
    pub preview_url: Option<String>,
    pub artwork_url: Option<String>,
}

/// Seam between the serving layer and the similarity backend.
pub trait Recommender: Send + Sync {
    /// Up to `top_k` rows most similar to `row_index`, excluding itself, with
    /// at most `max_per_artist` rows per artist, compared as stored. Only positive
    /// similarities are returned, in non-increasing score order.
    fn similar_by_index(
        &self,
        row_index: usize,
        top_k: usize,
        max_per_artist: usize,
    ) -> Result<Vec<Recommendation>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exhaustive cosine scan. Fine for catalogs that fit in memory.
#[derive(Debug, Clone)]
pub struct CosineEngine {
    matrix: Arc<EmbeddingMatrix>,
    id_map: Arc<IdMap>,
    norms: Vec<f32>,
}

impl CosineEngine {
    pub fn new(matrix: Arc<EmbeddingMatrix>, id_map: Arc<IdMap>) -> Result<Self> {
        if matrix.nrows() != id_map.len() {
            return Err(DscvrError::inconsistent(format!(
                "matrix has {} rows but id map has {} entries",
                matrix.nrows(),
                id_map.len()
            )));
        }
        let norms = matrix
            .axis_iter(Axis(0))
            .map(|row| row.dot(&row).sqrt())
            .collect();
        Ok(Self {
            matrix,
            id_map,
            norms,
        })
    }

    /// Cosine similarity of row `row_index` against every row. Rows with a
    /// zero norm score 0; the query row itself gets the sentinel.
    pub fn similarities(&self, row_index: usize) -> Result<Vec<f32>> {
        self.check_index(row_index)?;
        let query = self.matrix.row(row_index);
        let query_norm = self.norms[row_index];

        let mut sims: Vec<f32> = self
            .matrix
            .axis_iter(Axis(0))
            .zip(&self.norms)
            .map(|(row, &norm)| cosine(query, query_norm, row, norm))
            .collect();
        sims[row_index] = SELF_SENTINEL;
        Ok(sims)
    }

    fn check_index(&self, row_index: usize) -> Result<()> {
        let len = self.id_map.len();
        if row_index >= len {
            return Err(DscvrError::IndexOutOfRange {
                index: row_index,
                len,
            });
        }
        Ok(())
    }
}

fn cosine(a: ArrayView1<f32>, a_norm: f32, b: ArrayView1<f32>, b_norm: f32) -> f32 {
    let denom = a_norm * b_norm;
    if denom == 0.0 {
        0.0
    } else {
        a.dot(&b) / denom
    }
}

impl Recommender for CosineEngine {
    fn similar_by_index(
        &self,
        row_index: usize,
        top_k: usize,
        max_per_artist: usize,
    ) -> Result<Vec<Recommendation>> {
        let sims = self.similarities(row_index)?;
        if top_k == 0 || max_per_artist == 0 {
            return Ok(Vec::new());
        }

        let mut order: Vec<usize> = (0..sims.len()).collect();
        order.sort_by(|&a, &b| sims[b].total_cmp(&sims[a]).then(a.cmp(&b)));

        let mut per_artist: HashMap<&str, usize> = HashMap::new();
        let mut picked = Vec::with_capacity(top_k);
        for idx in order {
            let score = sims[idx];
            if score <= 0.0 || picked.len() == top_k {
                break;
            }
            let meta = &self.id_map[idx];
            let count = per_artist.entry(meta.artist.as_str()).or_insert(0);
            if *count >= max_per_artist {
                continue;
            }
            *count += 1;

            picked.push(Recommendation {
                row_index: idx,
                title: meta.title.clone(),
                artist: meta.artist.clone(),
                score,
                preview_url: meta.preview_url.clone(),
                artwork_url: meta.artwork_url.clone(),
            });
        }

        tracing::debug!(
            row = row_index,
            top_k,
            max_per_artist,
            returned = picked.len(),
            "recommendations computed"
        );
        Ok(picked)
    }

    fn len(&self) -> usize {
        self.id_map.len()
    }
}
