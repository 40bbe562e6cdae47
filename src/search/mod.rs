//! Fuzzy resolution of free-text queries to catalog rows.
//!
//! [`SearchIndex`] is built once from the id map. Each row keeps its
//! normalized title, artist and `"title artist"` string, with sequence
//! matchers prepared for the two strings that are scored.

pub mod ratio;

use serde::Serialize;

use crate::catalog::{normalize, IdMap, TrackMeta};
use crate::error::{DscvrError, Result};
use ratio::SequenceMatcher;

/// Default minimum score for [`SearchIndex::resolve`].
pub const DEFAULT_CUTOFF: f64 = 0.55;
/// Candidates `resolve` pulls from `search` before applying the cutoff.
pub const RESOLVE_CANDIDATES: usize = 3;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchHit {
    pub row_index: usize,
    pub title: String,
    pub artist: String,
    pub score: f64,
}

/// A query resolved to a single catalog row.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub row_index: usize,
    pub record: TrackMeta,
    pub score: f64,
}

#[derive(Debug, Clone)]
struct IndexEntry {
    meta: TrackMeta,
    norm_title: String,
    norm_artist: String,
    combined: SequenceMatcher,
    title: SequenceMatcher,
}

#[derive(Debug, Clone)]
pub struct SearchIndex {
    entries: Vec<IndexEntry>,
    candidates: usize,
}

impl SearchIndex {
    pub fn build(id_map: &IdMap) -> Self {
        let entries = id_map
            .iter()
            .map(|meta| {
                let norm_title = normalize(&meta.title);
                let norm_artist = normalize(&meta.artist);
                let combined = normalize(&format!("{} {}", meta.title, meta.artist));
                IndexEntry {
                    meta: meta.clone(),
                    combined: SequenceMatcher::new(&combined),
                    title: SequenceMatcher::new(&norm_title),
                    norm_title,
                    norm_artist,
                }
            })
            .collect();
        Self {
            entries,
            candidates: RESOLVE_CANDIDATES,
        }
    }

    /// Number of top hits `resolve` looks at. Clamped to at least one.
    pub fn with_candidates(mut self, candidates: usize) -> Self {
        self.candidates = candidates.max(1);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Normalized `(title, artist)` of a row.
    pub fn normalized(&self, row_index: usize) -> Option<(&str, &str)> {
        self.entries
            .get(row_index)
            .map(|e| (e.norm_title.as_str(), e.norm_artist.as_str()))
    }

    /// Best `limit` rows for `query`, by score descending then row index
    /// ascending. A query that normalizes to nothing yields no hits.
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        let q = normalize(query);
        if q.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f64)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, e.combined.ratio(&q).max(e.title.ratio(&q))))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(limit);

        scored
            .into_iter()
            .map(|(i, score)| {
                let meta = &self.entries[i].meta;
                SearchHit {
                    row_index: i,
                    title: meta.title.clone(),
                    artist: meta.artist.clone(),
                    score,
                }
            })
            .collect()
    }

    /// Single best row for `query` if it scores at least `cutoff`.
    ///
    /// Empty or whitespace-only queries fail with [`DscvrError::NoMatch`]
    /// without scoring anything.
    pub fn resolve(&self, query: &str, cutoff: f64) -> Result<Resolved> {
        let no_match = || DscvrError::NoMatch {
            query: query.to_string(),
        };
        if query.trim().is_empty() {
            return Err(no_match());
        }

        let best = self
            .search(query, self.candidates)
            .into_iter()
            .next()
            .filter(|hit| hit.score >= cutoff)
            .ok_or_else(no_match)?;

        tracing::debug!(query, row = best.row_index, score = best.score, "query resolved");
        Ok(Resolved {
            row_index: best.row_index,
            record: self.entries[best.row_index].meta.clone(),
            score: best.score,
        })
    }
}
