//! Read-only serving context built once at startup.
//!
//! [`RecsysContext`] owns the loaded artifacts, the search index and the
//! recommender. Handlers share it behind an `Arc`; nothing in it mutates after
//! construction.

use std::sync::Arc;

use serde::Serialize;

use crate::artifacts::{ArtifactStore, LoadedArtifacts, Manifest};
use crate::catalog::IdMap;
use crate::config::RetrievalConfig;
use crate::embedding::EmbeddingMatrix;
use crate::error::Result;
use crate::recommend::{CosineEngine, Recommendation, Recommender};
use crate::search::{SearchHit, SearchIndex};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecommendResponse {
    pub query: String,
    pub resolved_index: usize,
    pub resolved_title: String,
    pub resolved_artist: String,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Health {
    pub ok: bool,
    pub tracks: usize,
    pub dims: usize,
    pub generation: Option<String>,
}

pub struct RecsysContext {
    index: SearchIndex,
    recommender: Box<dyn Recommender>,
    retrieval: RetrievalConfig,
    tracks: usize,
    dims: usize,
    manifest: Option<Manifest>,
}

impl RecsysContext {
    /// Load the published artifacts from `store`.
    pub fn from_store(store: &ArtifactStore, retrieval: RetrievalConfig) -> Result<Self> {
        let LoadedArtifacts {
            matrix,
            id_map,
            manifest,
        } = store.load()?;
        let mut ctx = Self::from_parts(matrix, id_map, retrieval)?;
        ctx.manifest = Some(manifest);
        Ok(ctx)
    }

    /// Assemble a context from an in-memory matrix and its id map.
    pub fn from_parts(
        matrix: EmbeddingMatrix,
        id_map: IdMap,
        retrieval: RetrievalConfig,
    ) -> Result<Self> {
        let tracks = matrix.nrows();
        let dims = matrix.ncols();
        let index = SearchIndex::build(&id_map).with_candidates(retrieval.resolve_candidates);
        let recommender = CosineEngine::new(Arc::new(matrix), Arc::new(id_map))?;

        tracing::info!(tracks, dims, "recommendation context ready");
        Ok(Self {
            index,
            recommender: Box::new(recommender),
            retrieval,
            tracks,
            dims,
            manifest: None,
        })
    }

    pub fn retrieval(&self) -> &RetrievalConfig {
        &self.retrieval
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    pub fn search(&self, query: &str, limit: usize) -> SearchResponse {
        SearchResponse {
            query: query.to_string(),
            results: self.index.search(query, limit),
        }
    }

    /// Resolve `query` to a track, then return its nearest neighbours.
    pub fn recommend(
        &self,
        query: &str,
        top_k: usize,
        max_per_artist: usize,
    ) -> Result<RecommendResponse> {
        let resolved = self.index.resolve(query, self.retrieval.match_cutoff)?;
        let recommendations =
            self.recommender
                .similar_by_index(resolved.row_index, top_k, max_per_artist)?;

        Ok(RecommendResponse {
            query: query.to_string(),
            resolved_index: resolved.row_index,
            resolved_title: resolved.record.title,
            resolved_artist: resolved.record.artist,
            recommendations,
        })
    }

    /// Recommend with the configured `default_top_k` and `max_per_artist`.
    pub fn recommend_default(&self, query: &str) -> Result<RecommendResponse> {
        self.recommend(
            query,
            self.retrieval.default_top_k,
            self.retrieval.max_per_artist,
        )
    }

    pub fn similar_by_index(
        &self,
        row_index: usize,
        top_k: usize,
        max_per_artist: usize,
    ) -> Result<Vec<Recommendation>> {
        self.recommender
            .similar_by_index(row_index, top_k, max_per_artist)
    }

    pub fn health(&self) -> Health {
        Health {
            ok: self.tracks > 0 && self.recommender.len() == self.tracks,
            tracks: self.tracks,
            dims: self.dims,
            generation: self.manifest.as_ref().map(|m| m.generation.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TrackMeta;
    use crate::error::DscvrError;
    use ndarray::array;

    fn meta(title: &str, artist: &str) -> TrackMeta {
        TrackMeta {
            title: title.into(),
            artist: artist.into(),
            preview_url: None,
            artwork_url: None,
        }
    }

    fn ctx() -> RecsysContext {
        RecsysContext::from_parts(
            array![[1.0, 0.1, 0.0], [0.9, 0.2, 0.0], [0.1, 1.0, 0.0], [0.8, 0.0, 0.3]],
            vec![
                meta("Snooze", "SZA"),
                meta("Kill Bill", "SZA"),
                meta("Blinding Lights", "The Weeknd"),
                meta("Bad Habit", "Steve Lacy"),
            ],
            RetrievalConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn recommend_resolves_then_ranks() {
        let resp = ctx().recommend("snooze sza", 2, 2).unwrap();
        assert_eq!(resp.resolved_index, 0);
        assert_eq!(resp.resolved_title, "Snooze");
        assert_eq!(resp.resolved_artist, "SZA");
        assert_eq!(resp.recommendations.len(), 2);
        assert!(resp.recommendations.iter().all(|r| r.row_index != 0));
    }

    #[test]
    fn unknown_query_is_no_match() {
        let err = ctx().recommend("zzzzzzzzzzzzzzzz", 3, 2).unwrap_err();
        assert!(matches!(err, DscvrError::NoMatch { .. }));
    }

    #[test]
    fn blank_search_is_empty() {
        let resp = ctx().search("  ", 5);
        assert_eq!(resp.query, "  ");
        assert!(resp.results.is_empty());
    }

    #[test]
    fn health_reports_shape() {
        let health = ctx().health();
        assert!(health.ok);
        assert_eq!(health.tracks, 4);
        assert_eq!(health.dims, 3);
        assert_eq!(health.generation, None);
    }
}
