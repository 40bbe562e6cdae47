//! Catalog record definitions.
//!
//! [`TrackRecord`] is one row of the corpus produced by ingestion. [`TrackMeta`]
//! is the lightweight per-row metadata persisted as the id map, parallel to the
//! rows of the embedding matrix.

use serde::{Deserialize, Serialize};

/// Default for `storage.max_tags`: tags kept per track after merging
/// track-level and artist-level tags.
pub const DEFAULT_MAX_TAGS: usize = 40;

fn default_source() -> String {
    "unknown".into()
}

/// A single track as produced by the ingestion layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub title: String,
    pub artist: String,
    /// Ordered free-text tags, most relevant first. May be empty.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Artist-level tags from ingestion; folded into `tags` when the corpus
    /// is loaded.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artist_tags: Vec<String>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub artwork_url: Option<String>,
    /// Where the record came from, e.g. `"seed:rnb"` or `"similar"`.
    #[serde(default = "default_source")]
    pub source: String,
}

impl TrackRecord {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            tags: Vec::new(),
            artist_tags: Vec::new(),
            preview_url: None,
            artwork_url: None,
            source: default_source(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Deduplication identity. Case and formatting sensitive on purpose:
    /// normalization applies to matching only, never to storage.
    pub fn key(&self) -> (&str, &str) {
        (&self.title, &self.artist)
    }

    /// Tags joined by a single space; empty when there are none.
    pub fn joined_tags(&self) -> String {
        self.tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Raw text fed to the feature pipeline: tags, then title, then artist.
    pub fn feature_text(&self) -> String {
        format!("{} {} {}", self.joined_tags(), self.title, self.artist)
    }

    /// Merge track-level and artist-level tags, keeping the first occurrence of
    /// each tag and at most `max_tags` entries.
    pub fn merge_tags(
        track_tags: &[String],
        artist_tags: &[String],
        max_tags: usize,
    ) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        track_tags
            .iter()
            .chain(artist_tags.iter())
            .filter(|t| !t.trim().is_empty())
            .filter(|t| seen.insert(t.as_str()))
            .take(max_tags)
            .cloned()
            .collect()
    }

    /// Fold `artist_tags` into `tags` with [`TrackRecord::merge_tags`].
    pub fn fold_artist_tags(&mut self, max_tags: usize) {
        let artist_tags = std::mem::take(&mut self.artist_tags);
        self.tags = Self::merge_tags(&self.tags, &artist_tags, max_tags);
    }

    pub fn to_meta(&self) -> TrackMeta {
        TrackMeta {
            title: self.title.clone(),
            artist: self.artist.clone(),
            preview_url: self.preview_url.clone(),
            artwork_url: self.artwork_url.clone(),
        }
    }
}

/// One id map entry. `IdMap[i]` describes the track whose vector is row `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackMeta {
    pub title: String,
    pub artist: String,
    pub preview_url: Option<String>,
    pub artwork_url: Option<String>,
}

/// Ordered metadata parallel to the embedding matrix rows.
pub type IdMap = Vec<TrackMeta>;
