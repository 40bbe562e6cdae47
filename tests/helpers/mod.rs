#![allow(dead_code)]

use dscvr::artifacts::{ArtifactStore, Manifest};
use dscvr::catalog::{TrackMeta, TrackRecord};
use dscvr::config::{FeatureConfig, RetrievalConfig};
use dscvr::embedding::FeatureBuilder;
use dscvr::engine::RecsysContext;
use ndarray::array;
use tempfile::TempDir;

/// A small catalog with overlapping tags so every record keeps some vocabulary
/// under `min_df = 2`.
pub fn fixture_corpus() -> Vec<TrackRecord> {
    vec![
        TrackRecord::new("Snooze", "SZA").with_tags(["rnb", "soul", "slow jams", "neo soul"]),
        TrackRecord::new("Kill Bill", "SZA").with_tags(["rnb", "pop", "alternative rnb"]),
        TrackRecord::new("Good Days", "SZA").with_tags(["rnb", "neo soul", "dreamy"]),
        TrackRecord::new("Bad Habit", "Steve Lacy").with_tags(["indie", "soul", "alternative rnb"]),
        TrackRecord::new("Dark Red", "Steve Lacy").with_tags(["indie", "lo-fi", "dreamy"]),
        TrackRecord::new("Blinding Lights", "The Weeknd").with_tags(["pop", "synthwave", "80s"]),
        TrackRecord::new("Save Your Tears", "The Weeknd").with_tags(["pop", "synthwave", "slow jams"]),
        TrackRecord::new("Leave The Door Open", "Bruno Mars").with_tags(["soul", "rnb", "80s"]),
        TrackRecord::new("Redbone", "Childish Gambino").with_tags(["funk", "soul", "neo soul"]),
        TrackRecord::new("Pink + White", "Frank Ocean").with_tags(["rnb", "indie", "dreamy"]),
        TrackRecord::new("Lemon", "米津玄師").with_tags(["j-pop", "pop", "dreamy"]),
        TrackRecord::new("Marigold", "あいみょん").with_tags(["j-pop", "pop", "indie"]),
    ]
}

/// The five seed tracks, tagged so each keeps vocabulary under `min_df = 2`
/// without any term appearing in every document.
pub fn five_seed_corpus() -> Vec<TrackRecord> {
    vec![
        TrackRecord::new("Snooze", "SZA").with_tags(["rnb", "soul", "slow jams"]),
        TrackRecord::new("Bad Habit", "Steve Lacy").with_tags(["indie", "soul", "rnb"]),
        TrackRecord::new("Blinding Lights", "The Weeknd").with_tags(["pop", "synthwave", "slow jams"]),
        TrackRecord::new("Leave The Door Open", "Bruno Mars").with_tags(["soul", "rnb", "pop"]),
        TrackRecord::new("Redbone", "Childish Gambino").with_tags(["funk", "soul", "indie"]),
    ]
}

/// Fit and publish the five seed tracks end to end.
pub fn five_seed_store() -> (TempDir, ArtifactStore, Manifest) {
    let tmp = TempDir::new().unwrap();
    let store = ArtifactStore::new(tmp.path().join("artifacts"));
    let corpus = five_seed_corpus();
    let features = FeatureConfig {
        n_components: 4,
        ..FeatureConfig::default()
    };
    let (matrix, model) = FeatureBuilder::new(features).fit_transform(&corpus).unwrap();
    let id_map: Vec<TrackMeta> = corpus.iter().map(|r| r.to_meta()).collect();
    let manifest = store.save(&matrix, &model, &id_map).unwrap();
    (tmp, store, manifest)
}

pub fn small_features() -> FeatureConfig {
    FeatureConfig {
        n_components: 6,
        ..FeatureConfig::default()
    }
}

/// Fit the fixture corpus and publish it into a fresh temp directory.
pub fn built_store() -> (TempDir, ArtifactStore, Manifest) {
    let tmp = TempDir::new().unwrap();
    let store = ArtifactStore::new(tmp.path().join("artifacts"));
    let manifest = build_into(&store);
    (tmp, store, manifest)
}

pub fn build_into(store: &ArtifactStore) -> Manifest {
    let corpus = fixture_corpus();
    let (matrix, model) = FeatureBuilder::new(small_features())
        .fit_transform(&corpus)
        .unwrap();
    let id_map: Vec<TrackMeta> = corpus.iter().map(|r| r.to_meta()).collect();
    store.save(&matrix, &model, &id_map).unwrap()
}

fn meta(title: &str, artist: &str) -> TrackMeta {
    TrackMeta {
        title: title.into(),
        artist: artist.into(),
        preview_url: Some(format!("https://previews.example/{}", title.to_lowercase())),
        artwork_url: None,
    }
}

/// Five known tracks with hand-picked vectors. Every pairwise cosine is
/// positive and no artist repeats, so `top_k = 3` from any row yields 3 rows.
pub fn five_track_context() -> RecsysContext {
    RecsysContext::from_parts(
        array![
            [1.0, 0.2, 0.1],
            [0.9, 0.3, 0.2],
            [0.2, 1.0, 0.3],
            [0.7, 0.1, 0.6],
            [0.3, 0.4, 1.0],
        ],
        vec![
            meta("Snooze", "SZA"),
            meta("Bad Habit", "Steve Lacy"),
            meta("Blinding Lights", "The Weeknd"),
            meta("Leave The Door Open", "Bruno Mars"),
            meta("Redbone", "Childish Gambino"),
        ],
        RetrievalConfig::default(),
    )
    .unwrap()
}
