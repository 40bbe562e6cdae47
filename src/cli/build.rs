//! CLI `build` command: fit features on a corpus and publish artifacts.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

use dscvr::artifacts::ArtifactStore;
use dscvr::catalog::corpus;
use dscvr::config::DscvrConfig;
use dscvr::embedding::FeatureBuilder;

/// Build the embedding matrix, model and id map from a corpus file.
pub async fn build(
    config: &DscvrConfig,
    corpus_path: Option<PathBuf>,
    components: Option<usize>,
) -> Result<()> {
    let corpus_path = corpus_path.unwrap_or_else(|| config.resolved_corpus_path());
    let artifact_dir = config.resolved_artifact_dir();
    let mut features = config.features.clone();
    if let Some(n) = components {
        features.n_components = n;
    }

    let pb = spinner();

    pb.set_message(format!("loading corpus from {}", corpus_path.display()));
    let path = corpus_path.clone();
    let max_tags = config.storage.max_tags;
    let records = tokio::task::spawn_blocking(move || corpus::load_corpus(&path, max_tags))
        .await?
        .with_context(|| format!("failed to load corpus {}", corpus_path.display()))?;
    let records = corpus::dedupe(records);
    let total = records.len();

    pb.set_message(format!(
        "fitting {total} tracks into {} dimensions",
        features.n_components
    ));
    let builder = FeatureBuilder::new(features);
    let (matrix, model, id_map) = tokio::task::spawn_blocking(move || {
        builder.fit_transform(&records).map(|(matrix, model)| {
            let id_map: Vec<_> = records.iter().map(|r| r.to_meta()).collect();
            (matrix, model, id_map)
        })
    })
    .await?
    .context("feature build failed")?;

    pb.set_message(format!("writing artifacts to {}", artifact_dir.display()));
    let store = ArtifactStore::new(&artifact_dir)
        .with_keep_generations(config.storage.keep_generations);
    let manifest = tokio::task::spawn_blocking(move || store.save(&matrix, &model, &id_map))
        .await?
        .context("failed to save artifacts")?;

    pb.finish_and_clear();

    println!(
        "Built {} tracks × {} dims (vocabulary {}, explained variance {:.3}).",
        manifest.rows, manifest.dims, manifest.vocabulary_size, manifest.explained_variance_ratio
    );
    println!("Published generation {} in {}", manifest.generation, artifact_dir.display());
    Ok(())
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner} {msg} ({elapsed})") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
