use anyhow::{Context, Result};

use dscvr::artifacts::ArtifactStore;
use dscvr::config::DscvrConfig;
use dscvr::engine::RecsysContext;

async fn load_context(config: &DscvrConfig) -> Result<RecsysContext> {
    let store = ArtifactStore::new(config.resolved_artifact_dir());
    let retrieval = config.retrieval.clone();
    tokio::task::spawn_blocking(move || RecsysContext::from_store(&store, retrieval))
        .await?
        .context("failed to load artifacts (run `dscvr build` first)")
}

/// Print fuzzy title/artist matches for a query.
pub async fn search(config: &DscvrConfig, query: &str, limit: Option<usize>) -> Result<()> {
    let ctx = load_context(config).await?;
    let limit = limit.unwrap_or(config.retrieval.search_limit);
    let response = ctx.search(query, limit);

    if response.results.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    for (i, hit) in response.results.iter().enumerate() {
        println!(
            "  {}. {} — {} (row {}, score: {:.3})",
            i + 1,
            hit.title,
            hit.artist,
            hit.row_index,
            hit.score,
        );
    }
    Ok(())
}

/// Resolve a query to a track and print its nearest neighbours.
pub async fn recommend(
    config: &DscvrConfig,
    query: &str,
    top_k: Option<usize>,
    max_per_artist: Option<usize>,
) -> Result<()> {
    let ctx = load_context(config).await?;
    let top_k = top_k.unwrap_or(config.retrieval.default_top_k);
    let max_per_artist = max_per_artist.unwrap_or(config.retrieval.max_per_artist);

    let response = ctx.recommend(query, top_k, max_per_artist)?;
    println!(
        "Because you like {} — {}:\n",
        response.resolved_title, response.resolved_artist
    );

    if response.recommendations.is_empty() {
        println!("  No similar tracks found.");
        return Ok(());
    }

    for (i, rec) in response.recommendations.iter().enumerate() {
        println!(
            "  {}. {} — {} (similarity: {:.4})",
            i + 1,
            rec.title,
            rec.artist,
            rec.score
        );
        if let Some(url) = &rec.preview_url {
            println!("     preview: {url}");
        }
    }
    Ok(())
}
