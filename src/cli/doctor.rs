//! CLI `doctor` command: inspect the artifact directory and print a health report.

use anyhow::Result;

use dscvr::artifacts::ArtifactStore;
use dscvr::config::DscvrConfig;
use dscvr::engine::RecsysContext;

/// Check the published artifacts and print a health report.
pub fn doctor(config: &DscvrConfig) -> Result<()> {
    let artifact_dir = config.resolved_artifact_dir();
    let store = ArtifactStore::new(&artifact_dir);

    if !artifact_dir.exists() {
        println!("Artifacts: not found at {}", artifact_dir.display());
        println!("Run `dscvr build` to create them.");
        return Ok(());
    }

    let report = store.report();

    println!("dscvr Health Report");
    println!("===================");
    println!();
    println!("Artifact dir:      {}", artifact_dir.display());
    println!(
        "Generation:        {}",
        report.generation.as_deref().unwrap_or("(none published)")
    );
    println!();
    println!("Files:");
    for (name, size) in &report.files {
        match size {
            Some(bytes) => println!("  {name:<17}{}", format_bytes(*bytes)),
            None => println!("  {name:<17}MISSING"),
        }
    }

    if let Some(ref manifest) = report.manifest {
        println!();
        println!("Manifest:");
        println!("  Built at:        {}", manifest.built_at.to_rfc3339());
        println!("  Rows × dims:     {} × {}", manifest.rows, manifest.dims);
        println!("  Vocabulary:      {}", manifest.vocabulary_size);
        println!("  Explained var:   {:.3}", manifest.explained_variance_ratio);
        println!("  Seed:            {}", manifest.features.seed);
        if manifest.features != config.features {
            println!("  NOTE: feature config differs from the current config file.");
        }
    }

    println!();
    match RecsysContext::from_store(&store, config.retrieval.clone()) {
        Ok(ctx) => {
            let health = ctx.health();
            if health.ok {
                println!("Load check:        PASSED ({} tracks)", health.tracks);
            } else {
                println!("Load check:        FAILED (no tracks)");
            }
        }
        Err(e) => {
            println!("Load check:        FAILED ({e})");
            println!();
            println!("Recovery steps:");
            println!("  1. Rebuild from the corpus: dscvr build");
            println!("  2. Or point DSCVR_ARTIFACTS at a known-good artifact directory.");
        }
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
