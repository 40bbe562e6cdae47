//! Corpus loading and deduplication.
//!
//! The ingestion layer writes the corpus either as a JSON array of
//! [`TrackRecord`]s or as JSON Lines. Row order is significant: it becomes the
//! row order of the embedding matrix.

use std::collections::HashSet;
use std::path::Path;

use crate::catalog::TrackRecord;
use crate::error::{DscvrError, Result};

/// Read a corpus file. Accepts a JSON array or one JSON object per line.
/// Artist tags are folded into each record's tags, keeping at most `max_tags`.
pub fn load_corpus(path: impl AsRef<Path>, max_tags: usize) -> Result<Vec<TrackRecord>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(DscvrError::data(format!(
            "corpus file not found: {}",
            path.display()
        )));
    }
    let contents = std::fs::read_to_string(path)?;
    let records = parse_corpus(&contents, max_tags)?;
    tracing::info!(path = %path.display(), records = records.len(), "corpus loaded");
    Ok(records)
}

/// Parse corpus text, detecting the array vs. JSON Lines layout.
pub fn parse_corpus(contents: &str, max_tags: usize) -> Result<Vec<TrackRecord>> {
    let mut records: Vec<TrackRecord> = if contents.trim_start().starts_with('[') {
        serde_json::from_str(contents)?
    } else {
        contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line)
                    .map_err(|e| DscvrError::data(format!("corpus line {}: {e}", n + 1)))
            })
            .collect::<Result<_>>()?
    };

    for rec in &mut records {
        rec.fold_artist_tags(max_tags);
    }
    Ok(records)
}

/// Drop duplicate `(title, artist)` pairs, keeping the first occurrence, and
/// records whose title or artist is blank. Order is preserved.
pub fn dedupe(records: Vec<TrackRecord>) -> Vec<TrackRecord> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut out = Vec::with_capacity(records.len());

    for rec in records {
        if rec.title.trim().is_empty() || rec.artist.trim().is_empty() {
            tracing::warn!(title = %rec.title, artist = %rec.artist, "skipping record with blank title or artist");
            continue;
        }
        if seen.insert((rec.title.clone(), rec.artist.clone())) {
            out.push(rec);
        }
    }

    out
}
