use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::catalog::types::DEFAULT_MAX_TAGS;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct DscvrConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub features: FeatureConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub artifact_dir: String,
    pub corpus_path: String,
    /// Superseded artifact generations kept on disk after a new build is published.
    pub keep_generations: usize,
    /// Tags kept per track once artist tags are folded in at corpus load.
    pub max_tags: usize,
}

/// Knobs of the text → vector pipeline. Persisted alongside the artifacts so a
/// build can be reproduced.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct FeatureConfig {
    /// Output dimensionality `d`.
    pub n_components: usize,
    /// Minimum number of documents a term must appear in.
    pub min_df: usize,
    /// Maximum fraction of documents a term may appear in.
    pub max_df: f64,
    /// Longest n-gram, counted in tokens.
    pub ngram_max: usize,
    pub seed: u64,
    pub n_oversamples: usize,
    pub n_iter: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_top_k: usize,
    pub max_per_artist: usize,
    pub match_cutoff: f64,
    pub search_limit: usize,
    /// How many fuzzy candidates `resolve` considers before applying the cutoff.
    pub resolve_candidates: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8000,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let dir = default_dscvr_dir();
        Self {
            artifact_dir: dir.join("artifacts").to_string_lossy().into_owned(),
            corpus_path: dir.join("corpus.json").to_string_lossy().into_owned(),
            keep_generations: 1,
            max_tags: DEFAULT_MAX_TAGS,
        }
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            n_components: 200,
            min_df: 2,
            max_df: 0.95,
            ngram_max: 2,
            seed: 42,
            n_oversamples: 10,
            n_iter: 5,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: 10,
            max_per_artist: 2,
            match_cutoff: 0.55,
            search_limit: 5,
            resolve_candidates: 3,
        }
    }
}

/// Returns `~/.dscvr/`, or `./.dscvr/` when no home directory can be found.
pub fn default_dscvr_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".dscvr")
}

/// Returns the default config file path: `~/.dscvr/config.toml`
pub fn default_config_path() -> PathBuf {
    default_dscvr_dir().join("config.toml")
}

impl DscvrConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            DscvrConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (DSCVR_ARTIFACTS, DSCVR_CORPUS,
    /// DSCVR_LOG_LEVEL, DSCVR_PORT).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DSCVR_ARTIFACTS") {
            self.storage.artifact_dir = val;
        }
        if let Ok(val) = std::env::var("DSCVR_CORPUS") {
            self.storage.corpus_path = val;
        }
        if let Ok(val) = std::env::var("DSCVR_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("DSCVR_PORT") {
            match val.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %val, "ignoring unparsable DSCVR_PORT"),
            }
        }
    }

    pub fn resolved_artifact_dir(&self) -> PathBuf {
        expand_tilde(&self.storage.artifact_dir)
    }

    pub fn resolved_corpus_path(&self) -> PathBuf {
        expand_tilde(&self.storage.corpus_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
