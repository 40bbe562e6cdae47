//! Persisted build output: embedding matrix, encoding model and id map.
//!
//! Layout under the artifact directory:
//!
//! ```text
//! CURRENT                    name of the published generation
//! <generation>/features.f32  n × d matrix, row-major little-endian f32
//! <generation>/model.bin     bincode-encoded EncodingModel
//! <generation>/id_map.json   [{title, artist, preview_url, artwork_url}, ...]
//! <generation>/manifest.json build metadata
//! ```
//!
//! [`ArtifactStore::save`] fills a fresh generation directory and only then
//! swaps `CURRENT` (write temp file + rename), so a reader resolving `CURRENT`
//! always sees one complete triple.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::catalog::IdMap;
use crate::config::FeatureConfig;
use crate::embedding::{EmbeddingMatrix, EncodingModel};
use crate::error::{DscvrError, Result};

pub const CURRENT_FILE: &str = "CURRENT";
pub const FEATURES_FILE: &str = "features.f32";
pub const MODEL_FILE: &str = "model.bin";
pub const ID_MAP_FILE: &str = "id_map.json";
pub const MANIFEST_FILE: &str = "manifest.json";

const DTYPE: &str = "f32le";
const GENERATION_PREFIX: &str = "gen-";

/// Build metadata written next to each artifact triple.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    pub generation: String,
    pub built_at: DateTime<Utc>,
    pub rows: usize,
    pub dims: usize,
    pub dtype: String,
    pub vocabulary_size: usize,
    pub explained_variance_ratio: f64,
    pub features: FeatureConfig,
}

/// What serving needs: the matrix and its parallel id map.
#[derive(Debug, Clone)]
pub struct LoadedArtifacts {
    pub matrix: EmbeddingMatrix,
    pub id_map: IdMap,
    pub manifest: Manifest,
}

/// File-level view of the published generation, for diagnostics.
#[derive(Debug, Clone)]
pub struct ArtifactReport {
    pub generation: Option<String>,
    pub files: Vec<(String, Option<u64>)>,
    pub manifest: Option<Manifest>,
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    keep_generations: usize,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            keep_generations: 1,
        }
    }

    /// How many superseded generations survive a publish.
    pub fn with_keep_generations(mut self, keep: usize) -> Self {
        self.keep_generations = keep;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist a full triple and publish it. Returns the manifest written.
    pub fn save(
        &self,
        matrix: &EmbeddingMatrix,
        model: &EncodingModel,
        id_map: &IdMap,
    ) -> Result<Manifest> {
        if matrix.nrows() != id_map.len() {
            return Err(DscvrError::inconsistent(format!(
                "refusing to save {} matrix rows with {} id map entries",
                matrix.nrows(),
                id_map.len()
            )));
        }

        fs::create_dir_all(&self.root)?;
        let generation = format!("{GENERATION_PREFIX}{}", uuid::Uuid::now_v7().simple());
        let staging = self.root.join(format!(".{generation}.partial"));
        fs::create_dir_all(&staging)?;

        let manifest = Manifest {
            generation: generation.clone(),
            built_at: Utc::now(),
            rows: matrix.nrows(),
            dims: matrix.ncols(),
            dtype: DTYPE.into(),
            vocabulary_size: model.vocabulary_size(),
            explained_variance_ratio: model.explained_variance_ratio,
            features: model.config.clone(),
        };

        write_file(&staging.join(FEATURES_FILE), &encode_matrix(matrix))?;
        write_file(&staging.join(MODEL_FILE), &bincode::serialize(model)?)?;
        write_file(&staging.join(ID_MAP_FILE), &serde_json::to_vec(id_map)?)?;
        write_file(
            &staging.join(MANIFEST_FILE),
            &serde_json::to_vec_pretty(&manifest)?,
        )?;

        let final_dir = self.root.join(&generation);
        fs::rename(&staging, &final_dir)?;

        let pointer_tmp = self.root.join(format!("{CURRENT_FILE}.tmp"));
        write_file(&pointer_tmp, generation.as_bytes())?;
        fs::rename(&pointer_tmp, self.root.join(CURRENT_FILE))?;

        tracing::info!(
            dir = %final_dir.display(),
            rows = manifest.rows,
            dims = manifest.dims,
            "artifacts published"
        );

        // CURRENT already points at the new generation.
        if let Err(e) = self.prune(&generation) {
            tracing::warn!(
                error = %e,
                root = %self.root.display(),
                "failed to prune old artifact generations"
            );
        }
        Ok(manifest)
    }

    /// Load matrix and id map of the published generation, validating that
    /// they agree with each other and with the manifest.
    pub fn load(&self) -> Result<LoadedArtifacts> {
        let dir = self.current_dir()?;
        let features_path = require(&dir, FEATURES_FILE)?;
        let id_map_path = require(&dir, ID_MAP_FILE)?;
        require(&dir, MODEL_FILE)?;
        let manifest = read_manifest(&require(&dir, MANIFEST_FILE)?)?;

        if manifest.dtype != DTYPE {
            return Err(DscvrError::inconsistent(format!(
                "unsupported matrix dtype {:?}",
                manifest.dtype
            )));
        }

        let bytes = fs::read(&features_path)?;
        let matrix = decode_matrix(&bytes, manifest.rows, manifest.dims)?;
        let id_map: IdMap = serde_json::from_slice(&fs::read(&id_map_path)?)
            .map_err(|e| DscvrError::inconsistent(format!("{ID_MAP_FILE}: {e}")))?;

        if matrix.nrows() != id_map.len() {
            return Err(DscvrError::inconsistent(format!(
                "matrix has {} rows but id map has {} entries",
                matrix.nrows(),
                id_map.len()
            )));
        }

        tracing::info!(
            generation = %manifest.generation,
            rows = matrix.nrows(),
            dims = matrix.ncols(),
            "artifacts loaded"
        );

        Ok(LoadedArtifacts {
            matrix,
            id_map,
            manifest,
        })
    }

    /// Load the fitted encoding model of the published generation.
    pub fn load_model(&self) -> Result<EncodingModel> {
        let dir = self.current_dir()?;
        let path = require(&dir, MODEL_FILE)?;
        bincode::deserialize(&fs::read(path)?)
            .map_err(|e| DscvrError::inconsistent(format!("{MODEL_FILE}: {e}")))
    }

    /// Describe what is on disk without validating it.
    pub fn report(&self) -> ArtifactReport {
        let generation = fs::read_to_string(self.root.join(CURRENT_FILE))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let dir = generation.as_ref().map(|g| self.root.join(g));
        let files = [FEATURES_FILE, MODEL_FILE, ID_MAP_FILE, MANIFEST_FILE]
            .iter()
            .map(|name| {
                let size = dir
                    .as_ref()
                    .and_then(|d| fs::metadata(d.join(name)).ok())
                    .map(|m| m.len());
                (name.to_string(), size)
            })
            .collect();
        let manifest = dir.and_then(|d| read_manifest(&d.join(MANIFEST_FILE)).ok());

        ArtifactReport {
            generation,
            files,
            manifest,
        }
    }

    fn current_dir(&self) -> Result<PathBuf> {
        let pointer = self.root.join(CURRENT_FILE);
        let generation = match fs::read_to_string(&pointer) {
            Ok(s) => s.trim().to_string(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DscvrError::ArtifactMissing { path: pointer })
            }
            Err(e) => return Err(e.into()),
        };
        if generation.is_empty() {
            return Err(DscvrError::ArtifactMissing { path: pointer });
        }
        let dir = self.root.join(generation);
        if !dir.is_dir() {
            return Err(DscvrError::ArtifactMissing { path: dir });
        }
        Ok(dir)
    }

    /// Remove superseded generations beyond `keep_generations`, plus any
    /// abandoned staging directories.
    fn prune(&self, current: &str) -> Result<()> {
        let mut generations = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !entry.file_type()?.is_dir() || name == current {
                continue;
            }
            if name.starts_with('.') && name.ends_with(".partial") {
                fs::remove_dir_all(entry.path())?;
            } else if name.starts_with(GENERATION_PREFIX) {
                generations.push(name);
            }
        }

        // UUID v7 names sort by creation time.
        generations.sort();
        let excess = generations.len().saturating_sub(self.keep_generations);
        for name in generations.into_iter().take(excess) {
            tracing::debug!(generation = %name, "pruning old artifact generation");
            fs::remove_dir_all(self.root.join(name))?;
        }
        Ok(())
    }
}

fn require(dir: &Path, name: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    if path.is_file() {
        Ok(path)
    } else {
        Err(DscvrError::ArtifactMissing { path })
    }
}

fn read_manifest(path: &Path) -> Result<Manifest> {
    serde_json::from_slice(&fs::read(path)?)
        .map_err(|e| DscvrError::inconsistent(format!("{MANIFEST_FILE}: {e}")))
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

/// Row-major little-endian f32 bytes.
pub fn encode_matrix(matrix: &EmbeddingMatrix) -> Vec<u8> {
    let mut out = Vec::with_capacity(matrix.len() * 4);
    for v in matrix.iter() {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

pub fn decode_matrix(bytes: &[u8], rows: usize, dims: usize) -> Result<EmbeddingMatrix> {
    let expected = rows
        .checked_mul(dims)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| {
            DscvrError::inconsistent(format!("manifest shape {rows} × {dims} overflows"))
        })?;
    if bytes.len() != expected {
        return Err(DscvrError::inconsistent(format!(
            "matrix file holds {} bytes, manifest expects {rows} × {dims} f32 = {expected}",
            bytes.len()
        )));
    }
    let values: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    Array2::from_shape_vec((rows, dims), values)
        .map_err(|e| DscvrError::inconsistent(format!("matrix shape: {e}")))
}
