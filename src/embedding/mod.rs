//! Text-to-vector pipeline for catalog tracks.
//!
//! [`FeatureBuilder::fit_transform`] turns a corpus into a dense `n × d`
//! [`EmbeddingMatrix`] and the fitted [`EncodingModel`]:
//!
//! 1. normalized text per track (tags, title, artist)
//! 2. TF-IDF over unigrams and bigrams with document-frequency pruning
//! 3. seeded randomized truncated SVD down to `d` dimensions
//! 4. per-dimension division by the fit-time standard deviation (no centering)
//!
//! The model can encode out-of-corpus tracks through the [`TextEncoder`] trait.

pub mod stop_words;
pub mod svd;
pub mod tfidf;

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::catalog::{normalize, TrackRecord};
use crate::config::FeatureConfig;
use crate::error::{DscvrError, Result};
use tfidf::TfidfModel;

/// Dense `n × d` matrix; row `i` embeds corpus record `i`.
pub type EmbeddingMatrix = Array2<f32>;

/// Scales below this are treated as zero-variance and left at 1.
const MIN_SCALE: f64 = 10.0 * f64::EPSILON;

/// Trait for encoding text into the embedding space.
///
/// Implementations produce vectors of exactly [`TextEncoder::dimensions`]
/// entries. All methods are synchronous and CPU-bound.
pub trait TextEncoder: Send + Sync {
    /// Embed a single raw (un-normalized) text.
    fn encode_text(&self, text: &str) -> Vec<f32>;

    /// Embed a batch of texts. Implementations may override for batched math.
    fn encode_batch(&self, texts: &[&str]) -> Vec<Vec<f32>> {
        texts.iter().map(|t| self.encode_text(t)).collect()
    }

    fn dimensions(&self) -> usize;
}

/// Everything needed to re-encode a track the way the build did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingModel {
    pub config: FeatureConfig,
    pub tfidf: TfidfModel,
    /// `d × vocabulary` projection basis.
    pub components: Array2<f64>,
    pub singular_values: Vec<f64>,
    /// Per-dimension divisor learned at fit time.
    pub scale: Vec<f64>,
    /// Share of the weighted representation's variance kept by the projection.
    pub explained_variance_ratio: f64,
}

/// Text the pipeline sees for one record.
pub fn document_text(record: &TrackRecord) -> String {
    normalize(&record.feature_text())
}

#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    config: FeatureConfig,
}

impl FeatureBuilder {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Fit the encoding on `corpus` and embed every record, in corpus order.
    ///
    /// Fails with [`DscvrError::Data`] on an empty corpus, an invalid
    /// configuration, or when pruning leaves no vocabulary.
    pub fn fit_transform(
        &self,
        corpus: &[TrackRecord],
    ) -> Result<(EmbeddingMatrix, EncodingModel)> {
        self.validate()?;
        if corpus.is_empty() {
            return Err(DscvrError::data("corpus is empty"));
        }

        let docs: Vec<String> = corpus.iter().map(document_text).collect();
        let cfg = &self.config;

        let (tfidf, weighted) =
            TfidfModel::fit_transform(&docs, cfg.min_df, cfg.max_df, cfg.ngram_max)?;
        tracing::debug!(
            docs = docs.len(),
            terms = tfidf.n_terms(),
            "term weights fitted"
        );

        let factorization = svd::randomized_svd(
            &weighted,
            cfg.n_components,
            cfg.n_oversamples,
            cfg.n_iter,
            cfg.seed,
        );

        let projected = weighted.dot(&factorization.components.t().to_owned());
        let variance = svd::column_variance(&projected);
        let total_variance = weighted.total_variance();
        let explained_variance_ratio = if total_variance > 0.0 {
            variance.sum() / total_variance
        } else {
            0.0
        };

        let scale: Vec<f64> = variance
            .iter()
            .map(|v| {
                let sd = v.sqrt();
                if sd < MIN_SCALE {
                    1.0
                } else {
                    sd
                }
            })
            .collect();

        let model = EncodingModel {
            config: cfg.clone(),
            tfidf,
            components: factorization.components,
            singular_values: factorization.singular_values,
            scale,
            explained_variance_ratio,
        };
        let matrix = model.finish(projected);

        tracing::info!(
            rows = matrix.nrows(),
            dims = matrix.ncols(),
            vocabulary = model.tfidf.n_terms(),
            explained_variance = model.explained_variance_ratio,
            "feature matrix built"
        );

        Ok((matrix, model))
    }

    fn validate(&self) -> Result<()> {
        let cfg = &self.config;
        if cfg.n_components == 0 {
            return Err(DscvrError::data("n_components must be at least 1"));
        }
        if cfg.ngram_max == 0 {
            return Err(DscvrError::data("ngram_max must be at least 1"));
        }
        if !(cfg.max_df > 0.0 && cfg.max_df <= 1.0) {
            return Err(DscvrError::data(format!(
                "max_df must be in (0, 1], got {}",
                cfg.max_df
            )));
        }
        Ok(())
    }
}

impl EncodingModel {
    pub fn dims(&self) -> usize {
        self.components.nrows()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.tfidf.n_terms()
    }

    /// Embed raw texts; each is normalized the same way the build did.
    pub fn transform(&self, texts: &[&str]) -> EmbeddingMatrix {
        let docs: Vec<String> = texts.iter().map(|t| normalize(t)).collect();
        let weighted = self.tfidf.transform(&docs);
        let projected = weighted.dot(&self.components.t().to_owned());
        self.finish(projected)
    }

    /// Embed a single out-of-corpus record.
    pub fn encode(&self, record: &TrackRecord) -> Vec<f32> {
        self.encode_text(&record.feature_text())
    }

    fn finish(&self, mut projected: Array2<f64>) -> EmbeddingMatrix {
        let scale = Array1::from(self.scale.clone());
        for mut row in projected.axis_iter_mut(Axis(0)) {
            row /= &scale;
        }
        projected.mapv(|v| v as f32)
    }
}

impl TextEncoder for EncodingModel {
    fn encode_text(&self, text: &str) -> Vec<f32> {
        self.transform(&[text]).row(0).to_vec()
    }

    fn encode_batch(&self, texts: &[&str]) -> Vec<Vec<f32>> {
        self.transform(texts)
            .rows()
            .into_iter()
            .map(|r| r.to_vec())
            .collect()
    }

    fn dimensions(&self) -> usize {
        self.dims()
    }
}
