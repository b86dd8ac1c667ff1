//! Per-intent centroids computed from catalog example phrases.
//!
//! Every example is embedded as a passage; each intent's centroid is the
//! mean of its example vectors, renormalized so cosine similarity against a
//! unit query vector is a plain dot product.

use std::sync::Arc;
use std::time::Instant;

use parlance_core::IntentCatalog;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::AiError;
use crate::provider::{EmbeddingProvider, Role};
use crate::vector::{mean_normalized, normalize};

const EMBED_BATCH_SIZE: usize = 64;

/// Unit-length mean embedding of one intent's examples.
#[derive(Debug, Clone, PartialEq)]
pub struct Centroid {
    intent_id: String,
    vector: Vec<f32>,
}

impl Centroid {
    pub fn intent_id(&self) -> &str {
        &self.intent_id
    }

    pub fn vector(&self) -> &[f32] {
        &self.vector
    }
}

/// All centroids in catalog registration order, sharing one dimension.
#[derive(Debug, Clone, Default)]
pub struct CentroidIndex {
    centroids: Vec<Centroid>,
    dim: usize,
}

impl CentroidIndex {
    /// Embed every catalog example and reduce to one centroid per intent.
    pub async fn build(
        catalog: &IntentCatalog,
        provider: &EmbeddingProvider,
    ) -> Result<Self, AiError> {
        let start = Instant::now();
        let dim = provider.dim().await?;

        let texts: Vec<&str> = catalog
            .list()
            .iter()
            .flat_map(|card| card.examples().iter().map(String::as_str))
            .collect();

        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(EMBED_BATCH_SIZE) {
            vectors.extend(provider.embed_batch(chunk, Role::Passage).await?);
        }

        // Examples were flattened in catalog order; split them back per card.
        let mut centroids = Vec::with_capacity(catalog.len());
        let mut offset = 0;
        for card in catalog.list() {
            let n = card.examples().len();
            let vector = mean_normalized(&vectors[offset..offset + n], dim);
            offset += n;
            centroids.push(Centroid {
                intent_id: card.id().to_string(),
                vector,
            });
        }

        info!(
            intents = centroids.len(),
            examples = texts.len(),
            dim,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "centroid index built"
        );
        Ok(Self { centroids, dim })
    }

    /// Build an index from raw `(intent_id, vector)` rows.
    ///
    /// Vectors are normalized; all must be finite and share the first row's
    /// dimension.
    pub fn from_vectors<S: Into<String>>(
        rows: impl IntoIterator<Item = (S, Vec<f32>)>,
    ) -> Result<Self, AiError> {
        let mut centroids = Vec::new();
        let mut dim = None;
        for (id, mut vector) in rows {
            let expected = *dim.get_or_insert(vector.len());
            if vector.len() != expected {
                return Err(AiError::DimensionMismatch {
                    expected,
                    got: vector.len(),
                });
            }
            let intent_id: String = id.into();
            if !vector.iter().all(|x| x.is_finite()) {
                return Err(AiError::EmbeddingUnavailable(format!(
                    "centroid {intent_id} has non-finite components"
                )));
            }
            normalize(&mut vector);
            centroids.push(Centroid {
                intent_id,
                vector,
            });
        }
        Ok(Self {
            centroids,
            dim: dim.unwrap_or(0),
        })
    }

    pub fn centroids(&self) -> &[Centroid] {
        &self.centroids
    }

    pub fn get(&self, intent_id: &str) -> Option<&Centroid> {
        self.centroids.iter().find(|c| c.intent_id == intent_id)
    }

    pub fn len(&self) -> usize {
        self.centroids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }

    /// Embedding dimensionality (0 for an empty raw index).
    pub fn dim(&self) -> usize {
        self.dim
    }
}

/// Process-lifetime memo of the first successful [`CentroidIndex`] build.
///
/// Concurrent callers before a build completes await the same build. A
/// failed build leaves the cache empty; the next caller builds again.
#[derive(Default)]
pub struct CentroidCache {
    index: OnceCell<Arc<CentroidIndex>>,
}

impl CentroidCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the index, building it if no build has succeeded yet.
    pub async fn get_or_build(
        &self,
        catalog: &IntentCatalog,
        provider: &EmbeddingProvider,
    ) -> Result<Arc<CentroidIndex>, AiError> {
        self.index
            .get_or_try_init(|| async {
                match CentroidIndex::build(catalog, provider).await {
                    Ok(index) => Ok(Arc::new(index)),
                    Err(e) => {
                        warn!(error = %e, "centroid index build failed");
                        Err(e)
                    }
                }
            })
            .await
            .cloned()
    }

    /// The built index, without waiting or building.
    ///
    /// Fails with [`AiError::NotInitialized`] until a build has succeeded.
    pub fn lookup(&self) -> Result<Arc<CentroidIndex>, AiError> {
        self.index.get().cloned().ok_or(AiError::NotInitialized)
    }
}
