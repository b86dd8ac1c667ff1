//! Embedding provider: one lazily-loaded model shared by every caller.
//!
//! The first caller of [`EmbeddingProvider::model`] runs the loader; callers
//! arriving while the load is in flight await the same load. The outcome,
//! success or failure, is kept for the life of the provider.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use parlance_core::RouterConfig;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::AiError;
use crate::vector::normalize;

/// Which side of the asymmetric comparison a text is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// A user utterance being routed.
    Query,
    /// A catalog example phrase the query is compared against.
    Passage,
}

/// Instruction prefixes prepended to text before encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePrefixes {
    pub query: String,
    pub passage: String,
}

impl Default for RolePrefixes {
    fn default() -> Self {
        Self::from(&RouterConfig::default())
    }
}

impl From<&RouterConfig> for RolePrefixes {
    fn from(config: &RouterConfig) -> Self {
        Self {
            query: config.query_prefix.clone(),
            passage: config.passage_prefix.clone(),
        }
    }
}

impl RolePrefixes {
    pub fn prefix(&self, role: Role) -> &str {
        match role {
            Role::Query => &self.query,
            Role::Passage => &self.passage,
        }
    }
}

/// A loaded sentence embedding model.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Output dimensionality.
    fn dim(&self) -> usize;

    /// Encode already-prefixed texts, one vector per input.
    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Produces the model on first use.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self) -> anyhow::Result<Arc<dyn EmbeddingModel>>;
}

type LoadSlot = Result<Arc<dyn EmbeddingModel>, String>;

/// Role-aware embedding front end over a lazily-loaded [`EmbeddingModel`].
pub struct EmbeddingProvider {
    loader: Box<dyn ModelLoader>,
    prefixes: RolePrefixes,
    model: OnceCell<LoadSlot>,
}

impl EmbeddingProvider {
    pub fn new(loader: impl ModelLoader + 'static, prefixes: RolePrefixes) -> Self {
        Self {
            loader: Box::new(loader),
            prefixes,
            model: OnceCell::new(),
        }
    }

    /// The loaded model, loading it if this is the first call.
    pub async fn model(&self) -> Result<Arc<dyn EmbeddingModel>, AiError> {
        let slot = self
            .model
            .get_or_init(|| async {
                let start = Instant::now();
                match self.loader.load().await {
                    Ok(model) => {
                        info!(
                            dim = model.dim(),
                            elapsed_ms = start.elapsed().as_millis() as u64,
                            "embedding model ready"
                        );
                        Ok(model)
                    }
                    Err(e) => {
                        warn!(error = %format!("{e:#}"), "embedding model failed to load");
                        Err(format!("{e:#}"))
                    }
                }
            })
            .await;
        slot.clone().map_err(AiError::EmbeddingUnavailable)
    }

    /// Whether a model has been loaded successfully.
    pub fn is_loaded(&self) -> bool {
        matches!(self.model.get(), Some(Ok(_)))
    }

    pub fn prefixes(&self) -> &RolePrefixes {
        &self.prefixes
    }

    /// Output dimensionality of the loaded model.
    pub async fn dim(&self) -> Result<usize, AiError> {
        Ok(self.model().await?.dim())
    }

    /// Embed a single text, returning a unit vector.
    pub async fn embed(&self, text: &str, role: Role) -> Result<Vec<f32>, AiError> {
        self.embed_batch(&[text], role)
            .await?
            .pop()
            .ok_or_else(|| AiError::EmbeddingUnavailable("model returned no vector".into()))
    }

    /// Embed a batch of texts under one role, returning unit vectors.
    pub async fn embed_batch(&self, texts: &[&str], role: Role) -> Result<Vec<Vec<f32>>, AiError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let model = self.model().await?;
        let prefix = self.prefixes.prefix(role);
        let inputs: Vec<String> = texts.iter().map(|t| format!("{prefix}{t}")).collect();

        let mut vectors = model
            .embed_batch(&inputs)
            .await
            .map_err(|e| AiError::EmbeddingUnavailable(format!("{e:#}")))?;

        if vectors.len() != texts.len() {
            return Err(AiError::EmbeddingUnavailable(format!(
                "model returned {} vectors for {} inputs",
                vectors.len(),
                texts.len()
            )));
        }

        let dim = model.dim();
        for v in &mut vectors {
            if v.len() != dim {
                return Err(AiError::DimensionMismatch {
                    expected: dim,
                    got: v.len(),
                });
            }
            if !v.iter().all(|x| x.is_finite()) {
                return Err(AiError::EmbeddingUnavailable(
                    "model returned non-finite components".into(),
                ));
            }
            normalize(v);
        }
        Ok(vectors)
    }
}
