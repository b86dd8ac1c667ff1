//! Semantic routing layer: lazily-loaded embedding model, per-intent
//! centroids, confidence-gated matching, and the layered router.

mod centroid;
mod error;
mod matcher;
mod provider;
mod router;
mod vector;

#[cfg(feature = "onnx")]
mod embedder;
#[cfg(test)]
mod testing;

pub use centroid::{Centroid, CentroidCache, CentroidIndex};
#[cfg(feature = "onnx")]
pub use embedder::{Embedder, OnnxLoader};
pub use error::AiError;
pub use matcher::{Gate, SemanticMatch, rank};
pub use provider::{EmbeddingModel, EmbeddingProvider, ModelLoader, Role, RolePrefixes};
pub use router::{
    DeterministicResolver, Handoff, Layer, NoDeterministic, RouteOutcome, RouteResult, Router,
};
