use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("centroid index queried before any build attempt")]
    NotInitialized,

    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}
