use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbedError {
    /// Transient failure; the caller may retry the whole update later.
    #[error("Embedding provider unavailable: {0}")]
    Unavailable(String),

    #[error("Embedding inference failed: {0}")]
    Inference(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Got {ids} ids for {vectors} vectors")]
    LengthMismatch { ids: usize, vectors: usize },

    #[error("Duplicate vector id: {0}")]
    DuplicateId(i64),

    #[error("Store backend error: {0}")]
    Backend(String),
}
