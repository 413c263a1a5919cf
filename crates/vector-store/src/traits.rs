use crate::error::{EmbedError, StoreError};
use async_trait::async_trait;

/// One search result: a vector id and its similarity score.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: i64,
    pub score: f32,
}

/// Produces a fixed-dimension vector for a chunk of text.
///
/// Implementations may be slow or fail; callers treat any failure as
/// aborting the update that requested it.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Dimension of every vector this provider returns.
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

/// Vector storage with explicit id lifecycle and k-nearest search.
///
/// Implementations must be safe for concurrent reads and writes; the
/// synchronizer issues search calls while updates are in flight.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Add vectors under caller-allocated ids. `vectors` and `ids` must
    /// have equal length.
    async fn add_with_ids(&self, vectors: &[Vec<f32>], ids: &[i64]) -> Result<(), StoreError>;

    /// Remove the given ids. Ids not present are ignored.
    async fn remove_ids(&self, ids: &[i64]) -> Result<(), StoreError>;

    /// Return up to `k` nearest hits for `query`, best first.
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, StoreError>;

    /// Number of vectors currently stored.
    async fn count(&self) -> Result<usize, StoreError>;
}
